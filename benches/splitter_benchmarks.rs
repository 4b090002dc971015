//! Criterion benchmarks for go-splitter
//!
//! Run with: cargo bench
//! View HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use go_splitter::go::{parse_file, DottedDomainClassifier, FileSet};
use go_splitter::splitter::{classify, ImportShader};

/// Go file with `n` types, functions and methods
fn synthetic_source(n: usize) -> String {
    let mut src = String::from(
        "// Package bench is generated.\npackage bench\n\nimport (\n\t\"fmt\"\n\t\"strings\"\n\n\t\"github.com/pkg/errors\"\n\tyaml \"gopkg.in/yaml.v3\"\n)\n",
    );
    for i in 0..n {
        src.push_str(&format!(
            "\n// T{i} is a type.\ntype T{i} struct {{\n\tName string // name\n\tVals []int\n}}\n\nfunc F{i}(s string) string {{\n\treturn strings.ToUpper(fmt.Sprint(s, {i}))\n}}\n\nfunc (t *T{i}) M() error {{\n\t_, err := yaml.Marshal(t)\n\treturn errors.Wrap(err, \"m{i}\")\n}}\n",
            i = i
        ));
    }
    src
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_file");

    for size in [10, 100, 1000] {
        let src = synthetic_source(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &src, |b, src| {
            let fset = FileSet::new();
            b.iter(|| parse_file(&fset, "bench.go", black_box(src)));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let fset = FileSet::new();
    let src = synthetic_source(1000);
    let file = parse_file(&fset, "bench.go", &src).expect("benchmark source parses");

    c.bench_function("classify_1000", |b| {
        b.iter(|| classify(black_box(&file)).decl_count());
    });
}

fn bench_shade_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("shade_source");

    for size in [10, 100, 1000] {
        let src = synthetic_source(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &src, |b, src| {
            let fset = FileSet::new();
            let shader = ImportShader::new(&fset, &DottedDomainClassifier, "bench_split/third_party");
            b.iter(|| shader.shade_source("bench.go", black_box(src)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_classify, bench_shade_source);
criterion_main!(benches);
