//! Split pipeline
//!
//! Turns one Go file into a self-contained module:
//! 1. Parse the file and bucket its declarations
//! 2. Write one file per bucket with only the imports it uses
//! 3. `go mod init`, vendor dependencies into `third_party/`
//! 4. Shade every external import into the private namespace
//! 5. `go mod tidy`
//!
//! **Architecture:**
//! - `classifier.rs`: declaration buckets
//! - `writer.rs` / `prune.rs`: bucket files and unused-import pruning
//! - `manifest.rs` / `vendor.rs`: `modules.txt` and relocation
//! - `shader.rs`: import path rewriting over the output tree
//! - `toolchain.rs`: `go` command invocations

pub mod classifier;
pub mod config;
pub mod manifest;
pub mod prune;
pub mod shader;
pub mod toolchain;
pub mod vendor;
pub mod writer;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::error::SplitError;
use crate::go::{
    parse_file, parse_package_clause, DottedDomainClassifier, FileSet, ImportClass, ImportClassifier,
    ModuleListClassifier,
};

pub use classifier::{classify, Bucket, Classification};
pub use config::{OutputLayout, PrunerKind, SplitConfig};
pub use prune::{GoimportsPruner, ImportPruner, UsagePruner};
pub use shader::{ImportShader, MissingPackage, ShadeFailurePolicy, ShadeReport};
pub use toolchain::{GoCommand, GoToolchain};
pub use vendor::RelocationReport;
pub use writer::{BucketWriter, WrittenBucket};

/// Milliseconds spent per phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTimings {
    pub parse_ms: u64,
    pub write_ms: u64,
    pub init_ms: u64,
    pub vendor_ms: u64,
    pub shade_ms: u64,
    pub tidy_ms: u64,
    pub total_ms: u64,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub input: PathBuf,
    pub package: String,
    pub layout: OutputLayout,
    pub buckets: Vec<WrittenBucket>,
    /// `None` when the input has no external imports
    pub relocation: Option<RelocationReport>,
    pub shading: ShadeReport,
    pub missing_packages: Vec<MissingPackage>,
    pub warnings: Vec<String>,
    pub timings: PhaseTimings,
}

/// Import classifier for a configuration
pub fn classifier_for(config: &SplitConfig) -> Arc<dyn ImportClassifier> {
    if config.external_roots.is_empty() {
        Arc::new(DottedDomainClassifier)
    } else {
        Arc::new(ModuleListClassifier {
            roots: config.external_roots.clone(),
        })
    }
}

/// Unused-import pruner for a configuration
pub fn pruner_for(config: &SplitConfig, classifier: Arc<dyn ImportClassifier>) -> Box<dyn ImportPruner> {
    match config.pruner {
        PrunerKind::Usage => Box::new(UsagePruner::new(classifier)),
        PrunerKind::Goimports => Box::new(GoimportsPruner::new(config.goimports_binary.clone())),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub struct Splitter<'a> {
    config: SplitConfig,
    toolchain: &'a dyn GoToolchain,
    pruner: &'a dyn ImportPruner,
    classifier: Arc<dyn ImportClassifier>,
    /// Position context shared by every parse of this run
    fset: FileSet,
}

impl<'a> Splitter<'a> {
    pub fn new(config: SplitConfig, toolchain: &'a dyn GoToolchain, pruner: &'a dyn ImportPruner) -> Self {
        let classifier = classifier_for(&config);
        Self {
            config,
            toolchain,
            pruner,
            classifier,
            fset: FileSet::new(),
        }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Run the whole pipeline on `input`.
    ///
    /// Input and parse errors abort before anything is written. Later
    /// failures may leave a partially populated output tree behind.
    pub fn run(&self, input: &Path) -> Result<SplitReport, SplitError> {
        let started = Instant::now();
        let verbose = self.config.verbose;
        let mut timings = PhaseTimings::default();
        let mut warnings = Vec::new();

        // Phase 1: read and parse
        let t = Instant::now();
        let src = fs::read_to_string(input).map_err(|source| SplitError::Input {
            path: input.to_path_buf(),
            source,
        })?;
        let name = input.to_string_lossy();
        let package = parse_package_clause(&self.fset, &name, &src)?;
        let layout = self.config.layout(&package);

        if verbose {
            println!("🚀 Splitting {} into {}", input.display(), layout.project_name);
        }

        let source = parse_file(&self.fset, &name, &src)?;
        let classification = classify(&source);
        timings.parse_ms = elapsed_ms(t);

        if verbose {
            println!(
                "  📦 {} types, {} functions, {} methods, {} imports",
                classification.types.len(),
                classification.functions.len(),
                classification.methods.len(),
                classification.imports.len()
            );
        }

        // Phase 2: bucket files
        let t = Instant::now();
        let writer = BucketWriter::new(
            &self.fset,
            self.classifier.as_ref(),
            self.pruner,
            &layout.root,
            input,
        );
        let buckets = writer.write_all(&source, &classification)?;
        timings.write_ms = elapsed_ms(t);

        if verbose {
            for b in &buckets {
                println!(
                    "  📝 {} ({} decls, {} imports pruned)",
                    b.path.display(),
                    b.decl_count,
                    b.imports_pruned
                );
            }
        }

        // Phase 3: module identity
        let t = Instant::now();
        self.toolchain.mod_init(&layout.root, &layout.project_name)?;
        timings.init_ms = elapsed_ms(t);

        // Phase 4: vendor + relocate
        let t = Instant::now();
        let has_external = classification
            .imports
            .iter()
            .any(|spec| self.classifier.classify(&spec.path, &layout.import_prefix) != ImportClass::Internal);
        let relocation = if has_external {
            if verbose {
                println!("  📥 Vendoring dependencies into {}", layout.third_party.display());
            }
            let report = vendor::vendor_dependencies(self.toolchain, &self.config.work_dir, &layout.third_party)?;
            for (child, parent) in &report.ordering_violations {
                warnings.push(format!("manifest lists {} before its parent module {}", child, parent));
            }
            Some(report)
        } else {
            crate::debug_log!("{} has no external imports, skipping vendoring", input.display());
            if layout.third_party.exists() {
                crate::debug_log!("removing stale {}", layout.third_party.display());
                fs::remove_dir_all(&layout.third_party).map_err(|e| SplitError::io(&layout.third_party, e))?;
            }
            None
        };
        timings.vendor_ms = elapsed_ms(t);

        // Phase 5: shade
        let t = Instant::now();
        if verbose {
            println!("  ✏️  Rewriting imports to {}", layout.import_prefix);
        }
        let import_shader = ImportShader::new(&self.fset, self.classifier.as_ref(), layout.import_prefix.clone());
        let progress = self.config.progress.then(shader::shading_progress_bar);
        let shade_result = import_shader.shade_tree(
            &layout.root,
            self.config.shade_policy,
            self.config.parallel,
            progress.as_ref(),
        );
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        let shading = shade_result?.into_result()?;
        let missing_packages = import_shader.verify_vendor_completeness(&layout.root, &layout.third_party)?;
        for m in &missing_packages {
            warnings.push(format!(
                "{} imports {} which is not vendored",
                m.importer.display(),
                m.import_path
            ));
        }
        timings.shade_ms = elapsed_ms(t);

        // Phase 6: tidy; the tree is already complete, so failures only warn
        let t = Instant::now();
        if self.config.tidy {
            if let Err(e) = self.toolchain.mod_tidy(&layout.root) {
                warnings.push(e.to_string());
            }
        }
        timings.tidy_ms = elapsed_ms(t);
        timings.total_ms = elapsed_ms(started);

        if verbose {
            for w in &warnings {
                println!("  ⚠️  {}", w);
            }
            println!(
                "✨ Done: {} files, {} imports shaded in {}ms",
                buckets.len(),
                shading.imports_rewritten,
                timings.total_ms
            );
        }

        Ok(SplitReport {
            input: input.to_path_buf(),
            package,
            layout,
            buckets,
            relocation,
            shading,
            missing_packages,
            warnings,
            timings,
        })
    }

    /// Shade an existing output tree without re-running the split
    pub fn shade_only(&self, root: &Path, import_prefix: &str) -> Result<ShadeReport, SplitError> {
        let import_shader = ImportShader::new(&self.fset, self.classifier.as_ref(), import_prefix);
        let progress = self.config.progress.then(shader::shading_progress_bar);
        let result = import_shader.shade_tree(root, self.config.shade_policy, self.config.parallel, progress.as_ref());
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        result?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::file_ops::tree_fingerprint;
    use crate::constants::{GO_MOD_FILE, VENDOR_MANIFEST};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writes go.mod and a canned vendor tree instead of running `go`
    struct FakeToolchain {
        manifest: &'static str,
        files: Vec<(&'static str, &'static str)>,
        calls: RefCell<Vec<String>>,
        fail_tidy: bool,
    }

    impl FakeToolchain {
        fn new(manifest: &'static str, files: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                manifest,
                files,
                calls: RefCell::new(Vec::new()),
                fail_tidy: false,
            }
        }
    }

    impl GoToolchain for FakeToolchain {
        fn mod_init(&self, dir: &Path, name: &str) -> Result<(), SplitError> {
            self.calls.borrow_mut().push(format!("init {}", name));
            fs::write(dir.join(GO_MOD_FILE), format!("module {}\n", name)).unwrap();
            Ok(())
        }

        fn mod_vendor(&self, _work_dir: &Path, out_dir: &Path) -> Result<(), SplitError> {
            self.calls.borrow_mut().push("vendor".to_string());
            for (rel, content) in &self.files {
                let path = out_dir.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            fs::create_dir_all(out_dir).unwrap();
            fs::write(out_dir.join(VENDOR_MANIFEST), self.manifest).unwrap();
            Ok(())
        }

        fn mod_tidy(&self, _dir: &Path) -> Result<(), SplitError> {
            self.calls.borrow_mut().push("tidy".to_string());
            if self.fail_tidy {
                return Err(SplitError::Toolchain {
                    command: "go mod tidy".to_string(),
                    message: "network unreachable".to_string(),
                });
            }
            Ok(())
        }
    }

    const INPUT: &str = r#"package mylib

import (
	"strings"

	"github.com/pkg/errors"
)

type T struct{ Name string }

func F(s string) string {
	return strings.ToUpper(s)
}

func (t T) M() error {
	return errors.New(t.Name)
}
"#;

    const MANIFEST: &str = "# github.com/pkg/errors v0.9.1\n## explicit\ngithub.com/pkg/errors\n";

    fn vendored() -> Vec<(&'static str, &'static str)> {
        vec![(
            "github.com/pkg/errors/errors.go",
            "package errors\n\nimport \"fmt\"\n\nfunc New(s string) error { return fmt.Errorf(s) }\n",
        )]
    }

    fn config(work: &Path) -> SplitConfig {
        SplitConfig {
            work_dir: work.to_path_buf(),
            progress: false,
            ..SplitConfig::default()
        }
    }

    fn run(work: &Path, toolchain: &FakeToolchain) -> Result<SplitReport, SplitError> {
        let input = work.join("mylib.go");
        if !input.exists() {
            fs::write(&input, INPUT).unwrap();
        }
        let config = config(work);
        let pruner = pruner_for(&config, classifier_for(&config));
        Splitter::new(config, toolchain, pruner.as_ref()).run(&input)
    }

    #[test]
    fn test_end_to_end_split() {
        let temp = TempDir::new().unwrap();
        let toolchain = FakeToolchain::new(MANIFEST, vendored());
        let report = run(temp.path(), &toolchain).unwrap();

        let root = temp.path().join("mylib_split");
        assert_eq!(report.layout.root, root);
        assert_eq!(report.buckets.len(), 3);
        assert_eq!(
            *toolchain.calls.borrow(),
            vec!["init mylib_split", "vendor", "tidy"]
        );

        let types = fs::read_to_string(root.join("mylib_types.go")).unwrap();
        assert_eq!(types, "package mylib\n\ntype T struct{ Name string }\n");

        let funcs = fs::read_to_string(root.join("mylib_funcs.go")).unwrap();
        assert!(funcs.contains("import \"strings\""));
        assert!(!funcs.contains("errors"));

        let methods = fs::read_to_string(root.join("mylib_methods.go")).unwrap();
        assert!(methods.contains("import \"mylib_split/third_party/github.com/pkg/errors\""));
        assert!(!methods.contains("\"strings\""));

        assert!(root.join("third_party/github.com/pkg/errors/errors.go").is_file());
        assert!(root.join(GO_MOD_FILE).is_file());
        assert_eq!(report.shading.imports_rewritten, 1);
        assert!(report.missing_packages.is_empty());
        assert!(report.warnings.is_empty());

        // No vendor workspace left in the work directory
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".go-splitter-vendor-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_shading_twice_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let toolchain = FakeToolchain::new(MANIFEST, vendored());
        let report = run(temp.path(), &toolchain).unwrap();

        let before = tree_fingerprint(&report.layout.root).unwrap();
        let config = config(temp.path());
        let pruner = pruner_for(&config, classifier_for(&config));
        let splitter = Splitter::new(config, &toolchain, pruner.as_ref());
        let second = splitter
            .shade_only(&report.layout.root, &report.layout.import_prefix)
            .unwrap();

        assert_eq!(second.files_rewritten, 0);
        assert_eq!(before, tree_fingerprint(&report.layout.root).unwrap());
    }

    #[test]
    fn test_rerun_produces_identical_tree() {
        let temp = TempDir::new().unwrap();
        let toolchain = FakeToolchain::new(MANIFEST, vendored());
        let first = run(temp.path(), &toolchain).unwrap();
        let before = tree_fingerprint(&first.layout.root).unwrap();

        run(temp.path(), &toolchain).unwrap();
        assert_eq!(before, tree_fingerprint(&first.layout.root).unwrap());
    }

    #[test]
    fn test_no_methods_no_methods_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("mylib.go"),
            "package mylib\n\nimport \"fmt\"\n\ntype T int\n\nfunc F() { fmt.Println() }\n",
        )
        .unwrap();
        let toolchain = FakeToolchain::new("", vec![]);
        let report = run(temp.path(), &toolchain).unwrap();

        let root = temp.path().join("mylib_split");
        assert!(root.join("mylib_types.go").is_file());
        assert!(root.join("mylib_funcs.go").is_file());
        assert!(!root.join("mylib_methods.go").exists());
        // Standard library only: nothing to vendor
        assert!(report.relocation.is_none());
        assert!(!toolchain.calls.borrow().contains(&"vendor".to_string()));
    }

    #[test]
    fn test_stale_third_party_removed_when_nothing_to_vendor() {
        let temp = TempDir::new().unwrap();
        let toolchain = FakeToolchain::new(MANIFEST, vendored());
        let first = run(temp.path(), &toolchain).unwrap();
        let third_party = first.layout.third_party.clone();
        assert!(third_party.is_dir());

        // The input drops its only external dependency
        fs::write(
            temp.path().join("mylib.go"),
            "package mylib\n\nimport \"strings\"\n\nfunc F(s string) string { return strings.ToUpper(s) }\n",
        )
        .unwrap();
        let second = run(temp.path(), &toolchain).unwrap();

        assert!(second.relocation.is_none());
        assert!(!third_party.exists());
        assert!(second.missing_packages.is_empty());
    }

    #[test]
    fn test_input_errors_write_nothing() {
        let temp = TempDir::new().unwrap();
        let toolchain = FakeToolchain::new(MANIFEST, vendored());
        let config = config(temp.path());
        let pruner = pruner_for(&config, classifier_for(&config));
        let splitter = Splitter::new(config, &toolchain, pruner.as_ref());

        let err = splitter.run(&temp.path().join("missing.go")).unwrap_err();
        assert!(matches!(err, SplitError::Input { .. }));

        let bad = temp.path().join("bad.go");
        fs::write(&bad, "package bad\n\nfunc F( {\n").unwrap();
        let err = splitter.run(&bad).unwrap_err();
        assert!(matches!(err, SplitError::Parse(_)));
        assert!(!temp.path().join("bad_split").exists());
        assert!(toolchain.calls.borrow().is_empty());
    }

    #[test]
    fn test_tidy_failure_is_a_warning() {
        let temp = TempDir::new().unwrap();
        let mut toolchain = FakeToolchain::new(MANIFEST, vendored());
        toolchain.fail_tidy = true;
        let report = run(temp.path(), &toolchain).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("network unreachable"));
    }

    #[test]
    fn test_unvendored_import_reported() {
        let temp = TempDir::new().unwrap();
        // Manifest lists a module, but the vendored errors package imports
        // another one that was never materialized
        let toolchain = FakeToolchain::new(
            MANIFEST,
            vec![(
                "github.com/pkg/errors/errors.go",
                "package errors\n\nimport \"golang.org/x/xerrors\"\n\nvar New = xerrors.New\n",
            )],
        );
        let report = run(temp.path(), &toolchain).unwrap();
        assert_eq!(report.missing_packages.len(), 1);
        assert_eq!(
            report.missing_packages[0].import_path,
            "mylib_split/third_party/golang.org/x/xerrors"
        );
        assert_eq!(report.warnings.len(), 1);
    }
}
