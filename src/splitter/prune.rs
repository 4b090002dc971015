//! Unused-import pruning.
//!
//! Bucket files start with the full import list of the source unit; a pruner
//! removes every import the file never references.

use std::collections::HashSet;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::go::import_path::candidate_package_names;
use crate::go::lexer::{Lexer, Token};
use crate::go::scope::package_selectors;
use crate::go::{parse_file, render, FileSet, ImportClassifier, ImportSpec, ParseError, SourceFile, SyntheticUnit};

#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },
}

/// Removes unused imports from a Go source text.
pub trait ImportPruner: Send + Sync {
    fn prune(&self, fset: &FileSet, filename: &str, src: &str) -> Result<String, PruneError>;

    fn name(&self) -> &'static str;
}

/// Keeps an import only if its local name is the base of a selector
/// expression somewhere in the declarations, and that base is not a local
/// variable, parameter or receiver shadowing the package.
pub struct UsagePruner {
    classifier: Arc<dyn ImportClassifier>,
}

impl UsagePruner {
    pub fn new(classifier: Arc<dyn ImportClassifier>) -> Self {
        Self { classifier }
    }
}

impl ImportPruner for UsagePruner {
    fn prune(&self, fset: &FileSet, filename: &str, src: &str) -> Result<String, PruneError> {
        let file = parse_file(fset, filename, src)?;
        let used = selector_bases(&file);

        let mut unit = SyntheticUnit::from_source(&file);
        let before = unit.imports.len();
        unit.imports.retain(|spec| is_used(spec, &used));

        if unit.imports.len() != before {
            crate::debug_log!(
                "pruned {} of {} imports from {}",
                before - unit.imports.len(),
                before,
                filename
            );
        }
        Ok(render(&unit, self.classifier.as_ref()))
    }

    fn name(&self) -> &'static str {
        "usage"
    }
}

fn is_used(spec: &ImportSpec, used: &HashSet<String>) -> bool {
    if spec.is_blank() || spec.is_dot() || spec.is_cgo() {
        return true;
    }
    match &spec.name {
        Some(name) => used.contains(name),
        None => candidate_package_names(&spec.path)
            .iter()
            .any(|name| used.contains(name)),
    }
}

/// Package names referenced as `pkg.Sel` in the declarations.
fn selector_bases(file: &SourceFile) -> HashSet<String> {
    let body_start = file
        .imports
        .last()
        .map_or(file.package.span.end, |d| d.span.end);

    let Ok(tokens) = Lexer::tokenize(&file.src) else {
        return HashSet::new();
    };
    let tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|t| !t.is_comment() && t.span.start >= body_start)
        .collect();
    package_selectors(&file.src, &tokens)
}

/// Pipes the source through `goimports`.
pub struct GoimportsPruner {
    program: String,
}

impl GoimportsPruner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ImportPruner for GoimportsPruner {
    fn prune(&self, _fset: &FileSet, filename: &str, src: &str) -> Result<String, PruneError> {
        let tool_err = |message: String| PruneError::Tool {
            tool: self.program.clone(),
            message,
        };

        let mut child = Command::new(&self.program)
            .arg("-srcdir")
            .arg(filename)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tool_err(format!("failed to start: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(src.as_bytes())
                .map_err(|e| tool_err(format!("failed to write input: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| tool_err(format!("failed to wait: {}", e)))?;
        if !output.status.success() {
            return Err(tool_err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        String::from_utf8(output.stdout).map_err(|e| tool_err(format!("non UTF-8 output: {}", e)))
    }

    fn name(&self) -> &'static str {
        "goimports"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::go::DottedDomainClassifier;

    fn prune(src: &str) -> String {
        UsagePruner::new(Arc::new(DottedDomainClassifier))
            .prune(&FileSet::new(), "x.go", src)
            .unwrap()
    }

    #[test]
    fn test_drops_unused_imports() {
        let src = "package p\n\nimport (\n\t\"fmt\"\n\t\"strings\"\n\n\t\"github.com/pkg/errors\"\n)\n\nfunc F() string {\n\treturn strings.ToUpper(\"x\")\n}\n";
        assert_eq!(
            prune(src),
            "package p\n\nimport \"strings\"\n\nfunc F() string {\n\treturn strings.ToUpper(\"x\")\n}\n"
        );
    }

    #[test]
    fn test_all_imports_unused() {
        let src = "package p\n\nimport (\n\t\"fmt\"\n\t\"github.com/pkg/errors\"\n)\n\ntype T struct{}\n";
        assert_eq!(prune(src), "package p\n\ntype T struct{}\n");
    }

    #[test]
    fn test_alias_and_assumed_names() {
        let src = "package p\n\nimport (\n\tpe \"github.com/pkg/errors\"\n\t\"gopkg.in/yaml.v3\"\n\t\"github.com/jackc/pgx/v5\"\n)\n\nvar _ = pe.New\nvar _ = yaml.Marshal\n";
        let out = prune(src);
        assert!(out.contains("pe \"github.com/pkg/errors\""));
        assert!(out.contains("\"gopkg.in/yaml.v3\""));
        assert!(!out.contains("pgx"));
    }

    #[test]
    fn test_field_access_is_not_package_use() {
        // `s.fmt.X` must not keep "fmt"
        let src = "package p\n\nimport \"fmt\"\n\nfunc F(s S) int { return s.fmt.X }\n";
        assert!(!prune(src).contains("\"fmt\""));
    }

    #[test]
    fn test_comment_mentions_do_not_count() {
        let src = "package p\n\nimport \"fmt\"\n\n// fmt.Println is not called here\nfunc F() {}\n";
        assert!(!prune(src).contains("import"));
    }

    #[test]
    fn test_side_effect_imports_kept() {
        let src = "package p\n\n// #include <stdlib.h>\nimport \"C\"\n\nimport (\n\t_ \"embed\"\n\t. \"math\"\n)\n\nfunc F() float64 { return Pi }\n";
        let out = prune(src);
        assert!(out.contains("import \"C\""));
        assert!(out.contains("_ \"embed\""));
        assert!(out.contains(". \"math\""));
    }

    #[test]
    fn test_shadowing_local_does_not_keep_import() {
        let src = "package p\n\nimport \"net/url\"\n\ntype Req struct{ u U }\n\nfunc (r Req) P() string {\n\turl := r.u\n\treturn url.Path\n}\n";
        assert!(!prune(src).contains("net/url"));

        let src = "package p\n\nimport \"path\"\n\nfunc F(path P) string { return path.Base }\n";
        assert!(!prune(src).contains("import"));
    }

    #[test]
    fn test_package_use_outside_shadowing_scope_kept() {
        // `url` is a parameter in B only
        let src = "package p\n\nimport \"net/url\"\n\nfunc A(s string) {\n\tu, _ := url.Parse(s)\n\t_ = u\n}\n\nfunc B(url U) string { return url.Path }\n";
        assert!(prune(src).contains("import \"net/url\""));

        // the right-hand side still sees the package
        let src = "package p\n\nimport \"net/url\"\n\nfunc A(s string) {\n\turl, _ := url.Parse(s)\n\t_ = url\n}\n";
        assert!(prune(src).contains("import \"net/url\""));
    }

    #[test]
    fn test_versioned_package_named_after_version() {
        let src = "package p\n\nimport \"k8s.io/api/core/v1\"\n\nfunc F() *v1.Pod { return nil }\n";
        assert!(prune(src).contains("import \"k8s.io/api/core/v1\""));

        let src = "package p\n\nimport \"k8s.io/api/core/v1\"\n\nfunc F() {}\n";
        assert!(!prune(src).contains("import"));
    }

    #[test]
    fn test_goimports_missing_binary() {
        let pruner = GoimportsPruner::new("definitely-not-a-goimports-binary");
        let err = pruner
            .prune(&FileSet::new(), "x.go", "package p\n")
            .unwrap_err();
        assert!(matches!(err, PruneError::Tool { .. }));
    }
}
