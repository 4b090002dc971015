//! Import shading: rewrite external import paths into the private namespace.
//!
//! Only the path literals change; every other byte of a file is preserved,
//! and files without a canonical external import are never written. A second
//! pass over a shaded tree therefore changes nothing.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::file_ops::{find_go_files, module_rel_path};
use crate::error::{ShadeFailure, SplitError};
use crate::go::import_path::{has_prefix, join, quote};
use crate::go::{apply_edits, parse_file, Edit, FileSet, ImportClass, ImportClassifier};

/// What happens when a file in the tree cannot be shaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadeFailurePolicy {
    /// Stop at the first failure
    Abort,
    /// Attempt every file and report all failures together
    #[default]
    Collect,
}

/// Rewritten text of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shaded {
    pub text: String,
    pub rewritten: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShadeReport {
    pub files_visited: usize,
    pub files_rewritten: usize,
    pub imports_rewritten: usize,
    pub failures: Vec<ShadeFailure>,
    /// Set when the Abort policy stopped the walk early
    pub aborted: bool,
    pub rewritten_files: Vec<PathBuf>,
}

impl ShadeReport {
    /// Turn collected failures into a fatal error
    pub fn into_result(self) -> Result<Self, SplitError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(SplitError::Shading {
                failures: self.failures,
            })
        }
    }

    fn record(&mut self, path: &Path, result: Result<Option<usize>, String>) {
        self.files_visited += 1;
        match result {
            Ok(Some(count)) => {
                self.files_rewritten += 1;
                self.imports_rewritten += count;
                self.rewritten_files.push(path.to_path_buf());
            }
            Ok(None) => {}
            Err(message) => self.failures.push(ShadeFailure {
                path: path.to_path_buf(),
                message,
            }),
        }
    }
}

/// A shaded import whose package directory is absent from the private subtree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MissingPackage {
    pub importer: PathBuf,
    pub import_path: String,
}

pub struct ImportShader<'a> {
    fset: &'a FileSet,
    classifier: &'a dyn ImportClassifier,
    /// Private namespace, e.g. `mylib_split/third_party`
    prefix: String,
}

impl<'a> ImportShader<'a> {
    pub fn new(fset: &'a FileSet, classifier: &'a dyn ImportClassifier, prefix: impl Into<String>) -> Self {
        Self {
            fset,
            classifier,
            prefix: prefix.into(),
        }
    }

    /// Rewrite canonical external imports of one source text; `None` when
    /// nothing needs to change.
    pub fn shade_source(&self, name: &str, src: &str) -> Result<Option<Shaded>, String> {
        let file = parse_file(self.fset, name, src).map_err(|e| e.to_string())?;

        let edits: Vec<Edit> = file
            .import_specs()
            .filter(|spec| self.classifier.classify(&spec.path, &self.prefix) == ImportClass::ExternalCanonical)
            .map(|spec| Edit {
                span: spec.path_span,
                replacement: quote(&join(&self.prefix, &spec.path)),
            })
            .collect();

        if edits.is_empty() {
            return Ok(None);
        }

        let text = apply_edits(src, &edits).map_err(|e| e.to_string())?;
        Ok(Some(Shaded {
            text,
            rewritten: edits.len(),
        }))
    }

    /// Shade a file in place; returns the number of rewritten imports, or
    /// `None` when the file was left untouched.
    pub fn shade_file(&self, path: &Path) -> Result<Option<usize>, String> {
        let src = fs::read_to_string(path).map_err(|e| format!("cannot read: {}", e))?;
        let name = path.to_string_lossy();
        match self.shade_source(&name, &src)? {
            Some(shaded) => {
                fs::write(path, &shaded.text).map_err(|e| format!("cannot write: {}", e))?;
                crate::debug_log!("shaded {} import(s) in {}", shaded.rewritten, path.display());
                Ok(Some(shaded.rewritten))
            }
            None => Ok(None),
        }
    }

    /// Shade every `.go` file under `root`: files directly in `root` first,
    /// then the subdirectories recursively.
    pub fn shade_tree(
        &self,
        root: &Path,
        policy: ShadeFailurePolicy,
        parallel: bool,
        progress: Option<&ProgressBar>,
    ) -> Result<ShadeReport, SplitError> {
        let files = collect_files(root)?;
        if let Some(pb) = progress {
            pb.set_length(files.len() as u64);
        }

        let mut report = ShadeReport::default();
        match policy {
            ShadeFailurePolicy::Abort => {
                for path in &files {
                    let result = self.shade_file(path);
                    let failed = result.is_err();
                    report.record(path, result);
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    if failed {
                        report.aborted = true;
                        break;
                    }
                }
            }
            ShadeFailurePolicy::Collect => {
                let shade_one = |path: &PathBuf| {
                    let result = self.shade_file(path);
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    result
                };
                let results: Vec<Result<Option<usize>, String>> = if parallel {
                    files.par_iter().map(shade_one).collect()
                } else {
                    files.iter().map(shade_one).collect()
                };
                for (path, result) in files.iter().zip(results) {
                    report.record(path, result);
                }
            }
        }

        crate::debug_log!(
            "shading {}: {} visited, {} rewritten, {} failed",
            root.display(),
            report.files_visited,
            report.files_rewritten,
            report.failures.len()
        );
        Ok(report)
    }

    /// Every shaded import under `root` whose package is not present in
    /// `third_party`.
    pub fn verify_vendor_completeness(
        &self,
        root: &Path,
        third_party: &Path,
    ) -> Result<Vec<MissingPackage>, SplitError> {
        let mut missing = BTreeSet::new();
        let namespace = format!("{}/", self.prefix);

        for path in collect_files(root)? {
            let src = fs::read_to_string(&path).map_err(|e| SplitError::io(&path, e))?;
            let file = parse_file(self.fset, &path.to_string_lossy(), &src)?;

            for spec in file.import_specs() {
                if !has_prefix(&spec.path, &self.prefix) {
                    continue;
                }
                let rel = spec.path.strip_prefix(&namespace).unwrap_or("");
                if rel.is_empty() || !third_party.join(module_rel_path(rel)).is_dir() {
                    missing.insert(MissingPackage {
                        importer: path.clone(),
                        import_path: spec.path.clone(),
                    });
                }
            }
        }
        Ok(missing.into_iter().collect())
    }
}

/// `.go` files directly under `root` first, then the rest of the tree
fn collect_files(root: &Path) -> Result<Vec<PathBuf>, SplitError> {
    let all = find_go_files(root).map_err(|message| SplitError::Io {
        path: root.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, message),
    })?;
    let (top, nested): (Vec<PathBuf>, Vec<PathBuf>) =
        all.into_iter().partition(|p| p.parent() == Some(root));
    Ok(top.into_iter().chain(nested).collect())
}

/// Progress bar for the shading walk
pub fn shading_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} Shading [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
