//! Bucket writer: one synthesized Go file per non-empty bucket.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::classifier::{Bucket, Classification, ClassifiedDecl};
use super::prune::{ImportPruner, PruneError};
use crate::constants::GO_EXT;
use crate::error::SplitError;
use crate::go::{parse_file, render, FileSet, ImportClassifier, SourceFile, SyntheticUnit};

/// Result of writing one bucket file
#[derive(Debug, Clone, Serialize)]
pub struct WrittenBucket {
    pub bucket: Bucket,
    pub path: PathBuf,
    pub decl_count: usize,
    pub imports_kept: usize,
    pub imports_pruned: usize,
}

pub struct BucketWriter<'a> {
    fset: &'a FileSet,
    classifier: &'a dyn ImportClassifier,
    pruner: &'a dyn ImportPruner,
    output_dir: &'a Path,
    /// Input file name without extension
    stem: String,
}

impl<'a> BucketWriter<'a> {
    pub fn new(
        fset: &'a FileSet,
        classifier: &'a dyn ImportClassifier,
        pruner: &'a dyn ImportPruner,
        output_dir: &'a Path,
        input: &Path,
    ) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "split".to_string());
        Self {
            fset,
            classifier,
            pruner,
            output_dir,
            stem,
        }
    }

    /// `<stem>_types.go`, `<stem>_funcs.go` or `<stem>_methods.go`
    pub fn bucket_file_name(&self, bucket: Bucket) -> String {
        format!("{}{}.{}", self.stem, bucket.file_suffix(), GO_EXT)
    }

    /// Write every non-empty bucket. The package doc comment goes to the
    /// first file written. A file left by an earlier run for a bucket that
    /// is now empty is removed.
    pub fn write_all(
        &self,
        source: &SourceFile,
        classification: &Classification<'_>,
    ) -> Result<Vec<WrittenBucket>, SplitError> {
        fs::create_dir_all(self.output_dir).map_err(|e| SplitError::io(self.output_dir, e))?;

        let mut written = Vec::new();
        for bucket in classification.non_empty() {
            let with_doc = written.is_empty();
            let unit = synthesize(source, classification, classification.bucket(bucket), with_doc);
            written.push(self.write_bucket(bucket, &unit)?);
        }

        for bucket in Bucket::ALL {
            if !classification.bucket(bucket).is_empty() {
                continue;
            }
            let stale = self.output_dir.join(self.bucket_file_name(bucket));
            if stale.is_file() {
                crate::debug_log!("removing stale {}", stale.display());
                fs::remove_file(&stale).map_err(|e| SplitError::io(&stale, e))?;
            }
        }
        Ok(written)
    }

    /// Render, prune, validate and persist one unit.
    pub fn write_bucket(&self, bucket: Bucket, unit: &SyntheticUnit) -> Result<WrittenBucket, SplitError> {
        let file_name = self.bucket_file_name(bucket);
        let text = render(unit, self.classifier);

        let pruned = self
            .pruner
            .prune(self.fset, &file_name, &text)
            .map_err(|e| match e {
                PruneError::Parse(err) => SplitError::Serialization {
                    file: file_name.clone(),
                    message: err.to_string(),
                },
                other => SplitError::Prune {
                    file: file_name.clone(),
                    message: other.to_string(),
                },
            })?;

        // Whatever the pruner returned must still be a valid unit
        let validated = parse_file(self.fset, &file_name, &pruned).map_err(|e| SplitError::Serialization {
            file: file_name.clone(),
            message: e.to_string(),
        })?;
        let imports_kept = validated.import_specs().count();

        let path = self.output_dir.join(&file_name);
        fs::write(&path, &pruned).map_err(|e| SplitError::io(&path, e))?;

        crate::debug_log!(
            "wrote {} ({} decls, {} of {} imports kept)",
            path.display(),
            unit.decls.len(),
            imports_kept,
            unit.imports.len()
        );

        Ok(WrittenBucket {
            bucket,
            path,
            decl_count: unit.decls.len(),
            imports_kept,
            imports_pruned: unit.imports.len().saturating_sub(imports_kept),
        })
    }
}

/// Same package as the source, the bucket's declarations in order, and the
/// full original import list.
pub fn synthesize(
    source: &SourceFile,
    classification: &Classification<'_>,
    decls: &[ClassifiedDecl<'_>],
    with_package_doc: bool,
) -> SyntheticUnit {
    SyntheticUnit {
        header: source.header.clone(),
        with_package_doc,
        package: source.package.name.clone(),
        imports: classification.imports.clone(),
        decls: decls
            .iter()
            .map(|d| source.decl_text(d.decl).to_string())
            .collect(),
    }
}
