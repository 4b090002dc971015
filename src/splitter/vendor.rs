//! Dependency vendoring and relocation into the private subtree.
//!
//! `go mod vendor` runs into a scoped temporary workspace; each module the
//! manifest lists is then moved to `<output>/third_party/<module path>`.
//! Relocation is two-pass: moves first (parents before nested modules), then
//! a verification walk over every listed package.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;

use super::manifest::Manifest;
use super::toolchain::GoToolchain;
use crate::common::file_ops::{module_rel_path, move_dir};
use crate::constants::{VENDOR_MANIFEST, VENDOR_WORKSPACE_PREFIX};
use crate::error::SplitError;

/// Temporary vendor directory, removed when dropped
pub struct VendorWorkspace {
    dir: TempDir,
}

impl VendorWorkspace {
    pub fn create(work_dir: &Path) -> Result<Self, SplitError> {
        let dir = tempfile::Builder::new()
            .prefix(VENDOR_WORKSPACE_PREFIX)
            .tempdir_in(work_dir)
            .map_err(|e| SplitError::io(work_dir, e))?;
        crate::debug_log!("vendor workspace at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Target of `go mod vendor -o`
    pub fn vendor_dir(&self) -> PathBuf {
        self.dir.path().join("vendor")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.vendor_dir().join(VENDOR_MANIFEST)
    }

    /// Remove the workspace now, reporting failures instead of ignoring them
    pub fn close(self) -> Result<(), SplitError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| SplitError::io(&path, e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RelocationOutcome {
    Moved,
    /// Carried along with an enclosing module
    AlreadyRelocated,
    /// Listed without packages, nothing was vendored
    NotMaterialized,
    /// Listed with packages but absent from both trees
    Missing,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RelocatedModule {
    pub module: String,
    pub outcome: RelocationOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RelocationReport {
    pub modules: Vec<RelocatedModule>,
    /// (nested module, parent) pairs the manifest listed child-first
    pub ordering_violations: Vec<(String, String)>,
}

impl RelocationReport {
    pub fn moved(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.outcome == RelocationOutcome::Moved)
            .count()
    }
}

/// Move every manifest module from `vendor_dir` to `third_party`, then check
/// that nothing was left behind or lost.
pub fn relocate(
    manifest: &Manifest,
    vendor_dir: &Path,
    third_party: &Path,
) -> Result<RelocationReport, SplitError> {
    if third_party.exists() {
        crate::debug_log!("replacing stale {}", third_party.display());
        fs::remove_dir_all(third_party).map_err(|e| SplitError::io(third_party, e))?;
    }
    fs::create_dir_all(third_party).map_err(|e| SplitError::io(third_party, e))?;

    let mut report = RelocationReport {
        ordering_violations: manifest.ordering_violations(),
        ..RelocationReport::default()
    };
    for (child, parent) in &report.ordering_violations {
        crate::debug_log!("manifest lists {} before its parent {}", child, parent);
    }

    // Pass 1: move
    for module in manifest.relocation_order() {
        let rel = module_rel_path(&module.path);
        let src = vendor_dir.join(&rel);
        let dst = third_party.join(&rel);

        let outcome = if src.is_dir() {
            match move_dir(&src, &dst) {
                Ok(()) => RelocationOutcome::Moved,
                Err(e) => RelocationOutcome::Failed(e),
            }
        } else if dst.is_dir() {
            RelocationOutcome::AlreadyRelocated
        } else if !module.is_materialized() {
            RelocationOutcome::NotMaterialized
        } else {
            RelocationOutcome::Missing
        };

        crate::debug_log!("relocate {}: {:?}", module.path, outcome);
        report.modules.push(RelocatedModule {
            module: module.path.clone(),
            outcome,
        });
    }

    // Pass 2: verify
    let mut problems: Vec<String> = report
        .modules
        .iter()
        .filter_map(|m| match &m.outcome {
            RelocationOutcome::Failed(e) => Some(format!("{}: {}", m.module, e)),
            _ => None,
        })
        .collect();

    for package in manifest.packages() {
        let rel = module_rel_path(package);
        if vendor_dir.join(&rel).is_dir() {
            problems.push(format!("{} left in vendor directory", package));
        }
        if !third_party.join(&rel).is_dir() {
            problems.push(format!("{} missing from {}", package, third_party.display()));
        }
    }

    if problems.is_empty() {
        Ok(report)
    } else {
        Err(SplitError::Relocation { problems })
    }
}

/// Vendor the dependencies of `work_dir` and relocate them under
/// `third_party`. The temporary workspace is removed on every path.
pub fn vendor_dependencies(
    toolchain: &dyn GoToolchain,
    work_dir: &Path,
    third_party: &Path,
) -> Result<RelocationReport, SplitError> {
    let workspace = VendorWorkspace::create(work_dir)?;
    toolchain.mod_vendor(work_dir, &workspace.vendor_dir())?;

    let manifest = Manifest::load(&workspace.manifest_path())?;
    crate::debug_log!(
        "manifest lists {} modules, {} packages",
        manifest.modules.len(),
        manifest.packages().count()
    );

    let report = relocate(&manifest, &workspace.vendor_dir(), third_party)?;
    workspace.close()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    fn setup(manifest: &str, files: &[&str]) -> (TempDir, PathBuf, PathBuf, Manifest) {
        let temp = TempDir::new().unwrap();
        let vendor = temp.path().join("vendor");
        for f in files {
            touch(&vendor, f);
        }
        let third_party = temp.path().join("out/third_party");
        (temp, vendor, third_party, Manifest::parse(manifest).unwrap())
    }

    #[test]
    fn test_relocates_modules() {
        let (_temp, vendor, third_party, manifest) = setup(
            "# github.com/a/b v1.0.0\ngithub.com/a/b\ngithub.com/a/b/c\n# golang.org/x/y v0.1.0\ngolang.org/x/y/z\n# rsc.io/none v1.0.0\n",
            &["github.com/a/b/b.go", "github.com/a/b/c/c.go", "golang.org/x/y/z/z.go"],
        );

        let report = relocate(&manifest, &vendor, &third_party).unwrap();
        assert_eq!(report.moved(), 2);
        assert!(third_party.join("github.com/a/b/c/c.go").is_file());
        assert!(third_party.join("golang.org/x/y/z/z.go").is_file());
        assert!(!vendor.join("github.com/a/b").exists());

        let none = report.modules.iter().find(|m| m.module == "rsc.io/none").unwrap();
        assert_eq!(none.outcome, RelocationOutcome::NotMaterialized);
    }

    #[test]
    fn test_nested_module_listed_first() {
        let (_temp, vendor, third_party, manifest) = setup(
            "# github.com/a/b/sub v1.0.0\ngithub.com/a/b/sub\n# github.com/a/b v1.0.0\ngithub.com/a/b\n",
            &["github.com/a/b/b.go", "github.com/a/b/sub/s.go"],
        );

        let report = relocate(&manifest, &vendor, &third_party).unwrap();
        assert_eq!(report.ordering_violations.len(), 1);
        assert_eq!(report.modules[0].module, "github.com/a/b");
        assert_eq!(report.modules[0].outcome, RelocationOutcome::Moved);
        assert_eq!(report.modules[1].outcome, RelocationOutcome::AlreadyRelocated);
        assert!(third_party.join("github.com/a/b/sub/s.go").is_file());
    }

    #[test]
    fn test_missing_package_is_an_error() {
        let (_temp, vendor, third_party, manifest) = setup(
            "# github.com/a/b v1.0.0\ngithub.com/a/b\ngithub.com/a/b/gone\n",
            &["github.com/a/b/b.go"],
        );

        let err = relocate(&manifest, &vendor, &third_party).unwrap_err();
        match err {
            SplitError::Relocation { problems } => {
                assert_eq!(problems.len(), 1);
                assert!(problems[0].starts_with("github.com/a/b/gone missing"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_stale_third_party_replaced() {
        let (_temp, vendor, third_party, manifest) =
            setup("# github.com/a/b v1.0.0\ngithub.com/a/b\n", &["github.com/a/b/b.go"]);
        touch(&third_party, "github.com/a/b/old.go");

        relocate(&manifest, &vendor, &third_party).unwrap();
        assert!(third_party.join("github.com/a/b/b.go").is_file());
        assert!(!third_party.join("github.com/a/b/old.go").exists());
    }

    struct FakeVendor {
        manifest: &'static str,
        files: Vec<&'static str>,
        workspace: RefCell<Option<PathBuf>>,
    }

    impl GoToolchain for FakeVendor {
        fn mod_init(&self, _: &Path, _: &str) -> Result<(), SplitError> {
            Ok(())
        }

        fn mod_vendor(&self, _work_dir: &Path, out_dir: &Path) -> Result<(), SplitError> {
            for f in &self.files {
                touch(out_dir, f);
            }
            fs::write(out_dir.join(VENDOR_MANIFEST), self.manifest).unwrap();
            *self.workspace.borrow_mut() = out_dir.parent().map(Path::to_path_buf);
            Ok(())
        }

        fn mod_tidy(&self, _: &Path) -> Result<(), SplitError> {
            Ok(())
        }
    }

    #[test]
    fn test_workspace_removed_on_success_and_failure() {
        let temp = TempDir::new().unwrap();
        let third_party = temp.path().join("out/third_party");

        let ok = FakeVendor {
            manifest: "# github.com/a/b v1.0.0\ngithub.com/a/b\n",
            files: vec!["github.com/a/b/b.go"],
            workspace: RefCell::new(None),
        };
        vendor_dependencies(&ok, temp.path(), &third_party).unwrap();
        let ws = ok.workspace.borrow().clone().unwrap();
        assert!(ws.file_name().unwrap().to_string_lossy().starts_with(VENDOR_WORKSPACE_PREFIX));
        assert!(!ws.exists());

        let failing = FakeVendor {
            manifest: "# github.com/a/b v1.0.0\ngithub.com/a/b\ngithub.com/a/b/gone\n",
            files: vec!["github.com/a/b/b.go"],
            workspace: RefCell::new(None),
        };
        assert!(vendor_dependencies(&failing, temp.path(), &third_party).is_err());
        assert!(!failing.workspace.borrow().clone().unwrap().exists());
    }

    #[test]
    fn test_missing_manifest_is_manifest_error() {
        struct NoManifest;
        impl GoToolchain for NoManifest {
            fn mod_init(&self, _: &Path, _: &str) -> Result<(), SplitError> {
                Ok(())
            }
            fn mod_vendor(&self, _: &Path, _: &Path) -> Result<(), SplitError> {
                Ok(())
            }
            fn mod_tidy(&self, _: &Path) -> Result<(), SplitError> {
                Ok(())
            }
        }

        let temp = TempDir::new().unwrap();
        let err = vendor_dependencies(&NoManifest, temp.path(), &temp.path().join("tp")).unwrap_err();
        assert!(matches!(err, SplitError::Manifest { .. }));
    }
}
