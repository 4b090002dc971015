//! Configuration for splitter behavior

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::shader::ShadeFailurePolicy;
use crate::constants::{
    CONFIG_FILE, DEFAULT_GOIMPORTS_BINARY, DEFAULT_GO_BINARY, DEFAULT_OUTPUT_PATTERN,
    THIRD_PARTY_DIR,
};
use crate::error::SplitError;

/// Which unused-import pruner the bucket writer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrunerKind {
    /// Built-in selector-usage analysis
    #[default]
    Usage,
    /// External `goimports` binary
    Goimports,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Output folder and module name pattern (e.g., "{package}_split")
    pub output_pattern: String,

    /// Explicit output root; defaults to `<work_dir>/<module name>`
    pub output_dir: Option<PathBuf>,

    /// Module directory the dependency manager runs in
    pub work_dir: PathBuf,

    /// Name of the private dependency subtree under the output root
    pub third_party_dir: String,

    /// Verbose output
    pub verbose: bool,

    /// Show a progress bar while shading
    pub progress: bool,

    /// Shade files in parallel (only under the Collect policy)
    pub parallel: bool,

    pub shade_policy: ShadeFailurePolicy,

    pub pruner: PrunerKind,

    pub go_binary: String,

    pub goimports_binary: String,

    /// Run `go mod tidy` on the finished tree
    pub tidy: bool,

    /// Extra import path roots treated as external even without a dot
    pub external_roots: Vec<String>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            output_pattern: DEFAULT_OUTPUT_PATTERN.to_string(),
            output_dir: None,
            work_dir: PathBuf::from("."),
            third_party_dir: THIRD_PARTY_DIR.to_string(),
            verbose: false,
            progress: true,
            parallel: true,
            shade_policy: ShadeFailurePolicy::default(),
            pruner: PrunerKind::default(),
            go_binary: DEFAULT_GO_BINARY.to_string(),
            goimports_binary: DEFAULT_GOIMPORTS_BINARY.to_string(),
            tidy: true,
            external_roots: Vec::new(),
        }
    }
}

impl SplitConfig {
    /// Load a TOML configuration file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, SplitError> {
        let text = std::fs::read_to_string(path).map_err(|e| SplitError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml(&text).map_err(|message| SplitError::Config {
            message: format!("{}: {}", path.display(), message),
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        let config: SplitConfig = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Load `go-splitter.toml` from `dir` if present
    pub fn discover(dir: &Path) -> Result<Option<Self>, SplitError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !self.output_pattern.contains("{package}") {
            return Err(format!(
                "output_pattern '{}' must contain {{package}}",
                self.output_pattern
            ));
        }
        let dir = self.third_party_dir.trim_matches('/');
        if dir.is_empty() || dir.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(format!("invalid third_party_dir '{}'", self.third_party_dir));
        }
        Ok(())
    }

    /// Derive the output layout for a source package name
    pub fn layout(&self, package: &str) -> OutputLayout {
        let project_name = self.output_pattern.replace("{package}", package);
        let root = self
            .output_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join(&project_name));
        let third_party_dir = self.third_party_dir.trim_matches('/');
        OutputLayout {
            third_party: root.join(third_party_dir),
            import_prefix: format!("{}/{}", project_name, third_party_dir),
            project_name,
            root,
        }
    }
}

/// Paths and names of the generated module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLayout {
    /// Module name passed to `go mod init` (e.g. `mylib_split`)
    pub project_name: String,
    pub root: PathBuf,
    /// Private dependency subtree
    pub third_party: PathBuf,
    /// Import namespace of the private subtree (e.g. `mylib_split/third_party`)
    pub import_prefix: String,
}
