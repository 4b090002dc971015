//! Reader for the `vendor/modules.txt` manifest written by `go mod vendor`.
//!
//! ```text
//! # github.com/pkg/errors v0.9.1
//! ## explicit
//! github.com/pkg/errors
//! # golang.org/x/text v0.14.0 => ../text
//! ## explicit; go 1.18
//! golang.org/x/text/transform
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::SplitError;
use crate::go::import_path::has_prefix;

static MODULE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^# (\S+)(?: ([^=\s]\S*))?(?: => (\S+)(?: (\S+))?)?\s*$").expect("valid regex")
});

static GO_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^go (\S+)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub path: String,
    pub version: Option<String>,
}

/// One `# module` entry and the packages vendored from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestModule {
    pub path: String,
    pub version: Option<String>,
    pub replacement: Option<Replacement>,
    /// Required directly by the main module
    pub explicit: bool,
    pub go_version: Option<String>,
    pub packages: Vec<String>,
}

impl ManifestModule {
    /// Whether `go mod vendor` copied any source for this module
    pub fn is_materialized(&self) -> bool {
        !self.packages.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub modules: Vec<ManifestModule>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, SplitError> {
        let text = std::fs::read_to_string(path).map_err(|e| SplitError::Manifest {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&text).map_err(|message| SplitError::Manifest {
            message: format!("{}: {}", path.display(), message),
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut modules: Vec<ManifestModule> = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(annotations) = line.strip_prefix("## ") {
                let Some(module) = modules.last_mut() else {
                    return Err(format!("line {}: annotation before any module", lineno + 1));
                };
                for annotation in annotations.split(';').map(str::trim) {
                    if annotation == "explicit" {
                        module.explicit = true;
                    } else if let Some(caps) = GO_VERSION.captures(annotation) {
                        module.go_version = Some(caps[1].to_string());
                    }
                }
                continue;
            }

            if line.starts_with('#') {
                let caps = MODULE_HEADER
                    .captures(line)
                    .ok_or_else(|| format!("line {}: malformed module header '{}'", lineno + 1, line))?;
                modules.push(ManifestModule {
                    path: caps[1].to_string(),
                    version: caps.get(2).map(|m| m.as_str().to_string()),
                    replacement: caps.get(3).map(|m| Replacement {
                        path: m.as_str().to_string(),
                        version: caps.get(4).map(|v| v.as_str().to_string()),
                    }),
                    explicit: false,
                    go_version: None,
                    packages: Vec::new(),
                });
                continue;
            }

            let Some(module) = modules.last_mut() else {
                return Err(format!("line {}: package '{}' before any module", lineno + 1, line));
            };
            module.packages.push(line.trim().to_string());
        }

        Ok(Manifest { modules })
    }

    /// Modules listed before a module whose path is their prefix
    pub fn ordering_violations(&self) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for (i, child) in self.modules.iter().enumerate() {
            for parent in &self.modules[i + 1..] {
                if parent.path != child.path && has_prefix(&child.path, &parent.path) {
                    violations.push((child.path.clone(), parent.path.clone()));
                }
            }
        }
        violations
    }

    /// Modules ordered so that every parent precedes its nested modules;
    /// manifest order is kept otherwise.
    pub fn relocation_order(&self) -> Vec<&ManifestModule> {
        let mut order: Vec<&ManifestModule> = self.modules.iter().collect();
        order.sort_by_key(|m| m.path.split('/').count());
        order
    }

    /// Every vendored package path
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .flat_map(|m| m.packages.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULES_TXT: &str = "\
# github.com/pkg/errors v0.9.1
## explicit
github.com/pkg/errors
# golang.org/x/text v0.14.0 => ../text
## explicit; go 1.18
golang.org/x/text/transform
golang.org/x/text/unicode/norm
# example.com/local => ./local
example.com/local
# rsc.io/unused v1.0.0
";

    #[test]
    fn test_parse_modules_txt() {
        let manifest = Manifest::parse(MODULES_TXT).unwrap();
        assert_eq!(manifest.modules.len(), 4);

        let errors = &manifest.modules[0];
        assert_eq!(errors.path, "github.com/pkg/errors");
        assert_eq!(errors.version.as_deref(), Some("v0.9.1"));
        assert!(errors.explicit);
        assert_eq!(errors.packages, vec!["github.com/pkg/errors"]);

        let text = &manifest.modules[1];
        assert_eq!(text.go_version.as_deref(), Some("1.18"));
        assert_eq!(
            text.replacement,
            Some(Replacement {
                path: "../text".to_string(),
                version: None
            })
        );
        assert_eq!(text.packages.len(), 2);

        let local = &manifest.modules[2];
        assert_eq!(local.version, None);
        assert_eq!(local.replacement.as_ref().unwrap().path, "./local");
        assert!(!local.explicit);

        assert!(!manifest.modules[3].is_materialized());
        assert_eq!(manifest.packages().count(), 4);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Manifest::parse("github.com/a/b\n").is_err());
        assert!(Manifest::parse("## explicit\n").is_err());
        assert!(Manifest::parse("#bad\n").is_err());
        assert_eq!(Manifest::parse("").unwrap().modules.len(), 0);
    }

    #[test]
    fn test_relocation_order_puts_parents_first() {
        let text = "# github.com/a/b/v2/sub v1.0.0\ngithub.com/a/b/v2/sub\n# github.com/a/b/v2 v2.0.0\ngithub.com/a/b/v2\n# github.com/c/d v1.0.0\ngithub.com/c/d\n";
        let manifest = Manifest::parse(text).unwrap();

        assert_eq!(
            manifest.ordering_violations(),
            vec![("github.com/a/b/v2/sub".to_string(), "github.com/a/b/v2".to_string())]
        );

        let order: Vec<&str> = manifest.relocation_order().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(order, vec!["github.com/c/d", "github.com/a/b/v2", "github.com/a/b/v2/sub"]);
    }
}
