//! Import path conventions.
//!
//! Whether a path is external is a heuristic: the Go toolchain treats a
//! path whose first element contains a dot as a network-hosted module and
//! everything else as standard library (or the main module). The predicate
//! is a trait so other conventions can be plugged in.

/// Where an import path points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImportClass {
    /// Standard library or builtin; never rewritten
    Internal,
    /// Third-party path not yet under the private namespace
    ExternalCanonical,
    /// Already rewritten into the private namespace
    ExternalShaded,
}

/// Decides whether an import path refers to an externally hosted module.
pub trait ImportClassifier: Send + Sync {
    fn is_external(&self, path: &str) -> bool;

    /// Classify `path` relative to the private namespace `prefix`
    fn classify(&self, path: &str, prefix: &str) -> ImportClass {
        if has_prefix(path, prefix) {
            ImportClass::ExternalShaded
        } else if self.is_external(path) {
            ImportClass::ExternalCanonical
        } else {
            ImportClass::Internal
        }
    }
}

/// Default Go convention: the first path element contains a dot.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedDomainClassifier;

impl ImportClassifier for DottedDomainClassifier {
    fn is_external(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let first = path.split('/').next().unwrap_or(path);
        first.contains('.')
    }
}

/// Classifier backed by an explicit list of module roots, for ecosystems
/// where hosted modules carry no dot (e.g. a corporate `corp/...` tree).
#[derive(Debug, Clone, Default)]
pub struct ModuleListClassifier {
    pub roots: Vec<String>,
}

impl ImportClassifier for ModuleListClassifier {
    fn is_external(&self, path: &str) -> bool {
        self.roots.iter().any(|root| has_prefix(path, root))
            || DottedDomainClassifier.is_external(path)
    }
}

/// `path` equals `prefix` or lies below it (element-wise, so
/// `foo_split/third_partyx` is not under `foo_split/third_party`).
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Join a namespace and an import path with a single `/`.
pub fn join(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Package name a path is assumed to declare when no alias is given.
///
/// Last element, skipping a `vN` major version element, without a `go-`
/// prefix, cut at the first character that cannot appear in an identifier
/// (`gopkg.in/yaml.v3` → `yaml`, `github.com/google/go-cmp/cmp` → `cmp`).
pub fn assumed_package_name(path: &str) -> String {
    let mut elems = path.rsplit('/');
    let mut base = elems.next().unwrap_or(path);

    if is_major_version(base) {
        if let Some(parent) = elems.next() {
            base = parent;
        }
    }

    let base = base.strip_prefix("go-").unwrap_or(base);
    let end = base
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
        .map_or(base.len(), |(i, _)| i);
    base[..end].to_string()
}

/// Names an unaliased import may be referred to by.
///
/// The assumed name comes first. A path ending in a major version element
/// may also declare a package named after that element, as
/// `k8s.io/api/core/v1` declares `v1`.
pub fn candidate_package_names(path: &str) -> Vec<String> {
    let mut names = vec![assumed_package_name(path)];
    let last = path.rsplit('/').next().unwrap_or(path);
    if is_major_version(last) && !names.iter().any(|n| n == last) {
        names.push(last.to_string());
    }
    names
}

fn is_major_version(elem: &str) -> bool {
    elem.len() > 1
        && elem.starts_with('v')
        && elem[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Render a path as an interpreted string literal
pub fn quote(path: &str) -> String {
    format!("\"{}\"", path)
}
