//! Rendering of synthetic Go files and span-preserving rewrites.
//!
//! Declarations are emitted as their original source text, so comments and
//! formatting inside them survive untouched. Only the file skeleton (header,
//! package clause, import block) is regenerated, in gofmt/goimports layout.
//! Rendering is a fixed point: parsing the output and rendering it again
//! yields the same bytes.

use super::ast::{Header, ImportSpec, SourceFile, Span};
use super::import_path::{quote, ImportClassifier};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrintError {
    #[error("overlapping edits at byte {0}")]
    OverlappingEdits(usize),
    #[error("edit {start}..{end} outside source of {len} bytes")]
    EditOutOfBounds { start: usize, end: usize, len: usize },
}

/// A compilation unit assembled from parts of a parsed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticUnit {
    pub header: Header,
    /// Whether the package doc comment is emitted in this unit
    pub with_package_doc: bool,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    /// Declaration texts, leading comments included
    pub decls: Vec<String>,
}

impl SyntheticUnit {
    /// Rebuild a whole parsed file as a unit
    pub fn from_source(file: &SourceFile) -> Self {
        Self {
            header: file.header.clone(),
            with_package_doc: true,
            package: file.package.name.clone(),
            imports: file.import_specs().cloned().collect(),
            decls: file
                .decls
                .iter()
                .map(|d| file.decl_text(d).to_string())
                .collect(),
        }
    }
}

/// Render a unit to Go source text.
pub fn render(unit: &SyntheticUnit, classifier: &dyn ImportClassifier) -> String {
    let mut sections: Vec<String> = Vec::new();

    for comment in &unit.header.comments {
        sections.push(comment.clone());
    }
    if !unit.header.build_constraints.is_empty() {
        sections.push(unit.header.build_constraints.join("\n"));
    }

    let mut package = String::new();
    if unit.with_package_doc {
        if let Some(doc) = &unit.header.package_doc {
            package.push_str(doc);
            package.push('\n');
        }
    }
    package.push_str("package ");
    package.push_str(&unit.package);
    sections.push(package);

    let (cgo, regular): (Vec<&ImportSpec>, Vec<&ImportSpec>) =
        unit.imports.iter().partition(|s| s.is_cgo());

    for spec in cgo {
        let mut section = String::new();
        if let Some(doc) = &spec.doc {
            push_doc(&mut section, doc, "");
        }
        section.push_str("import ");
        section.push_str(&spec_line(spec));
        sections.push(section);
    }

    if let Some(block) = render_import_block(&regular, classifier) {
        sections.push(block);
    }

    for decl in &unit.decls {
        sections.push(decl.trim_end().to_string());
    }

    let mut out = sections.join("\n\n");
    out.push('\n');
    out
}

/// `import "x"` for a lone undecorated spec, otherwise a parenthesised
/// block with internal paths first and external paths second.
fn render_import_block(specs: &[&ImportSpec], classifier: &dyn ImportClassifier) -> Option<String> {
    if specs.is_empty() {
        return None;
    }

    if specs.len() == 1 {
        let spec = specs[0];
        let mut out = String::new();
        if let Some(doc) = &spec.doc {
            push_doc(&mut out, doc, "");
        }
        out.push_str("import ");
        out.push_str(&spec_line(spec));
        return Some(out);
    }

    let (mut external, mut internal): (Vec<&ImportSpec>, Vec<&ImportSpec>) = specs
        .iter()
        .copied()
        .partition(|s| classifier.is_external(&s.path));
    let by_path = |a: &&ImportSpec, b: &&ImportSpec| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name));
    internal.sort_by(by_path);
    external.sort_by(by_path);

    let mut out = String::from("import (\n");
    let groups = [internal, external];
    let mut first_group = true;
    for group in groups.iter().filter(|g| !g.is_empty()) {
        if !first_group {
            out.push('\n');
        }
        first_group = false;
        for spec in group {
            if let Some(doc) = &spec.doc {
                push_doc(&mut out, doc, "\t");
            }
            out.push('\t');
            out.push_str(&spec_line(spec));
            out.push('\n');
        }
    }
    out.push(')');
    Some(out)
}

fn spec_line(spec: &ImportSpec) -> String {
    let mut line = String::new();
    if let Some(name) = &spec.name {
        line.push_str(name);
        line.push(' ');
    }
    line.push_str(&quote(&spec.path));
    if let Some(comment) = &spec.comment {
        line.push(' ');
        line.push_str(comment);
    }
    line
}

fn push_doc(out: &mut String, doc: &str, indent: &str) {
    for line in doc.lines() {
        out.push_str(indent);
        out.push_str(line.trim());
        out.push('\n');
    }
}

/// Replacement of one source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

/// Apply non-overlapping edits; bytes outside the edited spans are copied
/// unchanged.
pub fn apply_edits(src: &str, edits: &[Edit]) -> Result<String, PrintError> {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|e| e.span.start);

    let mut out = String::with_capacity(src.len() + edits.len() * 32);
    let mut cursor = 0;
    for edit in sorted {
        let Span { start, end } = edit.span;
        if start > end || end > src.len() || !src.is_char_boundary(start) || !src.is_char_boundary(end) {
            return Err(PrintError::EditOutOfBounds {
                start,
                end,
                len: src.len(),
            });
        }
        if start < cursor {
            return Err(PrintError::OverlappingEdits(start));
        }
        out.push_str(&src[cursor..start]);
        out.push_str(&edit.replacement);
        cursor = end;
    }
    out.push_str(&src[cursor..]);
    Ok(out)
}
