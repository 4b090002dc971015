//! Declaration-level syntax tree for a Go source file.
//!
//! Only the structure the splitter needs is modelled: the header comments,
//! the package clause, import declarations and the top-level declaration
//! list. Declaration bodies are kept as source spans, so printing a
//! declaration reproduces its original text, comments included.

use super::fileset::FileId;

/// Byte range in a source text (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice `src` by this span
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

/// Comments found before the package clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Comment groups that are neither build constraints nor the package doc
    /// (licence banners and the like), in source order
    pub comments: Vec<String>,
    /// `//go:build` and `// +build` lines
    pub build_constraints: Vec<String>,
    /// Comment group attached directly to the package clause
    pub package_doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageClause {
    pub name: String,
    pub span: Span,
}

/// One `[name] "path"` entry of an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Local alias, `_` or `.`
    pub name: Option<String>,
    /// Unquoted import path
    pub path: String,
    /// Span of the quoted path literal in the source
    pub path_span: Span,
    /// Comment lines directly above the spec
    pub doc: Option<String>,
    /// Comment trailing the spec on the same line
    pub comment: Option<String>,
}

impl ImportSpec {
    pub fn new(name: Option<&str>, path: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            path: path.to_string(),
            path_span: Span::default(),
            doc: None,
            comment: None,
        }
    }

    /// `import "C"` enables cgo and must keep its preamble
    pub fn is_cgo(&self) -> bool {
        self.path == "C"
    }

    pub fn is_blank(&self) -> bool {
        self.name.as_deref() == Some("_")
    }

    pub fn is_dot(&self) -> bool {
        self.name.as_deref() == Some(".")
    }
}

/// A whole `import` declaration, grouped or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub span: Span,
    pub grouped: bool,
    pub specs: Vec<ImportSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DeclKind {
    Type,
    Var,
    Const,
    Func,
    Method,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Type => "type",
            DeclKind::Var => "var",
            DeclKind::Const => "const",
            DeclKind::Func | DeclKind::Method => "func",
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(self, DeclKind::Func | DeclKind::Method)
    }
}

/// Receiver of a method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub name: Option<String>,
    /// Base type name without pointer or type parameters
    pub type_name: String,
    pub pointer: bool,
}

/// A non-import top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub kind: DeclKind,
    /// Declared names (several for grouped `type`/`var`/`const`)
    pub names: Vec<String>,
    pub receiver: Option<Receiver>,
    /// From the keyword to the end of the declaration, including a comment
    /// trailing its last line
    pub span: Span,
    /// Start of the comments attached in front of the keyword, if any
    pub leading_start: Option<usize>,
}

impl Decl {
    /// Span including the attached leading comments
    pub fn full_span(&self) -> Span {
        Span::new(self.leading_start.unwrap_or(self.span.start), self.span.end)
    }

    /// First declared name, used for reporting
    pub fn display_name(&self) -> String {
        match (&self.receiver, self.names.first()) {
            (Some(recv), Some(name)) => format!("({}).{}", recv.type_name, name),
            (None, Some(name)) => name.clone(),
            (_, None) => format!("<{}>", self.kind.keyword()),
        }
    }
}

/// Parsed form of one Go file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file: FileId,
    pub name: String,
    pub src: String,
    pub header: Header,
    pub package: PackageClause,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

impl SourceFile {
    /// Every import spec in source order
    pub fn import_specs(&self) -> impl Iterator<Item = &ImportSpec> {
        self.imports.iter().flat_map(|d| d.specs.iter())
    }

    /// Source text of a declaration including its leading comments
    pub fn decl_text(&self, decl: &Decl) -> &str {
        decl.full_span().text(&self.src)
    }
}
