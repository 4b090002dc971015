//! Go source front end: tokenizer, declaration-level parser and printer.
//!
//! - `fileset.rs`: explicit position context shared by parse calls
//! - `lexer.rs`: spanned tokens, comments included
//! - `parser.rs`: header, package clause, imports, top-level declarations
//! - `printer.rs`: synthetic unit rendering and span edits
//! - `import_path.rs`: external/internal predicate and package name rules
//! - `scope.rs`: local bindings that shadow imported package names

pub mod ast;
pub mod fileset;
pub mod import_path;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scope;

pub use ast::{Decl, DeclKind, Header, ImportDecl, ImportSpec, Receiver, SourceFile, Span};
pub use fileset::{FileId, FileSet, Position};
pub use import_path::{DottedDomainClassifier, ImportClass, ImportClassifier, ModuleListClassifier};
pub use parser::{parse_file, parse_package_clause, ParseError, ParseErrorKind};
pub use printer::{apply_edits, render, Edit, PrintError, SyntheticUnit};
