//! Declaration classifier: partition top-level declarations into buckets.

use serde::{Deserialize, Serialize};

use crate::constants::{FUNCS_SUFFIX, METHODS_SUFFIX, TYPES_SUFFIX};
use crate::go::{Decl, DeclKind, ImportSpec, SourceFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// `type`, `var` and `const` declarations
    Types,
    /// Functions without receiver
    Functions,
    /// Functions bound to a receiver
    Methods,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Types, Bucket::Functions, Bucket::Methods];

    pub fn for_kind(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Method => Bucket::Methods,
            DeclKind::Func => Bucket::Functions,
            DeclKind::Type | DeclKind::Var | DeclKind::Const => Bucket::Types,
        }
    }

    pub fn file_suffix(self) -> &'static str {
        match self {
            Bucket::Types => TYPES_SUFFIX,
            Bucket::Functions => FUNCS_SUFFIX,
            Bucket::Methods => METHODS_SUFFIX,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Bucket::Types => "types",
            Bucket::Functions => "functions",
            Bucket::Methods => "methods",
        };
        f.write_str(name)
    }
}

/// A declaration together with its position in the source list
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedDecl<'a> {
    pub index: usize,
    pub decl: &'a Decl,
}

#[derive(Debug, Clone, Default)]
pub struct Classification<'a> {
    pub types: Vec<ClassifiedDecl<'a>>,
    pub functions: Vec<ClassifiedDecl<'a>>,
    pub methods: Vec<ClassifiedDecl<'a>>,
    /// Every import spec of the unit, in source order
    pub imports: Vec<ImportSpec>,
}

impl<'a> Classification<'a> {
    pub fn bucket(&self, bucket: Bucket) -> &[ClassifiedDecl<'a>] {
        match bucket {
            Bucket::Types => &self.types,
            Bucket::Functions => &self.functions,
            Bucket::Methods => &self.methods,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<ClassifiedDecl<'a>> {
        match bucket {
            Bucket::Types => &mut self.types,
            Bucket::Functions => &mut self.functions,
            Bucket::Methods => &mut self.methods,
        }
    }

    pub fn decl_count(&self) -> usize {
        self.types.len() + self.functions.len() + self.methods.len()
    }

    /// Buckets with at least one declaration, in output order
    pub fn non_empty(&self) -> impl Iterator<Item = Bucket> + '_ {
        Bucket::ALL.into_iter().filter(|b| !self.bucket(*b).is_empty())
    }
}

/// Bucket every top-level declaration; imports are collected separately.
pub fn classify(file: &SourceFile) -> Classification<'_> {
    let mut classification = Classification {
        imports: file.import_specs().cloned().collect(),
        ..Classification::default()
    };

    for (index, decl) in file.decls.iter().enumerate() {
        classification
            .bucket_mut(Bucket::for_kind(decl.kind))
            .push(ClassifiedDecl { index, decl });
    }

    crate::debug_log!(
        "classified {}: {} types, {} functions, {} methods, {} imports",
        file.name,
        classification.types.len(),
        classification.functions.len(),
        classification.methods.len(),
        classification.imports.len()
    );

    classification
}
