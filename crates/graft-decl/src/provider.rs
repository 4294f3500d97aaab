//! Read-only lookup of declarations by fully-qualified name.

use std::collections::HashMap;

use graft_diag::{Category, Diagnostic, DiagnosticError};

use crate::TypeDecl;

/// A queryable index from type reference to declaration.
///
/// Populated once per generation pass; the engine only reads from it.
pub trait DeclarationProvider {
    /// Look a declaration up by its exact fully-qualified name.
    fn lookup(&self, fq_name: &str) -> Option<&TypeDecl>;

    /// All declarations, in the order the front end supplied them.
    fn declarations(&self) -> Box<dyn Iterator<Item = &TypeDecl> + '_>;

    /// Resolve a reference as written inside `from`.
    ///
    /// Generic arguments are ignored. Tries, in order: the reference as a
    /// fully-qualified name, the referrer's namespace and each enclosing
    /// namespace, then each namespace the referrer imports.
    fn resolve(&self, reference: &str, from: &TypeDecl) -> Option<&TypeDecl> {
        let name = reference_base_name(reference);
        if name.is_empty() {
            return None;
        }
        if let Some(found) = self.lookup(name) {
            return Some(found);
        }

        if let Some(namespace) = from.namespace.as_deref() {
            let mut scope = namespace;
            loop {
                if let Some(found) = self.lookup(&format!("{scope}.{name}")) {
                    return Some(found);
                }
                match scope.rfind('.') {
                    Some(idx) => scope = &scope[..idx],
                    None => break,
                }
            }
        }

        from.imports
            .iter()
            .chain(from.namespace_imports.iter())
            .find_map(|import| self.lookup(&format!("{}.{name}", import.trim())))
    }
}

/// Strip generic arguments and surrounding whitespace from a reference.
pub fn reference_base_name(reference: &str) -> &str {
    let trimmed = reference.trim();
    match trimmed.find('<') {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    }
}

/// In-memory [`DeclarationProvider`] preserving declaration order.
#[derive(Debug, Clone, Default)]
pub struct DeclIndex {
    types: Vec<TypeDecl>,
    by_name: HashMap<String, usize>,
}

impl DeclIndex {
    /// Index `types` by fully-qualified name.
    ///
    /// Two declarations sharing a fully-qualified name are rejected; the
    /// model has no notion of merging partial declarations.
    pub fn new(types: Vec<TypeDecl>) -> Result<Self, DiagnosticError> {
        let mut by_name = HashMap::with_capacity(types.len());
        let mut duplicates = Vec::new();
        for (idx, decl) in types.iter().enumerate() {
            let fq_name = decl.fq_name();
            if by_name.insert(fq_name.clone(), idx).is_some() {
                duplicates.push(
                    Diagnostic::error(
                        Category::UnresolvedReference,
                        format!("type `{fq_name}` is declared more than once"),
                    )
                    .at(decl.span.location()),
                );
            }
        }
        if !duplicates.is_empty() {
            return Err(DiagnosticError::multiple(duplicates));
        }
        Ok(Self { types, by_name })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DeclarationProvider for DeclIndex {
    fn lookup(&self, fq_name: &str) -> Option<&TypeDecl> {
        self.by_name.get(fq_name).map(|&idx| &self.types[idx])
    }

    fn declarations(&self) -> Box<dyn Iterator<Item = &TypeDecl> + '_> {
        Box::new(self.types.iter())
    }
}
