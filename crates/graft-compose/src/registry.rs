//! Trait registry.
//!
//! Every trait declaration is validated once per pass, at its source.
//! Targets consult the registry to learn whether a trait, or some of its
//! members, were rejected there.

use std::collections::{BTreeMap, BTreeSet};

use graft_decl::{DeclarationProvider, TraitMode, TypeDecl};
use graft_diag::{Category, Diagnostic};

use crate::fragment::SourceFragment;
use crate::proxy::generate_proxy;
use crate::strict::validate_strict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitStatus {
    Accepted,
    /// Rejected at its declaration for the given reason; nothing merges.
    Rejected(Category),
}

#[derive(Debug, Clone)]
pub struct TraitEntry {
    pub fq_name: String,
    pub mode: TraitMode,
    pub status: TraitStatus,
    /// Member indices that must never be merged.
    pub rejected_members: BTreeSet<usize>,
}

impl TraitEntry {
    pub fn is_accepted(&self) -> bool {
        self.status == TraitStatus::Accepted
    }

    pub fn member_rejected(&self, idx: usize) -> bool {
        self.rejected_members.contains(&idx)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraitRegistry {
    traits: BTreeMap<String, TraitEntry>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `decl` and record the outcome.
    ///
    /// Returns the trait's own output: diagnostics raised at the trait and,
    /// when it is well formed, its diamond proxy layer.
    pub fn register(
        &mut self,
        decl: &TypeDecl,
        provider: &dyn DeclarationProvider,
    ) -> SourceFragment {
        let fq_name = decl.fq_name();
        let mode = decl.trait_mode().unwrap_or_default();
        let mut entry = TraitEntry {
            fq_name: fq_name.clone(),
            mode,
            status: TraitStatus::Accepted,
            rejected_members: BTreeSet::new(),
        };

        if !decl.is_abstract() || !decl.is_open() {
            entry.status = TraitStatus::Rejected(Category::MalformedTrait);
            self.traits.insert(fq_name, entry);
            return SourceFragment::from_diagnostic(
                Diagnostic::error(
                    Category::MalformedTrait,
                    format!("trait `{}` must be declared abstract and partial", decl.name),
                )
                .at(decl.span.location())
                .with_help(Category::MalformedTrait.example_fix()),
            );
        }

        if mode == TraitMode::Strict {
            let report = validate_strict(decl, provider);
            if !report.is_valid() {
                tracing::debug!(
                    target: "graft::strict",
                    trait_name = %fq_name,
                    violations = report.diagnostics.len(),
                    "strict trait rejected"
                );
                if report.missing_contract() {
                    entry.status = TraitStatus::Rejected(Category::StrictViolation);
                }
                entry.rejected_members = report.rejected_members;
                self.traits.insert(fq_name, entry);
                let mut fragment = SourceFragment::new();
                for diag in report.diagnostics {
                    fragment.push_diagnostic(diag);
                }
                return fragment;
            }
        }

        self.traits.insert(fq_name, entry);
        generate_proxy(decl, provider)
    }

    pub fn get(&self, fq_name: &str) -> Option<&TraitEntry> {
        self.traits.get(fq_name)
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}
