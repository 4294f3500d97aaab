//! Strict-mode validation: a strict trait may only declare what its
//! tagged contract declares.

use std::collections::BTreeSet;

use graft_decl::{DeclarationProvider, TypeDecl, TypeRole};
use graft_diag::{Category, Diagnostic};

use crate::signature::{MemberSignature, identical, member_signatures};

#[derive(Debug, Clone, Default)]
pub struct StrictReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Fully-qualified name of the bound contract.
    pub contract: Option<String>,
    /// Indices of trait members that lie outside the contract.
    pub rejected_members: BTreeSet<usize>,
}

impl StrictReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// No usable contract; the whole trait is rejected.
    pub fn missing_contract(&self) -> bool {
        self.contract.is_none()
    }
}

/// Check a strict trait against its single tagged contract.
///
/// Without exactly one tagged contract among the bases a single
/// diagnostic is produced and every member is rejected. Otherwise each
/// member signature (each variable, for fields) must be identical to a
/// contract member signature.
pub fn validate_strict(decl: &TypeDecl, provider: &dyn DeclarationProvider) -> StrictReport {
    let contracts: Vec<&TypeDecl> = decl
        .bases
        .iter()
        .filter_map(|base| provider.resolve(base, decl))
        .filter(|base| base.role() == TypeRole::Contract)
        .collect();

    let mut report = StrictReport::default();
    let contract = match contracts.as_slice() {
        [contract] => *contract,
        [] => {
            report.diagnostics.push(
                Diagnostic::error(
                    Category::StrictViolation,
                    format!(
                        "strict trait `{}` must derive from a tagged trait contract",
                        decl.name
                    ),
                )
                .at(decl.span.location())
                .with_help(Category::StrictViolation.example_fix()),
            );
            report.rejected_members = (0..decl.members.len()).collect();
            return report;
        }
        many => {
            let names: Vec<String> = many.iter().map(|c| c.name.clone()).collect();
            report.diagnostics.push(
                Diagnostic::error(
                    Category::StrictViolation,
                    format!(
                        "strict trait `{}` derives from {} tagged contracts ({}); exactly one is allowed",
                        decl.name,
                        many.len(),
                        names.join(", ")
                    ),
                )
                .at(decl.span.location()),
            );
            report.rejected_members = (0..decl.members.len()).collect();
            return report;
        }
    };
    report.contract = Some(contract.fq_name());

    let allowed: Vec<MemberSignature> = contract.members.iter().flat_map(member_signatures).collect();
    for (idx, member) in decl.members.iter().enumerate() {
        let outside: Vec<MemberSignature> = member_signatures(member)
            .into_iter()
            .filter(|own| !allowed.iter().any(|other| identical(own, other)))
            .collect();
        if outside.is_empty() {
            continue;
        }
        report.rejected_members.insert(idx);
        for own in outside {
            report.diagnostics.push(
                Diagnostic::error(
                    Category::StrictViolation,
                    format!(
                        "{} `{}` of strict trait `{}` is not declared by contract `{}`",
                        own.kind, own.name, decl.name, contract.name
                    ),
                )
                .at(member.span.location())
                .with_label(contract.span.location(), "contract declared here"),
            );
        }
    }
    report
}
