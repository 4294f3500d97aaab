//! Per-member conflict resolution between a trait and its target.

use graft_decl::{MemberDecl, MemberKind, Span};
use graft_diag::{Category, Diagnostic};

use crate::signature::{MemberSignature, collides, same_method_shape};

/// A signature the target already declares, with where it was declared.
#[derive(Debug, Clone)]
pub struct TargetMember {
    pub signature: MemberSignature,
    pub span: Span,
}

impl TargetMember {
    /// Signatures for every member of a target, in declaration order.
    pub fn collect(members: &[MemberDecl]) -> Vec<TargetMember> {
        members
            .iter()
            .flat_map(|member| {
                crate::signature::member_signatures(member)
                    .into_iter()
                    .map(move |signature| TargetMember {
                        signature,
                        span: member.span,
                    })
            })
            .collect()
    }
}

/// Names used when describing a conflict.
#[derive(Debug, Clone, Copy)]
pub struct ConflictScope<'a> {
    pub trait_name: &'a str,
    pub target_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No collision; merge the member.
    Include,
    /// A same-name method with a different signature; merged as an overload.
    IncludeOverload,
    /// The target supplies this member itself and the trait allows it.
    Overridden,
    /// The collision cannot be resolved; the member is not merged.
    Reject(Diagnostic),
}

impl Resolution {
    pub fn includes(&self) -> bool {
        matches!(self, Resolution::Include | Resolution::IncludeOverload)
    }
}

/// Decide what happens to one trait member given the target's members.
///
/// `signatures` are the trait member's own signatures (several for a
/// multi-variable field). Members without signatures are always included.
pub fn resolve_member(
    member: &MemberDecl,
    signatures: &[MemberSignature],
    target: &[TargetMember],
    scope: ConflictScope<'_>,
) -> Resolution {
    let candidates: Vec<(&MemberSignature, &TargetMember)> = signatures
        .iter()
        .flat_map(|own| {
            target
                .iter()
                .filter(move |other| collides(own, &other.signature))
                .map(move |other| (own, other))
        })
        .collect();
    if candidates.is_empty() {
        return Resolution::Include;
    }

    if let Some((own, other)) = candidates
        .iter()
        .find(|(own, other)| own.kind != other.signature.kind)
    {
        return Resolution::Reject(
            Diagnostic::error(
                Category::KindMismatch,
                format!(
                    "`{}` is a {} in trait `{}` but a {} in `{}`",
                    own.name, own.kind, scope.trait_name, other.signature.kind, scope.target_name
                ),
            )
            .at(member.span.location())
            .with_label(other.span.location(), "target member declared here"),
        );
    }

    if member.kind == MemberKind::Method {
        let exact = candidates
            .iter()
            .find(|(own, other)| same_method_shape(own, &other.signature));
        return match exact {
            Some(&(own, other)) => collision(member, own, other, scope),
            None => Resolution::IncludeOverload,
        };
    }

    let (own, other) = candidates[0];
    collision(member, own, other, scope)
}

fn collision(
    member: &MemberDecl,
    own: &MemberSignature,
    other: &TargetMember,
    scope: ConflictScope<'_>,
) -> Resolution {
    if member.markers.overridable {
        return Resolution::Overridden;
    }
    Resolution::Reject(
        Diagnostic::error(
            Category::UnresolvedCollision,
            format!(
                "{} `{}` of trait `{}` is already declared by `{}`",
                own.kind, own.name, scope.trait_name, scope.target_name
            ),
        )
        .at(member.span.location())
        .with_label(other.span.location(), "target member declared here")
        .with_help(Category::UnresolvedCollision.example_fix()),
    )
}
