//! The trait merge driver.
//!
//! For each composition request on a target the driver resolves the
//! trait, checks it is structurally compatible, and emits the target's
//! augmentation: imports, the namespace, and an open redeclaration of the
//! target holding every trait member that survives conflict resolution.

use std::collections::{BTreeSet, HashSet};

use graft_decl::{
    DeclarationProvider, MemberDecl, MemberKind, ProcessScope, TraitRequest, TypeDecl,
    strip_whitespace,
};
use graft_diag::{Category, Diagnostic};

use crate::fragment::SourceFragment;
use crate::registry::TraitStatus;
use crate::resolve::{ConflictScope, Resolution, TargetMember, resolve_member};
use crate::signature::member_signatures;
use crate::templates::expand_local;
use crate::trace::{MergeOutcome, MergeTrace};
use crate::{PassContext, PassError, Session};

/// Output destined for a unit of its own rather than the target's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalUnit {
    /// Stem of the unit name, before prefix and extension are applied.
    pub name: String,
    pub extension: Option<String>,
    pub fragment: SourceFragment,
}

/// Everything one target produced.
#[derive(Debug, Clone, Default)]
pub struct TargetOutput {
    pub fragment: SourceFragment,
    pub global_units: Vec<GlobalUnit>,
}

impl TargetOutput {
    fn diagnostic(diag: Diagnostic) -> Self {
        Self {
            fragment: SourceFragment::from_diagnostic(diag),
            global_units: Vec::new(),
        }
    }

    fn append(&mut self, other: TargetOutput) {
        self.fragment.append(other.fragment);
        self.global_units.extend(other.global_units);
    }
}

/// Process every composition request of `target`, in declaration order.
pub fn compose_target(
    target: &TypeDecl,
    provider: &dyn DeclarationProvider,
    pass: &mut PassContext,
    session: &mut Session,
) -> Result<TargetOutput, PassError> {
    pass.checkpoint()?;
    if !target.is_open() {
        return Ok(TargetOutput::diagnostic(
            Diagnostic::error(
                Category::MalformedTarget,
                format!("`{}` composes traits and must be declared partial", target.name),
            )
            .at(target.span.location())
            .with_help(Category::MalformedTarget.example_fix()),
        ));
    }

    let mut used = HashSet::new();
    let mut output = TargetOutput::default();
    for request in target.requests() {
        let merged = merge_trait_into_target(target, request, provider, pass, session, &mut used)?;
        output.append(merged);
    }
    Ok(output)
}

/// Merge one requested trait into `target`.
///
/// `used` holds the traits already merged into this target; a repeated
/// request is reported and skipped. Composition problems become
/// diagnostics in the returned fragment; only cancellation and
/// collaborator failures are errors.
pub fn merge_trait_into_target(
    target: &TypeDecl,
    request: &TraitRequest,
    provider: &dyn DeclarationProvider,
    pass: &mut PassContext,
    session: &mut Session,
    used: &mut HashSet<String>,
) -> Result<TargetOutput, PassError> {
    pass.checkpoint()?;

    let Some(trait_decl) = provider.resolve(&request.reference, target) else {
        return Ok(TargetOutput::diagnostic(
            Diagnostic::error(
                Category::UnresolvedReference,
                format!(
                    "trait `{}` requested by `{}` cannot be resolved",
                    request.reference, target.name
                ),
            )
            .at(request.span.location())
            .with_help(Category::UnresolvedReference.example_fix()),
        ));
    };
    let trait_fq = trait_decl.fq_name();

    if !used.insert(trait_fq.clone()) {
        return Ok(TargetOutput::diagnostic(
            Diagnostic::error(
                Category::DuplicateRequest,
                format!("`{}` requests trait `{}` more than once", target.name, trait_decl.name),
            )
            .at(request.span.location()),
        ));
    }

    if !trait_decl.is_trait() {
        return Ok(TargetOutput::diagnostic(
            Diagnostic::error(
                Category::NotATrait,
                format!("`{}` is not a trait", trait_fq),
            )
            .at(request.span.location())
            .with_label(trait_decl.span.location(), "declared here without the trait marker")
            .with_help(Category::NotATrait.example_fix()),
        ));
    }
    if trait_decl.is_interface() {
        return Ok(TargetOutput::diagnostic(
            Diagnostic::error(
                Category::NotATrait,
                format!("trait `{}` must be a class, not an interface", trait_fq),
            )
            .at(request.span.location()),
        ));
    }

    if let Some(diag) = structural_mismatch(target, trait_decl, request) {
        return Ok(TargetOutput::diagnostic(diag));
    }

    let entry = pass.registry.get(&trait_fq).cloned();
    if let Some(entry) = &entry
        && let TraitStatus::Rejected(category) = entry.status
    {
        return Ok(TargetOutput::diagnostic(
            Diagnostic::warning(
                category,
                format!(
                    "trait `{}` was rejected at its declaration; nothing is merged into `{}`",
                    trait_decl.name, target.name
                ),
            )
            .at(request.span.location()),
        ));
    }

    let mut trace = pass
        .options
        .trace
        .then(|| MergeTrace::new(target.fq_name(), trait_fq.clone()));
    let mut output = TargetOutput::default();
    let out = &mut output.fragment;

    write_imports(out, target, trait_decl, pass);

    let (outer, inner) = match target.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => {
            out.push_line(&format!("namespace {ns} {{"));
            let usings = trait_decl
                .namespace_imports
                .iter()
                .map(|import| import.trim())
                .filter(|import| !import.is_empty() && *import != ns && !pass.is_ignored_import(import))
                .collect::<BTreeSet<_>>();
            for import in &usings {
                out.push_line(&format!("    using {import};"));
            }
            if !usings.is_empty() {
                out.blank_line();
            }
            ("    ", "        ")
        }
        _ => ("", "    "),
    };
    out.push_line(&format!("{outer}{} {{", target.header()));

    expand_local(target, None, &target.name, &target.markers.templates, pass, session, out)?;
    expand_local(target, None, &trait_decl.name, &trait_decl.markers.templates, pass, session, out)?;
    for member in &target.members {
        expand_local(target, Some(member), &member.id(), &member.markers.templates, pass, session, out)?;
    }

    let target_members = TargetMember::collect(&target.members);
    let scope = ConflictScope {
        trait_name: &trait_decl.name,
        target_name: &target.name,
    };
    let mut merged = 0usize;

    for (idx, member) in trait_decl.members.iter().enumerate() {
        pass.checkpoint()?;
        expand_local(target, Some(member), &member.id(), &member.markers.templates, pass, session, out)?;

        let outcome = if member.markers.ignore {
            MergeOutcome::Ignored
        } else if let Some(scope_kind) = member.markers.process {
            if let Some(diag) = invalid_process_member(member, trait_decl) {
                out.push_diagnostic(diag);
                MergeOutcome::InvalidProcess
            } else {
                let result = session.execute(&trait_fq, member, target)?;
                for diag in result.diagnostics {
                    out.push_diagnostic(diag);
                }
                match scope_kind {
                    ProcessScope::Include => push_indented(out, &result.text, inner),
                    ProcessScope::Global => {
                        let mut fragment = SourceFragment::new();
                        fragment.push_str(&result.text);
                        if !result.text.is_empty() && !result.text.ends_with('\n') {
                            fragment.push_str("\n");
                        }
                        output_units_push(
                            &mut output.global_units,
                            format!("{}.{}", trait_decl.name, member.name()),
                            fragment,
                        );
                    }
                }
                MergeOutcome::Processed
            }
        } else if entry.as_ref().is_some_and(|e| e.member_rejected(idx)) {
            MergeOutcome::StrictRejected
        } else {
            let signatures = member_signatures(member);
            match resolve_member(member, &signatures, &target_members, scope) {
                Resolution::Include => {
                    out.push_str(&member.render(inner));
                    merged += 1;
                    MergeOutcome::Included
                }
                Resolution::IncludeOverload => {
                    out.push_str(&member.render(inner));
                    merged += 1;
                    MergeOutcome::IncludedOverload
                }
                Resolution::Overridden => MergeOutcome::Overridden,
                Resolution::Reject(diag) => {
                    let outcome = match diag.category {
                        Category::KindMismatch => MergeOutcome::KindMismatch,
                        _ => MergeOutcome::UnresolvedCollision,
                    };
                    out.push_diagnostic(diag);
                    outcome
                }
            }
        };
        tracing::debug!(
            target: "graft::merge",
            trait_name = %trait_decl.name,
            target_name = %target.name,
            member = %member.id(),
            ?outcome,
            "member resolved"
        );
        if let Some(trace) = trace.as_mut() {
            trace.record(member.id(), outcome);
        }
    }

    out.push_line(&format!("{outer}}}"));
    if !outer.is_empty() {
        out.push_line("}");
    }

    tracing::info!(
        target: "graft::merge",
        trait_name = %trait_fq,
        target_name = %target.fq_name(),
        merged,
        "merged trait"
    );
    if let Some(trace) = trace {
        pass.record_trace(trace);
    }
    Ok(output)
}

fn output_units_push(units: &mut Vec<GlobalUnit>, name: String, fragment: SourceFragment) {
    units.push(GlobalUnit {
        name,
        extension: None,
        fragment,
    });
}

fn structural_mismatch(
    target: &TypeDecl,
    trait_decl: &TypeDecl,
    request: &TraitRequest,
) -> Option<Diagnostic> {
    let pairs = [
        (
            "generic parameters",
            target.type_params.as_deref(),
            trait_decl.type_params.as_deref(),
        ),
        (
            "generic constraints",
            target.constraints.as_deref(),
            trait_decl.constraints.as_deref(),
        ),
    ];
    pairs.into_iter().find_map(|(what, ours, theirs)| {
        let ours = strip_whitespace(ours.unwrap_or_default());
        let theirs = strip_whitespace(theirs.unwrap_or_default());
        (ours != theirs).then(|| {
            Diagnostic::error(
                Category::StructuralMismatch,
                format!(
                    "{what} of trait `{}` and target `{}` must be identical, but got `{theirs}` and `{ours}`",
                    trait_decl.name, target.name
                ),
            )
            .at(request.span.location())
            .with_help(Category::StructuralMismatch.example_fix())
        })
    })
}

fn invalid_process_member(member: &MemberDecl, trait_decl: &TypeDecl) -> Option<Diagnostic> {
    let valid = member.kind == MemberKind::Method
        && member.has_modifier("public")
        && member.has_modifier("static");
    (!valid).then(|| {
        Diagnostic::error(
            Category::InvalidProcessMember,
            format!(
                "process member `{}` of trait `{}` must be a public static method",
                member.id(),
                trait_decl.name
            ),
        )
        .at(member.span.location())
        .with_help(Category::InvalidProcessMember.example_fix())
    })
}

/// File-level `using` lines: the trait's imports plus its own namespace,
/// minus ignored imports and the target's namespace.
fn write_imports(out: &mut SourceFragment, target: &TypeDecl, trait_decl: &TypeDecl, pass: &PassContext) {
    let own = target.namespace.as_deref().unwrap_or_default();
    let mut seen = BTreeSet::new();
    let candidates = trait_decl
        .imports
        .iter()
        .map(String::as_str)
        .chain(trait_decl.namespace.as_deref());
    let mut wrote = false;
    for import in candidates {
        let import = import.trim();
        if import.is_empty() || import == own || pass.is_ignored_import(import) {
            continue;
        }
        if seen.insert(import) {
            out.push_line(&format!("using {import};"));
            wrote = true;
        }
    }
    if wrote {
        out.blank_line();
    }
}

fn push_indented(out: &mut SourceFragment, text: &str, indent: &str) {
    for line in text.lines() {
        if line.trim().is_empty() {
            out.blank_line();
        } else {
            out.push_line(&format!("{indent}{line}"));
        }
    }
}
