//! Template expansion stages.
//!
//! Local requests expand inside a target's augmentation while it is being
//! merged. Global requests expand once per pass into standalone units. A
//! local request anywhere else is a scope error.

use graft_decl::{
    DeclarationProvider, MemberDecl, TemplateRequest, TemplateScope, TemplateVerbosity, TypeDecl,
};
use graft_diag::{Category, Diagnostic};

use crate::fragment::SourceFragment;
use crate::hooks::{TemplateContext, TemplateOutput};
use crate::merge::GlobalUnit;
use crate::{PassContext, PassError, Session};

/// Expand `node`'s local template requests into `out`.
///
/// `class` is the composing target; it supplies the context's class node
/// and file path. Each `(file, id, template)` combination expands at
/// most once per pass, however many targets share the file.
pub(crate) fn expand_local(
    class: &TypeDecl,
    node: Option<&MemberDecl>,
    id: &str,
    requests: &[TemplateRequest],
    pass: &mut PassContext,
    session: &mut Session,
    out: &mut SourceFragment,
) -> Result<(), PassError> {
    for request in requests.iter().filter(|r| r.scope == TemplateScope::Local) {
        pass.checkpoint()?;
        let key = format!("{}::{}::{}", class.file, id, request.name);
        if !pass.first_expansion(&key) {
            continue;
        }
        let context =
            TemplateContext::for_node(class, node, request.extra_tag.as_deref(), &class.file)?;
        let output = session.expand_template(request, &context)?;
        log_expansion(request, &context, &output);
        push_block(out, &output.text);
    }
    Ok(())
}

/// Expand every global template request and report misplaced local ones.
///
/// Produces one unit per declaration or member that carries requests,
/// named after the declaring file.
pub fn expand_global_templates(
    provider: &dyn DeclarationProvider,
    pass: &mut PassContext,
    session: &mut Session,
) -> Result<Vec<GlobalUnit>, PassError> {
    let mut units = Vec::new();
    for decl in provider.declarations() {
        let composes = decl.is_trait() || !decl.requests().is_empty();
        let candidates = std::iter::once((None, decl.name.clone(), &decl.markers.templates)).chain(
            decl.members
                .iter()
                .map(|member| (Some(member), member.id(), &member.markers.templates)),
        );

        for (node, id, requests) in candidates {
            if requests.is_empty() {
                continue;
            }
            let mut fragment = SourceFragment::new();
            let mut extension = None;
            for request in requests {
                pass.checkpoint()?;
                match request.scope {
                    TemplateScope::Local if !composes => fragment.push_diagnostic(
                        Diagnostic::error(
                            Category::TemplateScope,
                            format!(
                                "local template `{}` on `{}` requires a type that composes traits",
                                request.name, id
                            ),
                        )
                        .at(request.span.location())
                        .with_help(Category::TemplateScope.example_fix()),
                    ),
                    TemplateScope::Local => {}
                    TemplateScope::Global => {
                        let key = format!("global::{}::{}::{}", decl.file, id, request.name);
                        if !pass.first_expansion(&key) {
                            continue;
                        }
                        let context = TemplateContext::for_node(
                            decl,
                            node,
                            request.extra_tag.as_deref(),
                            &decl.file,
                        )?;
                        let output = session.expand_template(request, &context)?;
                        log_expansion(request, &context, &output);
                        push_block(&mut fragment, &output.text);
                        extension = output.extension.or(extension);
                    }
                }
            }
            if !fragment.is_empty() {
                units.push(GlobalUnit {
                    name: decl.file_stem(),
                    extension,
                    fragment,
                });
            }
        }
    }
    Ok(units)
}

fn push_block(out: &mut SourceFragment, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push_str("\n");
    }
}

fn log_expansion(request: &TemplateRequest, context: &TemplateContext, output: &TemplateOutput) {
    if request.verbosity >= TemplateVerbosity::Info {
        tracing::info!(
            target: "graft::templates",
            template = %request.name,
            bytes = output.text.len(),
            "expanded template"
        );
    }
    if request.verbosity >= TemplateVerbosity::Debug {
        let keys: Vec<&str> = context.keys().collect();
        tracing::debug!(target: "graft::templates", template = %request.name, ?keys, "template context");
    }
}
