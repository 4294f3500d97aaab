//! Diamond proxy generation.
//!
//! A trait deriving from plain interfaces gets an intermediate abstract
//! layer that forwards each interface member as an abstract declaration.
//! The composing target then supplies the implementation, and a member
//! shared by several interfaces is declared exactly once.

use std::collections::BTreeSet;

use graft_decl::{DeclarationProvider, TypeDecl, TypeRole};
use graft_diag::{Category, Diagnostic};

use crate::fragment::SourceFragment;

/// Name of the intermediate layer generated for `decl`.
pub fn proxy_name(decl: &TypeDecl) -> String {
    format!("BaseProxy{}", decl.name)
}

/// Abstract forwarding declarations for every plain-interface base, in
/// base order, deduplicated by their exact text.
///
/// Tagged contracts are skipped, and unresolvable bases are left to the
/// target language. Any other non-interface base is an error.
pub fn forwarded_members(
    decl: &TypeDecl,
    provider: &dyn DeclarationProvider,
) -> (Vec<String>, Vec<Diagnostic>) {
    let mut seen = BTreeSet::new();
    let mut lines = Vec::new();
    let mut diagnostics = Vec::new();

    for base in &decl.bases {
        let Some(resolved) = provider.resolve(base, decl) else {
            tracing::debug!(target: "graft::proxy", trait_name = %decl.name, base = %base, "base not in index");
            continue;
        };
        match resolved.role() {
            TypeRole::Contract => continue,
            TypeRole::Interface => {}
            _ => {
                diagnostics.push(
                    Diagnostic::error(
                        Category::InvalidBase,
                        format!(
                            "only interfaces may be bases of trait `{}`, but `{}` is not an interface",
                            decl.name,
                            resolved.fq_name()
                        ),
                    )
                    .at(decl.span.location())
                    .with_label(resolved.span.location(), "base declared here"),
                );
                continue;
            }
        }
        for member in &resolved.members {
            let text = single_line(&member.text);
            if text.is_empty() {
                continue;
            }
            let line = format!("public abstract {text}");
            if seen.insert(line.clone()) {
                lines.push(line);
            }
        }
    }
    (lines, diagnostics)
}

/// Build the proxy fragment for `decl`.
///
/// Diagnostics come first. Proxy text is produced only when at least one
/// member is forwarded; a trait with nothing to forward yields nothing.
pub fn generate_proxy(decl: &TypeDecl, provider: &dyn DeclarationProvider) -> SourceFragment {
    let mut fragment = SourceFragment::new();
    if decl.bases.is_empty() {
        return fragment;
    }
    let (lines, diagnostics) = forwarded_members(decl, provider);
    for diag in diagnostics {
        fragment.push_diagnostic(diag);
    }
    if lines.is_empty() {
        return fragment;
    }

    let proxy = format!(
        "{}{}",
        proxy_name(decl),
        decl.type_params.as_deref().map(str::trim).unwrap_or_default()
    );
    let (open, indent) = match decl.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => (Some(ns), "    "),
        _ => (None, ""),
    };
    if let Some(ns) = open {
        fragment.push_line(&format!("namespace {ns} {{"));
    }
    fragment.push_line(&format!("{indent}{} : {proxy} {{ }}", decl.header()));
    fragment.blank_line();
    fragment.push_line(&format!("{indent}abstract class {proxy} {{"));
    for line in &lines {
        fragment.push_line(&format!("{indent}    {line}"));
    }
    fragment.push_line(&format!("{indent}}}"));
    if open.is_some() {
        fragment.push_line("}");
    }
    tracing::debug!(target: "graft::proxy", trait_name = %decl.name, forwarded = lines.len(), "generated proxy layer");
    fragment
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_decl::{DeclIndex, MemberDecl, TraitMode};

    fn label(owner: &str) -> TypeDecl {
        TypeDecl::interface(owner)
            .in_namespace("Demo")
            .with_member(MemberDecl::method("Label", "string", Vec::new(), "string Label();"))
    }

    fn proxy_for(trait_decl: TypeDecl, others: Vec<TypeDecl>) -> SourceFragment {
        let fq = trait_decl.fq_name();
        let mut types = others;
        types.push(trait_decl);
        let index = DeclIndex::new(types).expect("index");
        generate_proxy(index.lookup(&fq).expect("trait"), &index)
    }

    #[test]
    fn shared_member_is_forwarded_once() {
        let trait_decl = TypeDecl::trait_class("PersonTrait", TraitMode::Normal)
            .in_namespace("Demo")
            .with_base("IName")
            .with_base("IAddrLabel");
        let fragment = proxy_for(trait_decl, vec![label("IName"), label("IAddrLabel")]);
        assert_eq!(
            fragment.render(),
            "namespace Demo {\n    abstract partial class PersonTrait : BaseProxyPersonTrait { }\n\n    abstract class BaseProxyPersonTrait {\n        public abstract string Label();\n    }\n}\n"
        );
    }

    #[test]
    fn tagged_contracts_and_unknown_bases_produce_nothing() {
        let contract = label("IName").tagged_contract();
        let trait_decl = TypeDecl::trait_class("NameTrait", TraitMode::Normal)
            .in_namespace("Demo")
            .with_base("IName")
            .with_base("System.IDisposable");
        assert!(proxy_for(trait_decl, vec![contract]).is_empty());
    }

    #[test]
    fn class_base_is_an_error() {
        let trait_decl = TypeDecl::trait_class("NameTrait", TraitMode::Normal)
            .in_namespace("Demo")
            .with_base("Entity");
        let fragment = proxy_for(trait_decl, vec![TypeDecl::class("Entity").in_namespace("Demo")]);
        assert_eq!(fragment.diagnostics().len(), 1);
        assert_eq!(fragment.diagnostics()[0].category, Category::InvalidBase);
        assert!(fragment.text().is_empty());
    }

    #[test]
    fn generic_trait_keeps_parameters_on_proxy() {
        let trait_decl = TypeDecl::trait_class("BoxTrait", TraitMode::Normal)
            .with_generics("<T>", None)
            .with_base("IName");
        let fragment = proxy_for(trait_decl, vec![TypeDecl::interface("IName").with_member(
            MemberDecl::property("Name", "string", "string  Name { get; }"),
        )]);
        assert_eq!(
            fragment.render(),
            "abstract partial class BoxTrait<T> : BaseProxyBoxTrait<T> { }\n\nabstract class BaseProxyBoxTrait<T> {\n    public abstract string Name { get; }\n}\n"
        );
    }
}
