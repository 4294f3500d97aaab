//! Property tests for signatures, resolution and fragments.
//!
//! Properties checked for arbitrary members:
//!
//! 1. Whitespace inside type strings never changes a signature
//! 2. `identical` is reflexive and symmetric, and implies `collides`
//! 3. A trait member whose name the target does not use is always included
//! 4. An overridable member facing its own copy is always overridden
//! 5. The same copy without the marker is an unresolved collision
//! 6. A same-named member of another kind is rejected, marker or not
//! 7. Generic arity counts the declared type parameters
//! 8. Interfaces sharing a member forward it once through the proxy
//! 9. Without diagnostics, a fragment renders exactly its text

use proptest::prelude::*;

use graft_decl::{DeclIndex, DeclarationProvider, MemberDecl, Param, TraitMode, TypeDecl};
use graft_diag::Category;

use crate::fragment::SourceFragment;
use crate::proxy::forwarded_members;
use crate::resolve::{ConflictScope, Resolution, TargetMember, resolve_member};
use crate::signature::{collides, extract_signature, identical, member_signatures};

const SCOPE: ConflictScope<'static> = ConflictScope {
    trait_name: "T",
    target_name: "X",
};

fn ident() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,8}"
}

fn type_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("int".to_string()),
        Just("string".to_string()),
        Just("List<int>".to_string()),
        Just("Dictionary<string,int>".to_string()),
        ident(),
    ]
}

fn method() -> impl Strategy<Value = MemberDecl> {
    (
        ident(),
        type_name(),
        prop::collection::vec(type_name(), 0..4),
        0usize..3,
    )
        .prop_map(|(name, ret, params, arity)| {
            let params = params
                .into_iter()
                .enumerate()
                .map(|(i, ty)| Param::new(format!("p{i}"), ty))
                .collect();
            let type_params: Vec<String> = (0..arity).map(|i| format!("T{i}")).collect();
            let refs: Vec<&str> = type_params.iter().map(String::as_str).collect();
            MemberDecl::method(name, ret, params, "void M() {}").with_type_params(&refs)
        })
}

/// Spread spaces around the punctuation of a type string.
fn loosen(ty: &str) -> String {
    let mut out = String::from(" ");
    for ch in ty.chars() {
        if matches!(ch, '<' | '>' | ',') {
            out.push(' ');
            out.push(ch);
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out.push('\t');
    out
}

proptest! {
    #[test]
    fn whitespace_never_changes_signature(member in method()) {
        let mut loose = member.clone();
        loose.return_type = loose.return_type.as_deref().map(loosen);
        for param in &mut loose.params {
            param.ty = loosen(&param.ty);
        }
        prop_assert_eq!(extract_signature(&member), extract_signature(&loose));
    }

    #[test]
    fn identical_is_reflexive_symmetric_and_collides(a in method(), b in method()) {
        let sa = extract_signature(&a).expect("method signature");
        let sb = extract_signature(&b).expect("method signature");
        prop_assert!(identical(&sa, &sa));
        prop_assert_eq!(identical(&sa, &sb), identical(&sb, &sa));
        if identical(&sa, &sb) {
            prop_assert!(collides(&sa, &sb));
        }
    }

    #[test]
    fn unused_name_is_always_included(member in method(), others in prop::collection::vec(method(), 0..6)) {
        let target: Vec<MemberDecl> = others
            .into_iter()
            .filter(|other| other.name() != member.name())
            .collect();
        let resolution = resolve_member(
            &member,
            &member_signatures(&member),
            &TargetMember::collect(&target),
            SCOPE,
        );
        prop_assert_eq!(resolution, Resolution::Include);
    }

    #[test]
    fn overridable_copy_is_overridden(member in method()) {
        let target = vec![member.clone()];
        let member = member.overridable();
        let resolution = resolve_member(
            &member,
            &member_signatures(&member),
            &TargetMember::collect(&target),
            SCOPE,
        );
        prop_assert_eq!(resolution, Resolution::Overridden);
    }

    #[test]
    fn plain_copy_is_an_unresolved_collision(member in method()) {
        let target = vec![member.clone()];
        let resolution = resolve_member(
            &member,
            &member_signatures(&member),
            &TargetMember::collect(&target),
            SCOPE,
        );
        prop_assert!(matches!(
            resolution,
            Resolution::Reject(ref diag) if diag.category == Category::UnresolvedCollision
        ));
    }

    #[test]
    fn kind_mismatch_is_always_rejected(member in method(), overridable in any::<bool>()) {
        let target = vec![MemberDecl::property(member.name(), "int", "int P { get; }")];
        let member = if overridable { member.overridable() } else { member };
        let resolution = resolve_member(
            &member,
            &member_signatures(&member),
            &TargetMember::collect(&target),
            SCOPE,
        );
        prop_assert!(!resolution.includes());
        prop_assert!(matches!(
            resolution,
            Resolution::Reject(ref diag) if diag.category == Category::KindMismatch
        ));
    }

    #[test]
    fn generic_arity_counts_type_parameters(member in method()) {
        let sig = extract_signature(&member).expect("method signature");
        prop_assert_eq!(sig.generic_arity, member.type_params.len());
    }

    #[test]
    fn shared_interface_member_is_forwarded_once(
        shared in method(),
        contracts in prop::collection::btree_set(ident(), 2..5),
    ) {
        let shared = MemberDecl::method(
            shared.name(),
            shared.return_type.clone().unwrap_or_default(),
            shared.params.clone(),
            format!("{} {}();", shared.return_type.as_deref().unwrap_or("void"), shared.name()),
        );
        let mut types: Vec<TypeDecl> = contracts
            .iter()
            .map(|name| TypeDecl::interface(format!("I{name}")).with_member(shared.clone()))
            .collect();
        let trait_decl = contracts.iter().fold(
            TypeDecl::trait_class("SharedTrait", TraitMode::Normal),
            |decl, name| decl.with_base(format!("I{name}")),
        );
        types.push(trait_decl);
        let index = DeclIndex::new(types).expect("distinct names");
        let decl = index.lookup("SharedTrait").expect("trait indexed");
        let (lines, diagnostics) = forwarded_members(decl, &index);
        prop_assert!(diagnostics.is_empty());
        prop_assert_eq!(lines.len(), 1);
    }

    #[test]
    fn fragment_without_diagnostics_renders_text(lines in prop::collection::vec("[ -~]{0,20}", 0..8)) {
        let mut fragment = SourceFragment::new();
        for line in &lines {
            fragment.push_line(line);
        }
        prop_assert_eq!(fragment.render(), fragment.text());
        prop_assert_eq!(fragment.text().lines().count(), lines.len());
    }
}
