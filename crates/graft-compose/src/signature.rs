//! Canonical member signatures and the comparisons the resolver relies on.
//!
//! Signatures are built from the structured declaration model, never from
//! source text, and every type string is whitespace-stripped so formatting
//! differences cannot cause or hide a collision.

use graft_decl::{MemberDecl, MemberKind, strip_whitespace};
use serde::Serialize;

/// Separator placed between argument types in [`MemberSignature::arguments`].
pub const ARGUMENT_SEPARATOR: char = ';';

/// The comparable shape of one declared name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MemberSignature {
    pub name: String,
    pub kind: MemberKind,
    /// Return type for methods, declared type for properties. Empty otherwise.
    pub return_type: String,
    /// Argument types joined by [`ARGUMENT_SEPARATOR`]. Methods only.
    pub arguments: String,
    /// Number of method type parameters.
    pub generic_arity: usize,
}

impl MemberSignature {
    fn named(name: &str, kind: MemberKind) -> Self {
        Self {
            name: name.trim().to_string(),
            kind,
            return_type: String::new(),
            arguments: String::new(),
            generic_arity: 0,
        }
    }
}

/// Signature of the member's primary name.
///
/// `None` for kinds that do not take part in collision checks
/// (constructors and anything unrecognized).
pub fn extract_signature(member: &MemberDecl) -> Option<MemberSignature> {
    match member.kind {
        MemberKind::Method => {
            let arguments = member
                .params
                .iter()
                .map(|param| strip_whitespace(&param.ty))
                .collect::<Vec<_>>()
                .join(&ARGUMENT_SEPARATOR.to_string());
            Some(MemberSignature {
                return_type: stripped(member.return_type.as_deref()),
                arguments,
                generic_arity: member.type_params.len(),
                ..MemberSignature::named(member.name(), MemberKind::Method)
            })
        }
        MemberKind::Property => Some(MemberSignature {
            return_type: stripped(member.return_type.as_deref()),
            ..MemberSignature::named(member.name(), MemberKind::Property)
        }),
        MemberKind::Field | MemberKind::NestedType => {
            Some(MemberSignature::named(member.name(), member.kind))
        }
        MemberKind::Constructor | MemberKind::Other => None,
    }
}

/// Every signature a member contributes: one per variable for fields.
pub fn member_signatures(member: &MemberDecl) -> Vec<MemberSignature> {
    match member.kind {
        MemberKind::Field => member
            .names
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| MemberSignature::named(name, MemberKind::Field))
            .collect(),
        _ => extract_signature(member).into_iter().collect(),
    }
}

/// Same kind, name, return type, argument types and generic arity.
pub fn identical(a: &MemberSignature, b: &MemberSignature) -> bool {
    a.kind == b.kind
        && a.name == b.name
        && a.return_type == b.return_type
        && a.arguments == b.arguments
        && a.generic_arity == b.generic_arity
}

/// Name equality alone; the resolver decides what the collision means.
pub fn collides(a: &MemberSignature, b: &MemberSignature) -> bool {
    a.name == b.name
}

/// The parts of a method signature that overload resolution looks at.
pub(crate) fn same_method_shape(a: &MemberSignature, b: &MemberSignature) -> bool {
    a.return_type == b.return_type
        && a.arguments == b.arguments
        && a.generic_arity == b.generic_arity
}

fn stripped(ty: Option<&str>) -> String {
    ty.map(strip_whitespace).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_decl::Param;

    fn greet(params: Vec<Param>) -> MemberDecl {
        MemberDecl::method("Greet", "string", params, "public string Greet() => \"hi\";")
    }

    #[test]
    fn method_signature_strips_whitespace() {
        let member = MemberDecl::method(
            "Lookup",
            " Dictionary< string , int > ",
            vec![Param::new("key", "string"), Param::new("items", "List< int >")],
            "",
        )
        .with_type_params(&["T"]);
        let sig = extract_signature(&member).expect("methods have signatures");
        assert_eq!(sig.name, "Lookup");
        assert_eq!(sig.return_type, "Dictionary<string,int>");
        assert_eq!(sig.arguments, "string;List<int>");
        assert_eq!(sig.generic_arity, 1);
    }

    #[test]
    fn property_keeps_type_but_no_arguments() {
        let member = MemberDecl::property("FirstName", "string", "public string FirstName { get; set; }");
        let sig = extract_signature(&member).expect("properties have signatures");
        assert_eq!(sig.kind, MemberKind::Property);
        assert_eq!(sig.return_type, "string");
        assert!(sig.arguments.is_empty());
    }

    #[test]
    fn fields_contribute_one_signature_per_variable() {
        let member = MemberDecl::field(&["first", "last"], "string", "string first, last;");
        let sigs = member_signatures(&member);
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[1].name, "last");
        assert!(sigs.iter().all(|sig| sig.return_type.is_empty()));
    }

    #[test]
    fn constructors_have_no_signature() {
        let ctor = MemberDecl::other(MemberKind::Constructor, "Person", "public Person() {}");
        assert!(extract_signature(&ctor).is_none());
        assert!(member_signatures(&ctor).is_empty());
    }

    #[test]
    fn identical_requires_every_component() {
        let a = extract_signature(&greet(vec![Param::new("name", "string")])).expect("sig");
        let b = extract_signature(&greet(vec![Param::new("other", "string")])).expect("sig");
        let c = extract_signature(&greet(vec![Param::new("count", "int")])).expect("sig");
        assert!(identical(&a, &b), "parameter names do not matter");
        assert!(!identical(&a, &c));
        assert!(collides(&a, &c));
    }

    #[test]
    fn different_kinds_are_never_identical() {
        let field = MemberDecl::field(&["Name"], "string", "string Name;");
        let prop = MemberDecl::property("Name", "string", "string Name { get; }");
        let field_sig = &member_signatures(&field)[0];
        let prop_sig = &member_signatures(&prop)[0];
        assert!(collides(field_sig, prop_sig));
        assert!(!identical(field_sig, prop_sig));
    }
}
