//! Synthetic declaration corpora for the benchmarks.

use graft_decl::{MemberDecl, Param, TraitMode, TypeDecl};

/// A trait with `members` methods, every third one overridable.
pub fn wide_trait(name: &str, members: usize) -> TypeDecl {
    (0..members).fold(
        TypeDecl::trait_class(name, TraitMode::Normal)
            .in_namespace("Bench")
            .in_file(format!("Traits/{name}.cs"))
            .with_import("System"),
        |decl, idx| {
            let method = MemberDecl::method(
                format!("Op{idx}"),
                "int",
                vec![Param::new("value", "int")],
                format!("public int Op{idx}(int value) => value + {idx};"),
            );
            decl.with_member(if idx % 3 == 0 { method.overridable() } else { method })
        },
    )
}

/// A partial target composing every trait in `traits`, already declaring
/// `own` of the members the traits bring in.
pub fn target(traits: &[&str], own: usize) -> TypeDecl {
    let decl = (0..own).fold(
        TypeDecl::class("Subject")
            .with_modifiers(&["public", "partial"])
            .in_namespace("Bench")
            .in_file("Subject.cs"),
        |decl, idx| {
            decl.with_member(MemberDecl::method(
                format!("Op{idx}"),
                "int",
                vec![Param::new("value", "int")],
                format!("public int Op{idx}(int value) => value;"),
            ))
        },
    );
    traits.iter().fold(decl, |decl, name| decl.composing(*name))
}
