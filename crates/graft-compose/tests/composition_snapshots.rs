use std::fmt::Write;

use graft_compose::{CancellationToken, PassContext, PassOptions, Session, compose_target};
use graft_decl::{DeclIndex, DeclarationProvider, MemberDecl, TraitMode, TypeDecl};
use insta::assert_snapshot;

fn corpus() -> DeclIndex {
    let name_contract = TypeDecl::interface("IName")
        .in_namespace("Demo.Contracts")
        .tagged_contract()
        .with_member(MemberDecl::property("FirstName", "string", "string FirstName { get; set; }"))
        .with_member(MemberDecl::method("Label", "string", Vec::new(), "string Label();"));
    let label = TypeDecl::interface("IAddrLabel")
        .in_namespace("Demo.Contracts")
        .with_member(MemberDecl::method("Label", "string", Vec::new(), "string Label();"))
        .with_member(MemberDecl::property("Zip", "string", "string Zip { get; }"));
    let name_trait = TypeDecl::trait_class("NameTrait", TraitMode::Strict)
        .in_namespace("Demo.Traits")
        .in_file("Traits/NameTrait.cs")
        .with_import("System")
        .with_import("Graft.Defs")
        .with_import("Demo.Contracts")
        .with_base("IName")
        .with_member(MemberDecl::property(
            "FirstName",
            "string",
            "public string FirstName { get; set; }",
        ))
        .with_member(
            MemberDecl::method(
                "Label",
                "string",
                Vec::new(),
                "public string Label()\n{\n    return FirstName;\n}",
            )
            .overridable(),
        );
    let address_trait = TypeDecl::trait_class("AddressTrait", TraitMode::Normal)
        .in_namespace("Demo.Traits")
        .in_file("Traits/AddressTrait.cs")
        .with_import("Demo.Contracts")
        .with_base("IName")
        .with_base("IAddrLabel")
        .with_member(MemberDecl::field(&["street", "city"], "string", "private string street, city;"));
    let person = TypeDecl::class("Person")
        .with_modifiers(&["public", "partial"])
        .in_namespace("Demo.People")
        .in_file("People/Person.cs")
        .with_import("Demo.Traits")
        .composing("NameTrait")
        .composing("AddressTrait")
        .with_member(MemberDecl::method(
            "Label",
            "string",
            Vec::new(),
            "public string Label() => \"person\";",
        ));

    DeclIndex::new(vec![name_contract, label, name_trait, address_trait, person]).expect("index")
}

fn run_corpus() -> String {
    let index = corpus();
    let mut pass = PassContext::new(
        PassOptions {
            ignored_imports: vec!["Graft.Defs".to_string()],
            trace: false,
        },
        CancellationToken::new(),
    );
    let mut session = Session::new();
    let mut output = String::new();

    for decl in index.declarations().filter(|decl| decl.is_trait()) {
        let fragment = pass.registry.register(decl, &index);
        if !fragment.is_empty() {
            writeln!(&mut output, "## trait {}", decl.name).expect("write");
            output.push_str(&fragment.render());
        }
    }
    for decl in index.declarations().filter(|decl| !decl.requests().is_empty()) {
        let composed =
            compose_target(decl, &index, &mut pass, &mut session).expect("compose target");
        writeln!(&mut output, "## target {}", decl.name).expect("write");
        output.push_str(&composed.fragment.render());
    }
    output
}

#[test]
fn diamond_corpus_snapshot() {
    assert_snapshot!(run_corpus(), @r#"
## trait AddressTrait
namespace Demo.Traits {
    abstract partial class AddressTrait : BaseProxyAddressTrait { }

    abstract class BaseProxyAddressTrait {
        public abstract string Label();
        public abstract string Zip { get; }
    }
}
## target Person
using System;
using Demo.Contracts;
using Demo.Traits;

namespace Demo.People {
    public partial class Person {
        public string FirstName { get; set; }
    }
}
using Demo.Contracts;
using Demo.Traits;

namespace Demo.People {
    public partial class Person {
        private string street, city;
    }
}
"#);
}

#[test]
fn output_is_deterministic() {
    assert_eq!(run_corpus(), run_corpus());
}
