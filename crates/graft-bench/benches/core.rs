use std::hint::black_box;

use divan::{AllocProfiler, Bencher};
use graft_bench::{target, wide_trait};
use graft_compose::resolve::{ConflictScope, TargetMember, resolve_member};
use graft_compose::{
    CancellationToken, PassContext, PassOptions, Session, TraitRegistry, compose_target,
    member_signatures,
};
use graft_decl::{DeclIndex, DeclarationProvider};

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

#[divan::bench(args = [16, 64, 256])]
fn resolve_against_target(bencher: Bencher, members: usize) {
    let trait_decl = wide_trait("WideTrait", members);
    let subject = target(&["WideTrait"], members / 2);
    let existing = TargetMember::collect(&subject.members);
    let scope = ConflictScope {
        trait_name: "Bench.WideTrait",
        target_name: "Bench.Subject",
    };
    bencher.bench(|| {
        let included = trait_decl
            .members
            .iter()
            .filter(|member| {
                let signatures = member_signatures(member);
                resolve_member(member, &signatures, black_box(&existing), scope).includes()
            })
            .count();
        black_box(included)
    });
}

#[divan::bench(args = [4, 16, 64])]
fn compose_many_traits(bencher: Bencher, traits: usize) {
    let names: Vec<String> = (0..traits).map(|idx| format!("Trait{idx}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut types: Vec<_> = names.iter().map(|name| wide_trait(name, 16)).collect();
    types.push(target(&refs, 8));
    let index = DeclIndex::new(types)
        .unwrap_or_else(|err| panic!("benchmark corpus should index: {err}"));
    let subject = index
        .lookup("Bench.Subject")
        .unwrap_or_else(|| panic!("benchmark target should exist"));

    bencher.bench(|| {
        let mut pass = PassContext::new(PassOptions::default(), CancellationToken::new());
        let mut session = Session::new();
        let output = compose_target(black_box(subject), &index, &mut pass, &mut session)
            .unwrap_or_else(|err| panic!("composition failed in benchmark: {err}"));
        black_box(output.fragment.text().len())
    });
}

#[divan::bench(args = [16, 64, 256])]
fn register_traits(bencher: Bencher, traits: usize) {
    let types: Vec<_> = (0..traits)
        .map(|idx| wide_trait(&format!("Trait{idx}"), 8))
        .collect();
    let index = DeclIndex::new(types)
        .unwrap_or_else(|err| panic!("benchmark corpus should index: {err}"));
    bencher.bench(|| {
        let mut registry = TraitRegistry::new();
        for decl in index.declarations() {
            black_box(registry.register(decl, &index));
        }
        black_box(registry.len())
    });
}
