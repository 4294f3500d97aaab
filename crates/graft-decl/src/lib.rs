//! Declaration model for graft.
//!
//! This crate defines the normalized view of type declarations that the
//! front end hands to the composition engine: types, their members, the
//! markers attached to both, and source spans for diagnostics. The model is
//! pure data; it is indexed by a [`DeclarationProvider`] and never mutated
//! during a generation pass.

pub mod manifest;
pub mod provider;

use graft_diag::SourceLocation;
use serde::{Deserialize, Serialize};

pub use manifest::{Manifest, ManifestError};
pub use provider::{DeclIndex, DeclarationProvider};

/// Identifies a source file in the generation session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    #[serde(default)]
    pub file: FileId,
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
}

impl Span {
    pub fn location(self) -> SourceLocation {
        SourceLocation {
            file_id: self.file.0,
            start: self.start,
            end: self.end,
        }
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Validation policy declared by a trait marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitMode {
    #[default]
    Normal,
    Strict,
}

/// Where the output of a process member goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessScope {
    /// Inline the result into the augmented target.
    #[default]
    Include,
    /// Emit the result as its own output unit.
    Global,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScope {
    /// Expanded inside the augmentation of the composing target.
    Local,
    /// Expanded once into a standalone output unit.
    #[default]
    Global,
}

/// How chatty template expansion is. Ordered from silent to most verbose.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVerbosity {
    #[default]
    None,
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

/// A request to expand an externally authored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    #[serde(default)]
    pub scope: TemplateScope,
    #[serde(default)]
    pub verbosity: TemplateVerbosity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_tag: Option<String>,
    #[serde(default)]
    pub span: Span,
}

impl TemplateRequest {
    pub fn new(name: impl Into<String>, scope: TemplateScope) -> Self {
        Self {
            name: name.into(),
            scope,
            verbosity: TemplateVerbosity::None,
            extra_tag: None,
            span: Span::default(),
        }
    }

    pub fn with_extra_tag(mut self, tag: impl Into<String>) -> Self {
        self.extra_tag = Some(tag.into());
        self
    }

    pub fn with_verbosity(mut self, verbosity: TemplateVerbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// One composition request as written on the target, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRequest {
    pub reference: String,
    #[serde(default)]
    pub span: Span,
}

/// Markers attached to a type declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMarkers {
    /// `Some` when the type carries the trait marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_mode: Option<TraitMode>,
    /// Tagged as a trait contract (only meaningful on interfaces).
    #[serde(default)]
    pub contract: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compose: Vec<TraitRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateRequest>,
}

/// Markers attached to a member declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMarkers {
    /// Never merged into targets.
    #[serde(default)]
    pub ignore: bool,
    /// An identical target member wins silently.
    #[serde(default)]
    pub overridable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessScope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateRequest>,
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    Property,
    Field,
    NestedType,
    Constructor,
    Other,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Field => "field",
            MemberKind::NestedType => "nested type",
            MemberKind::Constructor => "constructor",
            MemberKind::Other => "member",
        }
    }
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A member of a type declaration.
///
/// Fields may declare several variables at once (`int a, b;`); every other
/// kind has exactly one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub kind: MemberKind,
    pub names: Vec<String>,
    /// Method return type, property type or field type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Attribute text that is not a graft marker; emitted verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub markers: MemberMarkers,
    /// Declaration source without attributes.
    pub text: String,
    #[serde(default)]
    pub span: Span,
}

impl MemberDecl {
    fn new(kind: MemberKind, names: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            names,
            return_type: None,
            params: Vec::new(),
            type_params: Vec::new(),
            modifiers: Vec::new(),
            attributes: Vec::new(),
            markers: MemberMarkers::default(),
            text: text.into(),
            span: Span::default(),
        }
    }

    pub fn method(
        name: impl Into<String>,
        return_type: impl Into<String>,
        params: Vec<Param>,
        text: impl Into<String>,
    ) -> Self {
        let mut member = Self::new(MemberKind::Method, vec![name.into()], text);
        member.return_type = Some(return_type.into());
        member.params = params;
        member
    }

    pub fn property(name: impl Into<String>, ty: impl Into<String>, text: impl Into<String>) -> Self {
        let mut member = Self::new(MemberKind::Property, vec![name.into()], text);
        member.return_type = Some(ty.into());
        member
    }

    pub fn field(names: &[&str], ty: impl Into<String>, text: impl Into<String>) -> Self {
        let names = names.iter().map(|name| name.to_string()).collect();
        let mut member = Self::new(MemberKind::Field, names, text);
        member.return_type = Some(ty.into());
        member
    }

    pub fn nested_type(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MemberKind::NestedType, vec![name.into()], text)
    }

    pub fn other(kind: MemberKind, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(kind, vec![name.into()], text)
    }

    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_modifiers(mut self, modifiers: &[&str]) -> Self {
        self.modifiers = modifiers.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn with_template(mut self, request: TemplateRequest) -> Self {
        self.markers.templates.push(request);
        self
    }

    pub fn overridable(mut self) -> Self {
        self.markers.overridable = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.markers.ignore = true;
        self
    }

    pub fn process(mut self, scope: ProcessScope) -> Self {
        self.markers.process = Some(scope);
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Primary name; the first variable for multi-variable fields.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// Identifier used to key template expansion for this member.
    pub fn id(&self) -> String {
        self.names.join(", ")
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// Render the member for inclusion in a type body.
    ///
    /// Passthrough attributes come first, each on its own line; every line
    /// is prefixed with `indent`. Markers are structured and never rendered.
    pub fn render(&self, indent: &str) -> String {
        let mut out = String::new();
        for attribute in &self.attributes {
            out.push_str(indent);
            out.push_str(attribute.trim());
            out.push('\n');
        }
        for line in self.text.trim_end().lines() {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str(indent);
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Interface,
}

/// What a declaration is, as far as composition is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRole {
    Trait(TraitMode),
    /// Interface tagged as a trait contract.
    Contract,
    /// Interface without the contract tag.
    Interface,
    Ordinary,
}

/// A type declaration as supplied by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Raw generic parameter list, e.g. `<T, U>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_params: Option<String>,
    /// Raw constraint clauses, e.g. `where T : class`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default)]
    pub markers: TypeMarkers,
    /// File-level imports of the declaring file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Imports declared inside the namespace block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespace_imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberDecl>,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub span: Span,
}

impl TypeDecl {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            kind,
            modifiers: Vec::new(),
            type_params: None,
            constraints: None,
            bases: Vec::new(),
            markers: TypeMarkers::default(),
            imports: Vec::new(),
            namespace_imports: Vec::new(),
            members: Vec::new(),
            file: String::new(),
            span: Span::default(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Class, name)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Interface, name)
    }

    /// An `abstract partial` class carrying the trait marker.
    pub fn trait_class(name: impl Into<String>, mode: TraitMode) -> Self {
        let mut decl = Self::class(name).with_modifiers(&["abstract", "partial"]);
        decl.markers.trait_mode = Some(mode);
        decl
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: &[&str]) -> Self {
        self.modifiers = modifiers.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_generics(mut self, params: &str, constraints: Option<&str>) -> Self {
        self.type_params = Some(params.to_string());
        self.constraints = constraints.map(str::to_string);
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    pub fn with_member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_template(mut self, request: TemplateRequest) -> Self {
        self.markers.templates.push(request);
        self
    }

    pub fn composing(mut self, reference: impl Into<String>) -> Self {
        self.markers.compose.push(TraitRequest {
            reference: reference.into(),
            span: Span::default(),
        });
        self
    }

    pub fn tagged_contract(mut self) -> Self {
        self.markers.contract = true;
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Fully-qualified name: `Namespace.Name`, or just `Name` at top level.
    pub fn fq_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// Open types may be extended by generated augmentations.
    pub fn is_open(&self) -> bool {
        self.has_modifier("partial")
    }

    pub fn is_abstract(&self) -> bool {
        self.has_modifier("abstract")
    }

    pub fn trait_mode(&self) -> Option<TraitMode> {
        self.markers.trait_mode
    }

    pub fn is_trait(&self) -> bool {
        self.markers.trait_mode.is_some()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn role(&self) -> TypeRole {
        if let Some(mode) = self.markers.trait_mode {
            return TypeRole::Trait(mode);
        }
        match (self.kind, self.markers.contract) {
            (TypeKind::Interface, true) => TypeRole::Contract,
            (TypeKind::Interface, false) => TypeRole::Interface,
            _ => TypeRole::Ordinary,
        }
    }

    pub fn requests(&self) -> &[TraitRequest] {
        &self.markers.compose
    }

    /// File name without directories or extension; `Common` when unknown.
    pub fn file_stem(&self) -> String {
        std::path::Path::new(&self.file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("Common")
            .to_string()
    }

    /// `modifiers kind Name<T>` header without bases.
    pub fn header(&self) -> String {
        let keyword = match self.kind {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
        };
        let mut out = String::new();
        for modifier in &self.modifiers {
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str(keyword);
        out.push(' ');
        out.push_str(&self.name);
        if let Some(params) = &self.type_params {
            out.push_str(params.trim());
        }
        out
    }
}

/// Strip every whitespace character so formatting never affects comparison.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fq_name_includes_namespace() {
        let decl = TypeDecl::class("Person").in_namespace("Demo.People");
        assert_eq!(decl.fq_name(), "Demo.People.Person");
        assert_eq!(TypeDecl::class("Person").fq_name(), "Person");
    }

    #[test]
    fn roles_follow_markers_and_kind() {
        assert_eq!(
            TypeDecl::trait_class("NameTrait", TraitMode::Strict).role(),
            TypeRole::Trait(TraitMode::Strict)
        );
        assert_eq!(TypeDecl::interface("IName").tagged_contract().role(), TypeRole::Contract);
        assert_eq!(TypeDecl::interface("ILabel").role(), TypeRole::Interface);
        assert_eq!(TypeDecl::class("Person").role(), TypeRole::Ordinary);
    }

    #[test]
    fn header_renders_modifiers_and_generics() {
        let decl = TypeDecl::class("Box")
            .with_modifiers(&["public", "partial"])
            .with_generics("<T>", Some("where T : class"));
        assert_eq!(decl.header(), "public partial class Box<T>");
    }

    #[test]
    fn member_render_indents_and_keeps_attributes() {
        let member = MemberDecl::method(
            "GetFullName",
            "string",
            Vec::new(),
            "public string GetFullName()\n{\n    return \"X\";\n}",
        )
        .with_attribute("[Obsolete]")
        .overridable();
        assert_eq!(
            member.render("    "),
            "    [Obsolete]\n    public string GetFullName()\n    {\n        return \"X\";\n    }\n"
        );
    }

    #[test]
    fn field_member_id_joins_variables() {
        let member = MemberDecl::field(&["first", "last"], "string", "private string first, last;");
        assert_eq!(member.name(), "first");
        assert_eq!(member.id(), "first, last");
    }

    #[test]
    fn file_stem_defaults_to_common() {
        assert_eq!(TypeDecl::class("A").file_stem(), "Common");
        assert_eq!(TypeDecl::class("A").in_file("src/People/Person.cs").file_stem(), "Person");
    }

    #[test]
    fn strip_whitespace_removes_all_kinds() {
        assert_eq!(strip_whitespace(" Dictionary< string ,\n\tint > "), "Dictionary<string,int>");
    }
}
