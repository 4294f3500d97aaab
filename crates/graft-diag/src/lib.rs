//! Error reporting and diagnostics for graft.
//!
//! Diagnostics are created by the composition engine (`graft-compose`) and
//! the declaration index (`graft-decl`) as structured values. They travel
//! alongside generated text rather than inside it; turning them into
//! `#error` / `#warning` directives is a rendering concern handled here.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Broad category for diagnostics. Used for filtering, grouping and `explain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A requested trait, type or contract cannot be found.
    UnresolvedReference,
    /// Generic parameters or constraints differ between trait and target.
    StructuralMismatch,
    /// Colliding members are of different declaration kinds.
    KindMismatch,
    /// Signature-identical collision without an override marker.
    UnresolvedCollision,
    /// Strict trait member outside its contract, or missing contract.
    StrictViolation,
    /// Trait not declared abstract and open.
    MalformedTrait,
    /// Composition target not declared open.
    MalformedTarget,
    /// Same trait requested twice by one target.
    DuplicateRequest,
    /// Requested type does not carry the trait marker.
    NotATrait,
    /// Trait base is not an interface-like contract.
    InvalidBase,
    /// Process marker on something other than a public static method.
    InvalidProcessMember,
    /// Local template request outside a composing type.
    TemplateScope,
    /// Diagnostic reported by an external collaborator (sandbox, templates).
    CollaboratorReport,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::UnresolvedReference,
        Category::StructuralMismatch,
        Category::KindMismatch,
        Category::UnresolvedCollision,
        Category::StrictViolation,
        Category::MalformedTrait,
        Category::MalformedTarget,
        Category::DuplicateRequest,
        Category::NotATrait,
        Category::InvalidBase,
        Category::InvalidProcessMember,
        Category::TemplateScope,
        Category::CollaboratorReport,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::UnresolvedReference => "unresolved_reference",
            Category::StructuralMismatch => "structural_mismatch",
            Category::KindMismatch => "kind_mismatch",
            Category::UnresolvedCollision => "unresolved_collision",
            Category::StrictViolation => "strict_violation",
            Category::MalformedTrait => "malformed_trait",
            Category::MalformedTarget => "malformed_target",
            Category::DuplicateRequest => "duplicate_request",
            Category::NotATrait => "not_a_trait",
            Category::InvalidBase => "invalid_base",
            Category::InvalidProcessMember => "invalid_process_member",
            Category::TemplateScope => "template_scope",
            Category::CollaboratorReport => "collaborator_report",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::UnresolvedReference => "GR0001",
            Category::StructuralMismatch => "GR0002",
            Category::KindMismatch => "GR0003",
            Category::UnresolvedCollision => "GR0004",
            Category::StrictViolation => "GR0005",
            Category::MalformedTrait => "GR0006",
            Category::MalformedTarget => "GR0007",
            Category::DuplicateRequest => "GR0008",
            Category::NotATrait => "GR0009",
            Category::InvalidBase => "GR0010",
            Category::InvalidProcessMember => "GR0011",
            Category::TemplateScope => "GR0012",
            Category::CollaboratorReport => "GR0100",
        }
    }

    /// Look a category up by its stable code (case-insensitive).
    pub fn from_code(code: &str) -> Option<Category> {
        Self::ALL
            .iter()
            .copied()
            .find(|cat| cat.code().eq_ignore_ascii_case(code.trim()))
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::UnresolvedReference => {
                "A requested trait, type or contract could not be found in the declaration index."
            }
            Category::StructuralMismatch => {
                "Generic parameters or constraint clauses of a trait and its target differ."
            }
            Category::KindMismatch => {
                "A trait member and a target member share a name but are different kinds of declaration."
            }
            Category::UnresolvedCollision => {
                "A trait member collides with an identical target member and is not marked overridable."
            }
            Category::StrictViolation => {
                "A strict trait has no contract, or declares a member its contract does not."
            }
            Category::MalformedTrait => "A trait is not declared as an abstract, open type.",
            Category::MalformedTarget => "A composition target is not declared as an open type.",
            Category::DuplicateRequest => "The same trait is requested more than once by one target.",
            Category::NotATrait => "A composition request names a type without the trait marker.",
            Category::InvalidBase => "A trait base is something other than an interface-like contract.",
            Category::InvalidProcessMember => {
                "A process marker is attached to something other than a public static method."
            }
            Category::TemplateScope => {
                "A local template request appears outside of a type that composes traits."
            }
            Category::CollaboratorReport => {
                "A diagnostic reported by the template expander or the execution sandbox."
            }
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::UnresolvedReference => "Check the spelling or import the trait's namespace.",
            Category::StructuralMismatch => {
                "Declare identical generic parameters and constraints on trait and target."
            }
            Category::KindMismatch => "Rename one of the members so their names no longer collide.",
            Category::UnresolvedCollision => {
                "Mark the trait member overridable, or remove the target's definition."
            }
            Category::StrictViolation => {
                "Bind the trait to a tagged contract and drop members the contract does not declare."
            }
            Category::MalformedTrait => "Declare the trait `abstract partial`.",
            Category::MalformedTarget => "Declare the target `partial`.",
            Category::DuplicateRequest => "Remove the repeated composition request.",
            Category::NotATrait => "Add the trait marker to the type, or request a different type.",
            Category::InvalidBase => "Derive the trait from interfaces only.",
            Category::InvalidProcessMember => "Make the process member a `public static` method.",
            Category::TemplateScope => {
                "Use a global template, or move the request into a composing type."
            }
            Category::CollaboratorReport => "Follow the collaborator's message.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `graft-decl` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. GR0004).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Additional labeled spans (e.g., "target member declared here").
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    pub fn info(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity,
            category,
            message: message.into(),
            location: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render as a single-line directive understood by the enclosing build.
    ///
    /// Errors and warnings become preprocessor directives; informational
    /// diagnostics become plain comments so they never fail a build.
    pub fn to_directive(&self) -> String {
        let message = flatten_newlines(&self.message);
        let head = match self.severity {
            Severity::Error => "#error",
            Severity::Warning => "#warning",
            Severity::Info => "// info",
        };
        match &self.code {
            Some(code) => format!("{head} {code}: {message}"),
            None => format!("{head} {message}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        if let Some(code) = &self.code {
            write!(f, "{prefix}[{code}]: {}", self.message)?;
        } else {
            write!(f, "{prefix}: {}", self.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

/// Replace line breaks with spaces so a message fits on one directive line.
pub fn flatten_newlines(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_builder() {
        let loc = SourceLocation {
            file_id: 0,
            start: 10,
            end: 20,
        };
        let diag = Diagnostic::error(Category::UnresolvedCollision, "GetFullName collides")
            .at(loc)
            .with_help("mark it overridable");

        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.as_deref(), Some("GR0004"));
        assert_eq!(diag.category, Category::UnresolvedCollision);
        assert_eq!(diag.location, Some(loc));
        assert!(diag.help.unwrap().contains("overridable"));
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::error(Category::KindMismatch, "Name is a field and a method");
        let s = format!("{diag}");
        assert!(s.starts_with("error[GR0003]: Name is a field"));
    }

    #[test]
    fn directive_rendering_is_single_line() {
        let err = Diagnostic::error(Category::StrictViolation, "first\nsecond\r\nthird");
        assert_eq!(err.to_directive(), "#error GR0005: first second  third");

        let warn = Diagnostic::warning(Category::CollaboratorReport, "slow template");
        assert_eq!(warn.to_directive(), "#warning GR0100: slow template");

        let info = Diagnostic::info(Category::CollaboratorReport, "done");
        assert_eq!(info.to_directive(), "// info GR0100: done");
    }

    #[test]
    fn category_lookup_by_code() {
        assert_eq!(Category::from_code("gr0008"), Some(Category::DuplicateRequest));
        assert_eq!(Category::from_code(" GR0100 "), Some(Category::CollaboratorReport));
        assert_eq!(Category::from_code("E0001"), None);
    }

    #[test]
    fn category_metadata_is_stable_and_unique() {
        let mut codes = std::collections::BTreeSet::new();
        for cat in Category::all() {
            assert!(!cat.as_str().is_empty());
            assert!(!cat.description().is_empty());
            assert!(!cat.example_fix().is_empty());
            assert!(
                codes.insert(cat.code()),
                "duplicate diagnostic code detected: {}",
                cat.code()
            );
        }
    }

    #[test]
    fn diagnostic_error_displays_first_entry() {
        let err = DiagnosticError::multiple(vec![
            Diagnostic::error(Category::NotATrait, "Foo is not a trait"),
            Diagnostic::error(Category::NotATrait, "Bar is not a trait"),
        ]);
        assert_eq!(err.to_string(), "error[GR0009]: Foo is not a trait");
        assert_eq!(err.diagnostics().len(), 2);
    }
}
