//! Seams to the two external collaborators: the template expander and the
//! execution sandbox, plus the content-hashed cache of compiled process
//! members.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use graft_decl::{MemberDecl, TemplateRequest, TypeDecl};
use graft_diag::Diagnostic;
use serde_json::Value;
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Keys of the context bag handed to templates.
pub mod context_keys {
    pub const CLASS_NODE: &str = "ClassNode";
    pub const METHOD_NODE: &str = "MethodNode";
    pub const PROPERTY_NODE: &str = "PropertyNode";
    pub const SYNTAX_NODE: &str = "SyntaxNode";
    pub const EXTRA_TAG: &str = "ExtraTag";
    pub const FILE_PATH: &str = "FilePath";
}

/// Named values a template can read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    values: BTreeMap<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Resolve a dotted path such as `ClassNode.members.0.names`.
    ///
    /// The first segment names a context entry; the rest index into it,
    /// by key for objects and by position for arrays.
    pub fn lookup_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').map(str::trim);
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Bag for a type-level or member-level expansion.
    ///
    /// `class` is the enclosing type; `node` is the member being expanded,
    /// if any. Method and property nodes are filled by member kind.
    pub fn for_node(
        class: &TypeDecl,
        node: Option<&MemberDecl>,
        extra_tag: Option<&str>,
        file_path: &str,
    ) -> Result<Self, TemplateError> {
        use graft_decl::MemberKind;
        use self::context_keys::*;

        let mut context = Self::new();
        let class_value = context_value(CLASS_NODE, class)?;
        match node {
            Some(member) => {
                let member_value = context_value(SYNTAX_NODE, member)?;
                match member.kind {
                    MemberKind::Method => context.insert(METHOD_NODE, member_value.clone()),
                    MemberKind::Property => context.insert(PROPERTY_NODE, member_value.clone()),
                    _ => {}
                }
                context.insert(SYNTAX_NODE, member_value);
            }
            None => context.insert(SYNTAX_NODE, class_value.clone()),
        }
        context.insert(CLASS_NODE, class_value);
        context.insert(
            EXTRA_TAG,
            extra_tag.map_or(Value::Null, |tag| Value::String(tag.to_string())),
        );
        context.insert(FILE_PATH, Value::String(file_path.to_string()));
        Ok(context)
    }
}

fn context_value<T: serde::Serialize>(key: &str, value: &T) -> Result<Value, TemplateError> {
    serde_json::to_value(value).map_err(|source| TemplateError::Context {
        key: key.to_string(),
        source,
    })
}

/// Expanded template text and the file extension it asks for, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOutput {
    pub text: String,
    pub extension: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("no template expander is configured (requested `{0}`)")]
    Unavailable(String),
    #[error("no `{dir}` directory found above `{}`", from.display())]
    DirectoryMissing { dir: String, from: PathBuf },
    #[error("template `{name}` not found at `{}`", path.display())]
    NotFound { name: String, path: PathBuf },
    #[error("template `{name}` line {line}: {message}")]
    Render {
        name: String,
        line: usize,
        message: String,
    },
    #[error("cannot build template context entry `{key}`: {source}")]
    Context {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read template `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait TemplateExpander {
    fn expand(
        &mut self,
        request: &TemplateRequest,
        context: &TemplateContext,
    ) -> Result<TemplateOutput, TemplateError>;
}

/// Expander used when templates are not configured; every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateExpander for NoTemplates {
    fn expand(
        &mut self,
        request: &TemplateRequest,
        _context: &TemplateContext,
    ) -> Result<TemplateOutput, TemplateError> {
        Err(TemplateError::Unavailable(request.name.clone()))
    }
}

// ---------------------------------------------------------------------------
// Execution sandbox
// ---------------------------------------------------------------------------

/// Opaque handle to a process member prepared by a sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub owner: String,
    pub method: String,
    pub content_hash: String,
    pub location: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("no execution sandbox is configured (needed for `{owner}.{method}`)")]
    Unavailable { owner: String, method: String },
    #[error("failed to compile `{owner}.{method}`: {message}")]
    Compile {
        owner: String,
        method: String,
        message: String,
    },
    #[error("`{owner}.{method}` failed: {message}")]
    Run {
        owner: String,
        method: String,
        message: String,
    },
    #[error("sandbox I/O error at `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Compiles and runs process members against a composition target.
pub trait ExecutionSandbox {
    fn compile(
        &mut self,
        owner: &str,
        method: &MemberDecl,
        content_hash: &str,
    ) -> Result<CompiledArtifact, SandboxError>;

    fn run(
        &mut self,
        artifact: &CompiledArtifact,
        target: &TypeDecl,
    ) -> Result<ExecutionOutput, SandboxError>;
}

/// Compiled artifacts keyed by `(owner, method)`.
///
/// An entry is reused only while the method's content hash is unchanged;
/// a stale entry is evicted and recompiled.
#[derive(Debug, Default)]
pub struct ExecutionCache {
    entries: HashMap<(String, String), CompiledArtifact>,
}

impl ExecutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `method` of `owner` on `target`, compiling only when needed.
    pub fn execute(
        &mut self,
        sandbox: &mut dyn ExecutionSandbox,
        owner: &str,
        method: &MemberDecl,
        target: &TypeDecl,
    ) -> Result<ExecutionOutput, SandboxError> {
        let hash = content_hash(&method.text);
        let key = (owner.to_string(), method.name().to_string());
        let fresh = self
            .entries
            .get(&key)
            .is_some_and(|cached| cached.content_hash == hash);
        if !fresh {
            self.entries.remove(&key);
            tracing::debug!(target: "graft::exec", owner, method = method.name(), "compiling process member");
            let artifact = sandbox.compile(owner, method, &hash)?;
            self.entries.insert(key.clone(), artifact);
        }
        match self.entries.get(&key) {
            Some(artifact) => sandbox.run(artifact, target),
            None => Err(SandboxError::Compile {
                owner: owner.to_string(),
                method: method.name().to_string(),
                message: "artifact missing after compilation".to_string(),
            }),
        }
    }
}

/// Lowercase hex SHA-256 of `source`.
pub fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
