//! Trait composition engine for graft.
//!
//! This crate takes trait declarations and the types that request them and
//! produces augmentation fragments: generated source that, compiled next to
//! the original declarations, gives each target the trait's members.
//!
//! The pieces, leaf first:
//! - [`signature`]: canonical member signatures and comparisons
//! - [`resolve`]: per-member conflict resolution
//! - [`strict`]: strict-mode contract checks
//! - [`proxy`]: diamond proxy layers for interface bases
//! - [`registry`]: per-pass record of validated traits
//! - [`merge`]: the driver that assembles one target's augmentation
//! - [`templates`]: local and global template expansion
//!
//! State is split in two. [`PassContext`] lives for one generation pass and
//! is dropped with it; [`Session`] holds the collaborators and the
//! compiled-artifact cache, which survive across passes.

pub mod fragment;
pub mod hooks;
pub mod merge;
pub mod proxy;
pub mod registry;
pub mod resolve;
pub mod signature;
pub mod strict;
pub mod templates;
pub mod trace;

#[cfg(test)]
mod prop_tests;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graft_decl::{MemberDecl, TemplateRequest, TypeDecl};

pub use fragment::SourceFragment;
pub use hooks::{
    CompiledArtifact, ExecutionCache, ExecutionOutput, ExecutionSandbox, NoTemplates,
    SandboxError, TemplateContext, TemplateError, TemplateExpander, TemplateOutput,
};
pub use merge::{GlobalUnit, TargetOutput, compose_target, merge_trait_into_target};
pub use registry::{TraitEntry, TraitRegistry, TraitStatus};
pub use signature::{MemberSignature, collides, extract_signature, identical, member_signatures};
pub use trace::{MergeOutcome, MergeTrace, ResolutionStep};

// ---------------------------------------------------------------------------
// Errors and cancellation
// ---------------------------------------------------------------------------

/// Failures that abort a pass. Composition problems are diagnostics, not
/// errors; only cancellation and collaborator failures end up here.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("generation pass was cancelled")]
    Cancelled,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Shared cancellation flag, polled between targets and between members.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), PassError> {
        if self.is_cancelled() {
            Err(PassError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Pass-scoped state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    /// Imports never copied into augmentations (the marker namespace).
    pub ignored_imports: Vec<String>,
    /// Record a [`MergeTrace`] for every merge.
    pub trace: bool,
}

/// State owned by a single generation pass.
#[derive(Debug, Default)]
pub struct PassContext {
    pub options: PassOptions,
    pub registry: TraitRegistry,
    expanded_templates: HashSet<String>,
    cancel: CancellationToken,
    traces: Vec<MergeTrace>,
}

impl PassContext {
    pub fn new(options: PassOptions, cancel: CancellationToken) -> Self {
        Self {
            options,
            registry: TraitRegistry::new(),
            expanded_templates: HashSet::new(),
            cancel,
            traces: Vec::new(),
        }
    }

    /// Fail with [`PassError::Cancelled`] once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), PassError> {
        self.cancel.check()
    }

    /// `true` the first time `key` is seen in this pass (case-insensitive).
    pub fn first_expansion(&mut self, key: &str) -> bool {
        self.expanded_templates.insert(key.to_lowercase())
    }

    pub fn is_ignored_import(&self, import: &str) -> bool {
        let import = import.trim();
        self.options.ignored_imports.iter().any(|ignored| ignored == import)
    }

    pub fn record_trace(&mut self, trace: MergeTrace) {
        self.traces.push(trace);
    }

    pub fn traces(&self) -> &[MergeTrace] {
        &self.traces
    }

    pub fn take_traces(&mut self) -> Vec<MergeTrace> {
        std::mem::take(&mut self.traces)
    }
}

// ---------------------------------------------------------------------------
// Process-lifetime state
// ---------------------------------------------------------------------------

/// Collaborators and caches that outlive a single pass.
pub struct Session {
    templates: Box<dyn TemplateExpander>,
    sandbox: Option<Box<dyn ExecutionSandbox>>,
    executions: ExecutionCache,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session without templates or sandbox; requests for either fail.
    pub fn new() -> Self {
        Self {
            templates: Box::new(NoTemplates),
            sandbox: None,
            executions: ExecutionCache::new(),
        }
    }

    pub fn with_templates(mut self, templates: Box<dyn TemplateExpander>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_sandbox(mut self, sandbox: Box<dyn ExecutionSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn expand_template(
        &mut self,
        request: &TemplateRequest,
        context: &TemplateContext,
    ) -> Result<TemplateOutput, TemplateError> {
        self.templates.expand(request, context)
    }

    /// Run a process member through the sandbox, reusing compiled artifacts.
    pub fn execute(
        &mut self,
        owner: &str,
        method: &MemberDecl,
        target: &TypeDecl,
    ) -> Result<ExecutionOutput, SandboxError> {
        let Some(sandbox) = self.sandbox.as_deref_mut() else {
            return Err(SandboxError::Unavailable {
                owner: owner.to_string(),
                method: method.name().to_string(),
            });
        };
        self.executions.execute(sandbox, owner, method, target)
    }

    pub fn cached_executions(&self) -> usize {
        self.executions.len()
    }
}
