//! Opt-in traces of merge decisions, serialized for `--trace` output.
//!
//! Nothing is recorded unless the pass was started with tracing enabled.

use serde::Serialize;

/// Every decision taken while merging one trait into one target.
#[derive(Debug, Clone, Serialize)]
pub struct MergeTrace {
    pub target: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub steps: Vec<ResolutionStep>,
}

impl MergeTrace {
    pub fn new(target: impl Into<String>, trait_name: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            trait_name: trait_name.into(),
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, member: impl Into<String>, outcome: MergeOutcome) {
        self.steps.push(ResolutionStep {
            step: self.steps.len(),
            member: member.into(),
            outcome,
        });
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionStep {
    pub step: usize,
    pub member: String,
    pub outcome: MergeOutcome,
}

/// What happened to a trait member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    Included,
    /// Included next to a same-name target method with another signature.
    IncludedOverload,
    /// Identical target member wins; trait member marked overridable.
    Overridden,
    KindMismatch,
    UnresolvedCollision,
    /// Carries the ignore marker.
    Ignored,
    /// Executed in the sandbox instead of being copied.
    Processed,
    InvalidProcess,
    /// Outside the contract of a strict trait.
    StrictRejected,
}
