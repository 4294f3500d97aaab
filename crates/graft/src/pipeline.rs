use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use graft_compose::templates::expand_global_templates;
use graft_compose::{
    CancellationToken, MergeTrace, PassContext, PassError, PassOptions, Session, SourceFragment,
    compose_target,
};
use graft_decl::{DeclarationProvider, TypeDecl};
use graft_diag::{Category, Diagnostic};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Pass(#[from] PassError),
    #[error("no free unit name for `{stem}` after {max} attempts")]
    UnitNames { stem: String, max: u32 },
    #[error("failed to write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One generated output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    /// File name, extension included.
    pub name: String,
    pub fragment: SourceFragment,
}

impl GeneratedUnit {
    pub fn render(&self) -> String {
        self.fragment.render()
    }
}

#[derive(Debug, Default)]
pub struct PassOutput {
    pub units: Vec<GeneratedUnit>,
    /// Every diagnostic of every unit, in unit order.
    pub diagnostics: Vec<Diagnostic>,
    pub traces: Vec<MergeTrace>,
    /// A collaborator failed and the pass stopped early.
    pub aborted: bool,
}

/// Allocates unique `<prefix>.<stem>.<ext>` unit names for one pass.
#[derive(Debug)]
pub struct UnitNames {
    prefix: String,
    extension: String,
    max_suffix: u32,
    taken: HashSet<String>,
}

impl UnitNames {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>, max_suffix: u32) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
            max_suffix,
            taken: HashSet::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.unit_prefix, &config.unit_extension, config.max_unit_suffix)
    }

    /// Claim a name for `stem`, adding `.1`, `.2`, ... on collision.
    ///
    /// Names are compared case-insensitively.
    pub fn claim(&mut self, stem: &str, extension: Option<&str>) -> Result<String, PipelineError> {
        let extension = extension.unwrap_or(&self.extension).to_string();
        let base = format!("{}.{stem}", self.prefix);
        let candidates = std::iter::once(format!("{base}.{extension}"))
            .chain((1..=self.max_suffix).map(|n| format!("{base}.{n}.{extension}")));
        for candidate in candidates {
            if self.taken.insert(candidate.to_lowercase()) {
                return Ok(candidate);
            }
        }
        Err(PipelineError::UnitNames {
            stem: stem.to_string(),
            max: self.max_suffix,
        })
    }
}

/// Run one generation pass over every declaration `provider` holds.
///
/// Collaborator failures end the pass early with an `Exceptions` unit
/// describing the failure. Cancellation is the only error returned.
pub fn run_pass(
    provider: &dyn DeclarationProvider,
    config: &Config,
    session: &mut Session,
    cancel: CancellationToken,
    trace: bool,
) -> Result<PassOutput, PassError> {
    let options = PassOptions {
        ignored_imports: config.ignored_imports.clone(),
        trace,
    };
    let mut pass = PassContext::new(options, cancel);
    let mut names = UnitNames::from_config(config);
    let mut output = PassOutput::default();

    match generate(provider, &mut pass, session, &mut names, &mut output.units) {
        Ok(()) => {}
        Err(PipelineError::Pass(PassError::Cancelled)) => {
            tracing::warn!(target: "graft::pipeline", "generation pass cancelled");
            return Err(PassError::Cancelled);
        }
        Err(err) => {
            tracing::error!(target: "graft::pipeline", error = %err, "generation pass aborted");
            let name = names
                .claim("Exceptions", None)
                .unwrap_or_else(|_| format!("{}.Exceptions.{}", config.unit_prefix, config.unit_extension));
            output.units.push(GeneratedUnit {
                name,
                fragment: exceptions_fragment(&err),
            });
            output.aborted = true;
        }
    }

    output.diagnostics = output
        .units
        .iter()
        .flat_map(|unit| unit.fragment.diagnostics().iter().cloned())
        .collect();
    output.traces = pass.take_traces();
    tracing::info!(
        target: "graft::pipeline",
        units = output.units.len(),
        diagnostics = output.diagnostics.len(),
        traits = pass.registry.len(),
        "generation pass finished"
    );
    Ok(output)
}

fn generate(
    provider: &dyn DeclarationProvider,
    pass: &mut PassContext,
    session: &mut Session,
    names: &mut UnitNames,
    units: &mut Vec<GeneratedUnit>,
) -> Result<(), PipelineError> {
    let mut emit = |stem: &str, extension: Option<&str>, fragment: SourceFragment| {
        let name = names.claim(stem, extension)?;
        tracing::debug!(target: "graft::pipeline", unit = %name, "emitting unit");
        units.push(GeneratedUnit { name, fragment });
        Ok::<(), PipelineError>(())
    };

    for decl in provider.declarations().filter(|decl| decl.is_trait()) {
        pass.checkpoint()?;
        let fragment = pass.registry.register(decl, provider);
        if !fragment.is_empty() {
            emit(&decl.file_stem(), None, fragment)?;
        }
    }

    let targets: Vec<&TypeDecl> = provider
        .declarations()
        .filter(|decl| !decl.is_trait() && !decl.requests().is_empty())
        .collect();
    if targets.is_empty() {
        let mut fragment = SourceFragment::new();
        fragment.push_line("// no composition candidates");
        emit("Common", None, fragment)?;
    }
    for target in targets {
        let output = compose_target(target, provider, pass, session)?;
        if !output.fragment.is_empty() {
            emit(&target.file_stem(), None, output.fragment)?;
        }
        for unit in output.global_units {
            emit(&unit.name, unit.extension.as_deref(), unit.fragment)?;
        }
    }

    for unit in expand_global_templates(provider, pass, session)? {
        emit(&unit.name, unit.extension.as_deref(), unit.fragment)?;
    }
    Ok(())
}

/// A unit describing why the pass stopped: one error directive, then the
/// error and each of its causes as comments.
fn exceptions_fragment(err: &PipelineError) -> SourceFragment {
    let mut fragment = SourceFragment::from_diagnostic(Diagnostic::error(
        Category::CollaboratorReport,
        format!("generation aborted: {err}"),
    ));
    let mut cause: Option<&dyn std::error::Error> = Some(err);
    while let Some(current) = cause {
        for line in current.to_string().lines() {
            fragment.push_line(&format!("// {line}"));
        }
        cause = current.source();
    }
    fragment
}

/// Write every unit into `dir`, creating it when needed.
pub fn write_units(units: &[GeneratedUnit], dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    for unit in units {
        let path = dir.join(&unit.name);
        fs::write(&path, unit.render()).map_err(|source| PipelineError::Write { path, source })?;
    }
    Ok(())
}
