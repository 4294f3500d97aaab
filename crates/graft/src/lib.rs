//! Generation pipeline around `graft-compose`: configuration, logging,
//! template and sandbox collaborators, and unit output.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod sandbox;
pub mod templates;

use std::path::Path;

use graft_compose::Session;
use graft_diag::Diagnostic;

pub use config::{CONFIG_FILE_NAME, Config, ConfigError};
pub use logging::{LogFormat, LogLevel, LogOptions, init_logging};
pub use pipeline::{GeneratedUnit, PassOutput, PipelineError, UnitNames, run_pass, write_units};
pub use sandbox::CommandSandbox;
pub use templates::{DirTemplateExpander, Template};

/// Build a session whose templates and sandbox paths are anchored at
/// `root`, normally the manifest's directory.
pub fn build_session(config: &Config, root: &Path) -> Session {
    let templates = DirTemplateExpander::new(
        root,
        config.templates_dir.clone(),
        config.template_extension.clone(),
    );
    let session = Session::new().with_templates(Box::new(templates));
    if !config.sandbox_enabled() {
        return session;
    }
    let work_dir = root.join(&config.sandbox.work_dir);
    match CommandSandbox::new(config.sandbox.command.clone(), work_dir) {
        Some(sandbox) => session.with_sandbox(Box::new(sandbox)),
        None => {
            tracing::warn!(target: "graft::exec", "sandbox command has no program; process members are unavailable");
            session
        }
    }
}

pub fn emit_diagnostics(diags: &[Diagnostic]) {
    for diag in diags {
        eprintln!("{diag}");
    }
}
