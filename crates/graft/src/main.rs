use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use graft::{
    Config, LogFormat, LogLevel, LogOptions, PassOutput, build_session, emit_diagnostics,
    init_logging, run_pass, write_units,
};
use graft_compose::CancellationToken;
use graft_decl::Manifest;
use graft_diag::{Category, has_errors};

#[derive(Debug, Parser)]
#[command(name = "graft", version, about = "Compose trait declarations into partial targets")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Log format (auto, text, json)
    #[arg(long, global = true, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a generation pass over a declaration manifest
    Compose {
        manifest: PathBuf,
        /// Config file; defaults to `graft.toml` beside the manifest
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory; overrides `output_dir`
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Report diagnostics without writing units
        #[arg(long)]
        check: bool,
        /// Print per-member resolution traces as JSON on stdout
        #[arg(long)]
        trace: bool,
    },
    /// Describe a diagnostic code
    Explain { code: String },
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| format!("unknown log level `{value}`"))
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format `{value}`"))
}

fn main() {
    if let Err(message) = run() {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let log_options = LogOptions::from_env().with_overrides(cli.log_format, cli.log_level);

    match cli.command {
        Command::Compose {
            manifest,
            config,
            output,
            check,
            trace,
        } => {
            let config = Config::discover(config.as_deref(), &manifest).map_err(|err| err.to_string())?;
            init_logging(log_options, config.log_file.as_deref())
                .map_err(|err| format!("failed to initialise logging: {err}"))?;

            let root = manifest_root(&manifest);
            let result = compose_manifest(&manifest, &config, &root, trace)?;
            emit_diagnostics(&result.diagnostics);

            if trace {
                let json = serde_json::to_string_pretty(&result.traces)
                    .map_err(|err| format!("failed to serialise traces: {err}"))?;
                println!("{json}");
            }
            if !check {
                let dir = output.unwrap_or_else(|| root.join(&config.output_dir));
                write_units(&result.units, &dir).map_err(|err| err.to_string())?;
                if !trace {
                    println!("wrote {} unit(s) to `{}`", result.units.len(), dir.display());
                }
            }

            let errors = result.diagnostics.iter().filter(|d| d.is_error()).count();
            if has_errors(&result.diagnostics) {
                return Err(format!("generation reported {errors} error(s)"));
            }
            Ok(())
        }
        Command::Explain { code } => {
            println!("{}", explain(&code)?);
            Ok(())
        }
    }
}

fn manifest_root(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn compose_manifest(
    manifest: &Path,
    config: &Config,
    root: &Path,
    trace: bool,
) -> Result<PassOutput, String> {
    let index = match Manifest::load(manifest).and_then(Manifest::into_index) {
        Ok(index) => index,
        Err(graft_decl::ManifestError::Index(err)) => {
            emit_diagnostics(err.diagnostics());
            return Err(format!("invalid manifest `{}`", manifest.display()));
        }
        Err(err) => return Err(err.to_string()),
    };
    tracing::info!(
        target: "graft::pipeline",
        manifest = %manifest.display(),
        types = index.len(),
        "loaded declarations"
    );

    let mut session = build_session(config, root);
    run_pass(&index, config, &mut session, CancellationToken::new(), trace)
        .map_err(|err| err.to_string())
}

fn explain(code: &str) -> Result<String, String> {
    let category =
        Category::from_code(code).ok_or_else(|| format!("unknown diagnostic code `{code}`"))?;
    Ok(format!(
        "{} ({})\n\n{}\n\nFix: {}",
        category.code(),
        category.as_str(),
        category.description(),
        category.example_fix()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_compose_with_flags() {
        let cli = Cli::try_parse_from([
            "graft",
            "compose",
            "decls.json",
            "-o",
            "out",
            "--trace",
            "--log-level",
            "debug",
        ])
        .expect("cli parse should succeed");
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Command::Compose {
                manifest,
                output,
                check,
                trace,
                config,
            } => {
                assert_eq!(manifest, PathBuf::from("decls.json"));
                assert_eq!(output, Some(PathBuf::from("out")));
                assert!(trace);
                assert!(!check);
                assert_eq!(config, None);
            }
            other => panic!("expected compose, got {other:?}"),
        }
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = Cli::try_parse_from(["graft", "explain", "GR0001", "--log-level", "loud"])
            .expect_err("invalid level");
        assert!(err.to_string().contains("unknown log level `loud`"));
    }

    #[test]
    fn explain_known_and_unknown_codes() {
        let text = explain("gr0004").expect("known code");
        assert!(text.starts_with("GR0004 (unresolved_collision)\n\n"));
        assert!(text.contains("\n\nFix: "));
        assert_eq!(
            explain("GR9999").expect_err("unknown code"),
            "unknown diagnostic code `GR9999`"
        );
    }

    #[test]
    fn manifest_root_defaults_to_current_dir() {
        assert_eq!(manifest_root(Path::new("decls.json")), PathBuf::from("."));
        assert_eq!(
            manifest_root(Path::new("project/decls.json")),
            PathBuf::from("project")
        );
    }

    #[test]
    fn compose_manifest_reports_unreadable_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        let err = compose_manifest(&missing, &Config::default(), dir.path(), false)
            .expect_err("missing manifest");
        assert!(err.starts_with("failed to read manifest"));
    }

    #[test]
    fn compose_manifest_without_candidates_yields_common_unit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("decls.json");
        std::fs::write(&path, r#"{"types":[{"name":"Plain","namespace":"Demo"}]}"#)
            .expect("write manifest");
        let output =
            compose_manifest(&path, &Config::default(), dir.path(), false).expect("composes");
        assert_eq!(output.units.len(), 1);
        assert_eq!(output.units[0].name, "GraftGenerator.Common.cs");
        assert_eq!(output.units[0].render(), "// no composition candidates\n");
        assert!(output.diagnostics.is_empty());
    }
}
