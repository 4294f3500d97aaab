//! Execution sandbox backed by an external command.
//!
//! "Compiling" a process member writes its source into the work directory
//! under a content-addressed name. Running it spawns the configured
//! command with two extra arguments, the source path and the method name,
//! and writes the target declaration as JSON to its stdin. Stdout becomes
//! the generated text; each non-empty stderr line becomes a warning.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use graft_compose::{CompiledArtifact, ExecutionOutput, ExecutionSandbox, SandboxError};
use graft_decl::{MemberDecl, TypeDecl};
use graft_diag::{Category, Diagnostic};

#[derive(Debug, Clone)]
pub struct CommandSandbox {
    command: Vec<String>,
    work_dir: PathBuf,
}

impl CommandSandbox {
    /// `command` must name at least a program.
    pub fn new(command: Vec<String>, work_dir: impl Into<PathBuf>) -> Option<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return None;
        }
        Some(Self {
            command,
            work_dir: work_dir.into(),
        })
    }
}

fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> SandboxError {
    move |source| SandboxError::Io { path, source }
}

impl ExecutionSandbox for CommandSandbox {
    fn compile(
        &mut self,
        owner: &str,
        method: &MemberDecl,
        content_hash: &str,
    ) -> Result<CompiledArtifact, SandboxError> {
        fs::create_dir_all(&self.work_dir).map_err(io_error(self.work_dir.clone()))?;
        let short_hash = &content_hash[..content_hash.len().min(16)];
        let path = self
            .work_dir
            .join(format!("{owner}.{}.{short_hash}.src", method.name()));
        fs::write(&path, method.render("")).map_err(io_error(path.clone()))?;
        Ok(CompiledArtifact {
            owner: owner.to_string(),
            method: method.name().to_string(),
            content_hash: content_hash.to_string(),
            location: Some(path),
        })
    }

    fn run(
        &mut self,
        artifact: &CompiledArtifact,
        target: &TypeDecl,
    ) -> Result<ExecutionOutput, SandboxError> {
        let run_error = |message: String| SandboxError::Run {
            owner: artifact.owner.clone(),
            method: artifact.method.clone(),
            message,
        };
        let Some((program, args)) = self.command.split_first() else {
            return Err(run_error("no sandbox command configured".to_string()));
        };
        let input = serde_json::to_vec(target).map_err(|err| run_error(err.to_string()))?;

        let mut command = Command::new(program);
        command.args(args);
        if let Some(location) = &artifact.location {
            command.arg(location);
        }
        command
            .arg(&artifact.method)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|err| run_error(format!("failed to start `{program}`: {err}")))?;
        // Input is written while stdout and stderr drain. A child that exits
        // without reading it is not an error.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(&input) {
                Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            })
        });
        let output = child
            .wait_with_output()
            .map_err(|err| run_error(format!("failed to wait for `{program}`: {err}")))?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| run_error("input writer panicked".to_string()))?
                .map_err(|err| run_error(format!("failed to write input: {err}")))?;
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(run_error(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        let diagnostics = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                Diagnostic::warning(
                    Category::CollaboratorReport,
                    format!("{}.{}: {line}", artifact.owner, artifact.method),
                )
            })
            .collect();
        tracing::debug!(
            target: "graft::exec",
            owner = %artifact.owner,
            method = %artifact.method,
            bytes = output.stdout.len(),
            "process member finished"
        );
        Ok(ExecutionOutput {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            diagnostics,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use graft_compose::hooks::content_hash;

    fn describe() -> MemberDecl {
        MemberDecl::method(
            "Describe",
            "string",
            Vec::new(),
            "public static string Describe(TypeDecl target) => target.Name;",
        )
        .with_modifiers(&["public", "static"])
    }

    fn sandbox(script: &str, dir: &std::path::Path) -> CommandSandbox {
        CommandSandbox::new(
            vec!["sh".into(), "-c".into(), script.into(), "sh".into()],
            dir.join("work"),
        )
        .expect("command given")
    }

    #[test]
    fn compile_writes_content_addressed_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sandbox = sandbox("true", dir.path());
        let method = describe();
        let hash = content_hash(&method.text);
        let artifact = sandbox.compile("Demo.NameTrait", &method, &hash).expect("compiles");
        let path = artifact.location.expect("written to disk");
        assert!(path.starts_with(dir.path().join("work")));
        assert_eq!(
            fs::read_to_string(path).expect("read back"),
            "public static string Describe(TypeDecl target) => target.Name;\n"
        );
    }

    #[test]
    fn run_passes_method_and_target_and_collects_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = r#"input=$(cat); echo "// $2 saw ${#input} bytes"; echo "careful" >&2"#;
        let mut sandbox = sandbox(script, dir.path());
        let method = describe();
        let artifact = sandbox
            .compile("Demo.NameTrait", &method, &content_hash(&method.text))
            .expect("compiles");
        let output = sandbox
            .run(&artifact, &TypeDecl::class("Person"))
            .expect("runs");
        assert!(output.text.starts_with("// Describe saw "));
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(
            output.diagnostics[0].message,
            "Demo.NameTrait.Describe: careful"
        );
    }

    #[test]
    fn failing_command_is_a_run_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sandbox = sandbox("cat >/dev/null; echo nope >&2; exit 3", dir.path());
        let method = describe();
        let artifact = sandbox
            .compile("Demo.NameTrait", &method, &content_hash(&method.text))
            .expect("compiles");
        let err = sandbox
            .run(&artifact, &TypeDecl::class("Person"))
            .expect_err("non-zero exit");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn command_ignoring_large_input_still_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sandbox = sandbox("echo '// ok'", dir.path());
        let method = describe();
        let artifact = sandbox
            .compile("Demo.NameTrait", &method, &content_hash(&method.text))
            .expect("compiles");
        let bulky = TypeDecl::class("Person").with_member(MemberDecl::method(
            "Bulk",
            "string",
            Vec::new(),
            "x".repeat(1 << 20),
        ));
        let output = sandbox.run(&artifact, &bulky).expect("unread input is not an error");
        assert_eq!(output.text, "// ok\n");
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn large_output_before_reading_input_does_not_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = "head -c 262144 /dev/zero | tr '\\0' 'a'; cat >/dev/null";
        let mut sandbox = sandbox(script, dir.path());
        let method = describe();
        let artifact = sandbox
            .compile("Demo.NameTrait", &method, &content_hash(&method.text))
            .expect("compiles");
        let bulky = TypeDecl::class("Person").with_member(MemberDecl::method(
            "Bulk",
            "string",
            Vec::new(),
            "x".repeat(1 << 20),
        ));
        let output = sandbox.run(&artifact, &bulky).expect("runs");
        assert_eq!(output.text.len(), 262_144);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandSandbox::new(Vec::new(), "work").is_none());
        assert!(CommandSandbox::new(vec![" ".into()], "work").is_none());
    }
}
