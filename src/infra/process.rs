//! Thin wrapper around `std::process::Command` for the external tools the
//! pipeline drives (Hugo, git, wrangler, docker, pre-commit).

use std::{
    ffi::{OsStr, OsString},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{program}` is not installed or not on PATH: {source}")]
    NotFound { program: String, source: io::Error },
    #[error("failed to launch `{program}`: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("`{program}` failed (exit {exit_code:?}): {stderr}")]
    Failed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl ProcessError {
    /// Exit status reported by the child, when it ran and exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Output captured from a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments rendered lossily, for logs and assertions.
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }

    fn spawn_error(&self, err: io::Error) -> ProcessError {
        let program = self.program_name();
        if err.kind() == ErrorKind::NotFound {
            ProcessError::NotFound {
                program,
                source: err,
            }
        } else {
            ProcessError::Spawn {
                program,
                source: err,
            }
        }
    }

    /// Run to completion with stdout and stderr piped back to the caller.
    pub fn capture(&self) -> Result<CapturedOutput, ProcessError> {
        let started_at = Instant::now();
        let output = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                warn!(
                    target = "infra::process",
                    op = "process::capture",
                    result = "error",
                    program = %self.program.display(),
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn",
                    error = %err,
                    "Failed to spawn external command"
                );
                self.spawn_error(err)
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let exit_code = output.status.code();
            warn!(
                target = "infra::process",
                op = "process::capture",
                result = "error",
                program = %self.program.display(),
                args = %self.display_args(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                "External command exited unsuccessfully"
            );
            return Err(ProcessError::Failed {
                program: self.program_name(),
                exit_code,
                stderr: stderr.trim_end().to_string(),
            });
        }

        info!(
            target = "infra::process",
            op = "process::capture",
            result = "ok",
            program = %self.program.display(),
            args = %self.display_args(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            stdout_bytes = stdout.len(),
            "External command finished"
        );

        Ok(CapturedOutput { stdout, stderr })
    }

    /// Run in the foreground with the parent's stdio, for interactive tools.
    pub fn status(&self) -> Result<(), ProcessError> {
        let started_at = Instant::now();
        info!(
            target = "infra::process",
            op = "process::status",
            program = %self.program.display(),
            args = %self.display_args(),
            "Starting external command"
        );

        let status = self
            .command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|err| self.spawn_error(err))?;

        if !status.success() {
            let exit_code = status.code();
            warn!(
                target = "infra::process",
                op = "process::status",
                result = "error",
                program = %self.program.display(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                "External command exited unsuccessfully"
            );
            return Err(ProcessError::Failed {
                program: self.program_name(),
                exit_code,
                stderr: String::new(),
            });
        }

        info!(
            target = "infra::process",
            op = "process::status",
            result = "ok",
            program = %self.program.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "External command finished"
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::{fs, os::unix::fs::PermissionsExt, path::Path};

    /// Write `body` as an executable `/bin/sh` script at `path`.
    pub(crate) fn write_script(path: &Path, body: &str) {
        fs::write(path, format!("#!/bin/sh\n{body}")).expect("write script");
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("set perms");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use super::test_support::write_script;

    #[test]
    fn capture_returns_stdout() {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("tool");
        write_script(&script, "echo \"hello $1\"\n");

        let output = ExternalCommand::new(&script)
            .arg("world")
            .capture()
            .expect("command succeeds");
        assert_eq!(output.stdout.trim(), "hello world");
    }

    #[test]
    fn capture_surfaces_exit_code_and_stderr() {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("tool");
        write_script(&script, "echo \"boom\" >&2\nexit 42\n");

        let err = ExternalCommand::new(&script)
            .capture()
            .expect_err("command fails");
        match err {
            ProcessError::Failed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(42));
                assert!(stderr.contains("boom"), "stderr did not propagate: {stderr}");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = ExternalCommand::new("/nonexistent/sitepipe-tool")
            .capture()
            .expect_err("spawn fails");
        assert!(matches!(err, ProcessError::NotFound { .. }));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn env_and_working_directory_reach_the_child() {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("tool");
        write_script(&script, "echo \"$SITEPIPE_PROBE\"\npwd\n");

        let output = ExternalCommand::new(&script)
            .env("SITEPIPE_PROBE", "probe-value")
            .current_dir(dir.path())
            .capture()
            .expect("command succeeds");
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("probe-value"));
        let cwd = lines.next().expect("pwd line");
        let expected = dir.path().canonicalize().expect("canonical");
        assert_eq!(
            Path::new(cwd).canonicalize().expect("canonical cwd"),
            expected
        );
    }

    #[test]
    fn status_reports_exit_code() {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("tool");
        write_script(&script, "exit 3\n");

        let err = ExternalCommand::new(&script)
            .status()
            .expect_err("command fails");
        assert_eq!(err.exit_code(), Some(3));
    }
}
