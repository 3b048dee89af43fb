//! Argument plumbing for the Hugo binary.

use std::path::{Path, PathBuf};

use super::process::{CapturedOutput, ExternalCommand, ProcessError};

/// Flags for a one-shot `hugo` build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HugoBuild {
    pub destination: PathBuf,
    pub minify: bool,
    pub build_drafts: bool,
    pub base_url: Option<String>,
    pub environment: Option<String>,
}

/// Flags for `hugo server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HugoServe {
    pub host: String,
    pub port: u16,
    pub build_drafts: bool,
    pub debug: bool,
    pub live_reload: bool,
}

#[derive(Debug, Clone)]
pub struct HugoCli {
    binary: PathBuf,
    source: PathBuf,
}

impl HugoCli {
    pub fn new(binary: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn build_command(&self, request: &HugoBuild) -> ExternalCommand {
        let mut command = ExternalCommand::new(&self.binary)
            .current_dir(&self.source)
            .arg("--source")
            .arg(&self.source)
            .arg("--destination")
            .arg(&request.destination)
            .arg("--cleanDestinationDir");

        if request.minify {
            command = command.arg("--minify");
        }
        if request.build_drafts {
            command = command.arg("--buildDrafts");
        }
        if let Some(base_url) = &request.base_url {
            command = command.arg("--baseURL").arg(base_url);
        }
        if let Some(environment) = &request.environment {
            command = command.arg("--environment").arg(environment);
        }
        command
    }

    pub fn server_command(&self, request: &HugoServe) -> ExternalCommand {
        let mut command = ExternalCommand::new(&self.binary)
            .current_dir(&self.source)
            .arg("server")
            .arg("--source")
            .arg(&self.source)
            .arg("--bind")
            .arg(&request.host)
            .arg("--port")
            .arg(request.port.to_string());

        if request.build_drafts {
            command = command.arg("--buildDrafts");
        }
        if request.debug {
            command = command.args(["--logLevel", "debug"]);
        }
        if !request.live_reload {
            command = command.arg("--disableLiveReload");
        }
        command
    }

    /// `hugo new content`, with `path` relative to the content directory.
    pub fn new_content_command(&self, path: &Path, force: bool) -> ExternalCommand {
        let mut command = ExternalCommand::new(&self.binary)
            .current_dir(&self.source)
            .args(["new", "content"])
            .arg(path)
            .arg("--source")
            .arg(&self.source);
        if force {
            command = command.arg("--force");
        }
        command
    }

    pub fn build(&self, request: &HugoBuild) -> Result<CapturedOutput, ProcessError> {
        self.build_command(request).capture()
    }

    pub fn new_content(&self, path: &Path, force: bool) -> Result<CapturedOutput, ProcessError> {
        self.new_content_command(path, force).capture()
    }

    /// Blocks until the server exits.
    pub fn serve(&self, request: &HugoServe) -> Result<(), ProcessError> {
        self.server_command(request).status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_request() -> HugoBuild {
        HugoBuild {
            destination: PathBuf::from("/site/public"),
            minify: true,
            build_drafts: false,
            base_url: None,
            environment: None,
        }
    }

    #[test]
    fn production_build_minifies_without_drafts() {
        let hugo = HugoCli::new("hugo", "/site");
        let command = hugo.build_command(&build_request());
        let args = command.display_args();

        assert_eq!(command.program(), Path::new("hugo"));
        assert!(args.contains("--destination /site/public"), "{args}");
        assert!(args.contains("--minify"), "{args}");
        assert!(!args.contains("--buildDrafts"), "{args}");
    }

    #[test]
    fn draft_build_passes_build_drafts() {
        let hugo = HugoCli::new("hugo", "/site");
        let request = HugoBuild {
            build_drafts: true,
            minify: false,
            base_url: Some("https://preview.example.com/".into()),
            environment: Some("staging".into()),
            ..build_request()
        };
        let args = hugo.build_command(&request).display_args();

        assert!(args.contains("--buildDrafts"), "{args}");
        assert!(!args.contains("--minify"), "{args}");
        assert!(
            args.contains("--baseURL https://preview.example.com/"),
            "{args}"
        );
        assert!(args.contains("--environment staging"), "{args}");
    }

    #[test]
    fn new_content_uses_the_content_subcommand() {
        let hugo = HugoCli::new("hugo", "/site");
        let args = hugo
            .new_content_command(Path::new("posts/first-steps.md"), false)
            .display_args();
        assert_eq!(args, "new content posts/first-steps.md --source /site");

        let forced = hugo
            .new_content_command(Path::new("posts/first-steps.md"), true)
            .display_args();
        assert!(forced.ends_with(" --force"), "{forced}");
    }

    #[test]
    fn server_flags_follow_request() {
        let hugo = HugoCli::new("hugo", "/site");
        let request = HugoServe {
            host: "0.0.0.0".into(),
            port: 1414,
            build_drafts: true,
            debug: true,
            live_reload: false,
        };
        let args = hugo.server_command(&request).display_args();

        assert!(args.starts_with("server "), "{args}");
        assert!(args.contains("--bind 0.0.0.0"), "{args}");
        assert!(args.contains("--port 1414"), "{args}");
        assert!(args.contains("--buildDrafts"), "{args}");
        assert!(args.contains("--logLevel debug"), "{args}");
        assert!(args.contains("--disableLiveReload"), "{args}");
    }
}
