//! Thin wrappers over the repository tooling: pre-commit and the container stack.

use std::path::PathBuf;

use tracing::info;

use crate::{
    application::{
        build::{BuildOptions, BuildReport, SiteBuilder},
        error::AppError,
    },
    config::{DockerSettings, LintSettings},
    infra::process::ExternalCommand,
};

#[derive(Debug, Clone)]
pub struct Tooling {
    root: PathBuf,
    lint: LintSettings,
    docker: DockerSettings,
}

impl Tooling {
    pub fn new(root: impl Into<PathBuf>, lint: LintSettings, docker: DockerSettings) -> Self {
        Self {
            root: root.into(),
            lint,
            docker,
        }
    }

    pub fn lint_command(&self) -> ExternalCommand {
        ExternalCommand::new(&self.lint.binary)
            .current_dir(&self.root)
            .args(["run", "--all-files"])
    }

    pub fn docker_build_command(&self) -> ExternalCommand {
        ExternalCommand::new(&self.docker.binary)
            .current_dir(&self.root)
            .arg("build")
            .arg("-t")
            .arg(&self.docker.image)
            .arg("-f")
            .arg(&self.docker.dockerfile)
            .arg(".")
    }

    pub fn docker_up_command(&self) -> ExternalCommand {
        ExternalCommand::new(&self.docker.binary)
            .current_dir(&self.root)
            .arg("compose")
            .arg("-f")
            .arg(&self.docker.compose_file)
            .args(["up", "-d", "--build"])
    }

    pub fn lint(&self) -> Result<(), AppError> {
        self.lint_command().status()?;
        Ok(())
    }

    /// Render a production build, then package it with the Dockerfile.
    pub fn docker_build(
        &self,
        builder: &SiteBuilder,
        options: &BuildOptions,
    ) -> Result<BuildReport, AppError> {
        let report = builder.build(options)?;
        self.docker_build_command().status()?;
        info!(
            target = "application::tooling",
            op = "tooling::docker_build",
            result = "ok",
            image = %self.docker.image,
            digest = %report.digest(),
            "Container image built"
        );
        Ok(report)
    }

    pub fn docker_up(&self) -> Result<(), AppError> {
        self.docker_up_command().status()?;
        info!(
            target = "application::tooling",
            op = "tooling::docker_up",
            result = "ok",
            compose_file = %self.docker.compose_file.display(),
            "Container stack started"
        );
        Ok(())
    }
}
