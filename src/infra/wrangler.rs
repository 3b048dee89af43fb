//! Upload of the rendered site through `wrangler pages deploy`.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    application::publish::{DeployReceipt, DeployUpload, Deployer},
    infra::{
        cloudflare::{ACCOUNT_ID_ENV, API_TOKEN_ENV, CloudflareCredentials},
        error::InfraError,
        process::{ExternalCommand, ProcessError},
    },
};

const AUTH_FAILURE_MARKERS: [&str; 2] = ["Authentication error", "code: 10000"];

#[derive(Debug, Clone)]
pub struct WranglerDeployer {
    binary: PathBuf,
    root: PathBuf,
    credentials: CloudflareCredentials,
}

impl WranglerDeployer {
    pub fn new(
        binary: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        credentials: CloudflareCredentials,
    ) -> Self {
        Self {
            binary: binary.into(),
            root: root.into(),
            credentials,
        }
    }

    pub fn deploy_command(&self, upload: &DeployUpload) -> ExternalCommand {
        ExternalCommand::new(&self.binary)
            .current_dir(&self.root)
            .args(["pages", "deploy"])
            .arg(&upload.directory)
            .arg("--project-name")
            .arg(&upload.project_name)
            .arg("--branch")
            .arg(&upload.branch)
            .arg("--commit-hash")
            .arg(&upload.commit_sha)
            .env(API_TOKEN_ENV, &self.credentials.api_token)
            .env(ACCOUNT_ID_ENV, &self.credentials.account_id)
    }
}

#[async_trait]
impl Deployer for WranglerDeployer {
    async fn deploy(&self, upload: &DeployUpload) -> Result<DeployReceipt, InfraError> {
        let command = self.deploy_command(upload);
        let output = tokio::task::spawn_blocking(move || command.capture())
            .await
            .map_err(|err| InfraError::transport(format!("deploy task aborted: {err}")))?
            .map_err(classify_failure)?;

        Ok(DeployReceipt {
            url: extract_deployment_url(&output.stdout),
        })
    }
}

fn classify_failure(error: ProcessError) -> InfraError {
    match error {
        ProcessError::Failed { stderr, .. }
            if AUTH_FAILURE_MARKERS
                .iter()
                .any(|marker| stderr.contains(marker)) =>
        {
            InfraError::credential(format!("wrangler rejected the credentials: {stderr}"))
        }
        ProcessError::Failed {
            exit_code, stderr, ..
        } => InfraError::transport(format!(
            "wrangler pages deploy failed (exit {exit_code:?}): {stderr}"
        )),
        other => InfraError::Process(other),
    }
}

/// Wrangler prints the preview URL of the new deployment on success.
fn extract_deployment_url(stdout: &str) -> Option<String> {
    stdout
        .split_whitespace()
        .find(|token| token.starts_with("https://"))
        .map(|token| {
            token
                .trim_end_matches(|c: char| !c.is_ascii_alphanumeric() && c != '/')
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> DeployUpload {
        DeployUpload {
            directory: PathBuf::from("/site/public"),
            project_name: "blog".into(),
            branch: "main".into(),
            commit_sha: "abc123".into(),
        }
    }

    fn deployer() -> WranglerDeployer {
        WranglerDeployer::new(
            "wrangler",
            "/site",
            CloudflareCredentials {
                api_token: "tok".into(),
                account_id: "acct".into(),
            },
        )
    }

    #[test]
    fn deploy_command_targets_project_and_commit() {
        let args = deployer().deploy_command(&upload()).display_args();
        assert_eq!(
            args,
            "pages deploy /site/public --project-name blog --branch main --commit-hash abc123"
        );
    }

    #[test]
    fn extracts_url_from_wrangler_output() {
        let stdout = "✨ Success! Uploaded 12 files\n✨ Deployment complete! Take a peek over at https://1a2b3c.blog.pages.dev.\n";
        assert_eq!(
            extract_deployment_url(stdout).as_deref(),
            Some("https://1a2b3c.blog.pages.dev")
        );
        assert_eq!(extract_deployment_url("no url here"), None);
    }

    #[test]
    fn authentication_failures_are_credential_errors() {
        let err = classify_failure(ProcessError::Failed {
            program: "wrangler".into(),
            exit_code: Some(1),
            stderr: "✘ [ERROR] Authentication error [code: 10000]".into(),
        });
        assert!(matches!(err, InfraError::Credential { .. }));

        let err = classify_failure(ProcessError::Failed {
            program: "wrangler".into(),
            exit_code: Some(1),
            stderr: "fetch failed".into(),
        });
        assert!(matches!(err, InfraError::Transport { .. }));
    }
}
