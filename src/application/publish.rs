//! Publish trigger: check out, build, and deploy one commit, tracking progress
//! through [`PublishState`].

use std::{path::PathBuf, time::Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    application::{
        build::{BuildOptions, BuildReport, SiteBuilder},
        error::AppError,
    },
    domain::{
        deployment::{DeploymentRecord, ProviderDeployment, PublishState, TriggerEvent},
        error::DomainError,
    },
    infra::{error::InfraError, git::GitCli},
};

/// A rendered output directory ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployUpload {
    pub directory: PathBuf,
    pub project_name: String,
    pub branch: String,
    pub commit_sha: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReceipt {
    pub url: Option<String>,
}

/// Uploads a rendered site. The provider swaps deployments atomically, so a
/// failed upload leaves the previous deployment live.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, upload: &DeployUpload) -> Result<DeployReceipt, InfraError>;
}

#[async_trait]
pub trait DeploymentApi: Send + Sync {
    async fn verify_credentials(&self) -> Result<(), InfraError>;

    /// The provider's view of the deployment built from `commit_sha`, if any.
    async fn deployment_for_commit(
        &self,
        project_name: &str,
        commit_sha: &str,
    ) -> Result<Option<ProviderDeployment>, InfraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub branch: String,
    pub project_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub event: TriggerEvent,
    pub commit_sha: Option<String>,
    pub skip_checkout: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Skipped { reason: String },
    Deployed(DeploymentRecord),
}

#[derive(Debug, Error)]
#[error("publish ended in state `{state}`: {error}")]
pub struct PublishFailure {
    pub state: PublishState,
    #[source]
    pub error: AppError,
}

impl From<PublishFailure> for AppError {
    fn from(failure: PublishFailure) -> Self {
        failure.error
    }
}

pub struct PublishPipeline<'a> {
    git: GitCli,
    builder: SiteBuilder,
    build_options: BuildOptions,
    api: &'a dyn DeploymentApi,
    deployer: &'a dyn Deployer,
    target: PublishTarget,
}

impl<'a> PublishPipeline<'a> {
    pub fn new(
        git: GitCli,
        builder: SiteBuilder,
        build_options: BuildOptions,
        api: &'a dyn DeploymentApi,
        deployer: &'a dyn Deployer,
        target: PublishTarget,
    ) -> Self {
        Self {
            git,
            builder,
            build_options,
            api,
            deployer,
            target,
        }
    }

    pub async fn run(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishFailure> {
        let started_at = Instant::now();

        if !request.event.targets_branch(&self.target.branch) {
            let reason = format!(
                "event {:?} does not target branch `{}`",
                request.event, self.target.branch
            );
            info!(
                target = "application::publish",
                op = "publish::run",
                result = "skipped",
                state = PublishState::Idle.as_str(),
                reason = %reason,
                "Trigger ignored"
            );
            return Ok(PublishOutcome::Skipped { reason });
        }

        let mut state = PublishState::Idle;

        let commit_sha = self
            .checkout(request)
            .await
            .map_err(|error| failure(&state, error))?;
        state = transition(&state, state.checked_out(&commit_sha))?;

        let report = self.build().await.map_err(|error| failure(&state, error))?;
        state = transition(&state, state.built(report.digest()))?;

        let receipt = self
            .deploy(&commit_sha)
            .await
            .map_err(|error| failure(&state, error))?;
        state = transition(&state, state.deployed(receipt.url.clone()))?;

        let record = self.record(&commit_sha, &report, receipt).await;

        info!(
            target = "application::publish",
            op = "publish::run",
            result = "ok",
            state = state.as_str(),
            commit = %commit_sha,
            project = %self.target.project_name,
            url = record.url.as_deref().unwrap_or("-"),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Site published"
        );
        Ok(PublishOutcome::Deployed(record))
    }

    async fn checkout(&self, request: &PublishRequest) -> Result<String, AppError> {
        let git = self.git.clone();
        let skip_checkout = request.skip_checkout;
        let requested_sha = request
            .commit_sha
            .as_deref()
            .map(str::trim)
            .filter(|sha| !sha.is_empty())
            .map(str::to_string);

        let sha = blocking(move || {
            if !skip_checkout {
                git.update_submodules()?;
            }
            match requested_sha {
                Some(sha) => Ok(sha),
                None => Ok(git.head_commit()?),
            }
        })
        .await?;

        if sha.is_empty() {
            return Err(AppError::unexpected("git reported an empty commit SHA"));
        }

        log_transition("checked-out", &sha);
        Ok(sha)
    }

    async fn build(&self) -> Result<BuildReport, AppError> {
        let builder = self.builder.clone();
        let options = self.build_options.clone();
        let report = blocking(move || builder.build(&options)).await?;
        log_transition("built", &report.digest());
        Ok(report)
    }

    async fn deploy(&self, commit_sha: &str) -> Result<DeployReceipt, AppError> {
        self.api.verify_credentials().await?;

        let upload = DeployUpload {
            directory: self.build_options.output_dir.clone(),
            project_name: self.target.project_name.clone(),
            branch: self.target.branch.clone(),
            commit_sha: commit_sha.to_string(),
        };
        let receipt = self.deployer.deploy(&upload).await?;
        log_transition("deployed", receipt.url.as_deref().unwrap_or("-"));
        Ok(receipt)
    }

    /// The upload already succeeded; a failed lookup only thins the record.
    async fn record(
        &self,
        commit_sha: &str,
        report: &BuildReport,
        receipt: DeployReceipt,
    ) -> DeploymentRecord {
        let latest = match self
            .api
            .deployment_for_commit(&self.target.project_name, commit_sha)
            .await
        {
            Ok(latest) => latest,
            Err(err) => {
                warn!(
                    target = "application::publish",
                    op = "publish::record",
                    result = "error",
                    error_code = "deployment_lookup",
                    error = %err,
                    "Failed to fetch the latest deployment; recording the commit only"
                );
                None
            }
        };

        let (deployment_id, provider_url, environment, created_on) = match latest {
            Some(deployment) => (
                Some(deployment.id),
                deployment.url,
                deployment.environment,
                deployment.created_on,
            ),
            None => (None, None, None, None),
        };

        DeploymentRecord {
            commit_sha: commit_sha.to_string(),
            project: self.target.project_name.clone(),
            branch: self.target.branch.clone(),
            artifact_digest: report.digest(),
            deployment_id,
            url: receipt.url.or(provider_url),
            environment,
            created_on,
        }
    }
}

async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| AppError::unexpected(format!("blocking task aborted: {err}")))?
}

fn log_transition(state: &'static str, detail: &str) {
    info!(
        target = "application::publish",
        op = "publish::transition",
        state,
        detail = %detail,
        "Publish state advanced"
    );
}

fn transition(
    current: &PublishState,
    next: Result<PublishState, DomainError>,
) -> Result<PublishState, PublishFailure> {
    next.map_err(|err| failure(current, AppError::from(err)))
}

fn failure(state: &PublishState, error: AppError) -> PublishFailure {
    let failed = state
        .fail(error.to_string())
        .unwrap_or_else(|_| state.clone());
    warn!(
        target = "application::publish",
        op = "publish::run",
        result = "error",
        state = failed.as_str(),
        from = state.as_str(),
        commit = state.commit_sha().unwrap_or("-"),
        error_code = error.category().as_str(),
        error = %error,
        "Publish failed"
    );
    PublishFailure {
        state: failed,
        error,
    }
}
