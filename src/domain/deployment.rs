//! Publish pipeline state machine and the record of a finished deployment.

use std::fmt;

use serde::Serialize;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    Checkout,
    Build,
    Deploy,
}

impl PublishStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishStage::Checkout => "checkout",
            PublishStage::Build => "build",
            PublishStage::Deploy => "deploy",
        }
    }
}

/// `Idle → CheckedOut → Built → Deployed`, with `Failed` reachable from every
/// non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    CheckedOut {
        commit_sha: String,
    },
    Built {
        commit_sha: String,
        artifact_digest: String,
    },
    Deployed {
        commit_sha: String,
        url: Option<String>,
    },
    Failed {
        stage: PublishStage,
        reason: String,
    },
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Idle => "idle",
            PublishState::CheckedOut { .. } => "checked-out",
            PublishState::Built { .. } => "built",
            PublishState::Deployed { .. } => "deployed",
            PublishState::Failed { .. } => "failed",
        }
    }

    pub fn commit_sha(&self) -> Option<&str> {
        match self {
            PublishState::CheckedOut { commit_sha }
            | PublishState::Built { commit_sha, .. }
            | PublishState::Deployed { commit_sha, .. } => Some(commit_sha),
            PublishState::Idle | PublishState::Failed { .. } => None,
        }
    }

    /// The stage that runs next from this state, if any.
    pub fn pending_stage(&self) -> Option<PublishStage> {
        match self {
            PublishState::Idle => Some(PublishStage::Checkout),
            PublishState::CheckedOut { .. } => Some(PublishStage::Build),
            PublishState::Built { .. } => Some(PublishStage::Deploy),
            PublishState::Deployed { .. } | PublishState::Failed { .. } => None,
        }
    }

    pub fn checked_out(&self, commit_sha: impl Into<String>) -> Result<Self, DomainError> {
        match self {
            PublishState::Idle => Ok(PublishState::CheckedOut {
                commit_sha: commit_sha.into(),
            }),
            other => Err(illegal(other, "checked-out")),
        }
    }

    pub fn built(&self, artifact_digest: impl Into<String>) -> Result<Self, DomainError> {
        match self {
            PublishState::CheckedOut { commit_sha } => Ok(PublishState::Built {
                commit_sha: commit_sha.clone(),
                artifact_digest: artifact_digest.into(),
            }),
            other => Err(illegal(other, "built")),
        }
    }

    pub fn deployed(&self, url: Option<String>) -> Result<Self, DomainError> {
        match self {
            PublishState::Built { commit_sha, .. } => Ok(PublishState::Deployed {
                commit_sha: commit_sha.clone(),
                url,
            }),
            other => Err(illegal(other, "deployed")),
        }
    }

    /// Move to `Failed`, attributing the failure to the stage that was running.
    pub fn fail(&self, reason: impl Into<String>) -> Result<Self, DomainError> {
        match self.pending_stage() {
            Some(stage) => Ok(PublishState::Failed {
                stage,
                reason: reason.into(),
            }),
            None => Err(illegal(self, "failed")),
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn illegal(from: &PublishState, to: &str) -> DomainError {
    DomainError::invariant(format!(
        "illegal publish transition `{}` -> `{to}`",
        from.as_str()
    ))
}

/// What started a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    Push { git_ref: String },
    Manual,
}

impl TriggerEvent {
    /// Manual dispatch always runs; a push only runs for the designated branch.
    pub fn targets_branch(&self, branch: &str) -> bool {
        match self {
            TriggerEvent::Manual => true,
            TriggerEvent::Push { git_ref } => {
                let name = git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref);
                name == branch
            }
        }
    }
}

/// A deployment as reported by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDeployment {
    pub id: String,
    pub url: Option<String>,
    pub environment: Option<String>,
    pub created_on: Option<String>,
}

/// Commit published by one successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub commit_sha: String,
    pub project: String,
    pub branch: String,
    pub artifact_digest: String,
    pub deployment_id: Option<String>,
    pub url: Option<String>,
    pub environment: Option<String>,
    pub created_on: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_every_state() {
        let idle = PublishState::Idle;
        let checked_out = idle.checked_out("abc123").expect("checkout");
        let built = checked_out.built("digest").expect("build");
        let deployed = built
            .deployed(Some("https://abc.blog.pages.dev".into()))
            .expect("deploy");

        assert_eq!(checked_out.commit_sha(), Some("abc123"));
        assert_eq!(built.as_str(), "built");
        assert_eq!(deployed.pending_stage(), None);
        assert_eq!(deployed.commit_sha(), Some("abc123"));
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let err = PublishState::Idle.built("digest").expect_err("illegal");
        assert!(matches!(err, DomainError::Invariant { .. }));
        assert!(err.to_string().contains("`idle` -> `built`"));
    }

    #[test]
    fn failure_records_the_running_stage() {
        let idle = PublishState::Idle;
        let checked_out = idle.checked_out("abc").expect("checkout");
        let built = checked_out.built("digest").expect("build");

        for (state, stage) in [
            (&idle, PublishStage::Checkout),
            (&checked_out, PublishStage::Build),
            (&built, PublishStage::Deploy),
        ] {
            match state.fail("boom").expect("fail") {
                PublishState::Failed { stage: got, reason } => {
                    assert_eq!(got, stage);
                    assert_eq!(reason, "boom");
                }
                other => panic!("unexpected state {other:?}"),
            }
        }
    }

    #[test]
    fn terminal_states_do_not_move() {
        let deployed = PublishState::Deployed {
            commit_sha: "abc".into(),
            url: None,
        };
        let failed = PublishState::Failed {
            stage: PublishStage::Build,
            reason: "x".into(),
        };

        assert!(deployed.fail("late").is_err());
        assert!(failed.fail("again").is_err());
        assert!(failed.checked_out("abc").is_err());
    }

    #[test]
    fn push_only_triggers_for_designated_branch() {
        let main = TriggerEvent::Push {
            git_ref: "refs/heads/main".into(),
        };
        let feature = TriggerEvent::Push {
            git_ref: "refs/heads/feature/x".into(),
        };

        assert!(main.targets_branch("main"));
        assert!(!feature.targets_branch("main"));
        assert!(TriggerEvent::Manual.targets_branch("main"));
        assert!(
            TriggerEvent::Push {
                git_ref: "main".into()
            }
            .targets_branch("main")
        );
    }
}
