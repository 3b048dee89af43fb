use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    domain::{content::ContentError, error::DomainError},
    infra::{error::InfraError, process::ProcessError},
};

/// Exit status for rejected or missing publish credentials.
pub const CREDENTIAL_EXIT_CODE: i32 = 3;
const GENERIC_EXIT_CODE: i32 = 1;

/// Coarse failure taxonomy surfaced to operators; nothing is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Content,
    Configuration,
    Transport,
    Credential,
    External,
    Usage,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Content => "content",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Credential => "credential",
            ErrorCategory::External => "external",
            ErrorCategory::Usage => "usage",
            ErrorCategory::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("{}", render_content_issues(.issues))]
    Content { issues: Vec<ContentError> },
    #[error("renderer failed (exit {exit_code:?}):\n{stderr}")]
    Renderer {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<ProcessError> for AppError {
    fn from(error: ProcessError) -> Self {
        Self::Infra(InfraError::Process(error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Infra(InfraError::Io(error))
    }
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Content { .. } | AppError::Renderer { .. } => ErrorCategory::Content,
            AppError::Configuration(_) | AppError::Infra(InfraError::Configuration { .. }) => {
                ErrorCategory::Configuration
            }
            AppError::Infra(InfraError::Process(ProcessError::NotFound { .. })) => {
                ErrorCategory::Configuration
            }
            AppError::Infra(InfraError::Process(_)) => ErrorCategory::External,
            AppError::Infra(InfraError::Transport { .. }) => ErrorCategory::Transport,
            AppError::Credential(_) | AppError::Infra(InfraError::Credential { .. }) => {
                ErrorCategory::Credential
            }
            AppError::Validation(_) | AppError::Domain(DomainError::Validation { .. }) => {
                ErrorCategory::Usage
            }
            AppError::Infra(InfraError::Io(_))
            | AppError::Infra(InfraError::Telemetry(_))
            | AppError::Domain(DomainError::Invariant { .. })
            | AppError::Unexpected(_) => ErrorCategory::Internal,
        }
    }

    /// Process exit status: external tool codes pass through unchanged.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Renderer {
                exit_code: Some(code),
                ..
            } => *code,
            AppError::Infra(InfraError::Process(ProcessError::Failed {
                exit_code: Some(code),
                ..
            })) => *code,
            _ if self.category() == ErrorCategory::Credential => CREDENTIAL_EXIT_CODE,
            _ => GENERIC_EXIT_CODE,
        }
    }

    /// The error and its chain of sources, outermost first.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}

fn render_content_issues(issues: &[ContentError]) -> String {
    let mut rendered = format!("{} content file(s) failed to parse", issues.len());
    for issue in issues {
        rendered.push_str("\n  ");
        rendered.push_str(&issue.to_string());
    }
    rendered
}
