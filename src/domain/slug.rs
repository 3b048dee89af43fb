//! Naming helpers used when scaffolding new content.

use std::path::{Component, Path, PathBuf};

use slug::slugify;
use thiserror::Error;

use super::error::DomainError;

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a URL-safe file stem from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Validate a content path given relative to the content directory.
///
/// Only plain relative components are accepted. A missing extension becomes `.md`.
pub fn normalize_content_path(path: &Path) -> Result<PathBuf, DomainError> {
    if path.as_os_str().is_empty() {
        return Err(DomainError::validation("content path is empty"));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(DomainError::validation(format!(
                    "content path `{}` must not contain `..`",
                    path.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(DomainError::validation(format!(
                    "content path `{}` must be relative to the content directory",
                    path.display()
                )));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(DomainError::validation(format!(
            "content path `{}` does not name a file",
            path.display()
        )));
    }

    match normalized.extension().and_then(|ext| ext.to_str()) {
        None => {
            normalized.set_extension("md");
        }
        Some(ext) if MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {}
        Some(ext) => {
            return Err(DomainError::validation(format!(
                "content path `{}` has extension `.{ext}`; expected `.md` or `.markdown`",
                path.display()
            )));
        }
    }

    Ok(normalized)
}
