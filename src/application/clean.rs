use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use tracing::info;

use crate::application::error::AppError;

/// Remove the output directory. Returns whether anything was removed.
pub fn clean_output(site_root: &Path, output_dir: &Path) -> Result<bool, AppError> {
    let root = lexical(site_root);
    let output = lexical(output_dir);

    if output == root || !output.starts_with(&root) {
        return Err(AppError::configuration(format!(
            "refusing to remove `{}`: the output directory must live inside the site root `{}`",
            output_dir.display(),
            site_root.display()
        )));
    }

    if !output_dir.exists() {
        info!(
            target = "application::clean",
            op = "clean::output",
            result = "noop",
            path = %output_dir.display(),
            "Output directory already absent"
        );
        return Ok(false);
    }

    fs::remove_dir_all(output_dir)?;
    info!(
        target = "application::clean",
        op = "clean::output",
        result = "ok",
        path = %output_dir.display(),
        "Output directory removed"
    );
    Ok(true)
}

/// Absolute, with `.` and `..` folded, without touching the filesystem.
pub(crate) fn lexical(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
