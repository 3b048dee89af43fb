use serde::Serialize;

use crate::application::error::AppError;

/// Print a command result to stdout; logs stay on stderr.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::unexpected(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}
