use std::path::PathBuf;

use super::process::{ExternalCommand, ProcessError};

#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    root: PathBuf,
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            root: root.into(),
        }
    }

    fn command(&self) -> ExternalCommand {
        ExternalCommand::new(&self.binary).current_dir(&self.root)
    }

    /// Fetch and check out every submodule (the theme lives in one).
    pub fn update_submodules(&self) -> Result<(), ProcessError> {
        self.command()
            .args(["submodule", "update", "--init", "--recursive"])
            .capture()
            .map(|_| ())
    }

    pub fn head_commit(&self) -> Result<String, ProcessError> {
        let output = self.command().args(["rev-parse", "HEAD"]).capture()?;
        Ok(output.stdout.trim().to_string())
    }
}
