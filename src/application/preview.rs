use tracing::info;

use crate::{
    application::error::AppError,
    config::ServeSettings,
    infra::hugo::{HugoCli, HugoServe},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOptions {
    pub host: String,
    pub port: u16,
    pub include_drafts: bool,
    pub debug: bool,
    pub live_reload: bool,
}

impl PreviewOptions {
    pub fn from_settings(serve: &ServeSettings, include_drafts: bool, debug: bool) -> Self {
        Self {
            host: serve.host.clone(),
            port: serve.port,
            include_drafts,
            debug,
            live_reload: serve.live_reload,
        }
    }
}

/// Local preview: Hugo watches the tree and re-renders on change.
#[derive(Debug, Clone)]
pub struct PreviewServer {
    hugo: HugoCli,
}

impl PreviewServer {
    pub fn new(hugo: HugoCli) -> Self {
        Self { hugo }
    }

    /// Runs in the foreground until the server exits or is interrupted.
    pub fn run(&self, options: &PreviewOptions) -> Result<(), AppError> {
        info!(
            target = "application::preview",
            op = "preview::run",
            host = %options.host,
            port = options.port,
            drafts = options.include_drafts,
            "Starting preview server at http://{}:{}/",
            options.host,
            options.port
        );

        self.hugo
            .serve(&HugoServe {
                host: options.host.clone(),
                port: options.port,
                build_drafts: options.include_drafts,
                debug: options.debug,
                live_reload: options.live_reload,
            })
            .map_err(AppError::from)
    }
}
