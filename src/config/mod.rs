//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::*;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "sitepipe";
const ENV_PREFIX: &str = "SITEPIPE";
const DEFAULT_SITE_ROOT: &str = ".";
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_OUTPUT_DIR: &str = "public";
const DEFAULT_THEMES_DIR: &str = "themes";
const DEFAULT_THEME: &str = "blowfish";
const DEFAULT_HUGO_BINARY: &str = "hugo";
const DEFAULT_SERVE_HOST: &str = "127.0.0.1";
const DEFAULT_SERVE_PORT: u16 = 1313;
const DEFAULT_PUBLISH_BRANCH: &str = "main";
const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_WRANGLER_BINARY: &str = "wrangler";
const DEFAULT_GIT_BINARY: &str = "git";
const DEFAULT_DOCKER_BINARY: &str = "docker";
const DEFAULT_DOCKER_IMAGE: &str = "sitepipe-site:latest";
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
const DEFAULT_DOCKERFILE: &str = "Dockerfile";
const DEFAULT_LINT_BINARY: &str = "pre-commit";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteSettings,
    pub hugo: HugoSettings,
    pub serve: ServeSettings,
    pub publish: PublishSettings,
    pub docker: DockerSettings,
    pub lint: LintSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub themes_dir: PathBuf,
    pub theme: String,
}

impl SiteSettings {
    pub fn content_path(&self) -> PathBuf {
        resolve(&self.root, &self.content_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        resolve(&self.root, &self.output_dir)
    }

    pub fn theme_path(&self) -> PathBuf {
        resolve(&self.root, &self.themes_dir).join(&self.theme)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[derive(Debug, Clone)]
pub struct HugoSettings {
    pub binary: PathBuf,
    pub environment: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
    pub live_reload: bool,
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub branch: String,
    pub project_name: Option<String>,
    pub api_base_url: Url,
    pub wrangler_binary: PathBuf,
    pub git_binary: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DockerSettings {
    pub binary: PathBuf,
    pub image: String,
    pub compose_file: PathBuf,
    pub dockerfile: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LintSettings {
    pub binary: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(cli);
    match &cli.command {
        Command::Build(args) => raw.apply_build_overrides(args),
        Command::Serve(args) => raw.apply_serve_overrides(args),
        Command::Publish(args) => raw.apply_publish_overrides(args),
        Command::Clean
        | Command::New(_)
        | Command::Check(_)
        | Command::Lint
        | Command::DockerBuild
        | Command::DockerUp
        | Command::Qr(_) => {}
    }

    Settings::from_raw(raw)
}

/// Parse the process arguments and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    use clap::Parser;

    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    site: RawSiteSettings,
    hugo: RawHugoSettings,
    serve: RawServeSettings,
    publish: RawPublishSettings,
    docker: RawDockerSettings,
    lint: RawLintSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, cli: &CliArgs) {
        if let Some(root) = cli.site_root.as_ref() {
            self.site.root = Some(root.clone());
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_build_overrides(&mut self, args: &BuildArgs) {
        if let Some(output) = args.output.as_ref() {
            self.site.output_dir = Some(output.clone());
        }
        if let Some(url) = args.base_url.as_ref() {
            self.hugo.base_url = Some(url.clone());
        }
        if let Some(environment) = args.environment.as_ref() {
            self.hugo.environment = Some(environment.clone());
        }
    }

    fn apply_serve_overrides(&mut self, args: &ServeArgs) {
        if let Some(host) = args.host.as_ref() {
            self.serve.host = Some(host.clone());
        }
        if let Some(port) = args.port {
            self.serve.port = Some(port);
        }
        if args.no_live_reload {
            self.serve.live_reload = Some(false);
        }
    }

    fn apply_publish_overrides(&mut self, args: &PublishArgs) {
        if let Some(branch) = args.branch.as_ref() {
            self.publish.branch = Some(branch.clone());
        }
        if let Some(project) = args.project_name.as_ref() {
            self.publish.project_name = Some(project.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            site,
            hugo,
            serve,
            publish,
            docker,
            lint,
            logging,
        } = raw;

        Ok(Self {
            site: build_site_settings(site)?,
            hugo: build_hugo_settings(hugo)?,
            serve: build_serve_settings(serve)?,
            publish: build_publish_settings(publish)?,
            docker: build_docker_settings(docker)?,
            lint: build_lint_settings(lint)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let root = non_empty_path(site.root, DEFAULT_SITE_ROOT, "site.root")?;
    let content_dir = non_empty_path(site.content_dir, DEFAULT_CONTENT_DIR, "site.content_dir")?;
    let output_dir = non_empty_path(site.output_dir, DEFAULT_OUTPUT_DIR, "site.output_dir")?;
    let themes_dir = non_empty_path(site.themes_dir, DEFAULT_THEMES_DIR, "site.themes_dir")?;
    let theme = non_empty_string(site.theme, DEFAULT_THEME, "site.theme")?;

    Ok(SiteSettings {
        root,
        content_dir,
        output_dir,
        themes_dir,
        theme,
    })
}

fn build_hugo_settings(hugo: RawHugoSettings) -> Result<HugoSettings, LoadError> {
    Ok(HugoSettings {
        binary: non_empty_path(hugo.binary, DEFAULT_HUGO_BINARY, "hugo.binary")?,
        environment: trimmed(hugo.environment),
        base_url: trimmed(hugo.base_url),
    })
}

fn build_serve_settings(serve: RawServeSettings) -> Result<ServeSettings, LoadError> {
    let host = non_empty_string(serve.host, DEFAULT_SERVE_HOST, "serve.host")?;
    let port = serve.port.unwrap_or(DEFAULT_SERVE_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "serve.port",
            "port must be greater than zero",
        ));
    }

    Ok(ServeSettings {
        host,
        port,
        live_reload: serve.live_reload.unwrap_or(true),
    })
}

fn build_publish_settings(publish: RawPublishSettings) -> Result<PublishSettings, LoadError> {
    let branch = non_empty_string(publish.branch, DEFAULT_PUBLISH_BRANCH, "publish.branch")?;
    let api_base_url = publish
        .api_base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let api_base_url = Url::parse(api_base_url.trim()).map_err(|err| {
        LoadError::invalid("publish.api_base_url", format!("failed to parse: {err}"))
    })?;

    Ok(PublishSettings {
        branch,
        project_name: trimmed(publish.project_name),
        api_base_url,
        wrangler_binary: non_empty_path(
            publish.wrangler_binary,
            DEFAULT_WRANGLER_BINARY,
            "publish.wrangler_binary",
        )?,
        git_binary: non_empty_path(publish.git_binary, DEFAULT_GIT_BINARY, "publish.git_binary")?,
    })
}

fn build_docker_settings(docker: RawDockerSettings) -> Result<DockerSettings, LoadError> {
    Ok(DockerSettings {
        binary: non_empty_path(docker.binary, DEFAULT_DOCKER_BINARY, "docker.binary")?,
        image: non_empty_string(docker.image, DEFAULT_DOCKER_IMAGE, "docker.image")?,
        compose_file: non_empty_path(
            docker.compose_file,
            DEFAULT_COMPOSE_FILE,
            "docker.compose_file",
        )?,
        dockerfile: non_empty_path(docker.dockerfile, DEFAULT_DOCKERFILE, "docker.dockerfile")?,
    })
}

fn build_lint_settings(lint: RawLintSettings) -> Result<LintSettings, LoadError> {
    Ok(LintSettings {
        binary: non_empty_path(lint.binary, DEFAULT_LINT_BINARY, "lint.binary")?,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

fn non_empty_string(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "value must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    root: Option<PathBuf>,
    content_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    themes_dir: Option<PathBuf>,
    theme: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHugoSettings {
    binary: Option<PathBuf>,
    environment: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServeSettings {
    host: Option<String>,
    port: Option<u16>,
    live_reload: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPublishSettings {
    branch: Option<String>,
    project_name: Option<String>,
    api_base_url: Option<String>,
    wrangler_binary: Option<PathBuf>,
    git_binary: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDockerSettings {
    binary: Option<PathBuf>,
    image: Option<String>,
    compose_file: Option<PathBuf>,
    dockerfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLintSettings {
    binary: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[cfg(test)]
mod tests;
