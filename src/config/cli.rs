use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the sitepipe binary.
#[derive(Debug, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build, preview, and publish the Hugo blog"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SITEPIPE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Override the site root (the directory holding the Hugo config).
    #[arg(long = "site-root", value_name = "PATH", global = true, value_hint = ValueHint::DirPath)]
    pub site_root: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render the site into the output directory (minified by default).
    Build(BuildArgs),
    /// Run the local preview server.
    Serve(ServeArgs),
    /// Remove the output directory.
    Clean,
    /// Scaffold a new content file.
    New(NewArgs),
    /// Validate front matter and list what a build would publish.
    Check(CheckArgs),
    /// Run the configured pre-commit checks.
    Lint,
    /// Build the site and package it into a container image.
    #[command(name = "docker-build")]
    DockerBuild,
    /// Start the container stack (site behind the reverse proxy).
    #[command(name = "docker-up")]
    DockerUp,
    /// Check out, build, and deploy to Cloudflare Pages.
    Publish(Box<PublishArgs>),
    /// Write a QR code PNG that links to the site.
    Qr(QrArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildArgs {
    /// Include content marked `draft: true`.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub drafts: bool,

    /// Skip HTML/CSS/JS minification.
    #[arg(long = "no-minify", action = clap::ArgAction::SetTrue)]
    pub no_minify: bool,

    /// Override the output directory.
    #[arg(long = "output", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Override the site base URL passed to Hugo.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the Hugo environment.
    #[arg(long = "environment", value_name = "NAME")]
    pub environment: Option<String>,

    /// Build twice and fail if the outputs differ.
    #[arg(long = "check-reproducible", action = clap::ArgAction::SetTrue)]
    pub check_reproducible: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Include content marked `draft: true`.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub drafts: bool,

    /// Raise the renderer's log level to debug.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub debug: bool,

    /// Override the preview listener host.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the preview listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Disable live reload in the browser.
    #[arg(long = "no-live-reload", action = clap::ArgAction::SetTrue)]
    pub no_live_reload: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct NewArgs {
    /// Path of the new file, relative to the content directory (e.g. `posts/my-post.md`).
    #[arg(value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub path: Option<PathBuf>,

    /// Title written into the front matter; derived from the file name when omitted.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Tag to add; repeat for several.
    #[arg(long = "tag", value_name = "TAG", action = clap::ArgAction::Append)]
    pub tags: Vec<String>,

    /// Overwrite an existing file.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub force: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    /// Report drafts as publishable.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub drafts: bool,

    /// Report future-dated content as publishable.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub future: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TriggerKind {
    /// A push to a branch; only the designated branch publishes.
    Push,
    /// Manual dispatch; always publishes.
    #[default]
    #[value(alias = "workflow_dispatch")]
    Manual,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PublishArgs {
    /// Event that triggered this run.
    #[arg(long, value_enum, default_value_t = TriggerKind::Manual, env = "GITHUB_EVENT_NAME")]
    pub event: TriggerKind,

    /// Git ref that was pushed (e.g. `refs/heads/main`).
    #[arg(long = "ref", value_name = "REF", env = "GITHUB_REF")]
    pub git_ref: Option<String>,

    /// Commit being published; resolved with `git rev-parse HEAD` when omitted.
    #[arg(long, value_name = "SHA", env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// Assume the repository and submodules are already checked out.
    #[arg(long = "skip-checkout", action = clap::ArgAction::SetTrue)]
    pub skip_checkout: bool,

    /// Override the designated publish branch.
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Override the Cloudflare Pages project name.
    #[arg(long = "project-name", value_name = "NAME")]
    pub project_name: Option<String>,

    /// Cloudflare account identifier.
    #[arg(long = "account-id", value_name = "ID", env = "CLOUDFLARE_ACCOUNT_ID")]
    pub account_id: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct QrArgs {
    /// URL to encode; defaults to `hugo.base_url`.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Where to write the PNG, relative to the site root.
    #[arg(
        long,
        value_name = "FILE",
        default_value = "website_qr.png",
        value_hint = ValueHint::FilePath
    )]
    pub output: PathBuf,
}
