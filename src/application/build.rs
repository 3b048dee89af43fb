//! The Site Builder: preflight checks, one Hugo invocation, and the resulting
//! artifact set.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use tempfile::TempDir;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    application::{clean::lexical, content::load_content, error::AppError},
    domain::artifact::{Artifact, ArtifactDiff, ArtifactSet},
    infra::{
        hugo::{HugoBuild, HugoCli},
        process::ProcessError,
    },
};

const THEME_MISSING_HINT: &str = "run `git submodule update --init --recursive`";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub include_drafts: bool,
    pub minify: bool,
    pub output_dir: PathBuf,
    pub base_url: Option<String>,
    pub environment: Option<String>,
}

impl BuildOptions {
    /// Minified, drafts excluded: what gets deployed.
    pub fn production(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            include_drafts: false,
            minify: true,
            output_dir: output_dir.into(),
            base_url: None,
            environment: None,
        }
    }

    fn hugo_request(&self) -> HugoBuild {
        HugoBuild {
            destination: self.output_dir.clone(),
            minify: self.minify,
            build_drafts: self.include_drafts,
            base_url: self.base_url.clone(),
            environment: self.environment.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub content_items: usize,
    pub artifacts: ArtifactSet,
}

impl BuildReport {
    pub fn digest(&self) -> String {
        self.artifacts.digest()
    }
}

#[derive(Debug, Clone)]
pub struct SiteBuilder {
    hugo: HugoCli,
    content_dir: PathBuf,
    theme_dir: PathBuf,
}

impl SiteBuilder {
    pub fn new(hugo: HugoCli, content_dir: impl Into<PathBuf>, theme_dir: impl Into<PathBuf>) -> Self {
        Self {
            hugo,
            content_dir: content_dir.into(),
            theme_dir: theme_dir.into(),
        }
    }

    /// The theme is vendored as a git submodule and is empty until initialised.
    pub fn ensure_theme(&self) -> Result<(), AppError> {
        let populated = fs::read_dir(&self.theme_dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if populated {
            return Ok(());
        }

        Err(AppError::configuration(format!(
            "theme submodule missing at `{}`; {THEME_MISSING_HINT}",
            self.theme_dir.display()
        )))
    }

    /// Hugo empties the destination before rendering, so it must not hold
    /// the site sources.
    pub fn ensure_safe_destination(&self, output_dir: &Path) -> Result<(), AppError> {
        let destination = lexical(output_dir);
        // (name, directory, whether the output may live inside it)
        let guarded = [
            ("site root", self.hugo.source(), true),
            ("content directory", self.content_dir.as_path(), false),
            ("theme directory", self.theme_dir.as_path(), false),
        ];

        for (name, dir, may_nest) in guarded {
            let dir = lexical(dir);
            let overlaps =
                dir.starts_with(&destination) || (!may_nest && destination.starts_with(&dir));
            if overlaps {
                return Err(AppError::configuration(format!(
                    "output directory `{}` overlaps the {name} `{}`; choose another --output",
                    destination.display(),
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn build(&self, options: &BuildOptions) -> Result<BuildReport, AppError> {
        let started_at = Instant::now();
        self.ensure_safe_destination(&options.output_dir)?;
        self.ensure_theme()?;
        let content = load_content(&self.content_dir)?;

        let output = self
            .hugo
            .build(&options.hugo_request())
            .map_err(|err| match err {
                ProcessError::Failed {
                    exit_code, stderr, ..
                } => AppError::Renderer { exit_code, stderr },
                other => AppError::from(other),
            })
            .inspect_err(|err| {
                warn!(
                    target = "application::build",
                    op = "build::site",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = err.category().as_str(),
                    error = %err,
                    "Site build failed"
                );
            })?;

        if !output.stderr.trim().is_empty() {
            warn!(
                target = "application::build",
                op = "build::site",
                stderr = %output.stderr.trim_end(),
                "Renderer reported warnings"
            );
        }

        let artifacts = collect_artifacts(&options.output_dir)?;
        let report = BuildReport {
            output_dir: options.output_dir.clone(),
            content_items: content.len(),
            artifacts,
        };

        info!(
            target = "application::build",
            op = "build::site",
            result = "ok",
            drafts = options.include_drafts,
            minify = options.minify,
            content_items = report.content_items,
            artifacts = report.artifacts.len(),
            bytes = report.artifacts.total_bytes(),
            digest = %report.digest(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Site built"
        );

        Ok(report)
    }

    /// Build into the output directory and again into a scratch directory,
    /// failing when the two artifact sets differ.
    pub fn build_reproducible(&self, options: &BuildOptions) -> Result<BuildReport, AppError> {
        let first = self.build(options)?;

        let scratch = TempDir::new()?;
        let second_options = BuildOptions {
            output_dir: scratch.path().join("public"),
            ..options.clone()
        };
        let second = self.build(&second_options)?;

        let diff = first.artifacts.diff(&second.artifacts);
        if !diff.is_empty() {
            return Err(non_reproducible(&diff));
        }

        info!(
            target = "application::build",
            op = "build::reproducible",
            result = "ok",
            digest = %first.digest(),
            "Two builds produced identical output"
        );
        Ok(first)
    }
}

fn non_reproducible(diff: &ArtifactDiff) -> AppError {
    warn!(
        target = "application::build",
        op = "build::reproducible",
        result = "error",
        diff = %diff,
        "Builds with identical inputs differ"
    );
    AppError::unexpected(format!("build is not reproducible: {diff}"))
}

/// Digest every file under `dir`. A missing directory is an error.
pub fn collect_artifacts(dir: &Path) -> Result<ArtifactSet, AppError> {
    if !dir.is_dir() {
        return Err(AppError::unexpected(format!(
            "output directory `{}` was not produced",
            dir.display()
        )));
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| AppError::unexpected(err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let path = relative
            .components()
            .map(|component| {
                component.as_os_str().to_str().ok_or_else(|| {
                    AppError::unexpected(format!(
                        "output file `{}` has a non UTF-8 name",
                        entry.path().display()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("/");
        let contents = fs::read(entry.path())?;
        artifacts.push(Artifact::from_contents(path, &contents));
    }

    Ok(ArtifactSet::from_artifacts(artifacts))
}
