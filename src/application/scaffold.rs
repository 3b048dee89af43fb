//! `new`: `hugo new content` with path validation, plus optional title and
//! tag overrides applied to the archetype's front matter.

use std::{
    fs,
    path::{MAIN_SEPARATOR, Path, PathBuf},
};

use tracing::info;

use crate::{
    application::error::AppError,
    domain::{
        content::{FrontMatterFormat, split_front_matter},
        slug::{derive_slug, normalize_content_path},
    },
    infra::hugo::HugoCli,
};

pub const MISSING_PATH_MESSAGE: &str =
    "content path is required, e.g. `sitepipe new posts/my-post.md`";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContent {
    pub path: Option<PathBuf>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct Scaffolder {
    hugo: HugoCli,
    content_dir: PathBuf,
}

impl Scaffolder {
    pub fn new(hugo: HugoCli, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            hugo,
            content_dir: content_dir.into(),
        }
    }

    /// Create the file and return its path. Hugo is not started when the
    /// path is rejected or the file exists without `force`.
    pub fn create(&self, request: &NewContent) -> Result<PathBuf, AppError> {
        let requested = request
            .path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| AppError::validation(MISSING_PATH_MESSAGE))?;

        let relative = self.resolve_relative(requested, request.title.as_deref())?;
        let target = self.content_dir.join(&relative);
        if target.exists() && !request.force {
            return Err(AppError::validation(format!(
                "`{}` already exists; pass --force to overwrite",
                target.display()
            )));
        }

        self.hugo.new_content(&relative, request.force)?;
        if !target.is_file() {
            return Err(AppError::unexpected(format!(
                "hugo reported success but `{}` was not created",
                target.display()
            )));
        }

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty());
        let tags = clean_tags(&request.tags);
        if title.is_some() || !tags.is_empty() {
            apply_overrides(&target, title, &tags)?;
        }

        info!(
            target = "application::scaffold",
            op = "scaffold::create",
            result = "ok",
            path = %target.display(),
            title = title.unwrap_or("-"),
            tags = tags.len(),
            "Content file created"
        );
        Ok(target)
    }

    /// A path naming a directory gets a file name derived from the title.
    fn resolve_relative(&self, requested: &Path, title: Option<&str>) -> Result<PathBuf, AppError> {
        let names_directory = requested
            .to_string_lossy()
            .ends_with(['/', MAIN_SEPARATOR])
            || self.content_dir.join(requested).is_dir();

        let candidate = if names_directory {
            let title = title.ok_or_else(|| {
                AppError::validation(format!(
                    "`{}` is a directory; pass --title or name the file",
                    requested.display()
                ))
            })?;
            let slug = derive_slug(title).map_err(|err| AppError::validation(err.to_string()))?;
            requested.join(format!("{slug}.md"))
        } else {
            requested.to_path_buf()
        };

        Ok(normalize_content_path(&candidate)?)
    }
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()) {
        if !cleaned.iter().any(|seen| seen == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

/// Existing tags keep their order; new ones are appended.
fn merged_tags(existing: impl IntoIterator<Item = String>, extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = existing.into_iter().collect();
    for tag in extra {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Rewrite the front matter Hugo generated, keeping its fence style and body.
fn apply_overrides(target: &Path, title: Option<&str>, tags: &[String]) -> Result<(), AppError> {
    let source = fs::read_to_string(target)?;
    let invalid = |err: &dyn std::fmt::Display| {
        AppError::unexpected(format!(
            "cannot update front matter of `{}`: {err}",
            target.display()
        ))
    };

    let (block, body) = split_front_matter(&source).map_err(|err| invalid(&err))?;
    let rendered = match block {
        Some((FrontMatterFormat::Toml, raw)) => {
            let mut table: toml::Table = toml::from_str(raw).map_err(|err| invalid(&err))?;
            if let Some(title) = title {
                table.insert("title".into(), toml::Value::String(title.into()));
            }
            if !tags.is_empty() {
                let existing: Vec<String> = match table.get("tags") {
                    Some(toml::Value::Array(values)) => values
                        .iter()
                        .filter_map(|value| value.as_str().map(str::to_string))
                        .collect(),
                    _ => Vec::new(),
                };
                let merged = merged_tags(existing, tags)
                    .into_iter()
                    .map(toml::Value::String)
                    .collect();
                table.insert("tags".into(), toml::Value::Array(merged));
            }
            let toml = toml::to_string(&table).map_err(|err| invalid(&err))?;
            format!("+++\n{toml}+++\n{body}")
        }
        Some((FrontMatterFormat::Yaml, raw)) => {
            let mapping = if raw.trim().is_empty() {
                serde_yaml_ng::Mapping::new()
            } else {
                serde_yaml_ng::from_str(raw).map_err(|err| invalid(&err))?
            };
            let yaml = yaml_with_overrides(mapping, title, tags).map_err(|err| invalid(&err))?;
            format!("---\n{yaml}---\n{body}")
        }
        None => {
            let yaml = yaml_with_overrides(serde_yaml_ng::Mapping::new(), title, tags)
                .map_err(|err| invalid(&err))?;
            format!("---\n{yaml}---\n\n{body}")
        }
    };

    fs::write(target, rendered)?;
    Ok(())
}

fn yaml_with_overrides(
    mut mapping: serde_yaml_ng::Mapping,
    title: Option<&str>,
    tags: &[String],
) -> Result<String, serde_yaml_ng::Error> {
    use serde_yaml_ng::Value;

    if let Some(title) = title {
        mapping.insert(Value::from("title"), Value::from(title));
    }
    if !tags.is_empty() {
        let existing: Vec<String> = match mapping.get("tags") {
            Some(Value::Sequence(values)) => values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        let merged = merged_tags(existing, tags)
            .into_iter()
            .map(Value::String)
            .collect();
        mapping.insert(Value::from("tags"), Value::Sequence(merged));
    }
    serde_yaml_ng::to_string(&mapping)
}

#[cfg(all(test, unix))]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        application::error::ErrorCategory, domain::content::ContentItem,
        infra::process::test_support::write_script,
    };

    // Stands in for `hugo new content <path>`: records its arguments and
    // writes the default archetype below `content/`.
    const YAML_ARCHETYPE: &str = r#"
echo "$@" > hugo.log
mkdir -p "content/$(dirname "$3")"
cat > "content/$3" <<'DOC'
---
title: "Sbom With Syft"
date: 2025-03-10T09:30:00Z
draft: true
tags: ["security"]
---

Body stays.
DOC
"#;

    const TOML_ARCHETYPE: &str = r#"
mkdir -p "content/$(dirname "$3")"
cat > "content/$3" <<'DOC'
+++
title = "Sbom With Syft"
date = 2025-03-10T09:30:00Z
draft = true
+++
DOC
"#;

    struct Site {
        dir: TempDir,
    }

    impl Site {
        fn new() -> Self {
            Self {
                dir: TempDir::new().expect("temp dir"),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn scaffolder(&self, hugo_script: &str) -> Scaffolder {
            let hugo = self.root().join("fake-hugo");
            write_script(&hugo, hugo_script);
            Scaffolder::new(HugoCli::new(hugo, self.root()), self.root().join("content"))
        }

        fn hugo_calls(&self) -> Option<String> {
            fs::read_to_string(self.root().join("hugo.log")).ok()
        }
    }

    fn request(path: &str) -> NewContent {
        NewContent {
            path: Some(PathBuf::from(path)),
            ..Default::default()
        }
    }

    #[test]
    fn missing_path_is_descriptive_and_runs_nothing() {
        let site = Site::new();

        let err = site
            .scaffolder(YAML_ARCHETYPE)
            .create(&NewContent::default())
            .expect_err("path required");

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.category(), ErrorCategory::Usage);
        assert!(err.to_string().contains("sitepipe new posts/my-post.md"));
        assert!(site.hugo_calls().is_none());
    }

    #[test]
    fn delegates_to_hugo_new_content() {
        let site = Site::new();
        let created = site
            .scaffolder(YAML_ARCHETYPE)
            .create(&request("posts/sbom-with-syft.md"))
            .expect("created");

        assert_eq!(created, site.root().join("content/posts/sbom-with-syft.md"));
        let calls = site.hugo_calls().expect("hugo ran");
        assert!(
            calls.starts_with("new content posts/sbom-with-syft.md --source "),
            "{calls}"
        );
        assert!(!calls.contains("--force"), "{calls}");

        let source = fs::read_to_string(&created).expect("read back");
        let item = ContentItem::parse("posts/sbom-with-syft.md", &source).expect("parses");
        assert_eq!(item.front_matter.title, "Sbom With Syft");
        assert!(item.is_draft());
    }

    #[test]
    fn title_and_tags_override_the_archetype() {
        let site = Site::new();
        let created = site
            .scaffolder(YAML_ARCHETYPE)
            .create(&NewContent {
                title: Some("SBOMs with Syft".into()),
                tags: vec!["rust".into(), " security ".into(), "hugo".into()],
                ..request("posts/sbom-with-syft.md")
            })
            .expect("created");

        let source = fs::read_to_string(&created).expect("read back");
        assert!(source.ends_with("\nBody stays.\n"), "{source}");
        let item = ContentItem::parse("posts/sbom-with-syft.md", &source).expect("parses");
        assert_eq!(item.front_matter.title, "SBOMs with Syft");
        assert!(item.is_draft());
        assert_eq!(
            item.front_matter.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["hugo", "rust", "security"]
        );
    }

    #[test]
    fn toml_archetype_keeps_its_fence() {
        let site = Site::new();
        let created = site
            .scaffolder(TOML_ARCHETYPE)
            .create(&NewContent {
                title: Some("Homelab Notes".into()),
                tags: vec!["proxmox".into()],
                ..request("notes/homelab.md")
            })
            .expect("created");

        let source = fs::read_to_string(&created).expect("read back");
        assert!(source.starts_with("+++\n"), "{source}");
        let item = ContentItem::parse("notes/homelab.md", &source).expect("parses");
        assert_eq!(item.front_matter.title, "Homelab Notes");
        assert!(item.front_matter.tags.contains("proxmox"));
    }

    #[test]
    fn hugo_exit_code_passes_through() {
        let site = Site::new();
        let err = site
            .scaffolder("echo 'Error: no archetype found' >&2\nexit 4\n")
            .create(&request("posts/a.md"))
            .expect_err("hugo failed");

        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("no archetype found"));
    }

    #[test]
    fn existing_file_needs_force() {
        let site = Site::new();
        fs::create_dir_all(site.root().join("content/posts")).expect("dirs");
        fs::write(site.root().join("content/posts/a.md"), "edited").expect("edit");
        let scaffolder = site.scaffolder(YAML_ARCHETYPE);

        let err = scaffolder.create(&request("posts/a.md")).expect_err("exists");
        assert!(err.to_string().contains("--force"));
        assert!(site.hugo_calls().is_none());
        assert_eq!(
            fs::read_to_string(site.root().join("content/posts/a.md")).expect("read"),
            "edited"
        );

        scaffolder
            .create(&NewContent {
                force: true,
                ..request("posts/a.md")
            })
            .expect("forced");
        assert!(site.hugo_calls().expect("hugo ran").contains("--force"));
        assert!(
            fs::read_to_string(site.root().join("content/posts/a.md"))
                .expect("read")
                .starts_with("---\n")
        );
    }

    #[test]
    fn directory_path_uses_title_slug() {
        let site = Site::new();
        let created = site
            .scaffolder(YAML_ARCHETYPE)
            .create(&NewContent {
                title: Some("OpenTofu & Proxmox".into()),
                ..request("posts/")
            })
            .expect("created");
        assert_eq!(created, site.root().join("content/posts/opentofu-proxmox.md"));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let site = Site::new();
        let scaffolder = site.scaffolder(YAML_ARCHETYPE);

        for raw in ["../outside.md", "/tmp/abs.md", "posts/data.json"] {
            let err = scaffolder.create(&request(raw)).expect_err(raw);
            assert_eq!(err.category(), ErrorCategory::Usage, "{raw}");
        }
        assert!(site.hugo_calls().is_none());
        assert!(!site.root().join("outside.md").exists());
    }
}
