//! Loading the content tree and reporting what a build would publish.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    application::error::AppError,
    domain::content::{ContentError, ContentItem, ContentSet, PublishPolicy},
};

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Parse every Markdown file under `content_dir`, collecting all failures.
///
/// A missing directory yields an empty set; Hugo renders such a site too.
pub fn load_content(content_dir: &Path) -> Result<ContentSet, AppError> {
    if !content_dir.exists() {
        warn!(
            target = "application::content",
            op = "content::load",
            path = %content_dir.display(),
            "Content directory does not exist; treating it as empty"
        );
        return Ok(ContentSet::default());
    }

    let mut items = Vec::new();
    let mut issues = Vec::new();

    for entry in WalkDir::new(content_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(|path| relative_to(content_dir, path))
                    .unwrap_or_default();
                issues.push(ContentError::new(path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        let relative = relative_to(content_dir, entry.path());
        let source = match fs::read_to_string(entry.path()) {
            Ok(source) => source,
            Err(err) => {
                issues.push(ContentError::new(relative, format!("unreadable: {err}")));
                continue;
            }
        };

        match ContentItem::parse(relative, &source) {
            Ok(item) => items.push(item),
            Err(issue) => issues.push(issue),
        }
    }

    if !issues.is_empty() {
        warn!(
            target = "application::content",
            op = "content::load",
            result = "error",
            failures = issues.len(),
            "Content files failed to parse"
        );
        return Err(AppError::Content { issues });
    }

    let set = ContentSet::from_items(items);
    info!(
        target = "application::content",
        op = "content::load",
        result = "ok",
        items = set.len(),
        "Content loaded"
    );
    Ok(set)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// Summary printed by `check`.
#[derive(Debug, Clone, Serialize)]
pub struct ContentReport {
    pub total: usize,
    pub publishable: Vec<ReportEntry>,
    pub drafts: Vec<PathBuf>,
    pub future: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub path: PathBuf,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

impl ContentReport {
    pub fn new(set: &ContentSet, policy: PublishPolicy, now: OffsetDateTime) -> Self {
        Self {
            total: set.len(),
            publishable: set
                .publishable(policy, now)
                .map(|item| ReportEntry {
                    path: item.path.clone(),
                    title: item.front_matter.title.clone(),
                    date: item.front_matter.date,
                })
                .collect(),
            drafts: set.drafts().map(|item| item.path.clone()).collect(),
            future: set.future(now).map(|item| item.path.clone()).collect(),
        }
    }
}

/// Parse the whole tree and describe what a build under `policy` would include.
pub fn check_content(
    content_dir: &Path,
    policy: PublishPolicy,
    now: OffsetDateTime,
) -> Result<ContentReport, AppError> {
    let set = load_content(content_dir)?;
    Ok(ContentReport::new(&set, policy, now))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use time::macros::datetime;

    use super::*;

    const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write content");
    }

    #[test]
    fn loads_markdown_files_in_path_order() {
        let dir = TempDir::new().expect("temp dir");
        write(dir.path(), "posts/b.md", "---\ntitle: B\n---\n");
        write(dir.path(), "posts/a.md", "+++\ntitle = \"A\"\n+++\n");
        write(dir.path(), "about.markdown", "no front matter\n");
        write(dir.path(), "images/logo.png", "not markdown");

        let set = load_content(dir.path()).expect("loaded");
        let paths: Vec<_> = set.items().iter().map(|item| item.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("about.markdown"),
                PathBuf::from("posts/a.md"),
                PathBuf::from("posts/b.md"),
            ]
        );
    }

    #[test]
    fn collects_every_broken_file() {
        let dir = TempDir::new().expect("temp dir");
        write(dir.path(), "posts/ok.md", "---\ntitle: Ok\n---\n");
        write(dir.path(), "posts/open.md", "---\ntitle: Open\n");
        write(dir.path(), "posts/bad.md", "+++\ntitle = \n+++\n");

        match load_content(dir.path()).expect_err("broken content") {
            AppError::Content { issues } => {
                let paths: Vec<_> = issues.iter().map(|issue| issue.path.clone()).collect();
                assert_eq!(
                    paths,
                    vec![PathBuf::from("posts/bad.md"), PathBuf::from("posts/open.md")]
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().expect("temp dir");
        let set = load_content(&dir.path().join("content")).expect("empty set");
        assert!(set.is_empty());
    }

    #[test]
    fn report_separates_drafts_and_future_items() {
        let dir = TempDir::new().expect("temp dir");
        write(
            dir.path(),
            "posts/live.md",
            "---\ntitle: Live\ndate: 2025-01-01\n---\n",
        );
        write(
            dir.path(),
            "posts/draft.md",
            "---\ntitle: Draft\ndraft: true\n---\n",
        );
        write(
            dir.path(),
            "posts/later.md",
            "---\ntitle: Later\ndate: 2030-01-01\n---\n",
        );

        let report =
            check_content(dir.path(), PublishPolicy::production(), NOW).expect("report");
        assert_eq!(report.total, 3);
        assert_eq!(report.publishable.len(), 1);
        assert_eq!(report.publishable[0].title, "Live");
        assert_eq!(report.drafts, vec![PathBuf::from("posts/draft.md")]);
        assert_eq!(report.future, vec![PathBuf::from("posts/later.md")]);

        let report = check_content(
            dir.path(),
            PublishPolicy::production().with_drafts(true).with_future(true),
            NOW,
        )
        .expect("report");
        assert_eq!(report.publishable.len(), 3);
    }
}
