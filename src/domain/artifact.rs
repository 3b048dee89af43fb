//! The rendered output of one build, reduced to per-file digests.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// One rendered file. `path` is relative to the output directory and always
/// uses `/` separators so digests are stable across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

impl Artifact {
    pub fn from_contents(path: impl Into<String>, contents: &[u8]) -> Self {
        Self {
            path: path.into(),
            bytes: contents.len() as u64,
            sha256: hex::encode(Sha256::digest(contents)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn from_artifacts(mut artifacts: Vec<Artifact>) -> Self {
        artifacts.sort_by(|left, right| left.path.cmp(&right.path));
        Self { artifacts }
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|artifact| artifact.bytes).sum()
    }

    pub fn get(&self, path: &str) -> Option<&Artifact> {
        self.artifacts
            .binary_search_by(|artifact| artifact.path.as_str().cmp(path))
            .ok()
            .map(|index| &self.artifacts[index])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Combined digest over every (path, content digest) pair.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for artifact in &self.artifacts {
            hasher.update(artifact.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(artifact.sha256.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    pub fn diff(&self, other: &ArtifactSet) -> ArtifactDiff {
        let mut diff = ArtifactDiff::default();
        for artifact in &self.artifacts {
            match other.get(&artifact.path) {
                None => diff.removed.push(artifact.path.clone()),
                Some(theirs) if theirs.sha256 != artifact.sha256 => {
                    diff.changed.push(artifact.path.clone())
                }
                Some(_) => {}
            }
        }
        for artifact in &other.artifacts {
            if !self.contains(&artifact.path) {
                diff.added.push(artifact.path.clone());
            }
        }
        diff
    }
}

/// Paths that differ between two artifact sets, relative to the left-hand set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl ArtifactDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl fmt::Display for ArtifactDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} changed",
            self.added.len(),
            self.removed.len(),
            self.changed.len()
        )?;
        if let Some(first) = self
            .changed
            .first()
            .or_else(|| self.added.first())
            .or_else(|| self.removed.first())
        {
            write!(f, " (first: {first})")?;
        }
        Ok(())
    }
}
