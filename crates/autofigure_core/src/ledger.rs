use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ArtifactKind;

/// An addressable output of one pipeline stage. Identity is `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub url: String,
    pub name: String,
    pub kind: ArtifactKind,
}

/// Append-only, path-unique record of every artifact seen in a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArtifactLedger {
    entries: Vec<Artifact>,
    paths: HashSet<String>,
}

impl ArtifactLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the artifact was not known yet.
    pub fn record(&mut self, artifact: Artifact) -> bool {
        if self.paths.contains(&artifact.path) {
            return false;
        }
        self.paths.insert(artifact.path.clone());
        self.entries.push(artifact);
        true
    }

    /// Records every artifact and returns the ones that were new, in input order.
    pub fn merge<I>(&mut self, artifacts: I) -> Vec<Artifact>
    where
        I: IntoIterator<Item = Artifact>,
    {
        artifacts
            .into_iter()
            .filter_map(|artifact| {
                let added = artifact.clone();
                self.record(artifact).then_some(added)
            })
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter().rev()
    }

    pub fn to_vec(&self) -> Vec<Artifact> {
        self.entries.clone()
    }
}
