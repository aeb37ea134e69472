//! Incremental change tracking for published artifacts.
//!
//! `meta.json` maps category → file name → `{lastUpdated, contentHash}`.
//! A stamp only moves when the fingerprint of the freshly written bytes
//! differs from the stored one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::output::write_file;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStamp {
    pub last_updated: DateTime<Utc>,
    pub content_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    Clean,
    Updated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildMetadata {
    categories: BTreeMap<String, BTreeMap<String, ArtifactStamp>>,
}

/// Lowercase hex SHA-256 of `content`.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

impl BuildMetadata {
    /// Reads `path`; a missing or unreadable file is an empty state.
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes).unwrap_or_else(|| {
                warn!(path = %path.display(), "Build metadata is corrupt, starting empty");
                Self::default()
            }),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No build metadata, starting empty");
                Self::default()
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn get(&self, category: &str, file: &str) -> Option<&ArtifactStamp> {
        self.categories.get(category)?.get(file)
    }

    /// Compares `content` with the stored fingerprint for `(category, file)`
    /// and refreshes the stamp to `now` when it differs or is absent.
    pub fn record(
        &mut self,
        category: &str,
        file: &str,
        content: &[u8],
        now: DateTime<Utc>,
    ) -> ChangeState {
        let hash = content_hash(content);
        if self.get(category, file).is_some_and(|s| s.content_hash == hash) {
            debug!(category, file, "Artifact unchanged");
            return ChangeState::Clean;
        }

        info!(category, file, hash = %hash, "Artifact updated");
        self.categories.entry(category.to_string()).or_default().insert(
            file.to_string(),
            ArtifactStamp {
                last_updated: now,
                content_hash: hash,
            },
        );
        ChangeState::Updated
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        write_file(path, &bytes)
    }
}
