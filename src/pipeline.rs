//! Runs every category in turn, persists its artifacts and keeps
//! `meta.json` current.
//!
//! A failing category is logged and reported but never stops the others.
//! Its artifacts are all staged before any is renamed into place, so a
//! category that fails while generating or writing leaves its previously
//! published artifacts and metadata untouched. If a rename still fails
//! midway, the artifacts already renamed are recorded so `meta.json`
//! matches what is on disk.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{Instrument, error, info};

use crate::generators::Generator;
use crate::output::{Artifact, Staged};
use crate::tracker::{BuildMetadata, ChangeState};

pub const METADATA_FILE: &str = "meta.json";

#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    /// `category/file` of every artifact whose content changed.
    pub updated: Vec<String>,
    pub metadata_error: Option<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.metadata_error.is_none()
    }
}

/// Stages every artifact; on failure the staged temp files are removed and
/// nothing published is replaced.
fn stage_all(artifacts: &[Artifact], data_dir: &Path) -> Result<Vec<Staged>> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        match artifact.stage(data_dir) {
            Ok(s) => staged.push(s),
            Err(e) => {
                staged.into_iter().for_each(Staged::discard);
                return Err(e).with_context(|| format!("writing {}/{}", artifact.category, artifact.file));
            }
        }
    }
    Ok(staged)
}

async fn run_category(
    generator: &dyn Generator,
    data_dir: &Path,
    metadata: &mut BuildMetadata,
    summary: &mut RunSummary,
) {
    let category = generator.category();
    let prepared = match generator.generate().await {
        Ok(artifacts) => stage_all(&artifacts, data_dir).map(|staged| (artifacts, staged)),
        Err(e) => Err(e),
    };
    let (artifacts, staged) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Category failed");
            summary.failed.push(category);
            return;
        }
    };

    let mut pending = artifacts.iter().zip(staged);
    while let Some((artifact, staged)) = pending.next() {
        let path = staged.path().to_path_buf();
        if let Err(e) = staged.commit() {
            error!(path = %path.display(), error = %e, "Category failed");
            summary.failed.push(category);
            pending.for_each(|(_, rest)| rest.discard());
            return;
        }
        info!(path = %path.display(), records = artifact.records, "Artifact written");
        let state = metadata.record(category, &artifact.file, &artifact.bytes, Utc::now());
        if state == ChangeState::Updated {
            summary.updated.push(format!("{category}/{}", artifact.file));
        }
    }
    summary.succeeded.push(category);
}

/// Builds every category, then writes `meta.json` once.
pub async fn run(generators: &[Box<dyn Generator>], data_dir: &Path) -> RunSummary {
    let meta_path = data_dir.join(METADATA_FILE);
    let mut metadata = BuildMetadata::load(&meta_path);
    let mut summary = RunSummary::default();

    for generator in generators {
        let span = tracing::info_span!("category", category = generator.category());
        run_category(generator.as_ref(), data_dir, &mut metadata, &mut summary)
            .instrument(span)
            .await;
    }

    if let Err(e) = metadata.save(&meta_path) {
        error!(path = %meta_path.display(), error = %e, "Failed to write build metadata");
        summary.metadata_error = Some(e.to_string());
    }

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        updated = summary.updated.len(),
        "Build finished"
    );
    summary
}
