//! BRT network: stops and route paths from the regional open-data service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::{Generator, SHAPES_FILE, STOPS_FILE};
use crate::config::PipelineConfig;
use crate::fetch::auth::UrlParam;
use crate::fetch::{HttpClient, Retrying, fetch_bytes, with_retries};
use crate::merge::merge_stops;
use crate::output::Artifact;
use crate::shapes::{ColorRule, aggregate_shapes};
use crate::sources::opendata;

pub const CATEGORY: &str = "brt";

pub struct BrtGenerator<C> {
    client: Retrying<UrlParam<C>>,
    base_url: String,
}

impl<C: HttpClient> BrtGenerator<C> {
    pub fn new(client: C, config: &PipelineConfig) -> Self {
        let keyed = UrlParam::new(client, "key", &config.keys.opendata);
        Self {
            client: with_retries(keyed, &config.http),
            base_url: config.endpoints.opendata_geojson.clone(),
        }
    }
}

/// Builds both BRT artifacts from the two fetched GeoJSON documents.
pub fn build(stops_body: &[u8], paths_body: &[u8]) -> Result<Vec<Artifact>> {
    let stops = merge_stops(opendata::parse_stops(stops_body)?);
    info!(stops = stops.len(), "BRT stops merged");

    let shapes = aggregate_shapes(opendata::parse_paths(paths_body)?, ColorRule::BrtBands);
    info!(lines = shapes.len(), "BRT shapes aggregated");

    Ok(vec![
        Artifact::from_collection(CATEGORY, STOPS_FILE, &stops)?,
        Artifact::from_collection(CATEGORY, SHAPES_FILE, &shapes)?,
    ])
}

#[async_trait]
impl<C: HttpClient> Generator for BrtGenerator<C> {
    fn category(&self) -> &'static str {
        CATEGORY
    }

    #[tracing::instrument(skip(self), fields(category = CATEGORY))]
    async fn generate(&self) -> Result<Vec<Artifact>> {
        let stops_body = fetch_bytes(&self.client, &opendata::stops_url(&self.base_url)?)
            .await
            .context("fetching BRT stops")?;
        let paths_body = fetch_bytes(&self.client, &opendata::paths_url(&self.base_url)?)
            .await
            .context("fetching BRT paths")?;

        build(&stops_body, &paths_body)
    }
}
