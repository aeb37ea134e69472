//! TBM network: stops and lines from SIRI discovery, shapes from the
//! national GeoJSON export.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::{Generator, ROUTES_FILE, SHAPES_FILE, STOPS_FILE};
use crate::config::{PipelineConfig, TbmConfig};
use crate::fetch::auth::UrlParam;
use crate::fetch::{HttpClient, Retrying, fetch_bytes, with_retries};
use crate::merge::merge_stops;
use crate::model::Route;
use crate::output::Artifact;
use crate::shapes::{ColorRule, aggregate_shapes};
use crate::sort::sort_routes_by_id;
use crate::sources::{geojson, siri};
use crate::terminus::distinct_directions;

pub const CATEGORY: &str = "tbm";

pub struct TbmGenerator<C> {
    siri: Retrying<UrlParam<C>>,
    open: Retrying<C>,
    siri_base: String,
    shapes_url: String,
    config: TbmConfig,
}

impl<C: HttpClient + Clone> TbmGenerator<C> {
    pub fn new(client: C, config: &PipelineConfig) -> Self {
        let keyed = UrlParam::new(client.clone(), "AccountKey", &config.keys.siri);
        Self {
            siri: with_retries(keyed, &config.http),
            open: with_retries(client, &config.http),
            siri_base: config.endpoints.siri_base.clone(),
            shapes_url: config.endpoints.tbm_shapes_geojson.clone(),
            config: config.tbm.clone(),
        }
    }
}

pub fn build_routes(lines_body: &[u8], config: &TbmConfig) -> Result<Vec<Route>> {
    let routes = siri::parse_lines(lines_body)?
        .into_iter()
        .map(|line| Route {
            terminus: distinct_directions(&line.id, &line.destinations, &config.raw_direction_lines),
            id: line.id,
            name: line.name,
            name_short: line.code,
            trip_ids: None,
        })
        .collect();
    Ok(sort_routes_by_id(routes))
}

/// Builds the three TBM artifacts from the fetched documents.
pub fn build(
    stop_points_body: &[u8],
    lines_body: &[u8],
    shapes_body: &[u8],
    config: &TbmConfig,
) -> Result<Vec<Artifact>> {
    let stops = merge_stops(siri::parse_stop_points(stop_points_body)?);
    info!(stops = stops.len(), "TBM stops merged");

    let routes = build_routes(lines_body, config)?;
    info!(lines = routes.len(), "TBM routes built");

    let shapes = aggregate_shapes(geojson::parse_route_shapes(shapes_body)?, ColorRule::Source);
    info!(lines = shapes.len(), "TBM shapes aggregated");

    Ok(vec![
        Artifact::from_collection(CATEGORY, STOPS_FILE, &stops)?,
        Artifact::from_collection(CATEGORY, ROUTES_FILE, &routes)?,
        Artifact::from_collection(CATEGORY, SHAPES_FILE, &shapes)?,
    ])
}

#[async_trait]
impl<C: HttpClient + Clone> Generator for TbmGenerator<C> {
    fn category(&self) -> &'static str {
        CATEGORY
    }

    #[tracing::instrument(skip(self), fields(category = CATEGORY))]
    async fn generate(&self) -> Result<Vec<Artifact>> {
        let stop_points = fetch_bytes(&self.siri, &siri::stop_points_url(&self.siri_base))
            .await
            .context("fetching TBM stop points")?;
        let lines = fetch_bytes(&self.siri, &siri::lines_url(&self.siri_base))
            .await
            .context("fetching TBM lines")?;
        let shapes = fetch_bytes(&self.open, &self.shapes_url)
            .await
            .context("fetching TBM shapes")?;

        build(&stop_points, &lines, &shapes, &self.config)
    }
}
