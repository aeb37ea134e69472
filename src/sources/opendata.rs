//! Regional open-data GeoJSON service (BRT stops and route paths).

use serde::Deserialize;
use serde_json::json;

use super::geojson::{Geometry, lon_lat, parse_collection};
use crate::error::{PipelineError, Result};
use crate::model::RawStop;
use crate::shapes::{RawShape, brt_route_ids, is_brt_route};

pub const STOPS_LAYER: &str = "sv_arret_p";
pub const PATHS_LAYER: &str = "SV_CHEM_L";

/// Stops published twice, once by this source, are dropped.
const DUPLICATE_STOP_SOURCE: &str = "SIG_KEOLIS";

/// Query URL for `layer`; the API key is added by the client.
pub fn layer_url(base: &str, layer: &str, attributes: &[&str], filter: Option<&serde_json::Value>) -> Result<String> {
    let mut url = reqwest::Url::parse(base).map_err(|e| PipelineError::retrieval(base, e))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("typename", layer);
        query.append_pair("attributes", &serde_json::to_string(attributes)?);
        if let Some(filter) = filter {
            query.append_pair("filter", &filter.to_string());
        }
    }
    Ok(url.to_string())
}

pub fn stops_url(base: &str) -> Result<String> {
    layer_url(base, STOPS_LAYER, &["gid", "libelle", "source"], None)
}

/// Main paths of every BRT line, restricted to the published line numbers.
pub fn paths_url(base: &str) -> Result<String> {
    let filter = json!({
        "rs_sv_ligne_a": { "$in": brt_route_ids() },
        "principal": 1,
    });
    layer_url(base, PATHS_LAYER, &["geom", "gid", "rs_sv_ligne_a"], Some(&filter))
}

#[derive(Debug, Deserialize)]
struct StopProperties {
    gid: i64,
    libelle: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathProperties {
    gid: i64,
    rs_sv_ligne_a: i64,
}

pub fn parse_stops(bytes: &[u8]) -> Result<Vec<RawStop>> {
    const SOURCE: &str = "BRT stops GeoJSON";
    let collection = parse_collection::<StopProperties>(bytes, SOURCE)?;

    let mut stops = Vec::new();
    for feature in collection.features {
        let props = feature.properties;
        if props.source.as_deref() == Some(DUPLICATE_STOP_SOURCE) {
            continue;
        }
        let position = match &feature.geometry {
            Some(Geometry::Point { coordinates }) => Some(lon_lat(coordinates, SOURCE)?),
            _ => None,
        };
        stops.push(RawStop {
            id: props.gid.to_string(),
            name: props.libelle,
            position,
            lines: Vec::new(),
            in_core_area: None,
        });
    }
    Ok(stops)
}

/// Path features of published BRT lines; other line numbers are dropped
/// even if the service returns them.
pub fn parse_paths(bytes: &[u8]) -> Result<Vec<RawShape>> {
    const SOURCE: &str = "BRT paths GeoJSON";
    let collection = parse_collection::<PathProperties>(bytes, SOURCE)?;

    let mut shapes = Vec::new();
    for feature in collection.features {
        let props = feature.properties;
        if !is_brt_route(props.rs_sv_ligne_a) {
            continue;
        }
        let Some(paths) = feature.geometry.as_ref().and_then(|g| g.line_paths(SOURCE)) else {
            continue;
        };
        shapes.push(RawShape {
            route_id: props.rs_sv_ligne_a.to_string(),
            color: None,
            gid: Some(props.gid),
            paths: paths?,
        });
    }
    Ok(shapes)
}
