//! GeoJSON `FeatureCollection` reading shared by the GeoJSON sources, and
//! the national route-shapes export.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{PipelineError, Result};
use crate::model::LonLat;
use crate::shapes::RawShape;

#[derive(Debug, Deserialize)]
pub struct FeatureCollection<P> {
    #[serde(default = "Vec::new")]
    pub features: Vec<Feature<P>>,
}

#[derive(Debug, Deserialize)]
pub struct Feature<P> {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    pub properties: P,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    #[serde(other)]
    Unsupported,
}

pub fn parse_collection<P: DeserializeOwned>(bytes: &[u8], source_name: &str) -> Result<FeatureCollection<P>> {
    serde_json::from_slice(bytes).map_err(|e| PipelineError::parse(source_name, e))
}

/// First two members of a GeoJSON position; altitude is dropped.
pub fn lon_lat(position: &[f64], source_name: &str) -> Result<LonLat> {
    match position {
        [lon, lat, ..] => Ok([*lon, *lat]),
        _ => Err(PipelineError::parse(
            source_name,
            format!("position with {} coordinates", position.len()),
        )),
    }
}

pub fn path(positions: &[Vec<f64>], source_name: &str) -> Result<Vec<LonLat>> {
    positions.iter().map(|p| lon_lat(p, source_name)).collect()
}

impl Geometry {
    /// Line paths of a `LineString` or `MultiLineString`, `None` otherwise.
    pub fn line_paths(&self, source_name: &str) -> Option<Result<Vec<Vec<LonLat>>>> {
        match self {
            Geometry::LineString { coordinates } => {
                Some(path(coordinates, source_name).map(|p| vec![p]))
            }
            Geometry::MultiLineString { coordinates } => Some(
                coordinates
                    .iter()
                    .map(|line| path(line, source_name))
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteShapeProperties {
    #[serde(default)]
    route_id: Option<String>,
    #[serde(default)]
    route_color: Option<String>,
}

/// Route shapes from the national GTFS-to-GeoJSON export.
///
/// Only `LineString` features are route paths; the export also carries stop
/// points, which are skipped.
pub fn parse_route_shapes(bytes: &[u8]) -> Result<Vec<RawShape>> {
    const SOURCE: &str = "route shapes GeoJSON";
    let collection: FeatureCollection<RouteShapeProperties> = parse_collection(bytes, SOURCE)?;

    let mut shapes = Vec::new();
    for feature in collection.features {
        let Some(Geometry::LineString { coordinates }) = &feature.geometry else {
            continue;
        };
        let route_id = feature
            .properties
            .route_id
            .ok_or_else(|| PipelineError::parse(SOURCE, "line feature without route_id"))?;
        shapes.push(RawShape {
            route_id,
            color: feature.properties.route_color,
            gid: None,
            paths: vec![path(coordinates, SOURCE)?],
        });
    }
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-0.5, 44.8]},
             "properties": {"stop_id": "x"}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[-0.57, 44.84, 12.0], [-0.56, 44.85]]},
             "properties": {"route_id": "5", "route_color": "DF4EA0", "route_long_name": "Lac"}},
            {"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1], [0, 0]]]},
             "properties": {"route_id": "9"}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[-0.6, 44.8]]},
             "properties": {"route_id": "5", "route_color": "000000"}}
        ]
    }"#;

    #[test]
    fn test_parse_route_shapes_keeps_line_strings() {
        let shapes = parse_route_shapes(EXPORT.as_bytes()).unwrap();

        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].route_id, "5");
        assert_eq!(shapes[0].color.as_deref(), Some("DF4EA0"));
        assert_eq!(shapes[0].paths, vec![vec![[-0.57, 44.84], [-0.56, 44.85]]]);
        assert_eq!(shapes[1].paths, vec![vec![[-0.6, 44.8]]]);
    }

    #[test]
    fn test_short_position_is_parse_error() {
        let bad = r#"{"features": [{"geometry": {"type": "LineString", "coordinates": [[1.0]]},
                       "properties": {"route_id": "1"}}]}"#;
        assert!(matches!(
            parse_route_shapes(bad.as_bytes()),
            Err(PipelineError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            parse_route_shapes(b"<html>"),
            Err(PipelineError::Parse { .. })
        ));
    }
}
