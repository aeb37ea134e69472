//! Canonical output collections, serialized as the published artifacts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `(lon, lat)` as published by the upstream sources.
pub type LonLat = [f64; 2];

/// `(lat, lon)`, the axis order of published shape geometry.
pub type LatLon = [f64; 2];

/// A stop as read from one source, carrying a single source identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStop {
    pub id: String,
    pub name: String,
    pub position: Option<LonLat>,
    pub lines: Vec<String>,
    pub in_core_area: Option<bool>,
}

/// A deduplicated stop keyed by display name.
///
/// Every key of `lines_by_id` and `position_by_id` appears in `ids`; `ids`
/// is duplicate-free and ordered by [`crate::collate::cmp_numeric_ids`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub name: String,
    pub ids: Vec<String>,
    #[serde(rename = "linesByID", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lines_by_id: BTreeMap<String, BTreeSet<String>>,
    #[serde(rename = "positionByID", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub position_by_id: BTreeMap<String, LonLat>,
    /// Set for sources that distinguish a core service area; `true` when any
    /// merged record lies inside it. Published as `inGironde`, the name the
    /// web client reads.
    #[serde(rename = "inGironde", alias = "inCoreArea", default, skip_serializing_if = "Option::is_none")]
    pub in_core_area: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminus {
    pub direction: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    pub name_short: String,
    pub terminus: Vec<Terminus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_ids: Option<Vec<String>>,
}

/// One route's geometry, published as a GeoJSON `Feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: MultiLineString,
    pub properties: ShapeProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<LatLon>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProperties {
    pub route_color: String,
    pub route_id: String,
    pub shapes_id: Option<i64>,
}

impl ShapeFeature {
    pub fn new(route_id: String, route_color: String, shapes_id: Option<i64>, lines: Vec<Vec<LatLon>>) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: MultiLineString {
                kind: "MultiLineString".to_string(),
                coordinates: lines,
            },
            properties: ShapeProperties {
                route_color,
                route_id,
                shapes_id,
            },
        }
    }

    pub fn route_id(&self) -> &str {
        &self.properties.route_id
    }
}
