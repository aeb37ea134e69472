//! National rail GTFS archive: member extraction and comma-separated rows.
//!
//! Rows are split on `,` without quote handling, matching how the feed is
//! published.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::config::BoundingBox;
use crate::error::{PipelineError, Result};
use crate::model::RawStop;

pub const STOPS_FILE: &str = "stops.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const ROUTES_FILE: &str = "routes.txt";

/// Marker carried by the stop-point ids of regional TER services.
const TER_MARKER: &str = "Train TER";

/// `location_type` of a station.
const STATION: &str = "1";

pub struct GtfsArchive {
    name: String,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl GtfsArchive {
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| PipelineError::parse(name, format!("not a zip archive: {e}")))?;
        Ok(Self {
            name: name.to_string(),
            archive,
        })
    }

    /// Text of the member named `file`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Extraction`] when the member is absent.
    pub fn read_file(&mut self, file: &str) -> Result<String> {
        let mut entry = self
            .archive
            .by_name(file)
            .map_err(|_| PipelineError::Extraction {
                archive: self.name.clone(),
                file: file.to_string(),
            })?;
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        Ok(text)
    }
}

/// Header-keyed rows of `text`; columns not named in `T` are ignored.
pub fn rows<'a, T: DeserializeOwned + 'a>(
    text: &'a str,
    file: &'a str,
) -> impl Iterator<Item = Result<T>> + 'a {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    csv::ReaderBuilder::new()
        .quoting(false)
        .flexible(true)
        .from_reader(text.as_bytes())
        .into_deserialize::<T>()
        .map(move |row| row.map_err(|e| PipelineError::parse(file, e)))
}

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    stop_name: String,
    #[serde(default)]
    stop_lat: String,
    #[serde(default)]
    stop_lon: String,
    #[serde(default)]
    location_type: String,
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: String,
    stop_id: String,
}

#[derive(Debug, Deserialize)]
struct TripRow {
    route_id: String,
    trip_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRow {
    pub route_id: String,
    #[serde(default)]
    pub route_short_name: String,
    #[serde(default)]
    pub route_long_name: String,
}

/// Stations inside `region`, flagged when also inside `core`.
///
/// Unparsable coordinates place a station outside every box.
pub fn parse_stations(text: &str, region: &BoundingBox, core: &BoundingBox) -> Result<Vec<RawStop>> {
    let mut stops = Vec::new();
    for row in rows::<StopRow>(text, STOPS_FILE) {
        let row = row?;
        if row.location_type != STATION {
            continue;
        }
        let lat = row.stop_lat.trim().parse::<f64>().unwrap_or(f64::NAN);
        let lon = row.stop_lon.trim().parse::<f64>().unwrap_or(f64::NAN);
        if !region.contains(lat, lon) {
            continue;
        }
        stops.push(RawStop {
            id: row.stop_id,
            name: row.stop_name,
            position: Some([lon, lat]),
            lines: Vec::new(),
            in_core_area: Some(core.contains(lat, lon)),
        });
    }
    Ok(stops)
}

/// Station id of a stop point: `StopPoint:OCETrain TER-87581009` →
/// `StopArea:OCE87581009`.
pub fn stop_area_id(stop_point_id: &str) -> Option<String> {
    stop_point_id
        .split('-')
        .nth(1)
        .map(|code| format!("StopArea:OCE{code}"))
}

/// Trips with at least one TER stop time at a station in `stations`.
pub fn ter_trips_through(stop_times: &str, stations: &HashSet<String>) -> Result<HashSet<String>> {
    let mut trips = HashSet::new();
    for row in rows::<StopTimeRow>(stop_times, STOP_TIMES_FILE) {
        let row = row?;
        if !row.stop_id.contains(TER_MARKER) {
            continue;
        }
        if stop_area_id(&row.stop_id).is_some_and(|area| stations.contains(&area)) {
            trips.insert(row.trip_id);
        }
    }
    Ok(trips)
}

/// Route id → ids of its selected trips (truncated at the first `:`),
/// in file order.
pub fn trips_by_route(trips: &str, selected: &HashSet<String>) -> Result<IndexMap<String, Vec<String>>> {
    let mut by_route: IndexMap<String, Vec<String>> = IndexMap::new();
    for row in rows::<TripRow>(trips, TRIPS_FILE) {
        let row = row?;
        if !selected.contains(&row.trip_id) {
            continue;
        }
        let short = row.trip_id.split(':').next().unwrap_or_default().to_string();
        by_route.entry(row.route_id).or_default().push(short);
    }
    Ok(by_route)
}

/// First row of each route in `wanted`, in file order.
pub fn routes_named<K>(routes: &str, wanted: &IndexMap<String, K>) -> Result<Vec<RouteRow>> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for row in rows::<RouteRow>(routes, ROUTES_FILE) {
        let row = row?;
        if wanted.contains_key(&row.route_id) && seen.insert(row.route_id.clone()) {
            selected.push(row);
        }
    }
    Ok(selected)
}
