//! Timetable-detail service used to tell which end of a rail route is its
//! starting direction.

use async_trait::async_trait;
use serde::Deserialize;

use super::gtfs::stop_area_id;
use crate::error::{PipelineError, Result};
use crate::fetch::{HttpClient, fetch_bytes};

/// Answers "which station does this route's first published direction
/// start from".
#[async_trait]
pub trait TimetableLookup: Send + Sync {
    async fn first_stop_area(&self, route_id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct LineTimetable {
    #[serde(default)]
    routes: Vec<TimetableRoute>,
}

#[derive(Debug, Deserialize)]
struct TimetableRoute {
    #[serde(rename = "stopPoints", default)]
    stop_points: Vec<TimetableStopPoint>,
}

#[derive(Debug, Deserialize)]
struct TimetableStopPoint {
    id: String,
}

/// Station id of the first stop point of the first direction.
pub fn parse_first_stop_area(bytes: &[u8], source_name: &str) -> Result<String> {
    let timetable: LineTimetable =
        serde_json::from_slice(bytes).map_err(|e| PipelineError::parse(source_name, e))?;
    let point = timetable
        .routes
        .first()
        .and_then(|r| r.stop_points.first())
        .ok_or_else(|| PipelineError::parse(source_name, "no stop points in first direction"))?;
    stop_area_id(&point.id).ok_or_else(|| {
        PipelineError::parse(source_name, format!("unexpected stop point id '{}'", point.id))
    })
}

pub struct HttpTimetableLookup<C> {
    client: C,
    base_url: String,
}

impl<C> HttpTimetableLookup<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn line_url(&self, route_id: &str) -> String {
        format!("{}/line:SNC:{}", self.base_url, route_id)
    }
}

#[async_trait]
impl<C: HttpClient> TimetableLookup for HttpTimetableLookup<C> {
    async fn first_stop_area(&self, route_id: &str) -> Result<String> {
        let url = self.line_url(route_id);
        let bytes = fetch_bytes(&self.client, &url).await?;
        parse_first_stop_area(&bytes, &url)
    }
}
