//! SIRI 2.0 discovery deliveries (TBM stop points and lines).

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{PipelineError, Result};
use crate::model::RawStop;

pub fn stop_points_url(base: &str) -> String {
    format!("{}/stoppoints-discovery.json", base.trim_end_matches('/'))
}

pub fn lines_url(base: &str) -> String {
    format!("{}/lines-discovery.json", base.trim_end_matches('/'))
}

#[derive(Debug, Deserialize)]
struct Value {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "Siri")]
    siri: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StopPointsBody {
    stop_points_delivery: StopPointsDelivery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StopPointsDelivery {
    #[serde(default)]
    annotated_stop_point_ref: Vec<AnnotatedStopPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnnotatedStopPoint {
    stop_point_ref: Value,
    stop_name: Value,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    lines: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Location {
    longitude: f64,
    latitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LinesBody {
    lines_delivery: LinesDelivery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LinesDelivery {
    #[serde(default)]
    annotated_line_ref: Vec<AnnotatedLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnnotatedLine {
    line_ref: Value,
    line_code: Value,
    #[serde(default)]
    line_name: Vec<Option<Value>>,
    #[serde(default)]
    destinations: Vec<Destination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Destination {
    direction_ref: Value,
    #[serde(default)]
    place_name: Vec<Value>,
}

/// A line as announced by the discovery service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub id: String,
    pub name: String,
    pub code: String,
    /// `(direction ref, place name)` in upstream order.
    pub destinations: Vec<(String, String)>,
}

fn parse_envelope<T: DeserializeOwned>(bytes: &[u8], source_name: &str) -> Result<T> {
    let envelope: Envelope<T> =
        serde_json::from_slice(bytes).map_err(|e| PipelineError::parse(source_name, e))?;
    Ok(envelope.siri)
}

/// `index`-th `:`-separated segment of a SIRI reference such as
/// `bordeaux:StopPoint:BP:3713:LOC`.
fn ref_segment(reference: &str, index: usize, source_name: &str) -> Result<String> {
    reference
        .split(':')
        .nth(index)
        .map(str::to_string)
        .ok_or_else(|| PipelineError::parse(source_name, format!("malformed reference '{reference}'")))
}

/// Line code carried by a line reference (`bordeaux:Line:05:LOC` → `05`),
/// or the reference itself when it has no such segment.
pub fn line_code(reference: &str) -> String {
    reference
        .split(':')
        .nth(2)
        .unwrap_or(reference)
        .to_string()
}

pub fn parse_stop_points(bytes: &[u8]) -> Result<Vec<RawStop>> {
    const SOURCE: &str = "SIRI stop points discovery";
    let body: StopPointsBody = parse_envelope(bytes, SOURCE)?;

    body.stop_points_delivery
        .annotated_stop_point_ref
        .into_iter()
        .map(|point| {
            let mut lines: Vec<String> = Vec::new();
            for line in &point.lines {
                let code = line_code(&line.value);
                if !lines.contains(&code) {
                    lines.push(code);
                }
            }
            Ok(RawStop {
                id: ref_segment(&point.stop_point_ref.value, 3, SOURCE)?,
                name: point.stop_name.value,
                position: point.location.map(|l| [l.longitude, l.latitude]),
                lines,
                in_core_area: None,
            })
        })
        .collect()
}

pub fn parse_lines(bytes: &[u8]) -> Result<Vec<RawLine>> {
    const SOURCE: &str = "SIRI lines discovery";
    let body: LinesBody = parse_envelope(bytes, SOURCE)?;

    body.lines_delivery
        .annotated_line_ref
        .into_iter()
        .map(|line| {
            let id = ref_segment(&line.line_ref.value, 2, SOURCE)?;
            let destinations = line
                .destinations
                .into_iter()
                .map(|d| {
                    let place = d.place_name.into_iter().next().ok_or_else(|| {
                        PipelineError::parse(SOURCE, format!("line {id}: destination without place name"))
                    })?;
                    Ok((d.direction_ref.value, place.value))
                })
                .collect::<Result<Vec<_>>>()?;
            let name = line
                .line_name
                .into_iter()
                .next()
                .flatten()
                .map(|v| v.value)
                .unwrap_or_else(|| line.line_code.value.clone());

            Ok(RawLine {
                id,
                name,
                code: line.line_code.value,
                destinations,
            })
        })
        .collect()
}
