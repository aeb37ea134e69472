//! Groups route geometry segments into one multi-line shape per route.

use indexmap::IndexMap;

use crate::collate::numeric_prefix;
use crate::model::{LatLon, LonLat, ShapeFeature};
use crate::sort::sort_shapes;

/// One upstream geometry feature, coordinates still in `(lon, lat)` order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawShape {
    pub route_id: String,
    pub color: Option<String>,
    pub gid: Option<i64>,
    pub paths: Vec<Vec<LonLat>>,
}

/// How a shape's display colour is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRule {
    /// `route_color` of the first feature seen for the route.
    Source,
    /// Fixed bands over the BRT line-number range.
    BrtBands,
}

/// First and last BRT line numbers.
pub const BRT_ROUTE_RANGE: (i64, i64) = (123, 198);

/// Line numbers inside [`BRT_ROUTE_RANGE`] that are never requested.
const BRT_EXCLUDED: &[(i64, i64)] = &[(154, 157), (177, 178), (188, 191)];

pub fn is_brt_route(id: i64) -> bool {
    let (lo, hi) = BRT_ROUTE_RANGE;
    (lo..=hi).contains(&id) && !BRT_EXCLUDED.iter().any(|(a, b)| (*a..=*b).contains(&id))
}

pub fn brt_route_ids() -> Vec<i64> {
    let (lo, hi) = BRT_ROUTE_RANGE;
    (lo..=hi).filter(|id| is_brt_route(*id)).collect()
}

pub fn brt_band_color(id: i64) -> &'static str {
    match id {
        123..=150 => "rgb(131,31,130)",
        151 | 158..=176 => "rgb(229,0,64)",
        152 | 179..=186 => "rgb(211,80,152)",
        _ => "rgb(146,98,163)",
    }
}

impl ColorRule {
    fn color_for(self, shape: &RawShape) -> String {
        match self {
            ColorRule::Source => shape.color.clone().unwrap_or_default(),
            ColorRule::BrtBands => numeric_prefix(&shape.route_id)
                .and_then(|id| i64::try_from(id).ok())
                .map(brt_band_color)
                .unwrap_or_else(|| brt_band_color(0))
                .to_string(),
        }
    }
}

pub fn to_lat_lon([lon, lat]: LonLat) -> LatLon {
    [lat, lon]
}

struct Pending {
    color: String,
    shapes_id: Option<i64>,
    lines: Vec<Vec<LatLon>>,
}

/// One shape per distinct route id, lines in first-seen feature order,
/// returned sorted by numeric route id.
pub fn aggregate_shapes<I>(features: I, rule: ColorRule) -> Vec<ShapeFeature>
where
    I: IntoIterator<Item = RawShape>,
{
    let mut by_route: IndexMap<String, Pending> = IndexMap::new();

    for feature in features {
        let color = rule.color_for(&feature);
        let pending = by_route
            .entry(feature.route_id.clone())
            .or_insert_with(|| Pending {
                color,
                shapes_id: feature.gid,
                lines: Vec::new(),
            });
        pending.lines.extend(
            feature
                .paths
                .into_iter()
                .map(|path| path.into_iter().map(to_lat_lon).collect::<Vec<_>>()),
        );
    }

    let shapes = by_route
        .into_iter()
        .map(|(route_id, p)| ShapeFeature::new(route_id, p.color, p.shapes_id, p.lines))
        .collect();
    sort_shapes(shapes)
}
