//! Final orderings of the published collections.
//!
//! All sorts are stable: records comparing equal keep their input order.

use crate::collate::{cmp_numeric_ids, locale_cmp};
use crate::model::{Route, ShapeFeature, Stop};

pub fn sort_stops(mut stops: Vec<Stop>) -> Vec<Stop> {
    stops.sort_by(|a, b| locale_cmp(&a.name, &b.name));
    stops
}

/// For sources whose route ids are line numbers.
pub fn sort_routes_by_id(mut routes: Vec<Route>) -> Vec<Route> {
    routes.sort_by(|a, b| cmp_numeric_ids(&a.id, &b.id));
    routes
}

/// For sources whose route ids are opaque and the short name is what riders see.
pub fn sort_routes_by_short_name(mut routes: Vec<Route>) -> Vec<Route> {
    routes.sort_by(|a, b| locale_cmp(&a.name_short, &b.name_short));
    routes
}

pub fn sort_shapes(mut shapes: Vec<ShapeFeature>) -> Vec<ShapeFeature> {
    shapes.sort_by(|a, b| cmp_numeric_ids(a.route_id(), b.route_id()));
    shapes
}
