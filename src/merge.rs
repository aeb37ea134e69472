//! Collapses per-source stop records into canonical stops keyed by name.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::collate::cmp_numeric_ids;
use crate::model::{RawStop, Stop};
use crate::sort::sort_stops;

/// Canonical stops by exact display name, in first-seen order.
pub type StopIndex = IndexMap<String, Stop>;

fn seed(record: RawStop) -> Stop {
    let mut stop = Stop {
        name: record.name,
        ids: Vec::new(),
        lines_by_id: Default::default(),
        position_by_id: Default::default(),
        in_core_area: record.in_core_area,
    };
    if !record.lines.is_empty() {
        stop.lines_by_id
            .insert(record.id.clone(), record.lines.into_iter().collect());
    }
    if let Some(position) = record.position {
        stop.position_by_id.insert(record.id.clone(), position);
    }
    stop.ids.push(record.id);
    stop
}

/// Folds one record into `index`.
///
/// Names match exactly (case-sensitive). An id already listed keeps the
/// attributes it was first seen with.
pub fn merge_one(mut index: StopIndex, record: RawStop) -> StopIndex {
    let Some(stop) = index.get_mut(&record.name) else {
        let stop = seed(record);
        index.insert(stop.name.clone(), stop);
        return index;
    };

    if !stop.ids.contains(&record.id) {
        stop.ids.push(record.id.clone());
    }
    if !record.lines.is_empty() {
        stop.lines_by_id
            .entry(record.id.clone())
            .or_insert_with(|| record.lines.iter().cloned().collect::<BTreeSet<_>>());
    }
    if let Some(position) = record.position {
        stop.position_by_id.entry(record.id.clone()).or_insert(position);
    }
    stop.in_core_area = match (stop.in_core_area, record.in_core_area) {
        (Some(a), Some(b)) => Some(a || b),
        (a, b) => a.or(b),
    };
    stop.ids.sort_by(|a, b| cmp_numeric_ids(a, b));

    index
}

/// Merges `records` in input order and returns the stops sorted by name.
pub fn merge_stops<I>(records: I) -> Vec<Stop>
where
    I: IntoIterator<Item = RawStop>,
{
    let index = records.into_iter().fold(StopIndex::new(), merge_one);
    sort_stops(index.into_values().collect())
}
