//! Route endpoint naming, stop-id resolution and direction ordering.
//!
//! Everything here is pure. The one remote input, the first stop served
//! according to the timetable service, is passed in by the caller.

use indexmap::IndexMap;

use crate::collate::fold;
use crate::model::{Stop, Terminus};

/// Outcome of looking a place name up in a [`StopNameTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved,
}

impl Resolution {
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(id) => Some(id.as_str()),
            Resolution::Unresolved => None,
        }
    }

    pub fn or_fallback(self, fallback: &str) -> String {
        match self {
            Resolution::Resolved(id) => id,
            Resolution::Unresolved => fallback.to_string(),
        }
    }
}

/// Reduces `"Alias / Alias"` to one surface form.
///
/// Aliases that fold to the same text (diacritics and case ignored) count
/// once; the surface form of the first alias is returned.
pub fn clean_place_name(raw: &str) -> String {
    let mut seen: Vec<(String, &str)> = Vec::new();
    for alias in raw.split(" / ") {
        let key = fold(alias).trim().to_string();
        if !seen.iter().any(|(k, _)| *k == key) {
            seen.push((key, alias));
        }
    }
    seen.first()
        .map(|(_, alias)| alias.to_string())
        .unwrap_or_default()
}

/// Cleans `raw` unless `line_id` is on the pass-through list.
pub fn direction_label(line_id: &str, raw: &str, raw_lines: &[String]) -> String {
    if raw_lines.iter().any(|l| l == line_id) {
        raw.to_string()
    } else {
        clean_place_name(raw)
    }
}

/// One entry per distinct label, in upstream order, each keeping the
/// direction reference it was first published with.
pub fn distinct_directions(
    line_id: &str,
    destinations: &[(String, String)],
    raw_lines: &[String],
) -> Vec<Terminus> {
    let mut termini: Vec<Terminus> = Vec::new();
    for (direction_ref, place) in destinations {
        let direction = direction_label(line_id, place, raw_lines);
        if !termini.iter().any(|t| t.direction == direction) {
            termini.push(Terminus {
                direction,
                id: direction_ref.clone(),
            });
        }
    }
    termini
}

/// Lowercased stop name → first stop id, in stop order.
///
/// A later stop with the same lowercased name replaces the id but keeps the
/// position of the first one.
#[derive(Debug, Clone, Default)]
pub struct StopNameTable(IndexMap<String, String>);

impl StopNameTable {
    pub fn from_stops(stops: &[Stop]) -> Self {
        let mut table = IndexMap::new();
        for stop in stops {
            let id = stop.ids.first().cloned().unwrap_or_default();
            table.insert(stop.name.to_lowercase(), id);
        }
        Self(table)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First entry equal to `name` (case-insensitive) or containing it, or
    /// contained in it.
    ///
    /// This is a heuristic: a short table entry such as `"pau"` matches any
    /// longer name containing it, and the earliest such entry wins.
    pub fn resolve(&self, name: &str) -> Resolution {
        let target = name.trim().to_lowercase();
        self.0
            .iter()
            .find(|(entry, _)| {
                **entry == target || entry.contains(target.as_str()) || target.contains(entry.as_str())
            })
            .map(|(_, id)| Resolution::Resolved(id.clone()))
            .unwrap_or(Resolution::Unresolved)
    }
}

/// The two ends named by a route's long name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminusCandidates {
    pub first_name: String,
    pub first: Resolution,
    pub last_name: String,
    pub last: Resolution,
}

/// Place names listed in a long name such as `"12. Bordeaux - Libourne - Périgueux"`:
/// the text between the first and second `.`, split on `-`.
pub fn place_names(long_name: &str) -> Vec<String> {
    long_name
        .split('.')
        .nth(1)
        .unwrap_or("")
        .trim()
        .split('-')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First and last place of the long name, resolved against `table`.
///
/// An unparsable long name yields two empty, unresolved candidates.
pub fn candidates(long_name: &str, table: &StopNameTable) -> TerminusCandidates {
    let names = place_names(long_name);
    let first_name = names.first().cloned().unwrap_or_default();
    let last_name = names.last().cloned().unwrap_or_default();
    let resolve = |name: &str| {
        if name.is_empty() {
            Resolution::Unresolved
        } else {
            table.resolve(name)
        }
    };
    TerminusCandidates {
        first: resolve(&first_name),
        last: resolve(&last_name),
        first_name,
        last_name,
    }
}

/// Which candidate is published first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// First-named place, then last-named place.
    NameOrder,
    /// Last-named place, then first-named place.
    Reversed,
}

impl TerminusCandidates {
    /// Orientation implied by the stop the timetable service lists first.
    ///
    /// When that stop is the last-named candidate the name order is kept,
    /// otherwise it is reversed.
    pub fn orientation_from(&self, authoritative_first: &str) -> Orientation {
        if self.last.as_id() == Some(authoritative_first) {
            Orientation::NameOrder
        } else {
            Orientation::Reversed
        }
    }

    /// Always two entries; an unresolved end gets `"0"` in the first slot
    /// and `"1"` in the second.
    pub fn place(self, orientation: Orientation) -> [Terminus; 2] {
        let (a_name, a, b_name, b) = match orientation {
            Orientation::NameOrder => (self.first_name, self.first, self.last_name, self.last),
            Orientation::Reversed => (self.last_name, self.last, self.first_name, self.first),
        };
        [
            Terminus {
                direction: a_name,
                id: a.or_fallback("0"),
            },
            Terminus {
                direction: b_name,
                id: b.or_fallback("1"),
            },
        ]
    }
}
