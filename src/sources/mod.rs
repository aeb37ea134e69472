//! Per-source adapters turning fetched documents into intermediate records.
//!
//! Adapters only read the field paths they need and never validate whole
//! schemas. A missing required field is a [`crate::error::PipelineError::Parse`].

pub mod geojson;
pub mod gtfs;
pub mod opendata;
pub mod siri;
pub mod timetable;
