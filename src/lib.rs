pub mod collate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod generators;
pub mod merge;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod shapes;
pub mod sort;
pub mod sources;
pub mod terminus;
pub mod tracker;
