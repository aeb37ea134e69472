//! Per-category generators: fetch, adapt, merge/resolve/aggregate, sort.
//!
//! Each generator owns one source category and returns every artifact of
//! that category, or fails as a whole.

pub mod brt;
pub mod sncf;
pub mod tbm;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::fetch::HttpClient;
use crate::output::Artifact;

pub const STOPS_FILE: &str = "stops.json";
pub const ROUTES_FILE: &str = "routes.json";
pub const SHAPES_FILE: &str = "shapes.json";

/// Produces the artifacts of one source category.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Directory name under the data root, and key in `meta.json`.
    fn category(&self) -> &'static str;

    async fn generate(&self) -> Result<Vec<Artifact>>;
}

/// The three upstream categories, in the order they are built.
pub fn all<C>(client: C, config: &PipelineConfig) -> Vec<Box<dyn Generator>>
where
    C: HttpClient + Clone + 'static,
{
    vec![
        Box::new(brt::BrtGenerator::new(client.clone(), config)),
        Box::new(sncf::SncfGenerator::new(client.clone(), config)),
        Box::new(tbm::TbmGenerator::new(client, config)),
    ]
}
