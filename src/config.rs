//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every field is optional and falls back
//! to the values the generators were originally written against:
//! ```json
//! {
//!   "data_dir": "public/data",
//!   "http": { "max_retries": 5 },
//!   "sncf": { "on_lookup_failure": "keep_name_order" }
//! }
//! ```
//! `OPENDATA_API_KEY`, `SIRI_ACCOUNT_KEY` and `DATA_DIR` override the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub http: HttpConfig,
    pub endpoints: Endpoints,
    pub keys: ApiKeys,
    pub tbm: TbmConfig,
    pub sncf: SncfConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further attempt.
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub opendata_geojson: String,
    pub siri_base: String,
    pub tbm_shapes_geojson: String,
    pub sncf_gtfs_zip: String,
    pub timetable_lines: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// Sent as `key=` to the regional open-data service.
    pub opendata: String,
    /// Sent as `AccountKey=` to the SIRI discovery endpoints.
    pub siri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TbmConfig {
    /// Lines whose destination names are published verbatim.
    pub raw_direction_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// What to do with a route whose timetable lookup failed.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Abort the whole category.
    #[default]
    Fail,
    /// Drop the route from the artifact.
    SkipRoute,
    /// Keep the order in which the long name lists the termini.
    KeepNameOrder,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SncfConfig {
    /// Stops outside this box are not published.
    pub region_bbox: BoundingBox,
    /// Stops inside this box select which TER trips are kept.
    pub core_bbox: BoundingBox,
    pub lookup_concurrency: usize,
    pub on_lookup_failure: LookupFailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            http: HttpConfig::default(),
            endpoints: Endpoints::default(),
            keys: ApiKeys::default(),
            tbm: TbmConfig::default(),
            sncf: SncfConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            backoff_ms: 500,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            opendata_geojson: "https://data.bordeaux-metropole.fr/geojson".to_string(),
            siri_base: "https://bdx.mecatran.com/utw/ws/siri/2.0/bordeaux".to_string(),
            tbm_shapes_geojson: "https://transport.data.gouv.fr/resources/conversions/83024/GeoJSON"
                .to_string(),
            sncf_gtfs_zip:
                "https://eu.ftp.opendatasoft.com/sncf/plandata/export-opendata-sncf-gtfs.zip"
                    .to_string(),
            timetable_lines: "https://gateway-apim.infotbm.com/maas-web/web/v1/timetables/lines"
                .to_string(),
        }
    }
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            opendata: "258BILMNYZ".to_string(),
            siri: "opendata-bordeaux-metropole-flux-gtfs-rt".to_string(),
        }
    }
}

impl Default for TbmConfig {
    fn default() -> Self {
        Self {
            raw_direction_lines: ["59", "60", "61", "62", "901"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for SncfConfig {
    fn default() -> Self {
        Self {
            // Nouvelle-Aquitaine
            region_bbox: BoundingBox {
                min_lat: 42.77752,
                max_lat: 47.17576,
                min_lon: -1.79235,
                max_lon: 2.61157,
            },
            // Gironde
            core_bbox: BoundingBox {
                min_lat: 44.19381,
                max_lat: 45.57469,
                min_lon: -1.26205,
                max_lon: 0.31507,
            },
            lookup_concurrency: 4,
            on_lookup_failure: LookupFailurePolicy::Fail,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file '{path}'"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file '{path}'"))?;
        Ok(config)
    }

    /// Reads the optional file, then applies environment overrides.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENDATA_API_KEY") {
            self.keys.opendata = key;
        }
        if let Some(key) = lookup("SIRI_ACCOUNT_KEY") {
            self.keys.siri = key;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }
}
