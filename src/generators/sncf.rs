//! Regional rail: stations and TER routes from the national GTFS archive.
//!
//! Both artifacts come from one download. Route termini are named from the
//! route long name and ordered with the timetable-detail service.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{Generator, ROUTES_FILE, STOPS_FILE};
use crate::config::{LookupFailurePolicy, PipelineConfig, SncfConfig};
use crate::fetch::{HttpClient, Retrying, fetch_bytes, with_retries};
use crate::merge::merge_stops;
use crate::model::{RawStop, Route};
use crate::output::Artifact;
use crate::sort::sort_routes_by_short_name;
use crate::sources::gtfs::{self, GtfsArchive, RouteRow};
use crate::sources::timetable::{HttpTimetableLookup, TimetableLookup};
use crate::terminus::{Orientation, StopNameTable, candidates};

pub const CATEGORY: &str = "sncf";

pub struct SncfGenerator<C> {
    client: Retrying<C>,
    lookup: Arc<dyn TimetableLookup>,
    archive_url: String,
    config: SncfConfig,
}

impl<C: HttpClient + Clone + 'static> SncfGenerator<C> {
    pub fn new(client: C, config: &PipelineConfig) -> Self {
        let client = with_retries(client, &config.http);
        let lookup = HttpTimetableLookup::new(client.clone(), &config.endpoints.timetable_lines);
        Self {
            client,
            lookup: Arc::new(lookup),
            archive_url: config.endpoints.sncf_gtfs_zip.clone(),
            config: config.sncf.clone(),
        }
    }
}

fn core_station_ids(stations: &[RawStop]) -> HashSet<String> {
    stations
        .iter()
        .filter(|s| s.in_core_area == Some(true))
        .map(|s| s.id.clone())
        .collect()
}

/// Authoritative first station of every route, in `rows` order.
///
/// Lookups run concurrently inside a [`JoinSet`]. Under
/// [`LookupFailurePolicy::Fail`] the first failure returns at once, and
/// dropping the set aborts the lookups still in flight.
async fn first_stop_areas(
    rows: &[RouteRow],
    lookup: Arc<dyn TimetableLookup>,
    config: &SncfConfig,
) -> Result<Vec<crate::error::Result<String>>> {
    let semaphore = Arc::new(Semaphore::new(config.lookup_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (index, row) in rows.iter().enumerate() {
        let lookup = lookup.clone();
        let sem = semaphore.clone();
        let route_id = row.route_id.clone();
        tasks.spawn(async move {
            let _permit = sem.acquire().await.ok();
            (index, lookup.first_stop_area(&route_id).await)
        });
    }

    let mut outcomes: Vec<Option<crate::error::Result<String>>> = rows.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.map_err(|e| anyhow!("timetable lookup aborted: {e}"))?;
        let outcome = match outcome {
            Err(e) if config.on_lookup_failure == LookupFailurePolicy::Fail => {
                let route_id = &rows[index].route_id;
                return Err(e).with_context(|| format!("ordering termini of route {route_id}"));
            }
            outcome => outcome,
        };
        outcomes[index] = Some(outcome);
    }

    outcomes
        .into_iter()
        .zip(rows)
        .map(|(outcome, row)| {
            outcome.ok_or_else(|| anyhow!("no timetable lookup result for route {}", row.route_id))
        })
        .collect()
}

/// Builds both artifacts from the downloaded archive.
pub async fn build(
    archive: &mut GtfsArchive,
    config: &SncfConfig,
    lookup: Arc<dyn TimetableLookup>,
) -> Result<Vec<Artifact>> {
    let stations = gtfs::parse_stations(
        &archive.read_file(gtfs::STOPS_FILE)?,
        &config.region_bbox,
        &config.core_bbox,
    )?;
    let core_ids = core_station_ids(&stations);
    let stops = merge_stops(stations);
    info!(
        stations = stops.len(),
        core_stations = core_ids.len(),
        "SNCF stations merged"
    );

    let selected = gtfs::ter_trips_through(&archive.read_file(gtfs::STOP_TIMES_FILE)?, &core_ids)?;
    let trips = gtfs::trips_by_route(&archive.read_file(gtfs::TRIPS_FILE)?, &selected)?;
    let rows = gtfs::routes_named(&archive.read_file(gtfs::ROUTES_FILE)?, &trips)?;
    debug!(trips = selected.len(), routes = rows.len(), "TER routes selected");

    let table = StopNameTable::from_stops(&stops);
    let outcomes = first_stop_areas(&rows, lookup, config).await?;

    let mut routes = Vec::with_capacity(rows.len());
    for (row, outcome) in rows.into_iter().zip(outcomes) {
        let ends = candidates(&row.route_long_name, &table);

        let orientation = match outcome {
            Ok(first) => ends.orientation_from(&first),
            Err(e) => match config.on_lookup_failure {
                LookupFailurePolicy::Fail => {
                    return Err(e).with_context(|| format!("ordering termini of route {}", row.route_id));
                }
                LookupFailurePolicy::SkipRoute => {
                    warn!(route_id = %row.route_id, error = %e, "Timetable lookup failed, route skipped");
                    continue;
                }
                LookupFailurePolicy::KeepNameOrder => {
                    warn!(route_id = %row.route_id, error = %e, "Timetable lookup failed, keeping name order");
                    Orientation::NameOrder
                }
            },
        };

        if ends.first_name.is_empty() {
            warn!(route_id = %row.route_id, long_name = %row.route_long_name, "No place names in long name");
        }

        let name = if row.route_long_name.is_empty() {
            row.route_short_name.clone()
        } else {
            row.route_long_name.clone()
        };
        routes.push(Route {
            trip_ids: Some(trips.get(&row.route_id).cloned().unwrap_or_default()),
            terminus: ends.place(orientation).to_vec(),
            id: row.route_id,
            name,
            name_short: row.route_short_name,
        });
    }
    let routes = sort_routes_by_short_name(routes);
    info!(routes = routes.len(), "SNCF routes built");

    Ok(vec![
        Artifact::from_collection(CATEGORY, STOPS_FILE, &stops)?,
        Artifact::from_collection(CATEGORY, ROUTES_FILE, &routes)?,
    ])
}

#[async_trait]
impl<C: HttpClient + Clone + 'static> Generator for SncfGenerator<C> {
    fn category(&self) -> &'static str {
        CATEGORY
    }

    #[tracing::instrument(skip(self), fields(category = CATEGORY))]
    async fn generate(&self) -> Result<Vec<Artifact>> {
        let bytes = fetch_bytes(&self.client, &self.archive_url)
            .await
            .context("downloading SNCF GTFS archive")?;
        info!(bytes = bytes.len(), "SNCF GTFS archive downloaded");

        let mut archive = GtfsArchive::from_bytes(&self.archive_url, bytes)?;
        build(&mut archive, &self.config, self.lookup.clone()).await
    }
}
