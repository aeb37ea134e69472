use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use transit_static_gen::config::{LookupFailurePolicy, SncfConfig, TbmConfig};
use transit_static_gen::error::{PipelineError, Result as PipelineResult};
use transit_static_gen::generators::{Generator, ROUTES_FILE, SHAPES_FILE, STOPS_FILE, brt, sncf, tbm};
use transit_static_gen::model::{Route, ShapeFeature, Stop, Terminus};
use transit_static_gen::output::Artifact;
use transit_static_gen::pipeline::{self, METADATA_FILE};
use transit_static_gen::sources::gtfs::GtfsArchive;
use transit_static_gen::sources::timetable::TimetableLookup;
use transit_static_gen::tracker::{BuildMetadata, content_hash};

fn temp_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("transit_static_gen_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn artifact<'a>(artifacts: &'a [Artifact], file: &str) -> &'a Artifact {
    artifacts
        .iter()
        .find(|a| a.file == file)
        .unwrap_or_else(|| panic!("no artifact {file}"))
}

fn terminus(direction: &str, id: &str) -> Terminus {
    Terminus {
        direction: direction.to_string(),
        id: id.to_string(),
    }
}

#[test]
fn test_brt_build_merges_and_aggregates() {
    let artifacts = brt::build(
        include_bytes!("fixtures/brt_stops.geojson"),
        include_bytes!("fixtures/brt_paths.geojson"),
    )
    .unwrap();
    assert_eq!(artifacts.len(), 2);

    let stops: Vec<Stop> = serde_json::from_slice(&artifact(&artifacts, STOPS_FILE).bytes).unwrap();
    let names: Vec<&str> = stops.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["bègles", "Bègles", "Bordeaux", "Pessac Centre"]);

    let pessac = &stops[3];
    assert_eq!(pessac.ids, vec!["311", "4021"]);
    assert_eq!(pessac.position_by_id["4021"], [-0.6321, 44.7936]);
    assert!(!pessac.ids.contains(&"9999".to_string()));

    let shapes: Vec<ShapeFeature> = serde_json::from_slice(&artifact(&artifacts, SHAPES_FILE).bytes).unwrap();
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].route_id(), "123");
    assert_eq!(shapes[0].properties.route_color, "rgb(131,31,130)");
    assert_eq!(shapes[0].properties.shapes_id, Some(502));
    assert_eq!(shapes[0].geometry.coordinates.len(), 2);
    assert_eq!(shapes[0].geometry.coordinates[0][0], [44.90, -0.50]);

    assert_eq!(shapes[1].route_id(), "160");
    assert_eq!(shapes[1].properties.route_color, "rgb(229,0,64)");
    assert_eq!(shapes[1].properties.shapes_id, Some(501));
    assert_eq!(
        shapes[1].geometry.coordinates,
        vec![
            vec![[44.80, -0.61], [44.81, -0.60]],
            vec![[44.82, -0.62], [44.83, -0.63]],
        ]
    );
}

#[test]
fn test_brt_build_is_deterministic() {
    let a = brt::build(
        include_bytes!("fixtures/brt_stops.geojson"),
        include_bytes!("fixtures/brt_paths.geojson"),
    )
    .unwrap();
    let b = brt::build(
        include_bytes!("fixtures/brt_stops.geojson"),
        include_bytes!("fixtures/brt_paths.geojson"),
    )
    .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_tbm_build() {
    let artifacts = tbm::build(
        include_bytes!("fixtures/siri_stop_points.json"),
        include_bytes!("fixtures/siri_lines.json"),
        include_bytes!("fixtures/tbm_shapes.geojson"),
        &TbmConfig::default(),
    )
    .unwrap();
    assert_eq!(artifacts.len(), 3);

    let stops: Vec<Stop> = serde_json::from_slice(&artifact(&artifacts, STOPS_FILE).bytes).unwrap();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0].name, "Gare Saint-Jean");
    assert_eq!(stops[1].name, "Quinconces");
    assert_eq!(stops[1].ids, vec!["205", "3713"]);
    assert_eq!(
        stops[1].lines_by_id["3713"].iter().collect::<Vec<_>>(),
        vec!["B", "C"]
    );
    assert_eq!(
        stops[1].lines_by_id["205"].iter().collect::<Vec<_>>(),
        vec!["59"]
    );

    let routes: Vec<Route> = serde_json::from_slice(&artifact(&artifacts, ROUTES_FILE).bytes).unwrap();
    let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["5", "59", "B"]);

    // Duplicate labels collapse, keeping the first direction reference.
    assert_eq!(
        routes[0].terminus,
        vec![terminus("Lac", "0"), terminus("Gare Saint-Jean", "2")]
    );
    // Pass-through line keeps the raw alias list.
    assert_eq!(routes[1].terminus[0], terminus("Lac / Lác", "0"));
    assert_eq!(routes[2].name, "B");
    assert_eq!(routes[2].terminus[0], terminus("Pessac Centre", "0"));
    assert!(routes.iter().all(|r| r.trip_ids.is_none()));

    let shapes: Vec<ShapeFeature> = serde_json::from_slice(&artifact(&artifacts, SHAPES_FILE).bytes).unwrap();
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].route_id(), "3");
    assert_eq!(shapes[1].route_id(), "12");
    assert_eq!(shapes[1].properties.route_color, "E5004A");
    assert_eq!(shapes[1].geometry.coordinates.len(), 2);
    assert_eq!(shapes[1].properties.shapes_id, None);
}

#[test]
fn test_tbm_build_rejects_bad_lines_payload() {
    let result = tbm::build(
        include_bytes!("fixtures/siri_stop_points.json"),
        b"<html>maintenance</html>",
        include_bytes!("fixtures/tbm_shapes.geojson"),
        &TbmConfig::default(),
    );
    assert!(result.is_err());
}

struct FakeLookup {
    answers: HashMap<String, std::result::Result<String, String>>,
}

impl FakeLookup {
    fn new(answers: &[(&str, std::result::Result<&str, &str>)]) -> Arc<dyn TimetableLookup> {
        Arc::new(Self {
            answers: answers
                .iter()
                .map(|(route, answer)| {
                    (
                        route.to_string(),
                        answer.map(str::to_string).map_err(str::to_string),
                    )
                })
                .collect(),
        })
    }
}

#[async_trait]
impl TimetableLookup for FakeLookup {
    async fn first_stop_area(&self, route_id: &str) -> PipelineResult<String> {
        match self.answers.get(route_id) {
            Some(Ok(id)) => Ok(id.clone()),
            Some(Err(reason)) => Err(PipelineError::retrieval(route_id, reason)),
            None => Err(PipelineError::retrieval(route_id, "unknown route")),
        }
    }
}

fn sncf_archive() -> GtfsArchive {
    let members = [
        ("stops.txt", include_str!("fixtures/sncf/stops.txt")),
        ("stop_times.txt", include_str!("fixtures/sncf/stop_times.txt")),
        ("trips.txt", include_str!("fixtures/sncf/trips.txt")),
        ("routes.txt", include_str!("fixtures/sncf/routes.txt")),
    ];
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        for (name, text) in members {
            writer
                .start_file(name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(text.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    GtfsArchive::from_bytes("export-opendata-sncf-gtfs.zip", buf.into_inner()).unwrap()
}

const BORDEAUX: &str = "StopArea:OCE87581009";
const ARCACHON: &str = "StopArea:OCE87581538";
const PERIGUEUX: &str = "StopArea:OCE87595009";

async fn build_sncf(
    lookup: Arc<dyn TimetableLookup>,
    policy: LookupFailurePolicy,
) -> anyhow::Result<(Vec<Stop>, Vec<Route>)> {
    let config = SncfConfig {
        on_lookup_failure: policy,
        ..SncfConfig::default()
    };
    let artifacts = sncf::build(&mut sncf_archive(), &config, lookup).await?;
    let stops = serde_json::from_slice(&artifact(&artifacts, STOPS_FILE).bytes)?;
    let routes = serde_json::from_slice(&artifact(&artifacts, ROUTES_FILE).bytes)?;
    Ok((stops, routes))
}

#[tokio::test]
async fn test_sncf_build_orders_termini() {
    let lookup = FakeLookup::new(&[
        ("FR:Line::ARC:", Ok(BORDEAUX)),
        ("FR:Line::PGX:", Ok(BORDEAUX)),
    ]);
    let (stops, routes) = build_sncf(lookup, LookupFailurePolicy::Fail).await.unwrap();

    let names: Vec<&str> = stops.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Agen", "Arcachon", "Bordeaux Saint-Jean", "Libourne", "Périgueux"]
    );
    let agen = &stops[0];
    assert_eq!(agen.in_core_area, Some(false));
    assert_eq!(stops[2].in_core_area, Some(true));
    assert_eq!(stops[2].position_by_id[BORDEAUX], [-0.55627, 44.82577]);

    // Trips only calling outside the core area, or not TER, select no route.
    let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["FR:Line::ARC:", "FR:Line::PGX:"]);

    let arcachon = &routes[0];
    assert_eq!(arcachon.name_short, "K31");
    assert_eq!(arcachon.name, "31. Bordeaux - Arcachon");
    assert_eq!(arcachon.trip_ids, Some(vec!["OCESN866201F".to_string()]));
    // Timetable starts from the first-named place: name order is reversed.
    assert_eq!(
        arcachon.terminus,
        vec![terminus("Arcachon", ARCACHON), terminus("Bordeaux", BORDEAUX)]
    );

    // Timetable starts from the last-named place: name order is kept.
    assert_eq!(
        routes[1].terminus,
        vec![terminus("Périgueux", PERIGUEUX), terminus("Bordeaux", BORDEAUX)]
    );
}

#[tokio::test]
async fn test_sncf_lookup_failure_aborts_by_default() {
    let lookup = FakeLookup::new(&[("FR:Line::PGX:", Ok(BORDEAUX))]);
    let err = build_sncf(lookup, LookupFailurePolicy::Fail).await.unwrap_err();
    assert!(format!("{err:#}").contains("FR:Line::ARC:"));
}

#[tokio::test]
async fn test_sncf_lookup_failure_can_skip_route() {
    let lookup = FakeLookup::new(&[("FR:Line::PGX:", Ok(BORDEAUX))]);
    let (_, routes) = build_sncf(lookup, LookupFailurePolicy::SkipRoute).await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].id, "FR:Line::PGX:");
}

#[tokio::test]
async fn test_sncf_lookup_failure_can_keep_name_order() {
    let lookup = FakeLookup::new(&[
        ("FR:Line::ARC:", Err("timeout")),
        ("FR:Line::PGX:", Ok(BORDEAUX)),
    ]);
    let (_, routes) = build_sncf(lookup, LookupFailurePolicy::KeepNameOrder)
        .await
        .unwrap();
    assert_eq!(
        routes[0].terminus,
        vec![terminus("Bordeaux", BORDEAUX), terminus("Arcachon", ARCACHON)]
    );
}

/// Fails one route at once and answers every other route after a delay.
struct SlowLookup {
    failing_route: &'static str,
    delay: Duration,
    completed: Arc<AtomicUsize>,
}

#[async_trait]
impl TimetableLookup for SlowLookup {
    async fn first_stop_area(&self, route_id: &str) -> PipelineResult<String> {
        if route_id == self.failing_route {
            return Err(PipelineError::retrieval(route_id, "status 500"));
        }
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(BORDEAUX.to_string())
    }
}

#[tokio::test]
async fn test_sncf_failure_aborts_pending_lookups() {
    let completed = Arc::new(AtomicUsize::new(0));
    let lookup = Arc::new(SlowLookup {
        failing_route: "FR:Line::PGX:",
        delay: Duration::from_millis(200),
        completed: completed.clone(),
    });

    let result = build_sncf(lookup, LookupFailurePolicy::Fail).await;
    assert!(result.is_err());
    assert_eq!(completed.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}

/// Publishes one stops collection whose content and outcome the test controls.
#[derive(Clone)]
struct FakeGenerator {
    category: &'static str,
    state: Arc<Mutex<(Vec<String>, bool)>>,
}

impl FakeGenerator {
    fn new(category: &'static str, names: &[&str], fail: bool) -> Self {
        Self {
            category,
            state: Arc::new(Mutex::new((names.iter().map(|s| s.to_string()).collect(), fail))),
        }
    }

    fn set_names(&self, names: &[&str]) {
        self.state.lock().unwrap().0 = names.iter().map(|s| s.to_string()).collect();
    }

    fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().1 = fail;
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    fn category(&self) -> &'static str {
        self.category
    }

    async fn generate(&self) -> anyhow::Result<Vec<Artifact>> {
        let (names, fail) = self.state.lock().unwrap().clone();
        if fail {
            anyhow::bail!("upstream down");
        }
        Ok(vec![Artifact::from_collection(self.category, STOPS_FILE, &names)?])
    }
}

fn boxed(generators: &[&FakeGenerator]) -> Vec<Box<dyn Generator>> {
    generators
        .iter()
        .map(|g| Box::new((*g).clone()) as Box<dyn Generator>)
        .collect()
}

#[tokio::test]
async fn test_failed_category_does_not_stop_others() {
    let dir = temp_dir("isolation");
    let ok = FakeGenerator::new("brt", &["Pessac Centre"], false);
    let broken = FakeGenerator::new("sncf", &[], true);

    let summary = pipeline::run(&boxed(&[&broken, &ok]), &dir).await;

    assert!(!summary.is_success());
    assert_eq!(summary.failed, vec!["sncf"]);
    assert_eq!(summary.succeeded, vec!["brt"]);
    assert_eq!(summary.updated, vec!["brt/stops.json"]);
    assert!(dir.join("brt").join(STOPS_FILE).exists());
    assert!(!dir.join("sncf").exists());

    let meta = BuildMetadata::load(&dir.join(METADATA_FILE));
    assert!(meta.get("brt", STOPS_FILE).is_some());
    assert!(meta.get("sncf", STOPS_FILE).is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_unchanged_rebuild_keeps_stamp() {
    let dir = temp_dir("unchanged");
    let generator = FakeGenerator::new("tbm", &["Quinconces"], false);
    let generators = boxed(&[&generator]);

    let first = pipeline::run(&generators, &dir).await;
    assert!(first.is_success());
    assert_eq!(first.updated.len(), 1);
    let stamp = BuildMetadata::load(&dir.join(METADATA_FILE))
        .get("tbm", STOPS_FILE)
        .cloned()
        .unwrap();

    let second = pipeline::run(&generators, &dir).await;
    assert!(second.is_success());
    assert!(second.updated.is_empty());
    let meta = BuildMetadata::load(&dir.join(METADATA_FILE));
    assert_eq!(meta.get("tbm", STOPS_FILE), Some(&stamp));

    generator.set_names(&["Quinconces", "Gare Saint-Jean"]);
    let third = pipeline::run(&generators, &dir).await;
    assert_eq!(third.updated, vec!["tbm/stops.json"]);
    let meta = BuildMetadata::load(&dir.join(METADATA_FILE));
    let refreshed = meta.get("tbm", STOPS_FILE).unwrap();
    assert_ne!(refreshed.content_hash, stamp.content_hash);
    assert!(refreshed.last_updated >= stamp.last_updated);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_failure_keeps_previous_artifacts() {
    let dir = temp_dir("keep_previous");
    let generator = FakeGenerator::new("brt", &["Talence"], false);
    let generators = boxed(&[&generator]);

    assert!(pipeline::run(&generators, &dir).await.is_success());
    let path = dir.join("brt").join(STOPS_FILE);
    let published = std::fs::read(&path).unwrap();
    let stamp = BuildMetadata::load(&dir.join(METADATA_FILE))
        .get("brt", STOPS_FILE)
        .cloned();

    generator.set_fail(true);
    let summary = pipeline::run(&generators, &dir).await;
    assert_eq!(summary.failed, vec!["brt"]);
    assert_eq!(std::fs::read(&path).unwrap(), published);
    assert_eq!(
        BuildMetadata::load(&dir.join(METADATA_FILE))
            .get("brt", STOPS_FILE)
            .cloned(),
        stamp
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_corrupt_metadata_is_rebuilt() {
    let dir = temp_dir("corrupt_meta");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(METADATA_FILE), b"{not json").unwrap();

    let generator = FakeGenerator::new("brt", &["Talence"], false);
    let summary = pipeline::run(&boxed(&[&generator]), &dir).await;

    assert!(summary.is_success());
    assert_eq!(summary.updated, vec!["brt/stops.json"]);
    assert!(BuildMetadata::load(&dir.join(METADATA_FILE))
        .get("brt", STOPS_FILE)
        .is_some());

    let _ = std::fs::remove_dir_all(&dir);
}

/// Publishes the same names as both stops and routes.
struct PairGenerator(Vec<String>);

#[async_trait]
impl Generator for PairGenerator {
    fn category(&self) -> &'static str {
        "sncf"
    }

    async fn generate(&self) -> anyhow::Result<Vec<Artifact>> {
        Ok(vec![
            Artifact::from_collection("sncf", STOPS_FILE, &self.0)?,
            Artifact::from_collection("sncf", ROUTES_FILE, &self.0)?,
        ])
    }
}

#[tokio::test]
async fn test_unwritable_artifact_keeps_category_consistent() {
    let dir = temp_dir("unwritable");
    let first: Vec<Box<dyn Generator>> = vec![Box::new(PairGenerator(vec!["old".to_string()]))];
    assert!(pipeline::run(&first, &dir).await.is_success());

    let routes_path = dir.join("sncf").join(ROUTES_FILE);
    std::fs::remove_file(&routes_path).unwrap();
    std::fs::create_dir_all(&routes_path).unwrap();

    let second: Vec<Box<dyn Generator>> = vec![Box::new(PairGenerator(vec!["new".to_string()]))];
    let summary = pipeline::run(&second, &dir).await;
    assert_eq!(summary.failed, vec!["sncf"]);

    let stops_on_disk = std::fs::read(dir.join("sncf").join(STOPS_FILE)).unwrap();
    assert_eq!(stops_on_disk, br#"["old"]"#);
    assert!(!dir.join("sncf").join("stops.json.tmp").exists());

    let meta = BuildMetadata::load(&dir.join(METADATA_FILE));
    assert_eq!(
        meta.get("sncf", STOPS_FILE).map(|s| s.content_hash.clone()),
        Some(content_hash(&stops_on_disk))
    );

    let _ = std::fs::remove_dir_all(&dir);
}
