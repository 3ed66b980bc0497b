/// Integration tests for the outbreak map pipeline
///
/// These tests verify:
/// 1. A report fixture flows through ReportStore → OutbreakMap → GeoJSON
/// 2. Out-of-range reports are skipped with a warning, never dropped silently
/// 3. A failed fetch leaves zero markers and does not panic
/// 4. A slow, older fetch cannot overwrite a newer one
/// 5. Unmount clears the map, and results arriving after it change nothing
///
/// No network access is needed; report sources are fixture files or
/// in-memory fakes.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use cdews_client::analysis::groupings::group_by_disease;
use cdews_client::dashboard::{Dashboard, Services};
use cdews_client::diseases::MarkerColor;
use cdews_client::ingest::fixture::FixtureReportSource;
use cdews_client::ingest::predict::PredictionService;
use cdews_client::ingest::reports::{ReportBatch, ReportSource, ReportStore};
use cdews_client::map::{MapView, OutbreakMap};
use cdews_client::model::{
    Coordinates, FetchError, ImageUpload, PredictionResult, Report, ReportId, SubmitError,
};
use cdews_client::submission::FixedGeolocator;

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const FIXTURE: &str = r#"[
    {"id": 1, "lat": 28.6139, "long": 77.2090, "disease": "Potato___Early_blight"},
    {"id": 2, "lat": 19.0760, "long": 72.8777, "disease": "Tomato___Late_blight"},
    {"id": "field-3", "lat": 12.9716, "long": 77.5946, "disease": "Tomato___healthy"},
    {"id": 4, "lat": 22.5726, "long": 88.3639, "disease": "Potato___Early_blight"},
    {"id": 5, "lat": 91.0, "long": 77.0, "disease": "Tomato___Late_blight"},
    {"id": 6, "lat": 26.8467, "long": 80.9462, "disease": "Unknown___Disease"}
]"#;

fn fixture_file(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(body.as_bytes()).expect("write fixture");
    file
}

fn report(id: i64, disease: &str) -> Report {
    Report {
        id: ReportId::Number(id),
        lat: 20.0 + id as f64 * 0.1,
        long: 78.0,
        disease: disease.to_string(),
    }
}

struct NoPredictions;

impl PredictionService for NoPredictions {
    fn predict(&self, _: &ImageUpload, _: Coordinates) -> Result<PredictionResult, SubmitError> {
        Err(SubmitError::Network("not used in these tests".to_string()))
    }
}

fn dashboard_with(source: Arc<dyn ReportSource + Send + Sync>) -> Dashboard {
    Dashboard::new(
        Services {
            reports: source,
            geolocator: Arc::new(FixedGeolocator(None)),
            predictor: Arc::new(NoPredictions),
        },
        MapView::default(),
        15,
    )
}

/// First call blocks until released and returns `first`; every later call
/// returns `second` immediately.
struct GatedSource {
    calls: AtomicUsize,
    entered: Mutex<Sender<()>>,
    gate: Mutex<Receiver<()>>,
    first: Vec<Report>,
    second: Vec<Report>,
}

impl GatedSource {
    fn new(first: Vec<Report>, second: Vec<Report>) -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let source = Arc::new(Self {
            calls: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            gate: Mutex::new(gate_rx),
            first,
            second,
        });
        (source, entered_rx, gate_tx)
    }
}

impl ReportSource for GatedSource {
    fn fetch_reports(&self) -> Result<ReportBatch, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.gate.lock().unwrap().recv();
            return Ok(ReportBatch {
                reports: self.first.clone(),
                rejected: 0,
            });
        }
        Ok(ReportBatch {
            reports: self.second.clone(),
            rejected: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Fixture → map
// ---------------------------------------------------------------------------

#[test]
fn test_fixture_to_markers_and_geojson() {
    let file = fixture_file(FIXTURE);
    let source = FixtureReportSource::new(file.path());

    let mut store = ReportStore::new();
    let now = Utc.with_ymd_and_hms(2024, 7, 15, 6, 30, 0).unwrap();
    let count = store.refresh(&source, now).expect("fixture should load");
    assert_eq!(count, 6);
    assert_eq!(store.fetched_at(), Some(now));

    let mut map = OutbreakMap::default();
    map.show_reports(store.reports());

    // One report is out of range; every other one gets exactly one marker.
    assert_eq!(map.markers().len(), 5);
    assert_eq!(map.warnings().len(), 1);
    assert_eq!(map.warnings()[0].report_id, ReportId::Number(5));

    let unknown = map
        .markers()
        .iter()
        .find(|m| m.report_id == ReportId::Number(6))
        .expect("unknown label still plotted");
    assert_eq!(unknown.descriptor.marker, MarkerColor::Grey);
    assert_eq!(unknown.popup(), "Unknown Disease");

    let text_id = map
        .markers()
        .iter()
        .find(|m| m.report_id == ReportId::Text("field-3".to_string()))
        .expect("string ids are kept");
    assert_eq!(text_id.descriptor.marker, MarkerColor::Green);

    let geojson = map.to_geojson();
    assert_eq!(geojson.features.len(), 5);
    let json = geojson.to_string();
    assert!(json.contains("\"FeatureCollection\""));
    assert!(json.contains("Potato Early Blight"));
}

#[test]
fn test_bundled_fixture_is_fully_plottable() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/reports.json");
    let mut dash = dashboard_with(Arc::new(FixtureReportSource::new(path)));
    dash.mount();
    assert!(dash.wait_idle(WAIT));

    assert!(dash.store().last_error().is_none());
    assert_eq!(dash.map().markers().len(), dash.store().reports().len());
    assert!(dash.map().warnings().is_empty());
}

#[test]
fn test_grouping_counts_unplottable_reports_too() {
    let file = fixture_file(FIXTURE);
    let batch = FixtureReportSource::new(file.path())
        .fetch_reports()
        .expect("fixture should load");

    let rows = group_by_disease(&batch.reports);
    let late_blight = rows
        .iter()
        .find(|r| r.label == "Tomato___Late_blight")
        .unwrap();
    assert_eq!(late_blight.count, 2);
    assert_eq!(rows[0].count, 2);
}

#[test]
fn test_malformed_elements_are_skipped_not_fatal() {
    let file = fixture_file(
        r#"[
            {"id": 1, "lat": 28.6, "long": 77.2, "disease": "Tomato___healthy"},
            {"id": 2, "lat": "north", "long": 77.2, "disease": "Tomato___healthy"},
            {"lat": 10.0, "long": 77.2, "disease": "Tomato___healthy"}
        ]"#,
    );
    let batch = FixtureReportSource::new(file.path()).fetch_reports().unwrap();
    assert_eq!(batch.reports.len(), 1);
    assert_eq!(batch.rejected, 2);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_non_array_body_is_a_failed_fetch_with_zero_markers() {
    let file = fixture_file(r#"{"detail": "Internal Server Error"}"#);
    let mut dash = dashboard_with(Arc::new(FixtureReportSource::new(file.path())));
    dash.mount();
    assert!(dash.wait_idle(WAIT));

    assert!(dash.map().markers().is_empty());
    assert!(matches!(dash.store().last_error(), Some(FetchError::Parse(_))));
}

#[test]
fn test_failure_after_success_clears_the_map() {
    let file = fixture_file(FIXTURE);
    let mut dash = dashboard_with(Arc::new(FixtureReportSource::new(file.path())));
    dash.mount();
    assert!(dash.wait_idle(WAIT));
    assert_eq!(dash.map().markers().len(), 5);

    std::fs::write(file.path(), "not json").unwrap();
    dash.fetch_reports();
    assert!(dash.wait_idle(WAIT));
    assert!(dash.map().markers().is_empty());
    assert!(dash.store().reports().is_empty());
}

#[test]
fn test_refetch_keeps_user_view() {
    let file = fixture_file(FIXTURE);
    let mut dash = dashboard_with(Arc::new(FixtureReportSource::new(file.path())));
    let panned = MapView::new(Coordinates::new(23.0, 72.5), 11);
    dash.map_mut().set_view(panned);

    dash.mount();
    assert!(dash.wait_idle(WAIT));
    dash.fetch_reports();
    assert!(dash.wait_idle(WAIT));
    assert_eq!(dash.map().view(), panned);
}

// ---------------------------------------------------------------------------
// Ordering and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_slow_older_fetch_does_not_overwrite_newer() {
    let older = vec![report(1, "Tomato___healthy")];
    let newer = vec![
        report(2, "Potato___Early_blight"),
        report(3, "Potato___Early_blight"),
    ];
    let (source, entered, gate) = GatedSource::new(older, newer);

    let mut dash = dashboard_with(source);
    dash.mount();
    entered.recv_timeout(WAIT).expect("first fetch started");

    dash.fetch_reports();
    assert!(dash.process_next(WAIT), "second fetch should finish first");
    assert_eq!(dash.map().markers().len(), 2);

    gate.send(()).unwrap();
    assert!(dash.wait_idle(WAIT));
    assert_eq!(dash.map().markers().len(), 2);
    assert_eq!(dash.store().reports()[0].id, ReportId::Number(2));
}

#[test]
fn test_fetch_finishing_after_unmount_changes_nothing() {
    let (source, entered, gate) = GatedSource::new(vec![report(1, "Tomato___healthy")], vec![]);

    let mut dash = dashboard_with(source);
    dash.mount();
    entered.recv_timeout(WAIT).expect("fetch started");
    dash.unmount();

    gate.send(()).unwrap();
    assert!(dash.wait_idle(WAIT));
    assert!(dash.map().markers().is_empty());
    assert!(dash.store().fetched_at().is_none());
    assert!(!dash.fetch_reports(), "no new fetches once unmounted");
}

#[test]
fn test_unmount_clears_map_and_remount_refetches() {
    let file = fixture_file(FIXTURE);
    let mut dash = dashboard_with(Arc::new(FixtureReportSource::new(file.path())));
    dash.mount();
    assert!(dash.wait_idle(WAIT));
    assert_eq!(dash.map().markers().len(), 5);

    dash.unmount();
    assert!(dash.map().markers().is_empty());
    assert!(dash.map().warnings().is_empty());
    assert!(dash.store().reports().is_empty());

    dash.mount();
    assert!(dash.wait_idle(WAIT));
    assert_eq!(dash.map().markers().len(), 5);
}

#[test]
fn test_dropping_dashboard_with_fetch_in_flight_does_not_panic() {
    let (source, entered, gate) = GatedSource::new(vec![report(1, "Tomato___healthy")], vec![]);

    let mut dash = dashboard_with(source.clone());
    dash.mount();
    entered.recv_timeout(WAIT).expect("fetch started");
    drop(dash);

    // The worker's send fails quietly once the receiver is gone.
    gate.send(()).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}
