/// The dashboard: single owner of reports, map, submission and plan state.
///
/// All state changes happen on the thread that owns the `Dashboard`. The
/// three slow operations (reports fetch, geolocation, predict call) each run
/// on their own worker thread and send a `DashboardEvent` back over an mpsc
/// channel; none of them blocks the others. The owner applies events with
/// `process_next` / `pump` / `wait_idle`.
///
/// There is no cancellation. `unmount()` discards the report set, markers
/// and submission outcome; workers still finish, but their events are
/// dropped without touching state.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::ingest::predict::PredictionService;
use crate::ingest::reports::{FetchTicket, ReportBatch, ReportSource, ReportStore};
use crate::logging::{self, DataSource};
use crate::map::{MapView, OutbreakMap};
use crate::model::{
    Coordinates, FetchError, ImageUpload, PermissionError, PredictionResult, SubmitError,
    ValidationError,
};
use crate::planner::{self, PlanForm, PlanResult};
use crate::refresh;
use crate::submission::{AttemptId, Geolocator, Submission};

/// The external collaborators a dashboard talks to.
#[derive(Clone)]
pub struct Services {
    pub reports: Arc<dyn ReportSource + Send + Sync>,
    pub geolocator: Arc<dyn Geolocator + Send + Sync>,
    pub predictor: Arc<dyn PredictionService + Send + Sync>,
}

/// A completed background operation, tagged so stale results can be dropped.
#[derive(Debug)]
pub enum DashboardEvent {
    ReportsFetched {
        ticket: FetchTicket,
        result: Result<ReportBatch, FetchError>,
    },
    LocationResolved {
        attempt: AttemptId,
        position: Result<Coordinates, PermissionError>,
    },
    PredictionFinished {
        attempt: AttemptId,
        result: Result<PredictionResult, SubmitError>,
    },
}

pub struct Dashboard {
    services: Services,
    store: ReportStore,
    map: OutbreakMap,
    submission: Submission,
    plan_form: PlanForm,
    plan: Option<PlanResult>,
    max_age_minutes: u64,
    mounted: bool,
    in_flight: usize,
    tx: Sender<DashboardEvent>,
    rx: Receiver<DashboardEvent>,
}

impl Dashboard {
    pub fn new(services: Services, view: MapView, max_age_minutes: u64) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            services,
            store: ReportStore::new(),
            map: OutbreakMap::new(view),
            submission: Submission::new(),
            plan_form: PlanForm::default(),
            plan: None,
            max_age_minutes,
            mounted: false,
            in_flight: 0,
            tx,
            rx,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Marks the dashboard live and starts the initial reports fetch.
    pub fn mount(&mut self) {
        self.mounted = true;
        logging::debug(DataSource::System, None, "dashboard mounted");
        self.fetch_reports();
    }

    /// Discards reports, markers and the submission outcome. From here on,
    /// late worker results are dropped. The plan and map view are kept.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.store.clear();
        self.map.clear();
        self.submission.reset();
        logging::debug(
            DataSource::System,
            None,
            &format!("dashboard unmounted with {} operation(s) in flight", self.in_flight),
        );
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Number of worker results not yet received.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Starts a background fetch. Returns `false` when not mounted.
    pub fn fetch_reports(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        let ticket = self.store.begin_fetch();
        let source = Arc::clone(&self.services.reports);
        self.spawn_worker(
            "reports",
            move || DashboardEvent::ReportsFetched {
                ticket,
                result: source.fetch_reports(),
            },
            DashboardEvent::ReportsFetched {
                ticket,
                result: Err(FetchError::Network("could not start fetch worker".to_string())),
            },
        );
        true
    }

    /// Starts a fetch if the last successful one is older than the
    /// configured maximum age (or there never was one).
    pub fn refresh_if_stale_at(&mut self, now: DateTime<Utc>) -> bool {
        if !refresh::is_stale_at(self.store.fetched_at(), self.max_age_minutes, now) {
            return false;
        }
        self.fetch_reports()
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    pub fn select_image(&mut self, image: ImageUpload) -> Result<(), ValidationError> {
        self.submission.select_image(image)
    }

    /// Starts a submission attempt: geolocation first, then the upload.
    ///
    /// Validation failures are returned immediately and nothing is spawned.
    pub fn submit(&mut self) -> Result<AttemptId, SubmitError> {
        let attempt = self.submission.begin()?;
        let geolocator = Arc::clone(&self.services.geolocator);
        self.spawn_worker(
            "geolocation",
            move || DashboardEvent::LocationResolved {
                attempt,
                position: geolocator.current_position(),
            },
            DashboardEvent::LocationResolved {
                attempt,
                position: Err(PermissionError::Unavailable(
                    "could not start geolocation worker".to_string(),
                )),
            },
        );
        Ok(attempt)
    }

    fn start_upload(&mut self, attempt: AttemptId) {
        let Some((image, coords)) = self.submission.start_upload(attempt) else {
            return;
        };
        let predictor = Arc::clone(&self.services.predictor);
        self.spawn_worker(
            "predict",
            move || DashboardEvent::PredictionFinished {
                attempt,
                result: predictor.predict(&image, coords),
            },
            DashboardEvent::PredictionFinished {
                attempt,
                result: Err(SubmitError::Network("could not start upload worker".to_string())),
            },
        );
    }

    // -----------------------------------------------------------------------
    // Planner
    // -----------------------------------------------------------------------

    pub fn plan_form(&self) -> &PlanForm {
        &self.plan_form
    }

    /// Field edits only; nothing is validated until `calculate_plan`.
    pub fn plan_form_mut(&mut self) -> &mut PlanForm {
        &mut self.plan_form
    }

    /// Validates the form and replaces the plan. On a validation failure
    /// the previous plan is cleared.
    pub fn calculate_plan(&mut self) -> Result<&PlanResult, ValidationError> {
        match planner::plan(&self.plan_form) {
            Ok(result) => Ok(&*self.plan.insert(result)),
            Err(e) => {
                self.plan = None;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    fn spawn_worker<F>(&mut self, name: &str, job: F, on_spawn_failure: DashboardEvent)
    where
        F: FnOnce() -> DashboardEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("cdews-{}", name))
            .spawn(move || {
                // The receiver lives as long as the dashboard; a failed send
                // means it is gone and the result has nowhere to go.
                let _ = tx.send(job());
            });

        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => {
                logging::error(
                    DataSource::System,
                    Some(name),
                    &format!("could not spawn worker: {}", e),
                );
                self.handle(on_spawn_failure);
            }
        }
    }

    /// Applies one event. Dropped entirely when unmounted.
    pub fn handle(&mut self, event: DashboardEvent) {
        if !self.mounted {
            logging::debug(DataSource::System, None, "dropping late result after unmount");
            return;
        }

        match event {
            DashboardEvent::ReportsFetched { ticket, result } => {
                if self.store.complete(ticket, result, Utc::now()) {
                    if self.store.last_error().is_some() {
                        self.map.clear();
                    } else {
                        self.map.show_reports(self.store.reports());
                    }
                }
            }
            DashboardEvent::LocationResolved { attempt, position } => {
                if self.submission.location_resolved(attempt, position) {
                    self.start_upload(attempt);
                }
            }
            DashboardEvent::PredictionFinished { attempt, result } => {
                self.submission.upload_finished(attempt, result);
            }
        }
    }

    /// Waits up to `timeout` for one worker result and applies it.
    pub fn process_next(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.handle(event);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Applies every result that has already arrived, without blocking.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.handle(event);
            applied += 1;
        }
        applied
    }

    /// Applies results until nothing is in flight. Returns `false` if
    /// `timeout` ran out first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.process_next(remaining) {
                return self.in_flight == 0;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn map(&self) -> &OutbreakMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut OutbreakMap {
        &mut self.map
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn plan(&self) -> Option<&PlanResult> {
        self.plan.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
