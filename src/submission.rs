/// Report submission: image selection, geolocation and the predict call.
///
/// ```text
/// Idle -> AcquiringLocation -> LocationFailed
///                           -> LocationAcquired -> Submitting -> SubmitSucceeded
///                                                             -> SubmitFailed
/// ```
/// A missing image goes straight to `SubmitFailed` without touching the
/// geolocator or the network. Every state change goes through
/// `SubmissionState::on`; the `Submission` container adds the selected
/// image and an attempt counter so results belonging to a superseded attempt
/// are dropped.
///
/// A successful submission does not add anything to the outbreak map. The
/// report shows up there only after the next reports fetch.

use std::fmt;

use crate::ingest::predict::PredictionService;
use crate::logging::{self, DataSource};
use crate::model::{
    AdviceDetails, Coordinates, ImageUpload, PermissionError, PredictionResult, SubmitError,
    ValidationError,
};

// ---------------------------------------------------------------------------
// Geolocation
// ---------------------------------------------------------------------------

/// Device position provider. May block until the platform answers.
pub trait Geolocator {
    fn current_position(&self) -> Result<Coordinates, PermissionError>;
}

/// A geolocator with a position known up front (command line flags, tests).
/// `None` behaves like a device with no position source.
pub struct FixedGeolocator(pub Option<Coordinates>);

impl Geolocator for FixedGeolocator {
    fn current_position(&self) -> Result<Coordinates, PermissionError> {
        match self.0 {
            Some(c) if c.is_valid() => Ok(c),
            Some(c) => Err(PermissionError::Unavailable(format!(
                "invalid fix ({}, {})",
                c.lat, c.long
            ))),
            None => Err(PermissionError::Unavailable("no position source".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    AcquiringLocation,
    LocationFailed(PermissionError),
    LocationAcquired(Coordinates),
    Submitting(Coordinates),
    SubmitSucceeded(PredictionResult),
    SubmitFailed(SubmitError),
}

impl SubmissionState {
    fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "Idle",
            SubmissionState::AcquiringLocation => "AcquiringLocation",
            SubmissionState::LocationFailed(_) => "LocationFailed",
            SubmissionState::LocationAcquired(_) => "LocationAcquired",
            SubmissionState::Submitting(_) => "Submitting",
            SubmissionState::SubmitSucceeded(_) => "SubmitSucceeded",
            SubmissionState::SubmitFailed(_) => "SubmitFailed",
        }
    }

    /// True while waiting on the geolocator or the network.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SubmissionState::AcquiringLocation
                | SubmissionState::LocationAcquired(_)
                | SubmissionState::Submitting(_)
        )
    }

    /// Applies one event. Events that make no sense in the current state are
    /// rejected and leave the caller's state untouched.
    pub fn on(&self, event: SubmissionEvent) -> Result<SubmissionState, TransitionError> {
        use SubmissionEvent as E;
        use SubmissionState as S;

        let next = match (self, event) {
            (_, E::Reset) => S::Idle,
            (s, E::Begin) if !s.is_busy() => S::AcquiringLocation,
            (s, E::Rejected(v)) if !s.is_busy() => S::SubmitFailed(SubmitError::Validation(v)),
            (S::AcquiringLocation, E::LocationResolved(Ok(c))) => S::LocationAcquired(c),
            (S::AcquiringLocation, E::LocationResolved(Err(e))) => S::LocationFailed(e),
            (S::LocationAcquired(c), E::UploadStarted) => S::Submitting(*c),
            (S::Submitting(_), E::UploadFinished(Ok(r))) => S::SubmitSucceeded(r),
            (S::Submitting(_), E::UploadFinished(Err(e))) => S::SubmitFailed(e),
            (s, e) => {
                return Err(TransitionError {
                    state: s.name(),
                    event: e.name(),
                })
            }
        };
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionEvent {
    Begin,
    Rejected(ValidationError),
    LocationResolved(Result<Coordinates, PermissionError>),
    UploadStarted,
    UploadFinished(Result<PredictionResult, SubmitError>),
    Reset,
}

impl SubmissionEvent {
    fn name(&self) -> &'static str {
        match self {
            SubmissionEvent::Begin => "Begin",
            SubmissionEvent::Rejected(_) => "Rejected",
            SubmissionEvent::LocationResolved(_) => "LocationResolved",
            SubmissionEvent::UploadStarted => "UploadStarted",
            SubmissionEvent::UploadFinished(_) => "UploadFinished",
            SubmissionEvent::Reset => "Reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {} not allowed in state {}", self.event, self.state)
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// Submission container
// ---------------------------------------------------------------------------

/// Identifies one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

/// Owns the selected image and the current attempt's state.
#[derive(Debug)]
pub struct Submission {
    image: Option<ImageUpload>,
    state: SubmissionState,
    attempt: AttemptId,
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            image: None,
            state: SubmissionState::Idle,
            attempt: AttemptId(0),
        }
    }
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref()
    }

    /// Selects the image to submit. Only `image/*` content types are
    /// accepted. A new image clears any previous result or error and
    /// supersedes an in-flight attempt.
    pub fn select_image(&mut self, image: ImageUpload) -> Result<(), ValidationError> {
        if !image.content_type.starts_with("image/") {
            return Err(ValidationError::NotAnImage(image.content_type));
        }
        self.image = Some(image);
        self.attempt = AttemptId(self.attempt.0 + 1);
        self.apply(SubmissionEvent::Reset);
        Ok(())
    }

    fn apply(&mut self, event: SubmissionEvent) -> bool {
        match self.state.on(event) {
            Ok(next) => {
                self.state = next;
                true
            }
            Err(e) => {
                logging::debug(DataSource::Predict, None, &e.to_string());
                false
            }
        }
    }

    /// Starts a new attempt. Fails immediately, with no geolocation request
    /// and no network call, when no image is selected.
    pub fn begin(&mut self) -> Result<AttemptId, SubmitError> {
        if self.state.is_busy() {
            return Err(ValidationError::SubmissionInProgress.into());
        }
        self.attempt = AttemptId(self.attempt.0 + 1);

        if self.image.is_none() {
            let err = SubmitError::Validation(ValidationError::NoImageSelected);
            logging::log_submit_failure(self.attempt.0, &err);
            self.apply(SubmissionEvent::Rejected(ValidationError::NoImageSelected));
            return Err(err);
        }

        self.apply(SubmissionEvent::Begin);
        Ok(self.attempt)
    }

    /// Feeds the geolocation outcome. Ignored for superseded attempts.
    pub fn location_resolved(
        &mut self,
        attempt: AttemptId,
        position: Result<Coordinates, PermissionError>,
    ) -> bool {
        if attempt != self.attempt {
            return false;
        }
        if let Err(e) = &position {
            logging::log_submit_failure(attempt.0, &SubmitError::Permission(e.clone()));
        }
        self.apply(SubmissionEvent::LocationResolved(position))
    }

    /// Moves to `Submitting` and hands back what must be uploaded.
    pub fn start_upload(&mut self, attempt: AttemptId) -> Option<(ImageUpload, Coordinates)> {
        if attempt != self.attempt {
            return None;
        }
        let coords = match self.state {
            SubmissionState::LocationAcquired(c) => c,
            _ => return None,
        };
        let image = self.image.clone()?;
        self.apply(SubmissionEvent::UploadStarted);
        Some((image, coords))
    }

    /// Feeds the predict outcome. Ignored for superseded attempts.
    pub fn upload_finished(
        &mut self,
        attempt: AttemptId,
        result: Result<PredictionResult, SubmitError>,
    ) -> bool {
        if attempt != self.attempt {
            return false;
        }
        match &result {
            Ok(r) => logging::info(
                DataSource::Predict,
                Some(&format!("attempt-{}", attempt.0)),
                &format!("classified as {} ({})", r.label, r.confidence_percent()),
            ),
            Err(e) => logging::log_submit_failure(attempt.0, e),
        }
        self.apply(SubmissionEvent::UploadFinished(result))
    }

    /// Drops any result or error and returns to `Idle`. The image is kept.
    pub fn reset(&mut self) {
        self.attempt = AttemptId(self.attempt.0 + 1);
        self.apply(SubmissionEvent::Reset);
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match &self.state {
            SubmissionState::SubmitSucceeded(r) => Some(r),
            _ => None,
        }
    }

    /// The failure of the current attempt, if it failed.
    pub fn error(&self) -> Option<SubmitError> {
        match &self.state {
            SubmissionState::LocationFailed(e) => Some(SubmitError::Permission(e.clone())),
            SubmissionState::SubmitFailed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Message to show the user for the current state, if any.
    pub fn user_message(&self) -> Option<String> {
        self.error().map(|e| e.user_message())
    }
}

impl PredictionResult {
    /// The server's advisory, or the client registry's when the server sent
    /// none.
    pub fn advisory_or_local(&self) -> AdviceDetails {
        match &self.details {
            Some(details) => details.clone(),
            None => crate::diseases::advisory_for(&self.label),
        }
    }
}

// ---------------------------------------------------------------------------
// Synchronous driver
// ---------------------------------------------------------------------------

/// Runs one whole attempt on the calling thread: geolocation, then the
/// predict call. Each collaborator is called at most once.
pub fn run_submission<'a>(
    submission: &'a mut Submission,
    geolocator: &dyn Geolocator,
    predictor: &dyn PredictionService,
) -> &'a SubmissionState {
    let attempt = match submission.begin() {
        Ok(a) => a,
        Err(_) => return submission.state(),
    };

    let position = geolocator.current_position();
    submission.location_resolved(attempt, position);

    if let Some((image, coords)) = submission.start_upload(attempt) {
        let result = predictor.predict(&image, coords);
        submission.upload_finished(attempt, result);
    }

    submission.state()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
