/// Report, PredictionResult, advisory content, and the client error taxonomy.
///
/// Core data types shared by every other module. Only types live here: the
/// wire shapes of the reporting and prediction services, plus the errors
/// that can come out of talking to them.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Coordinate bounds
// ---------------------------------------------------------------------------

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Opaque report identifier. The reporting service has emitted both integer
/// and string ids; either is kept as-is and only ever compared or displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportId::Number(n) => write!(f, "{}", n),
            ReportId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One geolocated, disease-classified observation as returned by `GET /reports`.
///
/// Immutable once fetched. The whole set is replaced on refetch, so there is
/// no update path for an individual report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub lat: f64,
    /// Field name follows the wire format (`long`), not `lon`/`lng`.
    pub long: f64,
    /// Label from the classifier's label set, e.g. "Potato___Early_blight".
    pub disease: String,
}

impl Report {
    /// True when both coordinates are finite and inside WGS84 bounds.
    pub fn has_valid_coordinates(&self) -> bool {
        Coordinates::new(self.lat, self.long).is_valid()
    }
}

/// A latitude/longitude pair, as produced by a geolocation fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

impl Coordinates {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.long.is_finite()
            && (MIN_LATITUDE..=MAX_LATITUDE).contains(&self.lat)
            && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.long)
    }
}

// ---------------------------------------------------------------------------
// Prediction types
// ---------------------------------------------------------------------------

/// A titled list of steps (prevention or cure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceSection {
    pub title: String,
    pub steps: Vec<String>,
}

/// Extended farmer-facing advisory content attached to a diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceDetails {
    pub title: String,
    pub overview: String,
    pub prevention: AdviceSection,
    pub cure: AdviceSection,
}

/// The outcome of one successful `POST /predict`.
///
/// `details` is optional: a classification can succeed while the advisory
/// content is unavailable. Consumers match on it rather than assume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Classifier label. The service calls this field `disease`.
    #[serde(alias = "disease")]
    pub label: String,
    /// Softmax confidence in [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub details: Option<AdviceDetails>,
}

impl PredictionResult {
    /// Confidence rendered as a percentage with one decimal, e.g. "97.3%".
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// An image picked by the user, held until submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    /// MIME type, e.g. "image/jpeg".
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Reads an image from disk, taking the content type from the extension.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            content_type: content_type_for(&file_name).to_string(),
            file_name,
            bytes,
        })
    }
}

/// MIME type for a file name, by extension. Unknown extensions map to
/// `application/octet-stream`, which image selection rejects.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Bad or missing local input. Never leaves the client; no request is made.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NoImageSelected,
    /// The chosen file is not an `image/*` content type.
    NotAnImage(String),
    EmptyLandSize,
    /// Land size could not be parsed as a finite number.
    InvalidLandSize(String),
    NonPositiveLandSize,
    EmptyCropType,
    EmptyQuery,
    /// A submission is already waiting on geolocation or the network.
    SubmissionInProgress,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoImageSelected => write!(f, "Please select an image first."),
            ValidationError::NotAnImage(ct) => {
                write!(f, "Selected file is not an image (content type: {})", ct)
            }
            ValidationError::EmptyLandSize | ValidationError::EmptyCropType => {
                write!(f, "Please fill in all required fields")
            }
            ValidationError::InvalidLandSize(raw) => {
                write!(f, "Land size must be a number, got '{}'", raw)
            }
            ValidationError::NonPositiveLandSize => write!(f, "Land size must be greater than zero"),
            ValidationError::EmptyQuery => write!(f, "Please enter a question"),
            ValidationError::SubmissionInProgress => {
                write!(f, "A submission is already in progress")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Geolocation could not be obtained. Terminal for the submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionError {
    Denied,
    TimedOut,
    /// The platform has no position source (or reported an unusable fix).
    Unavailable(String),
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::Denied => write!(f, "Geolocation permission denied"),
            PermissionError::TimedOut => write!(f, "Geolocation request timed out"),
            PermissionError::Unavailable(msg) => write!(f, "Geolocation unavailable: {}", msg),
        }
    }
}

impl std::error::Error for PermissionError {}

/// Errors that can arise when fetching the outbreak report set.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request could not complete (connection refused, timeout, ...).
    Network(String),
    /// Non-2xx HTTP response from the reporting service.
    Http(u16),
    /// The response body was not a JSON array of reports.
    Parse(String),
    /// A fixture file could not be read.
    Io(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Http(code) => write!(f, "HTTP error: {}", code),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
            FetchError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Why a submission attempt ended without a prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    Validation(ValidationError),
    Permission(PermissionError),
    /// Request attempted, no usable response (transport failure, non-2xx
    /// without a structured detail, or an unparseable body).
    Network(String),
    /// Response received carrying a structured rejection message.
    Server { status: u16, detail: String },
}

impl SubmitError {
    /// The text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(e) => e.to_string(),
            SubmitError::Permission(_) => {
                "GPS permission is required to submit a report.".to_string()
            }
            SubmitError::Network(_) => {
                "Failed to get a prediction. Is the backend server running?".to_string()
            }
            SubmitError::Server { detail, .. } => detail.clone(),
        }
    }

    /// Network and server failures may succeed when re-invoked; validation
    /// and permission failures need user action first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Network(_) | SubmitError::Server { .. })
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Validation(e) => write!(f, "Validation error: {}", e),
            SubmitError::Permission(e) => write!(f, "Permission error: {}", e),
            SubmitError::Network(msg) => write!(f, "Network error: {}", msg),
            SubmitError::Server { status, detail } => {
                write!(f, "Server error ({}): {}", status, detail)
            }
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<ValidationError> for SubmitError {
    fn from(e: ValidationError) -> Self {
        SubmitError::Validation(e)
    }
}

impl From<PermissionError> for SubmitError {
    fn from(e: PermissionError) -> Self {
        SubmitError::Permission(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
