/// Clients for the CDEWS backend and offline report sources.
///
/// Submodules:
/// - `reports`: `GET /reports`, the `ReportSource` seam and `ReportStore`.
/// - `predict`: `POST /predict` multipart upload and response decoding.
/// - `assistant`: `POST /chat` thin wrapper.
/// - `fixture`: reports replayed from a JSON file for offline work.

pub mod assistant;
pub mod fixture;
pub mod predict;
pub mod reports;

use std::time::Duration;

/// Builds the blocking HTTP client shared by all backend calls.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Joins the configured base URL and an endpoint path, tolerating a trailing
/// slash on the base.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
