/// Backend Verification Module
///
/// Checks a configured backend before pointing the dashboard at it: the
/// service root must answer, and `/reports` must return a decodable report
/// array. Run with `cdews verify`.
///
/// The predict endpoint is not checked; it needs a real image and runs the
/// model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::ingest::{self, reports::{parse_reports_response, REPORTS_PATH}};

pub const ROOT_PATH: &str = "/";

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointCheck {
    pub path: String,
    pub status: VerificationStatus,
    pub http_status: Option<u16>,
    /// Service banner for `/`, report count for `/reports`.
    pub detail: Option<String>,
    pub error_message: Option<String>,
}

impl EndpointCheck {
    fn failed(path: &str, http_status: Option<u16>, message: String) -> Self {
        Self {
            path: path.to_string(),
            status: VerificationStatus::Failed,
            http_status,
            detail: None,
            error_message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub base_url: String,
    pub root: EndpointCheck,
    pub reports: EndpointCheck,
}

impl VerificationReport {
    /// True when every checked endpoint is usable (partial counts as usable).
    pub fn is_healthy(&self) -> bool {
        [&self.root, &self.reports]
            .iter()
            .all(|c| c.status != VerificationStatus::Failed)
    }
}

// ============================================================================
// Response assessment
// ============================================================================

/// `GET /` should answer 2xx with `{ "message": ... }`.
pub fn assess_root(status: u16, body: &str) -> EndpointCheck {
    if !(200..300).contains(&status) {
        return EndpointCheck::failed(ROOT_PATH, Some(status), format!("HTTP {}", status));
    }

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));

    match message {
        Some(message) => EndpointCheck {
            path: ROOT_PATH.to_string(),
            status: VerificationStatus::Success,
            http_status: Some(status),
            detail: Some(message),
            error_message: None,
        },
        None => EndpointCheck {
            path: ROOT_PATH.to_string(),
            status: VerificationStatus::PartialSuccess,
            http_status: Some(status),
            detail: None,
            error_message: Some("response has no 'message' field".to_string()),
        },
    }
}

/// `GET /reports` should answer 2xx with an array of reports. Some
/// undecodable elements make it partial; a non-array body fails it.
pub fn assess_reports(status: u16, body: &str) -> EndpointCheck {
    if !(200..300).contains(&status) {
        return EndpointCheck::failed(REPORTS_PATH, Some(status), format!("HTTP {}", status));
    }

    match parse_reports_response(body) {
        Ok(batch) => {
            let detail = format!("{} report(s)", batch.reports.len());
            if batch.rejected == 0 {
                EndpointCheck {
                    path: REPORTS_PATH.to_string(),
                    status: VerificationStatus::Success,
                    http_status: Some(status),
                    detail: Some(detail),
                    error_message: None,
                }
            } else {
                EndpointCheck {
                    path: REPORTS_PATH.to_string(),
                    status: VerificationStatus::PartialSuccess,
                    http_status: Some(status),
                    detail: Some(detail),
                    error_message: Some(format!("{} malformed report(s) skipped", batch.rejected)),
                }
            }
        }
        Err(e) => EndpointCheck::failed(REPORTS_PATH, Some(status), e.to_string()),
    }
}

// ============================================================================
// Endpoint Checks
// ============================================================================

/// Requests are bounded by the client's own timeout (`api.timeout_secs`).
fn check_endpoint<F>(client: &reqwest::blocking::Client, base_url: &str, path: &str, assess: F) -> EndpointCheck
where
    F: Fn(u16, &str) -> EndpointCheck,
{
    let url = ingest::endpoint(base_url, path);
    match client.get(&url).send() {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.text() {
                Ok(body) => assess(status, &body),
                Err(e) => EndpointCheck::failed(path, Some(status), format!("Read failed: {}", e)),
            }
        }
        Err(e) => EndpointCheck::failed(path, None, format!("Request failed: {}", e)),
    }
}

pub fn verify_backend(client: &reqwest::blocking::Client, base_url: &str) -> VerificationReport {
    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        base_url: base_url.to_string(),
        root: check_endpoint(client, base_url, ROOT_PATH, assess_root),
        reports: check_endpoint(client, base_url, REPORTS_PATH, assess_reports),
    }
}

// ============================================================================
// Full Verification Runner
// ============================================================================

fn print_check(check: &EndpointCheck) {
    print!("  {:<10} ... ", check.path);
    match check.status {
        VerificationStatus::Success => {
            println!("✓ OK ({})", check.detail.as_deref().unwrap_or("no detail"));
        }
        VerificationStatus::PartialSuccess => {
            println!("⚠ Partial ({})", check.error_message.as_deref().unwrap_or("unknown"));
        }
        VerificationStatus::Failed => {
            println!("✗ FAILED: {}", check.error_message.as_deref().unwrap_or("Unknown"));
        }
    }
}

/// Checks the backend and prints a summary.
pub fn run_full_verification(
    base_url: &str,
    timeout_secs: u64,
) -> Result<VerificationReport, Box<dyn Error>> {
    let client = ingest::build_client(timeout_secs)?;

    println!("🔍 Verifying backend at {}", base_url);
    let report = verify_backend(&client, base_url);
    print_check(&report.root);
    print_check(&report.reports);

    if report.is_healthy() {
        println!("\nBackend is usable.");
    } else {
        println!("\nBackend is NOT usable; the map will show no reports.");
    }

    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
