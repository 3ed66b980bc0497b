/// Outbreak reports feed
///
/// Retrieves the current set of classified, geolocated reports from the
/// reporting service and owns the client-side copy of that set.
///
/// The server is the single source of truth for set membership: every
/// successful fetch replaces the set wholesale, and a failed fetch leaves an
/// empty set plus the recorded error. Nothing is retried automatically.

use chrono::{DateTime, Utc};

use crate::logging::{self, DataSource};
use crate::model::{FetchError, Report};

pub const REPORTS_PATH: &str = "/reports";

// ============================================================================
// Source abstraction
// ============================================================================

/// One fetch worth of reports. `rejected` counts array elements that could
/// not be decoded as a report and were dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportBatch {
    pub reports: Vec<Report>,
    pub rejected: usize,
}

/// Anything that can produce the current report set.
pub trait ReportSource {
    fn fetch_reports(&self) -> Result<ReportBatch, FetchError>;
}

/// Decodes a `GET /reports` body.
///
/// The body must be a JSON array. Elements are decoded one at a time so a
/// single malformed record does not cost the whole map.
pub fn parse_reports_response(body: &str) -> Result<ReportBatch, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let items = value
        .as_array()
        .ok_or_else(|| FetchError::Parse("expected a JSON array of reports".to_string()))?;

    let mut batch = ReportBatch::default();
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<Report>(item.clone()) {
            Ok(report) => batch.reports.push(report),
            Err(e) => {
                batch.rejected += 1;
                let subject = format!("#{}", index);
                logging::warn(
                    DataSource::Reports,
                    Some(&subject),
                    &format!("dropping malformed report: {}", e),
                );
            }
        }
    }

    Ok(batch)
}

// ============================================================================
// HTTP source
// ============================================================================

/// Reads reports from the backend's `GET /reports` endpoint.
pub struct HttpReportSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpReportSource {
    pub fn new(client: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            client,
            url: super::endpoint(base_url, REPORTS_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReportSource for HttpReportSource {
    fn fetch_reports(&self) -> Result<ReportBatch, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        parse_reports_response(&body)
    }
}

// ============================================================================
// Report store
// ============================================================================

/// Identifies one fetch. Tickets are issued in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Client-side owner of the current report set.
///
/// Each fetch takes a ticket from `begin_fetch` and hands its outcome to
/// `complete`. A completion older than the newest one already applied is
/// dropped, so a slow early request cannot overwrite a fresher set.
#[derive(Debug, Default)]
pub struct ReportStore {
    reports: Vec<Report>,
    last_error: Option<FetchError>,
    fetched_at: Option<DateTime<Utc>>,
    next_ticket: u64,
    applied: Option<FetchTicket>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Applies a fetch outcome. Returns `false` if it was stale and dropped.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<ReportBatch, FetchError>,
        now: DateTime<Utc>,
    ) -> bool {
        if matches!(self.applied, Some(applied) if ticket < applied) {
            logging::debug(
                DataSource::Reports,
                None,
                &format!("discarding stale fetch {:?} (applied {:?})", ticket, self.applied),
            );
            return false;
        }
        self.applied = Some(ticket);

        match result {
            Ok(batch) => {
                logging::log_fetch_summary(batch.reports.len(), batch.rejected);
                self.reports = batch.reports;
                self.last_error = None;
                self.fetched_at = Some(now);
            }
            Err(e) => {
                logging::log_fetch_failure("fetch_reports", &e);
                self.reports = Vec::new();
                self.last_error = Some(e);
            }
        }
        true
    }

    /// Fetches synchronously from `source` and applies the result.
    pub fn refresh(&mut self, source: &dyn ReportSource, now: DateTime<Utc>) -> Result<usize, FetchError> {
        let ticket = self.begin_fetch();
        let result = source.fetch_reports();
        let outcome = result.as_ref().map(|b| b.reports.len()).map_err(|e| e.clone());
        self.complete(ticket, result, now);
        outcome
    }

    /// Empties the report set. Ticket order is kept, so a fetch begun
    /// before the clear still cannot land afterwards over a newer one.
    pub fn clear(&mut self) {
        self.reports.clear();
        self.last_error = None;
        self.fetched_at = None;
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Time of the last successful fetch.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

// ============================================================================
// Tests
// ============================================================================
