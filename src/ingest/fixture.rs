/// Offline report source for development.
///
/// When the backend is unavailable, point the map at a JSON file holding a
/// `GET /reports` body captured earlier. The file is re-read on every fetch,
/// so editing it and refetching behaves like a server-side change.

use std::fs;
use std::path::{Path, PathBuf};

use super::reports::{parse_reports_response, ReportBatch, ReportSource};
use crate::model::FetchError;

pub struct FixtureReportSource {
    path: PathBuf,
}

impl FixtureReportSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSource for FixtureReportSource {
    fn fetch_reports(&self) -> Result<ReportBatch, FetchError> {
        let body = fs::read_to_string(&self.path)
            .map_err(|e| FetchError::Io(format!("{}: {}", self.path.display(), e)))?;
        parse_reports_response(&body)
    }
}
