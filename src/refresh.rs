/// Report set staleness, used to decide when a periodic refetch is due.
///
/// Reports are fetched once on mount; after that the dashboard refetches
/// whenever the last successful fetch is older than the configured maximum
/// age.
///
/// # Clock injection
/// `is_stale_at` takes `now` rather than calling `Utc::now()`, so tests are
/// deterministic without mocking time.

use chrono::{DateTime, Utc};

/// Returns `true` if a refetch is due.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// A set that was never fetched successfully (`None`) is always stale. A
/// `fetched_at` later than `now` (clock skew) is treated as fresh.
pub fn is_stale_at(
    fetched_at: Option<DateTime<Utc>>,
    max_age_minutes: u64,
    now: DateTime<Utc>,
) -> bool {
    let Some(fetched_at) = fetched_at else {
        return true;
    };
    let age_minutes = (now - fetched_at).num_minutes();
    age_minutes > 0 && age_minutes as u64 > max_age_minutes
}

/// Convenience wrapper that uses the real current time.
/// Use `is_stale_at` in tests to keep them deterministic.
pub fn is_stale(fetched_at: Option<DateTime<Utc>>, max_age_minutes: u64) -> bool {
    is_stale_at(fetched_at, max_age_minutes, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// A fixed "now" used across all tests: 2024-07-15 06:30:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 6, 30, 0).unwrap()
    }

    fn minutes_ago(m: i64) -> Option<DateTime<Utc>> {
        Some(fixed_now() - Duration::minutes(m))
    }

    #[test]
    fn test_never_fetched_is_stale() {
        assert!(is_stale_at(None, 60, fixed_now()));
    }

    #[test]
    fn test_recent_fetch_is_not_stale() {
        assert!(!is_stale_at(minutes_ago(5), 15, fixed_now()));
    }

    #[test]
    fn test_fetch_exactly_at_threshold_is_not_stale() {
        assert!(
            !is_stale_at(minutes_ago(15), 15, fixed_now()),
            "staleness is strictly greater than, not >="
        );
    }

    #[test]
    fn test_fetch_one_minute_past_threshold_is_stale() {
        assert!(is_stale_at(minutes_ago(16), 15, fixed_now()));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let ahead = Some(fixed_now() + Duration::minutes(10));
        assert!(!is_stale_at(ahead, 0, fixed_now()));
    }

    #[test]
    fn test_same_fetch_stale_under_tight_threshold_not_under_loose() {
        let fetched = minutes_ago(30);
        assert!(is_stale_at(fetched, 20, fixed_now()));
        assert!(!is_stale_at(fetched, 60, fixed_now()));
    }
}
