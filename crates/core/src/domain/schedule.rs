// Cadence Domain Model

use super::error::{DomainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason recorded for every skipped entry
pub const REASON_NOT_DUE: &str = "not_due";

/// Cadence configuration for one adapter, fetched fresh every dispatch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeScheduleEntry {
    pub adapter: String,
    pub interval_minutes: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Informational, reported by the ingestion side
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

/// Per-entry decision within one dispatch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Disabled,
    NotDue,
    Due,
}

impl ScrapeScheduleEntry {
    pub fn new(adapter: impl Into<String>, interval_minutes: u32) -> Self {
        Self {
            adapter: adapter.into(),
            interval_minutes,
            enabled: true,
            last_run_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Reject entries whose interval is not strictly positive
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(DomainError::InvalidInterval {
                adapter: self.adapter.clone(),
                interval_minutes: self.interval_minutes,
            });
        }
        Ok(())
    }

    pub fn interval_seconds(&self) -> u64 {
        u64::from(self.interval_minutes) * 60
    }

    /// Classify this entry at `now`.
    ///
    /// The reference timestamp is the persisted last-dispatch marker when one
    /// exists, otherwise the informational `last_run_at`. No reference at all
    /// means due.
    pub fn due_state(&self, last_dispatch_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DueState {
        if !self.enabled {
            return DueState::Disabled;
        }

        let Some(reference) = last_dispatch_at.or(self.last_run_at) else {
            return DueState::Due;
        };

        let elapsed = now.signed_duration_since(reference).num_seconds();
        if elapsed >= self.interval_seconds() as i64 {
            DueState::Due
        } else {
            DueState::NotDue
        }
    }

    pub fn is_due(&self, last_dispatch_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.due_state(last_dispatch_at, now) == DueState::Due
    }
}

/// Per-adapter outcome of one dispatch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub adapter: String,
    pub run_id: Option<String>,
    pub dispatched: bool,
    pub reason: Option<String>,
}

impl DispatchRecord {
    pub fn dispatched(adapter: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            run_id: Some(run_id.into()),
            dispatched: true,
            reason: None,
        }
    }

    pub fn skipped(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            run_id: None,
            dispatched: false,
            reason: Some(REASON_NOT_DUE.to_string()),
        }
    }
}

/// Aggregate of one dispatch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub evaluated: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub details: Vec<DispatchRecord>,
}

impl DispatchSummary {
    pub fn from_records(details: Vec<DispatchRecord>) -> Self {
        let evaluated = details.len();
        let dispatched = details.iter().filter(|r| r.dispatched).count();
        Self {
            evaluated,
            dispatched,
            skipped: evaluated - dispatched,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_never_run_is_due() {
        let entry = ScrapeScheduleEntry::new("demo-board", 60);
        assert!(entry.is_due(None, now()));
        assert!(entry.is_due(None, now() + Duration::days(365)));
    }

    #[test]
    fn test_interval_boundaries() {
        let entry = ScrapeScheduleEntry::new("demo-board", 60);

        assert!(!entry.is_due(Some(now() - Duration::minutes(30)), now()));
        assert!(entry.is_due(Some(now() - Duration::minutes(61)), now()));
        assert!(entry.is_due(Some(now() - Duration::minutes(60)), now()));
    }

    #[test]
    fn test_persisted_marker_wins_over_last_run_at() {
        let mut entry = ScrapeScheduleEntry::new("demo-board", 60);
        entry.last_run_at = Some(now() - Duration::hours(5));

        // Local marker is recent: not due even though the API says 5h ago
        assert_eq!(
            entry.due_state(Some(now() - Duration::minutes(10)), now()),
            DueState::NotDue
        );
        // No local marker: fall back to last_run_at
        assert_eq!(entry.due_state(None, now()), DueState::Due);
    }

    #[test]
    fn test_disabled_never_due() {
        let mut entry = ScrapeScheduleEntry::new("demo-board", 15);
        entry.enabled = false;

        assert_eq!(entry.due_state(None, now()), DueState::Disabled);
        assert!(!entry.is_due(Some(now() - Duration::days(3)), now()));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let entry = ScrapeScheduleEntry::new("demo-board", 0);
        assert!(matches!(
            entry.validate(),
            Err(DomainError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_entry_deserialize_defaults() {
        let entry: ScrapeScheduleEntry =
            serde_json::from_value(serde_json::json!({"adapter": "demo-board", "interval_minutes": 15}))
                .unwrap();
        assert!(entry.enabled);
        assert!(entry.last_run_at.is_none());
    }

    #[test]
    fn test_summary_counts() {
        let summary = DispatchSummary::from_records(vec![
            DispatchRecord::dispatched("a", "run-1"),
            DispatchRecord::skipped("b"),
            DispatchRecord::skipped("c"),
        ]);
        assert_eq!(summary.evaluated, 3);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.details[1].reason.as_deref(), Some(REASON_NOT_DUE));
    }
}
