//! Retention policy for closed data.
//!
//! Closed tabs older than the window are dropped whole. Inside records that
//! survive, closed visits older than the window are dropped. Open tabs and
//! the open visit are never aged out, however long they have been open.

use crate::record::TabRecord;
use crate::types::{DAY_MS, Millis};

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// What a retention pass decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Nothing to remove.
    Keep,
    /// The given number of closed visits were dropped.
    Pruned(usize),
    /// The whole record should be deleted.
    Delete,
}

/// How long closed data is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    window_ms: Millis,
}

impl Default for Retention {
    fn default() -> Self {
        Self::days(DEFAULT_RETENTION_DAYS)
    }
}

impl Retention {
    pub fn days(days: u32) -> Self {
        Self {
            window_ms: i64::from(days) * DAY_MS,
        }
    }

    pub const fn window_ms(self) -> Millis {
        self.window_ms
    }

    fn expired(self, ended: Option<Millis>, now: Millis) -> bool {
        ended.is_some_and(|end| now.saturating_sub(end) > self.window_ms)
    }

    /// Decides what would happen to `record` without changing it.
    pub fn plan(self, record: &TabRecord, now: Millis) -> Expiry {
        if self.expired(record.end_time, now) {
            return Expiry::Delete;
        }
        let stale = record
            .visit_history
            .iter()
            .filter(|visit| self.expired(visit.end_time, now))
            .count();
        if stale == 0 {
            Expiry::Keep
        } else {
            Expiry::Pruned(stale)
        }
    }

    /// Applies the policy to `record`.
    ///
    /// On [`Expiry::Delete`] the record is left untouched for the caller to
    /// remove.
    pub fn apply(self, record: &mut TabRecord, now: Millis) -> Expiry {
        let expiry = self.plan(record, now);
        if let Expiry::Pruned(_) = expiry {
            record
                .visit_history
                .retain(|visit| !self.expired(visit.end_time, now));
        }
        expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TabId;

    const NOW: Millis = 100 * DAY_MS;

    fn closed_tab(ended_days_ago: i64) -> TabRecord {
        let end = NOW - ended_days_ago * DAY_MS;
        let mut record = TabRecord::new(TabId::new(1), None, "A", "https://a.test", end - 1_000, false);
        record.close(end);
        record
    }

    #[test]
    fn closed_record_past_window_is_deleted() {
        let mut record = closed_tab(8);
        assert_eq!(Retention::default().apply(&mut record, NOW), Expiry::Delete);
    }

    #[test]
    fn closed_record_inside_window_is_kept_unchanged() {
        let mut record = closed_tab(3);
        let before = record.clone();
        assert_eq!(Retention::default().apply(&mut record, NOW), Expiry::Keep);
        assert_eq!(record, before);
    }

    #[test]
    fn exactly_at_window_is_kept() {
        let record = closed_tab(7);
        assert_eq!(Retention::default().plan(&record, NOW), Expiry::Keep);
    }

    #[test]
    fn old_visits_are_pruned_from_open_tab() {
        let start = NOW - 10 * DAY_MS;
        let mut record = TabRecord::new(TabId::new(2), None, "A", "https://a.test", start, false);
        record.navigate("https://b.test", "B", start + DAY_MS);
        record.navigate("https://c.test", "C", NOW - DAY_MS);

        assert_eq!(Retention::default().apply(&mut record, NOW), Expiry::Pruned(1));
        assert_eq!(record.visit_history.len(), 2);
        assert_eq!(record.visit_history[0].url, "https://b.test");
        assert!(record.current_visit().is_some());
    }

    #[test]
    fn long_open_tab_is_never_closed() {
        let mut record =
            TabRecord::new(TabId::new(3), None, "A", "https://a.test", NOW - 30 * DAY_MS, true);
        assert_eq!(Retention::default().apply(&mut record, NOW), Expiry::Keep);
        assert!(!record.is_closed());
        assert_eq!(record.visit_history.len(), 1);
    }
}
