//! Read-side time aggregation.
//!
//! Stored totals only include focus spans that have already closed. These
//! functions add the running span on top for display, without touching the
//! record, so calling them on every refresh never double counts.

use serde::Serialize;

use crate::interval::VisitInterval;
use crate::record::{TabRecord, TabState};
use crate::types::{Millis, TabId, secs_between};

/// Focused seconds for a tab as of `now`, including a running focus span.
pub fn live_time_spent(record: &TabRecord, now: Millis) -> f64 {
    let running = record
        .visit_history
        .last()
        .and_then(|visit| visit.focus.open_since())
        .map_or(0.0, |start| secs_between(start, now));
    record.time_spent_in_sec + running
}

/// Focused seconds for a single visit as of `now`.
pub fn live_visit_time_spent(visit: &VisitInterval, now: Millis) -> f64 {
    let running = visit
        .focus
        .open_since()
        .map_or(0.0, |start| secs_between(start, now));
    visit.time_spent_in_sec + running
}

/// Seconds the tab has existed, up to its close or `now`.
pub fn open_duration(record: &TabRecord, now: Millis) -> f64 {
    secs_between(record.start_time, record.end_time.unwrap_or(now))
}

/// Seconds a visit has been displayed, up to its close or `now`.
pub fn visit_open_duration(visit: &VisitInterval, now: Millis) -> f64 {
    visit
        .time_diff_in_sec
        .unwrap_or_else(|| secs_between(visit.start_time, visit.end_time.unwrap_or(now)))
}

/// A visit with its live totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitView {
    pub url: String,
    pub title: String,
    pub start_time: Millis,
    pub end_time: Option<Millis>,
    pub focused_secs: f64,
    pub open_secs: f64,
}

/// A tab record with its live totals, as handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabView {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub state: TabState,
    pub start_time: Millis,
    pub end_time: Option<Millis>,
    pub focused_secs: f64,
    pub open_secs: f64,
    pub visits: Vec<VisitView>,
}

impl TabView {
    pub fn new(record: &TabRecord, now: Millis) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            url: record.url.clone(),
            state: record.state(),
            start_time: record.start_time,
            end_time: record.end_time,
            focused_secs: live_time_spent(record, now),
            open_secs: open_duration(record, now),
            visits: record
                .visit_history
                .iter()
                .map(|visit| VisitView {
                    url: visit.url.clone(),
                    title: visit.title.clone(),
                    start_time: visit.start_time,
                    end_time: visit.end_time,
                    focused_secs: live_visit_time_spent(visit, now),
                    open_secs: visit_open_duration(visit, now),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "whole-millisecond spans are exact in f64"
)]
mod tests {
    use super::*;
    use crate::types::WindowId;

    fn focused_tab() -> TabRecord {
        TabRecord::new(
            TabId::new(1),
            Some(WindowId::new(1)),
            "A",
            "https://a.test",
            0,
            true,
        )
    }

    #[test]
    fn live_time_adds_running_span() {
        let record = focused_tab();
        assert_eq!(live_time_spent(&record, 7_000), 7.0);
        assert_eq!(record.time_spent_in_sec, 0.0);
    }

    #[test]
    fn live_time_is_idempotent() {
        let record = focused_tab();
        let first = live_time_spent(&record, 3_000);
        let second = live_time_spent(&record, 3_000);
        assert_eq!(first, second);
        assert_eq!(record, focused_tab());
    }

    #[test]
    fn live_time_ignores_closed_spans() {
        let mut record = focused_tab();
        record.unfocus(4_000);
        assert_eq!(live_time_spent(&record, 60_000), 4.0);
    }

    #[test]
    fn live_time_counts_prior_visits_once() {
        let mut record = focused_tab();
        record.navigate("https://b.test", "B", 5_000);
        // 5s folded from A, 2s running on B.
        assert_eq!(live_time_spent(&record, 7_000), 7.0);
        assert_eq!(live_visit_time_spent(&record.visit_history[0], 7_000), 5.0);
        assert_eq!(live_visit_time_spent(&record.visit_history[1], 7_000), 2.0);
    }

    #[test]
    fn open_duration_freezes_at_close() {
        let mut record = focused_tab();
        assert_eq!(open_duration(&record, 2_000), 2.0);
        record.close(3_000);
        assert_eq!(open_duration(&record, 50_000), 3.0);
    }

    #[test]
    fn tab_view_reports_state_and_visits() {
        let mut record = focused_tab();
        record.navigate("https://b.test", "B", 1_000);
        let view = TabView::new(&record, 4_000);
        assert_eq!(view.state, TabState::OpenFocused);
        assert_eq!(view.visits.len(), 2);
        assert_eq!(view.visits[0].open_secs, 1.0);
        assert_eq!(view.visits[1].open_secs, 3.0);
        assert_eq!(view.focused_secs, 4.0);
    }
}
