//! Per-tab accounting records and their state transitions.
//!
//! A [`TabRecord`] is the unit of storage: one per tab, keyed by the tab ID.
//! All mutation goes through the transition methods here so the accounting
//! invariants hold regardless of which runtime drives them:
//!
//! - at most one visit is open, and it is the last one
//! - focus deltas are folded into both the visit and the tab exactly once
//! - `end_time` is set once and never moved

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interval::VisitInterval;
use crate::types::{Millis, TabId, WindowId};

/// Lifecycle state of a tracked tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TabState {
    #[serde(rename = "open")]
    OpenUnfocused,
    #[serde(rename = "focused")]
    OpenFocused,
    /// Terminal.
    #[serde(rename = "closed")]
    Closed,
}

impl TabState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenUnfocused => "open",
            Self::OpenFocused => "focused",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of applying a completed navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The tab is closed; nothing changed.
    Ignored,
    /// Same URL as the current visit; only the title was refreshed.
    SameUrl,
    /// The previous visit closed and a new one opened.
    NewVisit,
}

/// Time-accounting record for one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    /// The window that owns the tab, when the host reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
    pub start_time: Millis,
    #[serde(default)]
    pub end_time: Option<Millis>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Whether this tab currently holds focus.
    #[serde(default)]
    pub active: bool,
    /// Focused seconds from all closed focus spans across every visit.
    #[serde(default)]
    pub time_spent_in_sec: f64,
    #[serde(default, alias = "tabTracker")]
    pub visit_history: Vec<VisitInterval>,
}

impl TabRecord {
    /// Creates a record for a tab that appeared at `at`.
    ///
    /// A non-empty initial URL opens the first visit immediately; blank tabs
    /// wait for their first completed navigation.
    pub fn new(
        id: TabId,
        window_id: Option<WindowId>,
        title: impl Into<String>,
        url: impl Into<String>,
        at: Millis,
        focused: bool,
    ) -> Self {
        let title = title.into();
        let url = url.into();
        let visit_history = if url.is_empty() {
            Vec::new()
        } else {
            vec![VisitInterval::open(url.clone(), title.clone(), at, focused)]
        };
        Self {
            id,
            window_id,
            start_time: at,
            end_time: None,
            title,
            url,
            active: focused,
            time_spent_in_sec: 0.0,
            visit_history,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> TabState {
        if self.end_time.is_some() {
            TabState::Closed
        } else if self.active {
            TabState::OpenFocused
        } else {
            TabState::OpenUnfocused
        }
    }

    pub const fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// The visit currently displayed, if any.
    pub fn current_visit(&self) -> Option<&VisitInterval> {
        self.visit_history.last().filter(|visit| visit.is_open())
    }

    fn current_visit_mut(&mut self) -> Option<&mut VisitInterval> {
        self.visit_history.last_mut().filter(|visit| visit.is_open())
    }

    /// Applies a completed navigation to `url` at `at`.
    pub fn navigate(&mut self, url: &str, title: &str, at: Millis) -> Navigation {
        if self.is_closed() {
            return Navigation::Ignored;
        }

        self.title = title.to_string();
        if let Some(visit) = self.current_visit_mut() {
            if visit.url == url {
                visit.title = title.to_string();
                return Navigation::SameUrl;
            }
            if let Some(folded) = visit.close(at) {
                self.time_spent_in_sec += folded;
            }
        }

        self.url = url.to_string();
        self.visit_history
            .push(VisitInterval::open(url, title, at, self.active));
        Navigation::NewVisit
    }

    /// Marks the tab focused from `at`.
    ///
    /// Returns `false` if nothing changed (closed, or already focused).
    pub fn focus(&mut self, at: Millis) -> bool {
        if self.is_closed() {
            return false;
        }
        let was_active = self.active;
        self.active = true;
        let started = self
            .current_visit_mut()
            .is_some_and(|visit| visit.start_focus(at));
        started || !was_active
    }

    /// Marks the tab unfocused at `at`, folding the running focus span.
    ///
    /// Returns `false` if nothing changed.
    pub fn unfocus(&mut self, at: Millis) -> bool {
        if self.is_closed() {
            return false;
        }
        let was_active = self.active;
        self.active = false;
        let folded = self.current_visit_mut().and_then(|visit| visit.end_focus(at));
        if let Some(delta) = folded {
            self.time_spent_in_sec += delta;
        }
        folded.is_some() || was_active
    }

    /// Closes the tab at `at`: finalizes the current visit and freezes totals.
    ///
    /// Returns `false` if the tab was already closed.
    pub fn close(&mut self, at: Millis) -> bool {
        if self.is_closed() {
            return false;
        }
        let end = at.max(self.start_time);
        if let Some(folded) = self.current_visit_mut().and_then(|visit| visit.close(end)) {
            self.time_spent_in_sec += folded;
        }
        self.end_time = Some(end);
        self.active = false;
        true
    }

    /// Number of visits that have been closed.
    pub fn closed_visits(&self) -> usize {
        self.visit_history
            .iter()
            .filter(|visit| !visit.is_open())
            .count()
    }
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "whole-millisecond spans are exact in f64"
)]
mod tests {
    use super::*;
    use crate::interval::FocusSpan;

    fn tab(focused: bool) -> TabRecord {
        TabRecord::new(
            TabId::new(1),
            Some(WindowId::new(10)),
            "A",
            "https://a.test",
            0,
            focused,
        )
    }

    #[test]
    fn new_record_opens_first_visit() {
        let record = tab(true);
        assert_eq!(record.state(), TabState::OpenFocused);
        assert_eq!(record.visit_history.len(), 1);
        assert_eq!(
            record.current_visit().unwrap().focus,
            FocusSpan::Open { start: 0 }
        );
    }

    #[test]
    fn blank_tab_waits_for_navigation() {
        let mut record = TabRecord::new(TabId::new(2), None, "", "", 0, false);
        assert!(record.visit_history.is_empty());
        assert_eq!(record.navigate("https://b.test", "B", 1_000), Navigation::NewVisit);
        assert_eq!(record.visit_history.len(), 1);
        assert_eq!(record.url, "https://b.test");
    }

    #[test]
    fn focused_navigation_splits_visit() {
        let mut record = tab(true);
        assert_eq!(record.navigate("https://b.test", "B", 5_000), Navigation::NewVisit);

        let first = &record.visit_history[0];
        assert_eq!(first.end_time, Some(5_000));
        assert_eq!(first.time_diff_in_sec, Some(5.0));
        assert_eq!(first.time_spent_in_sec, 5.0);

        let second = &record.visit_history[1];
        assert_eq!(second.focus, FocusSpan::Open { start: 5_000 });
        assert_eq!(record.time_spent_in_sec, 5.0);
        assert_eq!(record.url, "https://b.test");
    }

    #[test]
    fn same_url_updates_title_only() {
        let mut record = tab(false);
        assert_eq!(
            record.navigate("https://a.test", "A (loaded)", 2_000),
            Navigation::SameUrl
        );
        assert_eq!(record.visit_history.len(), 1);
        assert_eq!(record.title, "A (loaded)");
        assert_eq!(record.visit_history[0].title, "A (loaded)");
        assert!(record.visit_history[0].is_open());
    }

    #[test]
    fn alternating_navigation_counts_closed_visits() {
        let mut record = tab(false);
        let urls = ["https://b.test", "https://b.test", "https://a.test", "https://c.test"];
        for (i, url) in urls.iter().enumerate() {
            let at = i64::try_from(i + 1).unwrap() * 1_000;
            record.navigate(url, "t", at);
        }
        // One repeat among four navigations.
        assert_eq!(record.closed_visits(), 3);
        for visit in &record.visit_history {
            if let Some(end) = visit.end_time {
                assert!(end >= visit.start_time);
            }
        }
    }

    #[test]
    fn focus_and_unfocus_fold_into_tab_total() {
        let mut record = tab(false);
        assert!(record.focus(1_000));
        assert!(!record.focus(1_500));
        assert!(record.unfocus(11_000));
        assert!(!record.unfocus(12_000));
        assert_eq!(record.time_spent_in_sec, 10.0);
        assert_eq!(record.visit_history[0].time_spent_in_sec, 10.0);
        assert_eq!(record.state(), TabState::OpenUnfocused);
    }

    #[test]
    fn close_sets_end_once() {
        let mut record = tab(true);
        assert!(record.close(3_000));
        assert!(!record.close(9_000));
        assert_eq!(record.end_time, Some(3_000));
        assert_eq!(record.state(), TabState::Closed);
        assert_eq!(record.time_spent_in_sec, 3.0);
        assert!(record.current_visit().is_none());

        assert_eq!(record.navigate("https://z.test", "Z", 4_000), Navigation::Ignored);
        assert!(!record.focus(4_000));
        assert_eq!(record.visit_history.len(), 1);
    }

    #[test]
    fn legacy_tab_tracker_field_is_accepted() {
        let json = r#"{
            "id": 5,
            "startTime": 0,
            "endTime": null,
            "title": "A",
            "url": "https://a.test",
            "tabTracker": [
                {"startTime": 0, "endTime": null, "title": "A", "url": "https://a.test"}
            ]
        }"#;
        let record: TabRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.visit_history.len(), 1);
        assert_eq!(record.time_spent_in_sec, 0.0);
        assert!(!record.active);
    }

    #[test]
    fn state_serializes_and_pads_as_label() {
        let mut record = tab(true);
        assert_eq!(serde_json::to_string(&record.state()).unwrap(), r#""focused""#);
        record.close(1_000);
        assert_eq!(serde_json::to_string(&record.state()).unwrap(), r#""closed""#);
        assert_eq!(format!("[{:<6}]", TabState::OpenUnfocused), "[open  ]");
    }
}
