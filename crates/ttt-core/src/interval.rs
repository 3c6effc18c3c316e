//! Visit intervals and their nested focus spans.
//!
//! A [`VisitInterval`] covers one contiguous URL visit inside a tab. It tracks
//! two independent durations:
//!
//! - **open** time, bounded by `start_time`/`end_time`
//! - **focused** time, accumulated from [`FocusSpan`]s
//!
//! Only the latest focus span is held live. When a span closes its delta is
//! folded into `time_spent_in_sec` once, so repeated reads never re-add it.

use serde::{Deserialize, Serialize};

use crate::types::{Millis, secs_between};

/// The live focus span of a visit.
///
/// Persisted as the nullable pair `userStartTime`/`userEndTime`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FocusFields", into = "FocusFields")]
pub enum FocusSpan {
    /// The visit has not been focused (or its focus was never recorded).
    #[default]
    Idle,
    /// Focus started at `start` and is still running.
    Open { start: Millis },
    /// The most recent focus span, already folded into the visit total.
    Closed { start: Millis, end: Millis },
}

impl FocusSpan {
    /// Returns the start of a running span.
    #[must_use]
    pub const fn open_since(self) -> Option<Millis> {
        match self {
            Self::Open { start } => Some(start),
            Self::Idle | Self::Closed { .. } => None,
        }
    }

    /// Whether a focus span is currently running.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Wire shape of a focus span.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FocusFields {
    #[serde(default)]
    user_start_time: Option<Millis>,
    #[serde(default)]
    user_end_time: Option<Millis>,
}

impl From<FocusFields> for FocusSpan {
    fn from(fields: FocusFields) -> Self {
        match (fields.user_start_time, fields.user_end_time) {
            (Some(start), Some(end)) => Self::Closed { start, end },
            (Some(start), None) => Self::Open { start },
            // An end without a start carries no usable span.
            (None, _) => Self::Idle,
        }
    }
}

impl From<FocusSpan> for FocusFields {
    fn from(span: FocusSpan) -> Self {
        match span {
            FocusSpan::Idle => Self::default(),
            FocusSpan::Open { start } => Self {
                user_start_time: Some(start),
                user_end_time: None,
            },
            FocusSpan::Closed { start, end } => Self {
                user_start_time: Some(start),
                user_end_time: Some(end),
            },
        }
    }
}

/// One contiguous URL visit within a tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitInterval {
    /// When the URL started being displayed.
    pub start_time: Millis,
    /// When the URL stopped being displayed. `None` while current.
    #[serde(default)]
    pub end_time: Option<Millis>,
    /// The latest focus span.
    #[serde(flatten)]
    pub focus: FocusSpan,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Focused seconds from spans that have already closed.
    #[serde(default)]
    pub time_spent_in_sec: f64,
    /// Open duration in seconds, set when the visit closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_diff_in_sec: Option<f64>,
}

impl VisitInterval {
    /// Opens a visit at `at`, starting a focus span if the tab is focused.
    pub fn open(url: impl Into<String>, title: impl Into<String>, at: Millis, focused: bool) -> Self {
        Self {
            start_time: at,
            end_time: None,
            focus: if focused {
                FocusSpan::Open { start: at }
            } else {
                FocusSpan::Idle
            },
            title: title.into(),
            url: url.into(),
            time_spent_in_sec: 0.0,
            time_diff_in_sec: None,
        }
    }

    /// Whether this visit is still displayed.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Starts a focus span at `at`.
    ///
    /// Returns `false` without changes if a span is already running or the
    /// visit has closed.
    pub fn start_focus(&mut self, at: Millis) -> bool {
        if !self.is_open() || self.focus.is_open() {
            return false;
        }
        self.focus = FocusSpan::Open { start: at };
        true
    }

    /// Ends the running focus span at `at` and folds its duration.
    ///
    /// Returns the folded seconds, or `None` if no span was running. The end
    /// is clamped to the span start.
    pub fn end_focus(&mut self, at: Millis) -> Option<f64> {
        let start = self.focus.open_since()?;
        let end = at.max(start);
        let delta = secs_between(start, end);
        self.focus = FocusSpan::Closed { start, end };
        self.time_spent_in_sec += delta;
        Some(delta)
    }

    /// Closes the visit at `at`.
    ///
    /// A running focus span is closed at the same instant. Returns the focused
    /// seconds folded by the close, or `None` if the visit was already closed.
    pub fn close(&mut self, at: Millis) -> Option<f64> {
        if !self.is_open() {
            return None;
        }
        let end = at.max(self.start_time);
        let folded = self.end_focus(end).unwrap_or(0.0);
        self.end_time = Some(end);
        self.time_diff_in_sec = Some(secs_between(self.start_time, end));
        Some(folded)
    }
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "whole-millisecond spans are exact in f64"
)]
mod tests {
    use super::*;

    #[test]
    fn open_focused_starts_span() {
        let visit = VisitInterval::open("https://a.test", "A", 1_000, true);
        assert_eq!(visit.focus, FocusSpan::Open { start: 1_000 });
        assert!(visit.is_open());
        assert_eq!(visit.time_spent_in_sec, 0.0);

        let visit = VisitInterval::open("https://a.test", "A", 1_000, false);
        assert_eq!(visit.focus, FocusSpan::Idle);
    }

    #[test]
    fn end_focus_folds_once() {
        let mut visit = VisitInterval::open("https://a.test", "A", 0, true);
        assert_eq!(visit.end_focus(4_000), Some(4.0));
        assert_eq!(visit.end_focus(9_000), None);
        assert_eq!(visit.time_spent_in_sec, 4.0);
        assert_eq!(visit.focus, FocusSpan::Closed { start: 0, end: 4_000 });
    }

    #[test]
    fn repeated_focus_spans_accumulate() {
        let mut visit = VisitInterval::open("https://a.test", "A", 0, true);
        visit.end_focus(2_000);
        assert!(visit.start_focus(10_000));
        assert!(!visit.start_focus(11_000));
        visit.end_focus(13_000);
        assert_eq!(visit.time_spent_in_sec, 5.0);
    }

    #[test]
    fn close_forces_running_span_closed() {
        let mut visit = VisitInterval::open("https://a.test", "A", 0, true);
        assert_eq!(visit.close(5_000), Some(5.0));
        assert_eq!(visit.end_time, Some(5_000));
        assert_eq!(visit.time_diff_in_sec, Some(5.0));
        assert_eq!(visit.time_spent_in_sec, 5.0);
        assert!(!visit.focus.is_open());
    }

    #[test]
    fn close_is_noop_when_already_closed() {
        let mut visit = VisitInterval::open("https://a.test", "A", 0, false);
        assert_eq!(visit.close(3_000), Some(0.0));
        assert_eq!(visit.close(8_000), None);
        assert_eq!(visit.end_time, Some(3_000));
        assert!(!visit.start_focus(9_000));
    }

    #[test]
    fn out_of_order_close_never_goes_negative() {
        let mut visit = VisitInterval::open("https://a.test", "A", 5_000, true);
        visit.close(1_000);
        assert_eq!(visit.end_time, Some(5_000));
        assert_eq!(visit.time_diff_in_sec, Some(0.0));
        assert_eq!(visit.time_spent_in_sec, 0.0);
    }

    #[test]
    fn focus_span_persists_as_nullable_pair() {
        let mut visit = VisitInterval::open("https://a.test", "A", 0, true);
        let json = serde_json::to_value(&visit).unwrap();
        assert_eq!(json["userStartTime"], 0);
        assert!(json["userEndTime"].is_null());

        visit.close(2_000);
        let json = serde_json::to_value(&visit).unwrap();
        assert_eq!(json["userEndTime"], 2_000);
        assert_eq!(json["timeDiffInSec"], 2.0);

        let parsed: VisitInterval = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, visit);
    }

    #[test]
    fn end_without_start_reads_as_idle() {
        let json = r#"{
            "startTime": 0,
            "endTime": null,
            "userEndTime": 500,
            "title": "A",
            "url": "https://a.test"
        }"#;
        let visit: VisitInterval = serde_json::from_str(json).unwrap();
        assert_eq!(visit.focus, FocusSpan::Idle);
        assert_eq!(visit.time_spent_in_sec, 0.0);
    }
}
