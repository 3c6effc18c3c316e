//! Tab lifecycle events from the host browser.

use serde::{Deserialize, Serialize};

use crate::types::{Millis, TabId, WindowId};

/// Load status reported with a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// A tab lifecycle event.
///
/// # Content Safety
///
/// `title` and `url` are stored as reported by the host. Consumers should
/// escape them before rendering in a terminal or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabEvent {
    /// A tab was opened.
    TabCreated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<WindowId>,
        #[serde(default)]
        title: String,
        #[serde(default)]
        url: String,
        /// Whether the tab opened in the foreground.
        #[serde(default)]
        active: bool,
    },
    /// A tab's load state, title or URL changed.
    TabUpdated {
        tab_id: TabId,
        status: LoadStatus,
        #[serde(default)]
        title: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        active: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<WindowId>,
    },
    /// A tab became the focused tab.
    TabActivated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<WindowId>,
    },
    /// A tab was closed.
    TabRemoved { tab_id: TabId },
    /// A window and all its tabs were closed.
    WindowRemoved { window_id: WindowId },
}

/// Event kinds whose bursts collapse to the latest event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKind {
    Activation,
    Navigation,
}

impl TabEvent {
    /// The tab this event targets, if it targets a single tab.
    pub const fn tab_id(&self) -> Option<TabId> {
        match self {
            Self::TabCreated { tab_id, .. }
            | Self::TabUpdated { tab_id, .. }
            | Self::TabActivated { tab_id, .. }
            | Self::TabRemoved { tab_id } => Some(*tab_id),
            Self::WindowRemoved { .. } => None,
        }
    }

    /// Whether the accounting core acts on this event at all.
    ///
    /// Only completed loads matter among updates.
    pub const fn is_meaningful(&self) -> bool {
        !matches!(
            self,
            Self::TabUpdated {
                status: LoadStatus::Loading,
                ..
            }
        )
    }

    pub const fn debounce_kind(&self) -> Option<DebounceKind> {
        match self {
            Self::TabActivated { .. } => Some(DebounceKind::Activation),
            Self::TabUpdated {
                status: LoadStatus::Complete,
                ..
            } => Some(DebounceKind::Navigation),
            _ => None,
        }
    }
}

/// A feed line: an event with an optional timestamp.
///
/// Events without `at` are stamped on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<Millis>,
    #[serde(flatten)]
    pub event: TabEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_line_parses_with_timestamp() {
        let line = r#"{"at":1000,"type":"tab_created","tab_id":3,"window_id":1,"title":"A","url":"https://a.test","active":true}"#;
        let parsed: TimedEvent = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.at, Some(1_000));
        assert_eq!(parsed.event.tab_id(), Some(TabId::new(3)));
        assert_eq!(parsed.event.debounce_kind(), None);
    }

    #[test]
    fn feed_line_without_timestamp() {
        let line = r#"{"type":"window_removed","window_id":9}"#;
        let parsed: TimedEvent = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.at, None);
        assert_eq!(
            parsed.event,
            TabEvent::WindowRemoved {
                window_id: WindowId::new(9)
            }
        );
        assert_eq!(parsed.event.tab_id(), None);
    }

    #[test]
    fn loading_updates_are_not_meaningful() {
        let loading: TabEvent = serde_json::from_str(
            r#"{"type":"tab_updated","tab_id":1,"status":"loading","url":"https://a.test"}"#,
        )
        .unwrap();
        assert!(!loading.is_meaningful());
        assert_eq!(loading.debounce_kind(), None);

        let complete: TabEvent = serde_json::from_str(
            r#"{"type":"tab_updated","tab_id":1,"status":"complete","url":"https://a.test"}"#,
        )
        .unwrap();
        assert!(complete.is_meaningful());
        assert_eq!(complete.debounce_kind(), Some(DebounceKind::Navigation));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let result: Result<TimedEvent, _> =
            serde_json::from_str(r#"{"type":"tab_zoomed","tab_id":1}"#);
        assert!(result.is_err());
    }
}
