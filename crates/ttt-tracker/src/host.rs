//! Live tab lookup on the host browser.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use ttt_core::{LoadStatus, TabEvent, TabId, WindowId};

/// Host lookup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host could not be reached.
    #[error("host unavailable: {0}")]
    Unavailable(String),
    /// The host refused to focus the tab.
    #[error("tab {0} cannot be focused")]
    NotFocusable(TabId),
}

/// A tab as the host currently sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTab {
    pub id: TabId,
    pub window_id: Option<WindowId>,
    pub title: String,
    pub url: String,
    pub active: bool,
}

/// Access to the host's live tabs.
pub trait HostTabs: Send + Sync + 'static {
    /// Returns the live tab, or `None` if the host no longer has it.
    fn lookup(&self, tab: TabId)
    -> impl Future<Output = Result<Option<HostTab>, HostError>> + Send;

    /// Asks the host to bring a tab and its window to the front.
    fn focus_tab(
        &self,
        tab: TabId,
        window: Option<WindowId>,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

/// A host view assembled from the event feed itself.
///
/// Used when replaying a feed with no live browser behind it: a tab exists
/// from its creation event until its removal (or its window's removal).
#[derive(Debug, Clone, Default)]
pub struct KnownTabs {
    tabs: Arc<RwLock<HashMap<TabId, HostTab>>>,
}

impl KnownTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the known tabs from one feed event.
    pub fn observe(&self, event: &TabEvent) {
        let mut tabs = self.tabs.write().unwrap_or_else(PoisonError::into_inner);
        match event {
            TabEvent::TabCreated {
                tab_id,
                window_id,
                title,
                url,
                active,
            } => {
                tabs.insert(
                    *tab_id,
                    HostTab {
                        id: *tab_id,
                        window_id: *window_id,
                        title: title.clone(),
                        url: url.clone(),
                        active: *active,
                    },
                );
            }
            TabEvent::TabUpdated {
                tab_id,
                status: LoadStatus::Complete,
                title,
                url,
                window_id,
                ..
            } => {
                if let Some(tab) = tabs.get_mut(tab_id) {
                    tab.title.clone_from(title);
                    tab.url.clone_from(url);
                    if window_id.is_some() {
                        tab.window_id = *window_id;
                    }
                }
            }
            TabEvent::TabUpdated { .. } => {}
            TabEvent::TabActivated { tab_id, .. } => {
                for tab in tabs.values_mut() {
                    tab.active = tab.id == *tab_id;
                }
            }
            TabEvent::TabRemoved { tab_id } => {
                tabs.remove(tab_id);
            }
            TabEvent::WindowRemoved { window_id } => {
                tabs.retain(|_, tab| tab.window_id != Some(*window_id));
            }
        }
    }

    pub fn get(&self, tab: TabId) -> Option<HostTab> {
        self.tabs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tab)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tabs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HostTabs for KnownTabs {
    async fn lookup(&self, tab: TabId) -> Result<Option<HostTab>, HostError> {
        Ok(self.get(tab))
    }

    async fn focus_tab(&self, tab: TabId, _window: Option<WindowId>) -> Result<(), HostError> {
        let mut tabs = self.tabs.write().unwrap_or_else(PoisonError::into_inner);
        if !tabs.contains_key(&tab) {
            return Err(HostError::NotFocusable(tab));
        }
        for known in tabs.values_mut() {
            known.active = known.id == tab;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: i64, window: i64) -> TabEvent {
        TabEvent::TabCreated {
            tab_id: TabId::new(id),
            window_id: Some(WindowId::new(window)),
            title: format!("Tab {id}"),
            url: format!("https://{id}.test"),
            active: false,
        }
    }

    #[test]
    fn observe_tracks_lifecycle() {
        let known = KnownTabs::new();
        known.observe(&created(1, 1));
        known.observe(&created(2, 1));
        known.observe(&created(3, 2));
        assert_eq!(known.len(), 3);

        known.observe(&TabEvent::TabUpdated {
            tab_id: TabId::new(1),
            status: LoadStatus::Complete,
            title: "Moved".into(),
            url: "https://moved.test".into(),
            active: false,
            window_id: None,
        });
        assert_eq!(known.get(TabId::new(1)).unwrap().url, "https://moved.test");

        known.observe(&TabEvent::TabRemoved {
            tab_id: TabId::new(2),
        });
        assert!(known.get(TabId::new(2)).is_none());

        known.observe(&TabEvent::WindowRemoved {
            window_id: WindowId::new(1),
        });
        assert!(known.get(TabId::new(1)).is_none());
        assert!(known.get(TabId::new(3)).is_some());
    }

    #[tokio::test]
    async fn focus_tab_requires_known_tab() {
        let known = KnownTabs::new();
        known.observe(&created(1, 1));
        known.observe(&created(2, 1));

        known.focus_tab(TabId::new(2), None).await.unwrap();
        assert!(known.get(TabId::new(2)).unwrap().active);
        assert!(!known.get(TabId::new(1)).unwrap().active);

        let err = known.focus_tab(TabId::new(9), None).await.unwrap_err();
        assert_eq!(err, HostError::NotFocusable(TabId::new(9)));
    }
}
