//! Lane command handlers.
//!
//! Each handler is one read-modify-write of a single tab's record. They only
//! run on that tab's lane.

use ttt_core::{Expiry, Millis, Navigation, TabEvent, TabId, TabRecord, WindowId};
use ttt_store::Store;

use crate::error::TrackerError;
use crate::host::{HostTab, HostTabs};
use crate::tracker::{Focus, Refresh, Tracker};

type Result<T> = std::result::Result<T, TrackerError>;

pub(crate) async fn on_event<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
    event: TabEvent,
    focus: Focus,
) -> Result<()> {
    match event {
        TabEvent::TabCreated {
            window_id,
            title,
            url,
            ..
        } => on_created(tracker, tab, at, window_id, &title, &url, focus).await,
        TabEvent::TabUpdated {
            window_id,
            title,
            url,
            ..
        } => on_navigated(tracker, tab, at, window_id, &url, &title).await,
        TabEvent::TabActivated { window_id, .. } => {
            on_activated(tracker, tab, at, window_id, focus).await
        }
        TabEvent::TabRemoved { .. } => on_removed(tracker, tab, at).await,
        TabEvent::WindowRemoved { .. } => Ok(()),
    }
}

/// Applies the focus an event claimed to `record`.
fn apply_focus(record: &mut TabRecord, at: Millis, focus: Focus) -> bool {
    match focus {
        Focus::Unchanged => false,
        Focus::Held => record.focus(at),
        Focus::Until(until) => {
            let started = record.focus(at);
            record.unfocus(until) || started
        }
    }
}

async fn on_created<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
    window: Option<WindowId>,
    title: &str,
    url: &str,
    focus: Focus,
) -> Result<()> {
    match tracker.load(tab).await? {
        Some(mut existing) if !existing.is_closed() => {
            tracing::debug!(tab = %tab, "tab already tracked");
            if apply_focus(&mut existing, at, focus) {
                tracker.save(existing).await?;
                tracing::debug!(tab = %tab, at, "tab focused");
            }
            return Ok(());
        }
        Some(_) => tracing::debug!(tab = %tab, "tab id reused; replacing closed record"),
        None => {}
    }

    let mut record = TabRecord::new(tab, window, title, url, at, false);
    apply_focus(&mut record, at, focus);
    tracker.save(record).await?;
    tracing::debug!(tab = %tab, ?focus, "tab created");
    Ok(())
}

async fn on_navigated<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
    window: Option<WindowId>,
    url: &str,
    title: &str,
) -> Result<()> {
    let mut record = tracker
        .load(tab)
        .await?
        .ok_or(TrackerError::MissingRecord(tab))?;
    let outcome = record.navigate(url, title, at);
    if outcome == Navigation::Ignored {
        return Ok(());
    }
    if window.is_some() {
        record.window_id = window;
    }
    tracker.save(record).await?;
    tracing::debug!(tab = %tab, ?outcome, "navigation applied");
    Ok(())
}

async fn on_activated<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
    window: Option<WindowId>,
    focus: Focus,
) -> Result<()> {
    let mut record = tracker
        .load(tab)
        .await?
        .ok_or(TrackerError::MissingRecord(tab))?;
    if record.is_closed() {
        return Ok(());
    }

    let mut changed = apply_focus(&mut record, at, focus);
    if window.is_some() && record.window_id != window {
        record.window_id = window;
        changed = true;
    }
    if changed {
        tracker.save(record).await?;
        tracing::debug!(tab = %tab, at, "tab focused");
    }
    Ok(())
}

pub(crate) async fn on_unfocus<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
) -> Result<()> {
    let mut record = tracker
        .load(tab)
        .await?
        .ok_or(TrackerError::MissingRecord(tab))?;
    if record.unfocus(at) {
        tracker.save(record).await?;
        tracing::debug!(tab = %tab, at, "tab unfocused");
    }
    Ok(())
}

async fn on_removed<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
) -> Result<()> {
    let mut record = tracker
        .load(tab)
        .await?
        .ok_or(TrackerError::MissingRecord(tab))?;
    if record.close(at) {
        tracker.save(record).await?;
        tracing::debug!(tab = %tab, at, "tab closed");
    }
    Ok(())
}

pub(crate) async fn on_expire<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    now: Millis,
) -> Result<Expiry> {
    let Some(mut record) = tracker.load(tab).await? else {
        return Ok(Expiry::Keep);
    };
    let expiry = tracker.options().retention.apply(&mut record, now);
    match expiry {
        Expiry::Delete => tracker.delete(tab).await?,
        Expiry::Pruned(_) => tracker.save(record).await?,
        Expiry::Keep => {}
    }
    if expiry != Expiry::Keep {
        tracing::debug!(tab = %tab, ?expiry, "retention applied");
    }
    Ok(expiry)
}

pub(crate) async fn on_retire<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
) -> Result<bool> {
    match tracker.load(tab).await? {
        Some(record) if record.is_closed() => {
            tracker.delete(tab).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

async fn lookup_live<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
) -> Result<HostTab> {
    tracker
        .inner
        .host
        .lookup(tab)
        .await?
        .ok_or(TrackerError::StaleHostLookup(tab))
}

pub(crate) async fn on_refresh<S: Store, H: HostTabs>(
    tracker: &Tracker<S, H>,
    tab: TabId,
    at: Millis,
) -> Result<Refresh> {
    let mut record = tracker
        .load(tab)
        .await?
        .ok_or(TrackerError::MissingRecord(tab))?;
    if record.is_closed() {
        return Ok(Refresh::Closed);
    }

    let live = match lookup_live(tracker, tab).await {
        Ok(live) => live,
        Err(err @ TrackerError::StaleHostLookup(_)) => {
            tracing::info!(tab = %tab, error = %err, "deleting record");
            tracker.release_focus(tab);
            tracker.delete(tab).await?;
            return Ok(Refresh::Deleted);
        }
        Err(err) => return Err(err),
    };

    let mut changed = false;
    if !live.url.is_empty() {
        changed = record.navigate(&live.url, &live.title, at) != Navigation::Ignored;
    }
    if live.window_id.is_some() && record.window_id != live.window_id {
        record.window_id = live.window_id;
        changed = true;
    }
    if changed {
        tracker.save(record).await?;
    }
    Ok(Refresh::Updated)
}
