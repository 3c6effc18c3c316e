//! The tracker handle: dispatch, focus ownership and the read/command surface.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use ttt_core::{
    Clock, Expiry, Millis, Retention, SystemClock, TabEvent, TabId, TabRecord, TabView, WindowId,
};
use ttt_store::{Query, Store};

use crate::error::TrackerError;
use crate::host::HostTabs;
use crate::inflight::InFlight;
use crate::lane::{self, Command};

/// Default debounce window for activation and navigation bursts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Runtime tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    /// How long a debounceable event is held for a newer one to replace it.
    /// Zero applies every event immediately.
    pub debounce: Duration,
    /// How long closed data is kept.
    pub retention: Retention,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            retention: Retention::default(),
        }
    }
}

/// Which tab holds focus, and since when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FocusHolder {
    tab: TabId,
    since: Millis,
}

/// Outcome of trying to take the focus holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    /// The claim won; `previous` must be folded out.
    Granted { previous: Option<TabId> },
    /// A later activation already holds focus; the claimant was focused
    /// only until `until`.
    Stale { holder: TabId, until: Millis },
}

/// What an event does to its tab's focus, decided when it is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    /// The event does not touch focus.
    Unchanged,
    /// Focused from the event onward.
    Held,
    /// Focused from the event until a later activation elsewhere.
    Until(Millis),
}

/// Result of one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub pruned_visits: usize,
}

/// Result of refreshing one record from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The record is closed; the host was not asked.
    Closed,
    /// The host no longer has the tab; the record was deleted.
    Deleted,
    /// The record was brought up to date with the live tab.
    Updated,
}

pub(crate) struct Inner<S, H> {
    pub(crate) store: S,
    pub(crate) host: H,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) options: TrackerOptions,
    pub(crate) inflight: InFlight,
    lanes: Mutex<HashMap<TabId, mpsc::UnboundedSender<Command>>>,
    focus: Mutex<Option<FocusHolder>>,
    /// Last reported window of each live tab.
    windows: Mutex<HashMap<TabId, WindowId>>,
}

/// Handle to the tab accounting state machine.
///
/// Cheap to clone; clones share one runtime. The tracker is the only writer
/// of tab records. Every mutation of a given tab runs on that tab's lane, one
/// at a time, while different tabs proceed in parallel.
///
/// Event methods must be called from inside a tokio runtime.
pub struct Tracker<S, H> {
    pub(crate) inner: Arc<Inner<S, H>>,
}

impl<S, H> Clone for Tracker<S, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Store, H: HostTabs> Tracker<S, H> {
    pub fn new(store: S, host: H, options: TrackerOptions) -> Self {
        Self::with_clock(store, host, options, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, host: H, options: TrackerOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                host,
                clock,
                options,
                inflight: InFlight::default(),
                lanes: Mutex::new(HashMap::new()),
                focus: Mutex::new(None),
                windows: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn now(&self) -> Millis {
        self.inner.clock.now_ms()
    }

    pub fn options(&self) -> TrackerOptions {
        self.inner.options
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Handles an event stamped with the current time.
    pub fn handle(&self, event: TabEvent) {
        self.handle_at(event, self.now());
    }

    /// Handles an event that happened at `at`.
    ///
    /// Returns immediately; the work runs on the tab's lane. Focus moves
    /// here, in the order events are handed in, so the tab losing focus sees
    /// its fold before any of its own later events.
    pub fn handle_at(&self, event: TabEvent, at: Millis) {
        if !event.is_meaningful() {
            tracing::trace!(?event, "ignoring incomplete load");
            return;
        }
        self.remember_window(&event);
        let Some(tab) = event.tab_id() else {
            if let TabEvent::WindowRemoved { window_id } = event {
                self.close_window(window_id, at);
            }
            return;
        };
        let focus = match &event {
            TabEvent::TabActivated { .. } | TabEvent::TabCreated { active: true, .. } => {
                self.take_focus(tab, at)
            }
            TabEvent::TabRemoved { .. } => {
                self.release_focus(tab);
                Focus::Unchanged
            }
            _ => Focus::Unchanged,
        };
        self.dispatch(tab, Command::Event { at, event, focus });
    }

    /// Resolves once every dispatched event has been applied.
    pub async fn wait_idle(&self) {
        self.inner.inflight.wait().await;
    }

    /// The tab currently holding focus.
    pub fn focused_tab(&self) -> Option<TabId> {
        lock(&self.inner.focus).map(|holder| holder.tab)
    }

    /// Reads one record.
    pub async fn record(&self, tab: TabId) -> Result<Option<TabRecord>, TrackerError> {
        self.load(tab).await
    }

    /// Reads every record, oldest tab first.
    pub async fn records(&self) -> Result<Vec<TabRecord>, TrackerError> {
        let mut records: Vec<TabRecord> =
            self.inner.store.get(Query::All).await?.into_values().collect();
        records.sort_by_key(|record| (record.start_time, record.id));
        Ok(records)
    }

    /// Reads every record with live totals as of now.
    pub async fn views(&self) -> Result<Vec<TabView>, TrackerError> {
        let now = self.now();
        Ok(self
            .records()
            .await?
            .iter()
            .map(|record| TabView::new(record, now))
            .collect())
    }

    /// Deletes every closed record. Returns how many were deleted.
    pub async fn clear_closed_history(&self) -> Result<usize, TrackerError> {
        let closed: Vec<TabId> = self
            .records()
            .await?
            .into_iter()
            .filter(TabRecord::is_closed)
            .map(|record| record.id)
            .collect();

        let results = self
            .ask_each(closed, |reply| Command::Retire { reply })
            .await;
        let mut removed = 0;
        for result in results {
            if result? {
                removed += 1;
            }
        }
        tracing::info!(removed, "cleared closed history");
        Ok(removed)
    }

    /// Runs one retention pass over the store.
    pub async fn sweep(&self) -> Result<SweepReport, TrackerError> {
        let now = self.now();
        let retention = self.inner.options.retention;
        let due: Vec<TabId> = self
            .inner
            .store
            .get(Query::All)
            .await?
            .into_values()
            .filter(|record| retention.plan(record, now) != Expiry::Keep)
            .map(|record| record.id)
            .collect();

        let results = self
            .ask_each(due, |reply| Command::Expire { now, reply })
            .await;
        let mut report = SweepReport::default();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(Expiry::Delete) => report.deleted += 1,
                Ok(Expiry::Pruned(count)) => report.pruned_visits += count,
                Ok(Expiry::Keep) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "retention failed for one record");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) if report == SweepReport::default() => Err(err),
            _ => Ok(report),
        }
    }

    /// Brings one open record up to date with the host's live tab.
    ///
    /// If the host no longer has the tab, the record is deleted.
    pub async fn refresh(&self, tab: TabId) -> Result<Refresh, TrackerError> {
        let at = self.now();
        let mut results = self
            .ask_each(vec![tab], |reply| Command::Refresh { at, reply })
            .await;
        results.pop().unwrap_or(Err(TrackerError::LaneClosed(tab)))
    }

    /// Refreshes every open record, e.g. after a browser restart.
    ///
    /// Returns how many stale records were deleted.
    pub async fn reconcile(&self) -> Result<usize, TrackerError> {
        let at = self.now();
        let open: Vec<TabId> = self
            .records()
            .await?
            .into_iter()
            .filter(|record| !record.is_closed())
            .map(|record| record.id)
            .collect();

        let results = self
            .ask_each(open, |reply| Command::Refresh { at, reply })
            .await;
        let mut deleted = 0;
        for result in results {
            match result {
                Ok(Refresh::Deleted) => deleted += 1,
                Ok(_) => {}
                Err(err) if err.is_benign() => {}
                Err(err) => return Err(err),
            }
        }
        tracing::info!(deleted, "reconciled open records with host");
        Ok(deleted)
    }

    /// Asks the host to focus a tab and its window.
    ///
    /// Accounting follows from the activation event the host then emits.
    pub async fn focus_tab(&self, tab: TabId) -> Result<(), TrackerError> {
        let record = self
            .load(tab)
            .await?
            .ok_or(TrackerError::MissingRecord(tab))?;
        self.inner.host.focus_tab(tab, record.window_id).await?;
        Ok(())
    }

    /// Sends a reply-carrying command to each tab's lane and collects answers
    /// in order.
    async fn ask_each<T, F>(&self, tabs: Vec<TabId>, make: F) -> Vec<Result<T, TrackerError>>
    where
        F: Fn(oneshot::Sender<Result<T, TrackerError>>) -> Command,
    {
        let pending: Vec<_> = tabs
            .into_iter()
            .map(|tab| {
                let (tx, rx) = oneshot::channel();
                self.dispatch(tab, make(tx));
                (tab, rx)
            })
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        for (tab, rx) in pending {
            results.push(rx.await.unwrap_or(Err(TrackerError::LaneClosed(tab))));
        }
        results
    }

    /// Queues `command` on the tab's lane, starting the lane if needed.
    pub(crate) fn dispatch(&self, tab: TabId, command: Command) {
        self.inner.inflight.begin();
        let mut lanes = lock(&self.inner.lanes);
        let command = match lanes.get(&tab) {
            Some(tx) => match tx.send(command) {
                Ok(()) => return,
                // The lane died without deregistering; replace it.
                Err(mpsc::error::SendError(command)) => command,
            },
            None => command,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(command).is_err() {
            tracing::error!(tab = %tab, "new lane rejected its first command");
            self.inner.inflight.end();
            return;
        }
        lanes.insert(tab, tx);
        drop(lanes);
        tokio::spawn(lane::run(self.clone(), tab, rx));
    }

    /// Deregisters an idle lane, unless a command slipped in.
    ///
    /// Senders only send while holding the registry lock, so an empty queue
    /// seen under the lock stays empty.
    pub(crate) fn retire_lane(
        &self,
        tab: TabId,
        rx: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Option<Command> {
        let mut lanes = lock(&self.inner.lanes);
        if let Ok(command) = rx.try_recv() {
            return Some(command);
        }
        lanes.remove(&tab);
        None
    }

    /// Moves the focus holder to `tab` as of `at`.
    fn claim_focus(&self, tab: TabId, at: Millis) -> Claim {
        let mut holder = lock(&self.inner.focus);
        match *holder {
            Some(current) if current.tab == tab => {
                *holder = Some(FocusHolder {
                    tab,
                    since: current.since.min(at),
                });
                Claim::Granted { previous: None }
            }
            Some(current) if current.since > at => Claim::Stale {
                holder: current.tab,
                until: current.since,
            },
            current => {
                *holder = Some(FocusHolder { tab, since: at });
                Claim::Granted {
                    previous: current.map(|h| h.tab),
                }
            }
        }
    }

    /// Takes the focus holder for `tab` and folds the previous holder out.
    fn take_focus(&self, tab: TabId, at: Millis) -> Focus {
        match self.claim_focus(tab, at) {
            Claim::Granted { previous } => {
                if let Some(previous) = previous {
                    self.dispatch(previous, Command::Unfocus { at });
                }
                Focus::Held
            }
            Claim::Stale { holder, until } => {
                tracing::debug!(tab = %tab, holder = %holder, at, until, "activation overtaken");
                Focus::Until(until)
            }
        }
    }

    /// Clears the focus holder if `tab` holds it.
    pub(crate) fn release_focus(&self, tab: TabId) {
        let mut holder = lock(&self.inner.focus);
        if holder.is_some_and(|h| h.tab == tab) {
            *holder = None;
        }
    }

    fn remember_window(&self, event: &TabEvent) {
        let mut windows = lock(&self.inner.windows);
        match event {
            TabEvent::TabCreated {
                tab_id,
                window_id: Some(window),
                ..
            }
            | TabEvent::TabUpdated {
                tab_id,
                window_id: Some(window),
                ..
            }
            | TabEvent::TabActivated {
                tab_id,
                window_id: Some(window),
            } => {
                windows.insert(*tab_id, *window);
            }
            TabEvent::TabRemoved { tab_id } => {
                windows.remove(tab_id);
            }
            _ => {}
        }
    }

    /// Closes every open tab of a removed window.
    ///
    /// Tabs seen in this session are closed in order behind their pending
    /// events. Records persisted by an earlier session are found by scanning
    /// the store.
    fn close_window(&self, window: WindowId, at: Millis) {
        let (members, known) = {
            let mut windows = lock(&self.inner.windows);
            let known: HashSet<TabId> = windows.keys().copied().collect();
            let members: Vec<TabId> = windows
                .iter()
                .filter(|(_, w)| **w == window)
                .map(|(tab, _)| *tab)
                .collect();
            windows.retain(|_, w| *w != window);
            (members, known)
        };

        tracing::debug!(window = %window, tabs = members.len(), "closing window");
        for tab in members {
            self.close_tab(tab, at);
        }

        self.inner.inflight.begin();
        let tracker = self.clone();
        tokio::spawn(async move {
            match tracker.inner.store.get(Query::All).await {
                Ok(records) => {
                    let stragglers = records.into_values().filter(|record| {
                        record.window_id == Some(window)
                            && !record.is_closed()
                            && !known.contains(&record.id)
                    });
                    for record in stragglers {
                        tracker.close_tab(record.id, at);
                    }
                }
                Err(err) => {
                    tracing::warn!(window = %window, error = %err, "failed to scan window tabs");
                }
            }
            tracker.inner.inflight.end();
        });
    }

    fn close_tab(&self, tab: TabId, at: Millis) {
        self.release_focus(tab);
        self.dispatch(
            tab,
            Command::Event {
                at,
                event: TabEvent::TabRemoved { tab_id: tab },
                focus: Focus::Unchanged,
            },
        );
    }

    pub(crate) async fn load(&self, tab: TabId) -> Result<Option<TabRecord>, TrackerError> {
        let key = tab.key();
        let mut found = self.inner.store.get(Query::Key(key.clone())).await?;
        Ok(found.remove(&key))
    }

    pub(crate) async fn save(&self, record: TabRecord) -> Result<(), TrackerError> {
        let key = record.id.key();
        self.inner.store.set([(key, record)].into_iter().collect()).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, tab: TabId) -> Result<(), TrackerError> {
        self.inner.store.remove(vec![tab.key()]).await?;
        Ok(())
    }
}
