//! Per-tab actor loop.
//!
//! A lane owns the command queue of one tab id. Commands run one at a time,
//! each a full read-modify-write of the tab's record, so two events for the
//! same tab can never interleave their store calls. The lane exits once its
//! queue is empty; the next dispatch starts a fresh one.
//!
//! # Debounce
//!
//! Activation and navigation-complete events are held for the debounce
//! window before they are applied. While one is held:
//!
//! - a newer event of the same kind, stamped within the window of the held
//!   one, replaces it and restarts the timer; a repeated activation keeps
//!   the held one's earlier start
//! - any other command applies the held event first, then itself
//! - the timer firing applies the held event

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use ttt_core::{DebounceKind, Expiry, Millis, TabEvent, TabId};
use ttt_store::Store;

use crate::error::TrackerError;
use crate::handlers;
use crate::host::HostTabs;
use crate::tracker::{Focus, Refresh, Tracker};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, TrackerError>>;

/// Work queued on a lane.
#[derive(Debug)]
pub(crate) enum Command {
    /// A host event for this tab.
    Event {
        at: Millis,
        event: TabEvent,
        focus: Focus,
    },
    /// Another tab took focus at `at`.
    Unfocus { at: Millis },
    /// Apply retention as of `now`.
    Expire { now: Millis, reply: Reply<Expiry> },
    /// Delete the record if it is closed.
    Retire { reply: Reply<bool> },
    /// Re-read the live tab from the host.
    Refresh { at: Millis, reply: Reply<Refresh> },
}

impl Command {
    fn debounce_kind(&self) -> Option<DebounceKind> {
        match self {
            Self::Event { event, .. } => event.debounce_kind(),
            _ => None,
        }
    }

    fn focus(&self) -> Focus {
        match self {
            Self::Event { focus, .. } => *focus,
            _ => Focus::Unchanged,
        }
    }

    /// Moves an event's start back to `start` if that is earlier.
    fn start_from(&mut self, start: Millis) {
        if let Self::Event { at, .. } = self {
            *at = (*at).min(start);
        }
    }
}

/// An event waiting out its debounce window.
struct Held {
    kind: DebounceKind,
    /// Stamp of the newest event folded into this one.
    at: Millis,
    command: Command,
    deadline: Instant,
}

impl Held {
    /// Whether `command`, stamped `at`, supersedes the held event.
    ///
    /// Activations only merge while both hold focus outright. An overtaken
    /// activation is bounded by another tab's span and is applied on its own.
    fn superseded_by(
        &self,
        kind: DebounceKind,
        at: Millis,
        command: &Command,
        window_ms: Millis,
    ) -> bool {
        if self.kind != kind || at.saturating_sub(self.at) >= window_ms {
            return false;
        }
        kind != DebounceKind::Activation
            || (self.command.focus() == Focus::Held && command.focus() == Focus::Held)
    }

    fn start(&self) -> Option<Millis> {
        match self.command {
            Command::Event { at, .. } => Some(at),
            _ => None,
        }
    }
}

pub(crate) async fn run<S: Store, H: HostTabs>(
    tracker: Tracker<S, H>,
    tab: TabId,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let debounce = tracker.options().debounce;
    let window_ms = Millis::try_from(debounce.as_millis()).unwrap_or(Millis::MAX);
    let mut held: Option<Held> = None;
    tracing::trace!(tab = %tab, "lane started");

    loop {
        let deadline = held.as_ref().map(|h| h.deadline);
        let next = match deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    command = rx.recv() => command,
                    () = tokio::time::sleep_until(deadline) => {
                        if let Some(expired) = held.take() {
                            apply(&tracker, tab, expired.command).await;
                        }
                        continue;
                    }
                }
            }
            None => match rx.try_recv() {
                Ok(command) => Some(command),
                Err(_) => tracker.retire_lane(tab, &mut rx),
            },
        };

        let Some(mut command) = next else {
            if let Some(pending) = held.take() {
                apply(&tracker, tab, pending.command).await;
            }
            tracing::trace!(tab = %tab, "lane idle");
            return;
        };

        let at = match &command {
            Command::Event { at, .. } => *at,
            _ => 0,
        };
        match command.debounce_kind().filter(|_| !debounce.is_zero()) {
            Some(kind) => {
                if let Some(previous) = held.take() {
                    if previous.superseded_by(kind, at, &command, window_ms) {
                        tracing::trace!(tab = %tab, ?kind, "coalesced event");
                        if let (DebounceKind::Activation, Some(start)) = (kind, previous.start()) {
                            command.start_from(start);
                        }
                        tracker.inner.inflight.end();
                    } else {
                        apply(&tracker, tab, previous.command).await;
                    }
                }
                held = Some(Held {
                    kind,
                    at,
                    command,
                    deadline: Instant::now() + debounce,
                });
            }
            None => {
                if let Some(previous) = held.take() {
                    apply(&tracker, tab, previous.command).await;
                }
                apply(&tracker, tab, command).await;
            }
        }
    }
}

/// Runs one command to completion and retires its in-flight count.
async fn apply<S: Store, H: HostTabs>(tracker: &Tracker<S, H>, tab: TabId, command: Command) {
    match command {
        Command::Event { at, event, focus } => {
            report(tab, handlers::on_event(tracker, tab, at, event, focus).await);
        }
        Command::Unfocus { at } => report(tab, handlers::on_unfocus(tracker, tab, at).await),
        Command::Expire { now, reply } => {
            let _ = reply.send(handlers::on_expire(tracker, tab, now).await);
        }
        Command::Retire { reply } => {
            let _ = reply.send(handlers::on_retire(tracker, tab).await);
        }
        Command::Refresh { at, reply } => {
            let _ = reply.send(handlers::on_refresh(tracker, tab, at).await);
        }
    }
    tracker.inner.inflight.end();
}

fn report(tab: TabId, result: Result<(), TrackerError>) {
    match result {
        Ok(()) => {}
        Err(err) if err.is_benign() => {
            tracing::debug!(tab = %tab, error = %err, "skipping event");
        }
        Err(err) => tracing::warn!(tab = %tab, error = %err, "dropping tab update"),
    }
}
