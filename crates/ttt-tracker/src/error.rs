//! Tracker error taxonomy.

use thiserror::Error;
use ttt_core::TabId;
use ttt_store::StoreError;

use crate::host::HostError;

/// Errors from the accounting runtime.
///
/// Event handling never surfaces these to the event source: lanes log them
/// and move on. Query and command methods return them to the caller.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The event referenced a tab with no stored record.
    #[error("no record for tab {0}")]
    MissingRecord(TabId),
    /// The host no longer knows a tab whose record is still open.
    #[error("tab {0} no longer exists on the host")]
    StaleHostLookup(TabId),
    /// The store rejected a read or write.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    /// The host failed to answer.
    #[error("host failure: {0}")]
    Host(#[from] HostError),
    /// The lane dropped a reply channel without answering.
    #[error("lane for tab {0} stopped before replying")]
    LaneClosed(TabId),
}

impl TrackerError {
    /// Benign races that need no attention.
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::MissingRecord(_))
    }
}
