//! Event-driven tab accounting runtime.
//!
//! [`Tracker`] consumes the host's tab lifecycle events and keeps one
//! [`ttt_core::TabRecord`] per tab in a [`ttt_store::Store`]:
//! - Per-tab lanes serialize every read-modify-write of a record
//! - A single focus holder guarantees at most one focused tab
//! - Activation and navigation bursts are debounced per tab
//! - A background sweeper ages out closed data
//!
//! Event methods never fail. Errors inside a lane are logged and the event is
//! dropped; the next event for the tab starts from whatever was stored.

mod error;
mod handlers;
mod host;
mod inflight;
mod lane;
mod sweeper;
mod tracker;

pub use error::TrackerError;
pub use host::{HostError, HostTab, HostTabs, KnownTabs};
pub use sweeper::{DEFAULT_SWEEP_INTERVAL, spawn_sweeper};
pub use tracker::{DEFAULT_DEBOUNCE, Refresh, SweepReport, Tracker, TrackerOptions};
