//! Core time-accounting model for the tab time tracker.
//!
//! This crate contains the pure, synchronous parts of the tracker:
//! - Intervals: URL visits with nested focus spans
//! - Records: per-tab state transitions (navigate, focus, close)
//! - Aggregation: live "time spent so far" without mutating stored totals
//! - Retention: which closed data ages out
//! - Events: the host's tab lifecycle feed

pub mod aggregate;
pub mod clock;
pub mod event;
pub mod interval;
pub mod record;
pub mod retention;
pub mod types;

pub use aggregate::{
    TabView, VisitView, live_time_spent, live_visit_time_spent, open_duration,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{DebounceKind, LoadStatus, TabEvent, TimedEvent};
pub use interval::{FocusSpan, VisitInterval};
pub use record::{Navigation, TabRecord, TabState};
pub use retention::{DEFAULT_RETENTION_DAYS, Expiry, Retention};
pub use types::{DAY_MS, Millis, TabId, ValidationError, WindowId, secs_between};
