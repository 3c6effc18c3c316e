//! Run command: apply a JSONL feed of tab events.
//!
//! Each line is a [`TimedEvent`]. Lines without `at` are stamped with the
//! current time. Malformed lines are logged and skipped.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use ttt_core::TimedEvent;
use ttt_store::Store;
use ttt_tracker::{KnownTabs, Tracker};

/// Counts from one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub skipped: usize,
    /// Open records deleted because the feed no longer has their tab.
    pub stale: usize,
}

/// Feeds every event from `input` to the tracker, then waits for all of them
/// to land.
///
/// `host` must be the tracker's own host handle: it learns which tabs exist
/// from the same feed.
pub async fn run<R, W, S>(
    input: R,
    writer: &mut W,
    tracker: &Tracker<S, KnownTabs>,
    host: &KnownTabs,
    reconcile: bool,
) -> Result<Summary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Store,
{
    let mut summary = Summary::default();
    let mut lines = input.lines();
    let mut line_number = 0_usize;

    while let Some(line) = lines.next_line().await.context("failed to read event feed")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<TimedEvent>(line) {
            Ok(TimedEvent { at, event }) => {
                host.observe(&event);
                let at = at.unwrap_or_else(|| tracker.now());
                tracker.handle_at(event, at);
                summary.applied += 1;
            }
            Err(err) => {
                tracing::warn!(line = line_number, error = %err, "skipping malformed event");
                summary.skipped += 1;
            }
        }
    }

    tracker.wait_idle().await;
    tracing::debug!(?summary, "feed drained");

    if reconcile {
        summary.stale = tracker
            .reconcile()
            .await
            .context("failed to reconcile open tabs")?;
    }

    writeln!(
        writer,
        "Applied {} events ({} malformed lines skipped).",
        summary.applied, summary.skipped
    )?;
    if reconcile {
        writeln!(writer, "Deleted {} stale tabs.", summary.stale)?;
    }
    Ok(summary)
}
