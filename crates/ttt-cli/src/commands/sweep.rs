//! Sweep command: one retention pass.

use std::io::Write;

use anyhow::Result;
use ttt_store::Store;
use ttt_tracker::{HostTabs, SweepReport, Tracker};

pub async fn run<W: Write, S: Store, H: HostTabs>(
    writer: &mut W,
    tracker: &Tracker<S, H>,
) -> Result<SweepReport> {
    let report = tracker.sweep().await?;
    writeln!(
        writer,
        "Deleted {} expired tabs, pruned {} old visits.",
        report.deleted, report.pruned_visits
    )?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use insta::assert_snapshot;
    use ttt_core::{DAY_MS, ManualClock, TabId, TabRecord};
    use ttt_store::{MemoryStore, Records};
    use ttt_tracker::{KnownTabs, TrackerOptions};

    #[tokio::test]
    async fn reports_deleted_and_pruned() {
        let now = 20 * DAY_MS;
        let mut expired = TabRecord::new(TabId::new(1), None, "A", "https://a.test", 0, false);
        expired.close(DAY_MS);
        let mut live = TabRecord::new(TabId::new(2), None, "B", "https://b.test", 0, false);
        live.navigate("https://c.test", "C", 2 * DAY_MS);
        let store = MemoryStore::with_records(Records::from([
            (expired.id.key(), expired),
            (live.id.key(), live),
        ]));
        let tracker = Tracker::with_clock(
            store,
            KnownTabs::new(),
            TrackerOptions::default(),
            Arc::new(ManualClock::new(now)),
        );

        let mut output = Vec::new();
        let report = run(&mut output, &tracker).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.pruned_visits, 1);
        assert_snapshot!(
            String::from_utf8(output).unwrap(),
            @"Deleted 1 expired tabs, pruned 1 old visits."
        );
    }
}
