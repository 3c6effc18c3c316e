//! Clear command: delete closed tabs.

use std::io::Write;

use anyhow::Result;
use ttt_store::Store;
use ttt_tracker::{HostTabs, Tracker};

pub async fn run<W: Write, S: Store, H: HostTabs>(
    writer: &mut W,
    tracker: &Tracker<S, H>,
) -> Result<usize> {
    let removed = tracker.clear_closed_history().await?;
    match removed {
        0 => writeln!(writer, "No closed tabs to clear.")?,
        1 => writeln!(writer, "Cleared 1 closed tab.")?,
        n => writeln!(writer, "Cleared {n} closed tabs.")?,
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use ttt_core::{TabId, TabRecord};
    use ttt_store::{MemoryStore, Records};
    use ttt_tracker::{KnownTabs, TrackerOptions};

    #[tokio::test]
    async fn clears_only_closed_tabs() {
        let mut closed = TabRecord::new(TabId::new(1), None, "A", "https://a.test", 0, false);
        closed.close(1_000);
        let open = TabRecord::new(TabId::new(2), None, "B", "https://b.test", 0, false);
        let store = MemoryStore::with_records(Records::from([
            (closed.id.key(), closed),
            (open.id.key(), open),
        ]));
        let tracker = Tracker::new(store.clone(), KnownTabs::new(), TrackerOptions::default());

        let mut output = Vec::new();
        assert_eq!(run(&mut output, &tracker).await.unwrap(), 1);
        assert_snapshot!(String::from_utf8(output).unwrap(), @"Cleared 1 closed tab.");
        assert_eq!(store.len().await, 1);

        let mut output = Vec::new();
        run(&mut output, &tracker).await.unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No closed tabs to clear.");
    }
}
