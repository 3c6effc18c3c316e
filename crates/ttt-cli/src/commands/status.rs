//! Status command: database location and tab counts.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use ttt_core::TabState;
use ttt_store::Store;
use ttt_tracker::{HostTabs, Tracker};

pub async fn run<W: Write, S: Store, H: HostTabs>(
    writer: &mut W,
    tracker: &Tracker<S, H>,
    database_path: &Path,
) -> Result<()> {
    let records = tracker.records().await?;

    writeln!(writer, "Tab time tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    if records.is_empty() {
        writeln!(writer, "No tabs tracked.")?;
        return Ok(());
    }

    let count = |state: TabState| records.iter().filter(|r| r.state() == state).count();
    let focused = count(TabState::OpenFocused);
    let open = focused + count(TabState::OpenUnfocused);
    writeln!(writer, "Open tabs: {open} ({focused} focused)")?;
    writeln!(writer, "Closed tabs: {}", count(TabState::Closed))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use ttt_core::{TabId, TabRecord};
    use ttt_store::{Records, SqliteStore};
    use ttt_tracker::{KnownTabs, TrackerOptions};

    #[tokio::test]
    async fn status_command_counts_tabs_by_state() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("ttt.db");
        let store = SqliteStore::open(&db_path).unwrap();

        let focused = TabRecord::new(TabId::new(1), None, "A", "https://a.test", 0, true);
        let background = TabRecord::new(TabId::new(2), None, "B", "https://b.test", 0, false);
        let mut closed = TabRecord::new(TabId::new(3), None, "C", "https://c.test", 0, false);
        closed.close(10);
        store
            .set(Records::from([
                (focused.id.key(), focused),
                (background.id.key(), background),
                (closed.id.key(), closed),
            ]))
            .await
            .unwrap();

        let tracker = Tracker::new(store, KnownTabs::new(), TrackerOptions::default());
        let mut output = Vec::new();
        run(&mut output, &tracker, &db_path).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/ttt.db");
        assert_snapshot!(output, @r"
        Tab time tracker status
        Database: [TEMP]/ttt.db
        Open tabs: 2 (1 focused)
        Closed tabs: 1
        ");
    }

    #[tokio::test]
    async fn status_command_reports_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let tracker = Tracker::new(store, KnownTabs::new(), TrackerOptions::default());
        let mut output = Vec::new();
        run(&mut output, &tracker, Path::new("/data/ttt.db"))
            .await
            .unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Tab time tracker status
        Database: /data/ttt.db
        No tabs tracked.
        ");
    }
}
