//! Show command: one tab's visit history.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use ttt_core::{TabId, TabView};
use ttt_store::Store;
use ttt_tracker::{HostTabs, Tracker};

use super::util::{format_time, format_timestamp, truncate};

const URL_WIDTH: usize = 64;

pub async fn run<W: Write, S: Store, H: HostTabs>(
    writer: &mut W,
    tracker: &Tracker<S, H>,
    tab: TabId,
    json: bool,
) -> Result<()> {
    let Some(record) = tracker.record(tab).await? else {
        bail!("no record for tab {tab}");
    };
    let view = TabView::new(&record, tracker.now());

    if json {
        serde_json::to_writer_pretty(&mut *writer, &view)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", render(&view))?;
    }
    Ok(())
}

fn render(view: &TabView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tab {}: {} ({})", view.id, view.title, view.state);
    let _ = write!(
        out,
        "Opened {} | focused {} | open {}",
        format_timestamp(view.start_time),
        format_time(view.focused_secs),
        format_time(view.open_secs)
    );
    if let Some(end) = view.end_time {
        let _ = write!(out, " | closed {}", format_timestamp(end));
    }
    out.push('\n');

    if view.visits.is_empty() {
        out.push_str("No visits yet.\n");
        return out;
    }

    let _ = writeln!(out, "\n{:<19}  {:>7}  {:>7}  URL", "STARTED", "FOCUSED", "OPEN");
    for visit in &view.visits {
        let _ = writeln!(
            out,
            "{:<19}  {:>7}  {:>7}  {}",
            format_timestamp(visit.start_time),
            format_time(visit.focused_secs),
            format_time(visit.open_secs),
            truncate(&visit.url, URL_WIDTH)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use ttt_core::TabRecord;
    use ttt_store::MemoryStore;
    use ttt_tracker::{KnownTabs, TrackerOptions};

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn renders_visits_with_live_times() {
        let mut record = TabRecord::new(
            TabId::new(3),
            None,
            "Post",
            "https://blog.test/post",
            NOW - 4_000_000,
            true,
        );
        record.navigate("https://blog.test/next", "Next post", NOW - 200_000);

        assert_snapshot!(render(&TabView::new(&record, NOW)), @r"
        Tab 3: Next post (focused)
        Opened 2023-11-14 21:06:40 | focused 1h 6m | open 1h 6m

        STARTED              FOCUSED     OPEN  URL
        2023-11-14 21:06:40    1h 3m    1h 3m  https://blog.test/post
        2023-11-14 22:10:00   3m 20s   3m 20s  https://blog.test/next
        ");
    }

    #[test]
    fn renders_closed_blank_tab() {
        let mut record = TabRecord::new(TabId::new(8), None, "New Tab", "", NOW - 5_000, false);
        record.close(NOW);

        assert_snapshot!(render(&TabView::new(&record, NOW)), @r"
        Tab 8: New Tab (closed)
        Opened 2023-11-14 22:13:15 | focused 0s | open 5s | closed 2023-11-14 22:13:20
        No visits yet.
        ");
    }

    #[tokio::test]
    async fn missing_tab_is_an_error() {
        let tracker = Tracker::new(MemoryStore::new(), KnownTabs::new(), TrackerOptions::default());
        let mut output = Vec::new();
        let err = run(&mut output, &tracker, TabId::new(5), false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no record for tab 5");
    }
}
