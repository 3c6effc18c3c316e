//! List command: every tracked tab with live totals.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use ttt_core::TabView;
use ttt_store::Store;
use ttt_tracker::{HostTabs, Tracker};

use super::util::{format_time, truncate};

const TITLE_WIDTH: usize = 48;

/// Which tabs to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Open,
    Closed,
}

impl Filter {
    pub const fn from_flags(open: bool, closed: bool) -> Self {
        match (open, closed) {
            (true, _) => Self::Open,
            (false, true) => Self::Closed,
            (false, false) => Self::All,
        }
    }

    fn accepts(self, view: &TabView) -> bool {
        match self {
            Self::All => true,
            Self::Open => view.end_time.is_none(),
            Self::Closed => view.end_time.is_some(),
        }
    }
}

pub async fn run<W: Write, S: Store, H: HostTabs>(
    writer: &mut W,
    tracker: &Tracker<S, H>,
    filter: Filter,
    json: bool,
) -> Result<()> {
    let mut views: Vec<TabView> = tracker
        .views()
        .await?
        .into_iter()
        .filter(|view| filter.accepts(view))
        .collect();
    views.reverse();

    if json {
        serde_json::to_writer_pretty(&mut *writer, &views)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", render(&views))?;
    }
    Ok(())
}

fn render(views: &[TabView]) -> String {
    if views.is_empty() {
        return "No tabs tracked.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6}  {:<8}  {:>7}  {:>7}  TITLE",
        "ID", "STATE", "FOCUSED", "OPEN"
    );
    for view in views {
        let title = if view.title.is_empty() {
            &view.url
        } else {
            &view.title
        };
        let _ = writeln!(
            out,
            "{:<6}  {:<8}  {:>7}  {:>7}  {}",
            view.id,
            view.state,
            format_time(view.focused_secs),
            format_time(view.open_secs),
            truncate(title, TITLE_WIDTH)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use ttt_core::{TabId, TabRecord};

    const NOW: i64 = 1_700_000_000_000;

    fn views() -> Vec<TabView> {
        let mut reading = TabRecord::new(
            TabId::new(3),
            None,
            "A very long article title that will not fit in the listing column",
            "https://blog.test/post",
            NOW - 4_000_000,
            true,
        );
        reading.navigate("https://blog.test/next", "Next post", NOW - 200_000);

        let mut closed = TabRecord::new(
            TabId::new(1),
            None,
            "Docs",
            "https://docs.test",
            NOW - 90_000,
            true,
        );
        closed.close(NOW - 48_000);

        let background = TabRecord::new(
            TabId::new(12),
            None,
            "",
            "https://quiet.test",
            NOW - 30_000,
            false,
        );

        [background, reading, closed]
            .iter()
            .map(|record| TabView::new(record, NOW))
            .collect()
    }

    #[test]
    fn renders_table() {
        assert_snapshot!(render(&views()), @r"
        ID      STATE     FOCUSED     OPEN  TITLE
        12      open           0s      30s  https://quiet.test
        3       focused     1h 6m    1h 6m  Next post
        1       closed        42s      42s  Docs
        ");
    }

    #[test]
    fn renders_empty() {
        assert_snapshot!(render(&[]), @"No tabs tracked.");
    }

    #[test]
    fn filter_from_flags() {
        assert_eq!(Filter::from_flags(false, false), Filter::All);
        assert_eq!(Filter::from_flags(true, false), Filter::Open);
        assert_eq!(Filter::from_flags(false, true), Filter::Closed);
    }
}
