//! Integration tests driving the `ttt` binary end to end.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::{NamedTempFile, TempDir};

const FEED: &str = r#"{"at":1700000000000,"type":"tab_created","tab_id":1,"window_id":1,"title":"Docs","url":"https://docs.test","active":true}
{"at":1700000001000,"type":"tab_created","tab_id":2,"window_id":1,"title":"Mail","url":"https://mail.test","active":false}
{"at":1700000010000,"type":"tab_activated","tab_id":2,"window_id":1}
{"at":1700000020000,"type":"tab_updated","tab_id":2,"status":"complete","title":"Inbox","url":"https://mail.test/inbox"}
{"at":1700000030000,"type":"tab_removed","tab_id":1}
"#;

struct Workspace {
    dir: TempDir,
    config: NamedTempFile,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ttt.db");

        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, r#"database_path = "{}""#, db_path.display()).unwrap();
        writeln!(config, "debounce_ms = 0").unwrap();
        config.flush().unwrap();

        Self { dir, config }
    }

    fn ttt(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ttt"))
            .arg("--config")
            .arg(self.config.path())
            .args(args)
            .output()
            .expect("failed to run ttt")
    }

    fn feed_file(&self) -> std::path::PathBuf {
        let path = self.dir.path().join("feed.jsonl");
        std::fs::write(&path, FEED).unwrap();
        path
    }
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "ttt failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn replay_then_inspect_and_clear() {
    let ws = Workspace::new();
    let feed = ws.feed_file();

    let out = stdout(&ws.ttt(&["run", "--events", path_arg(&feed), "--no-sweep"]));
    assert!(out.contains("Applied 5 events"), "unexpected run output: {out}");

    let listing = stdout(&ws.ttt(&["list", "--json"]));
    let tabs: serde_json::Value = serde_json::from_str(&listing).unwrap();
    let tabs = tabs.as_array().unwrap();
    assert_eq!(tabs.len(), 2);
    // Newest first.
    assert_eq!(tabs[0]["id"], 2);
    assert_eq!(tabs[0]["state"], "focused");
    assert_eq!(tabs[0]["title"], "Inbox");
    assert_eq!(tabs[1]["id"], 1);
    assert_eq!(tabs[1]["state"], "closed");
    assert_eq!(tabs[1]["focused_secs"], 10.0);
    assert_eq!(tabs[1]["open_secs"], 30.0);

    let open_only = stdout(&ws.ttt(&["list", "--open"]));
    assert!(open_only.contains("Inbox"));
    assert!(!open_only.contains("Docs"));

    let shown = stdout(&ws.ttt(&["show", "2"]));
    assert!(shown.starts_with("Tab 2: Inbox (focused)"), "{shown}");
    assert!(shown.contains("https://mail.test/inbox"));

    let status = stdout(&ws.ttt(&["status"]));
    assert!(status.contains("Open tabs: 1 (1 focused)"), "{status}");
    assert!(status.contains("Closed tabs: 1"), "{status}");

    let cleared = stdout(&ws.ttt(&["clear"]));
    assert_eq!(cleared.trim(), "Cleared 1 closed tab.");

    let missing = ws.ttt(&["show", "1"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("no record for tab 1"));
}

#[test]
fn run_reads_stdin_and_skips_malformed_lines() {
    let ws = Workspace::new();
    let mut child = Command::new(env!("CARGO_BIN_EXE_ttt"))
        .arg("--config")
        .arg(ws.config.path())
        .args(["run", "--no-sweep"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ttt run");
    {
        let stdin = child.stdin.as_mut().unwrap();
        stdin.write_all(FEED.as_bytes()).unwrap();
        stdin.write_all(b"{\"type\":\"tab_created\"}\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();
    let out = stdout(&output);
    assert!(
        out.contains("Applied 5 events (1 malformed lines skipped)."),
        "{out}"
    );
}

#[test]
fn sweep_removes_expired_history() {
    let ws = Workspace::new();
    let feed = ws.feed_file();
    stdout(&ws.ttt(&["run", "--events", path_arg(&feed), "--no-sweep"]));

    // The feed is from 2023, so its closed tab is long past retention.
    let swept = stdout(&ws.ttt(&["sweep"]));
    assert_eq!(swept.trim(), "Deleted 1 expired tabs, pruned 1 old visits.");

    let listing = stdout(&ws.ttt(&["list", "--closed"]));
    assert_eq!(listing.trim(), "No tabs tracked.");
}

#[test]
fn show_rejects_invalid_tab_id() {
    let ws = Workspace::new();
    let output = ws.ttt(&["show", "not-a-number"]);
    assert!(!output.status.success());
}
