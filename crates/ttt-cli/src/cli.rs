//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ttt_core::TabId;

/// Per-tab browsing time tracker.
///
/// Replays browser tab events into a local store and reports how long each
/// tab and URL was open and focused.
#[derive(Debug, Parser)]
#[command(name = "ttt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply a JSONL feed of tab events.
    Run {
        /// Read events from this file instead of stdin.
        #[arg(long)]
        events: Option<PathBuf>,

        /// After the feed ends, delete open records for tabs the feed no
        /// longer has.
        #[arg(long)]
        reconcile: bool,

        /// Do not run the retention sweeper while replaying.
        #[arg(long)]
        no_sweep: bool,
    },

    /// List tracked tabs, newest first.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Only open tabs.
        #[arg(long, conflicts_with = "closed")]
        open: bool,

        /// Only closed tabs.
        #[arg(long)]
        closed: bool,
    },

    /// Show the visits of one tab.
    Show {
        /// The tab ID.
        tab_id: TabId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete every closed tab.
    Clear,

    /// Run one retention pass.
    Sweep,

    /// Show database location and tab counts.
    Status,
}
