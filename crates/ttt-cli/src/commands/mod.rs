//! CLI subcommand implementations.

pub mod clear;
pub mod list;
pub mod run;
pub mod show;
pub mod status;
pub mod sweep;
pub mod util;
