//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function (or one
//! function per nested subcommand).

pub mod check;
pub mod config;
pub mod cursor;
pub mod docs;
pub mod init;
pub mod run;
