// ABOUTME: Library root for panda - exposes the SSH engine and helpers for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod fanout;
pub mod inventory;
pub mod output;
pub mod select;
pub mod ssh;
pub mod tee;
