//! Behavioral specifications for the `tf` CLI.
//!
//! Black-box: each test invokes the real `tf` binary against an isolated
//! runtime directory and checks stdout/stderr/exit code.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/list.rs"]
mod list;
#[path = "specs/show.rs"]
mod show;
#[path = "specs/cancel.rs"]
mod cancel;
#[path = "specs/retry.rs"]
mod retry;
#[path = "specs/clean.rs"]
mod clean;
#[path = "specs/tick.rs"]
mod tick;
