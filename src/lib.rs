//! Rolling, hard-link deduplicated snapshot backups over a secure
//! transport (see `SPEC_FULL.md` for the component breakdown).
//!
//! The crate is consumed by two binaries: `snapback`, the snapshot
//! engine that runs a single pass over all configured hosts and
//! directories, and `snapback-loopd`, the companion launch loop that
//! serializes invocations of the engine from a trigger directory.

#![forbid(unsafe_code)]

pub mod accounting;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod launch_loop;
pub mod logging;
pub mod mail;
pub mod util;

pub use error::{Result, SnapbackError};
