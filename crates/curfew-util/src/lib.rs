//! Shared utilities for curfewd
//!
//! This crate provides:
//! - Wall-clock helpers (time of day, seconds since midnight)
//! - Mock time for development builds
//! - Default paths for config and state files

mod paths;
mod time;

pub use paths::*;
pub use time::*;
