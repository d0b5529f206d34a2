//! Core enforcement engine for curfewd
//!
//! This crate contains:
//! - The policy evaluator (allow, power off, cap volume)
//! - The per-tick enforcement cycle (Idle -> Connecting -> Connected -> Evaluating -> Acting)
//! - The live status channel read by the status page

mod cycle;
mod policy;
mod status;

pub use cycle::*;
pub use policy::*;
pub use status::*;
