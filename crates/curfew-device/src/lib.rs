//! Device control boundary for curfewd
//!
//! The enforcement cycle only needs "connect, send a command, close" from
//! the television. This crate defines that capability as traits, a TCP
//! client speaking newline-delimited JSON frames, and an in-process mock.

mod command;
mod mock;
mod tcp;
mod traits;

pub use command::*;
pub use mock::*;
pub use tcp::*;
pub use traits::*;
