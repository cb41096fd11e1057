//! Offline variant generation

mod cmd;

pub use cmd::*;
