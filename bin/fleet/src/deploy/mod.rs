//! Batch deployment against a live node

mod cmd;

pub use cmd::*;
