//! Test doubles for the compiler and the chain.

mod chain;
mod compiler;

pub use chain::*;
pub use compiler::*;
