//! Command-line surface of the fleet deployer.

mod cmd;
pub use cmd::*;

/// Shared argument groups, configuration errors and wallet loading
pub mod common;
/// Full batch: mutate, compile, deploy, fund, drain, record
pub mod deploy;
/// Variant generation only
pub mod mutate;
