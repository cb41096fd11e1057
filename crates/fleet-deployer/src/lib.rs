//! Batch deployment of byte-distinct contract variants.
//!
//! One canonical Solidity source is mutated into `N` whitespace-only variants, each variant is
//! compiled, deployed from its own wallet, funded with a random amount and then drained back to
//! the deployer. A record of every deployment is persisted next to the generated source.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod types;
pub use types::*;

mod mutator;
pub use mutator::*;

mod compiler;
pub use compiler::*;

pub mod chain;
pub use chain::{ChainClient, ChainConfig, ChainError, Deployment, RpcChainClient};

mod pipeline;
pub use pipeline::*;

mod store;
pub use store::*;

mod wallet;
pub use wallet::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
