//! Chain access used by the deployment pipeline.
//!
//! [`ChainClient`] is the seam between the pipeline and the node. [`RpcChainClient`] implements it
//! over JSON-RPC; tests substitute a recording double.

use std::time::Duration;

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, TxHash, U256};
use alloy_transport::TransportError;

use crate::{CompiledArtifact, Wallet};

mod rpc;
pub use rpc::*;

/// Errors raised by chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The transaction was not mined within the polling horizon
    #[error("transaction {0} not found within the polling horizon")]
    NotFound(TxHash),

    /// The node rejected the transaction at submission
    #[error("transaction rejected by node: {0}")]
    Rejected(String),

    /// The transaction was mined but reverted
    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    /// The receipt of a creation transaction carries no contract address
    #[error("receipt of {0} has no contract address")]
    NoContractAddress(TxHash),

    /// The ABI has no function with the configured drain entry point name
    #[error("entry point '{0}' not found in contract ABI")]
    MissingEntryPoint(String),

    /// The transaction could not be built or signed
    #[error("failed to sign transaction: {0}")]
    Signing(String),

    /// The RPC client could not be constructed
    #[error("invalid RPC client setup: {0}")]
    Setup(String),

    /// RPC transport error while querying chain state
    #[error("RPC transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A confirmed contract creation.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Address of the created contract.
    pub address: Address,
    /// Interface descriptor of the created contract.
    pub abi: JsonAbi,
    /// Hash of the creation transaction.
    pub tx_hash: TxHash,
}

/// The three chain operations a wallet iteration performs.
///
/// Every operation fetches chain id, gas price and the wallet nonce at call time; nothing is
/// cached between calls.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Deploys `artifact` from `wallet` and waits for its receipt.
    async fn deploy_contract(
        &self,
        artifact: &CompiledArtifact,
        wallet: &Wallet,
        gas_limit: u64,
    ) -> Result<Deployment, ChainError>;

    /// Sends `amount` wei from `wallet` to `to` without waiting for confirmation.
    async fn transfer_value(
        &self,
        wallet: &Wallet,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError>;

    /// Calls the funds-return entry point of `contract` with zero value, without waiting for
    /// confirmation.
    async fn invoke_drain(
        &self,
        wallet: &Wallet,
        contract: Address,
        abi: &JsonAbi,
    ) -> Result<TxHash, ChainError>;
}

/// Configuration of [`RpcChainClient`].
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Per-request timeout. Also bounds how long a deployment receipt is polled for.
    pub request_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Gas limit of the funding transfer.
    pub transfer_gas_limit: u64,
    /// Gas limit of the drain call.
    pub drain_gas_limit: u64,
    /// Name of the contract function that returns its balance to the deployer.
    pub drain_entry_point: String,
}

impl ChainConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
    /// Default funding transfer gas limit.
    pub const DEFAULT_TRANSFER_GAS: u64 = 300_000;
    /// Default drain call gas limit.
    pub const DEFAULT_DRAIN_GAS: u64 = 500_000;
    /// Default drain entry point.
    pub const DEFAULT_DRAIN_ENTRY_POINT: &'static str = "MoneyBack";

    /// Creates a configuration for `rpc_url` with default limits.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            request_timeout: Self::DEFAULT_TIMEOUT,
            poll_interval: Duration::from_secs(1),
            transfer_gas_limit: Self::DEFAULT_TRANSFER_GAS,
            drain_gas_limit: Self::DEFAULT_DRAIN_GAS,
            drain_entry_point: Self::DEFAULT_DRAIN_ENTRY_POINT.to_string(),
        }
    }
}
