//! JSON-RPC implementation of [`ChainClient`].

use alloy_eips::eip2718::Encodable2718;
use alloy_json_abi::JsonAbi;
use alloy_network::{Ethereum, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{TransactionReceipt, TransactionRequest};
use alloy_transport_http::Http;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace, warn};

use super::{ChainClient, ChainConfig, ChainError, Deployment};
use crate::{CompiledArtifact, Wallet};

/// Chain client backed by an HTTP JSON-RPC endpoint.
///
/// Transactions are legacy (EIP-155) transactions priced at the node's current gas price and
/// signed locally by the wallet.
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
    config: ChainConfig,
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RpcChainClient {
    /// Connects to `config.rpc_url` with `config.request_timeout` applied to every request.
    pub fn new(config: ChainConfig) -> Result<Self, ChainError> {
        let url = config.rpc_url.parse().map_err(|e| {
            ChainError::Setup(format!("invalid RPC URL '{}': {e}", config.rpc_url))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Setup(e.to_string()))?;
        let transport = Http::with_client(http, url);
        let is_local = transport.guess_local();
        let client = RpcClient::new(transport, is_local);
        let provider =
            ProviderBuilder::new().disable_recommended_fillers().connect_client(client).erased();
        Ok(Self { provider, config })
    }

    /// The client configuration.
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Builds a request skeleton from chain state fetched right now.
    ///
    /// The nonce is read at the `pending` tag so a previous fire-and-forget submission from the
    /// same wallet is already counted.
    async fn prepare(
        &self,
        wallet: &Wallet,
        gas_limit: u64,
    ) -> Result<TransactionRequest, ChainError> {
        let from = wallet.address();
        let chain_id = self.provider.get_chain_id().await?;
        let gas_price = self.provider.get_gas_price().await?;
        let nonce = self.provider.get_transaction_count(from).pending().await?;
        debug!(wallet = %from, chain_id, gas_price, nonce, "Fetched transaction parameters");

        Ok(TransactionRequest::default()
            .with_from(from)
            .with_chain_id(chain_id)
            .with_gas_price(gas_price)
            .with_gas_limit(gas_limit)
            .with_nonce(nonce))
    }

    /// Signs `request` with `wallet` and submits the raw transaction.
    async fn submit(
        &self,
        wallet: &Wallet,
        request: TransactionRequest,
    ) -> Result<TxHash, ChainError> {
        let envelope = TransactionBuilder::<Ethereum>::build(request, &wallet.network_wallet())
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let raw = envelope.encoded_2718();

        let pending = self.provider.send_raw_transaction(&raw).await.map_err(|err| {
            match err.as_error_resp() {
                Some(payload) => ChainError::Rejected(payload.message.to_string()),
                None => ChainError::Transport(err),
            }
        })?;
        Ok(*pending.tx_hash())
    }

    /// Polls for the receipt of `tx_hash` until the request timeout window elapses.
    ///
    /// A failed lookup is retried like a missing receipt; only the deadline ends the wait.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ChainError> {
        let deadline = Instant::now() + self.config.request_timeout;
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => trace!(tx = %tx_hash, "Receipt not available yet"),
                Err(error) => warn!(tx = %tx_hash, %error, "Receipt lookup failed, retrying"),
            }
            if Instant::now() >= deadline {
                return Err(ChainError::NotFound(tx_hash));
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

impl ChainClient for RpcChainClient {
    async fn deploy_contract(
        &self,
        artifact: &CompiledArtifact,
        wallet: &Wallet,
        gas_limit: u64,
    ) -> Result<Deployment, ChainError> {
        let request = self
            .prepare(wallet, gas_limit)
            .await?
            .with_deploy_code(artifact.bytecode.clone())
            .with_value(U256::ZERO);
        let tx_hash = self.submit(wallet, request).await?;
        debug!(wallet = %wallet.address(), tx = %tx_hash, "Submitted contract creation");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status() {
            return Err(ChainError::Reverted(tx_hash));
        }
        let address = receipt.contract_address().ok_or(ChainError::NoContractAddress(tx_hash))?;
        info!(wallet = %wallet.address(), tx = %tx_hash, contract = %address, "Deployed contract");

        Ok(Deployment { address, abi: artifact.abi.clone(), tx_hash })
    }

    async fn transfer_value(
        &self,
        wallet: &Wallet,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError> {
        let request = self
            .prepare(wallet, self.config.transfer_gas_limit)
            .await?
            .with_to(to)
            .with_value(amount);
        let tx_hash = self.submit(wallet, request).await?;
        info!(wallet = %wallet.address(), to = %to, amount = %amount, tx = %tx_hash, "Sent value to contract");
        Ok(tx_hash)
    }

    async fn invoke_drain(
        &self,
        wallet: &Wallet,
        contract: Address,
        abi: &JsonAbi,
    ) -> Result<TxHash, ChainError> {
        let entry_point = &self.config.drain_entry_point;
        let function = abi
            .function(entry_point)
            .and_then(|overloads| overloads.iter().find(|function| function.inputs.is_empty()))
            .ok_or_else(|| ChainError::MissingEntryPoint(entry_point.clone()))?;
        let input = Bytes::copy_from_slice(function.selector().as_slice());

        let request = self
            .prepare(wallet, self.config.drain_gas_limit)
            .await?
            .with_to(contract)
            .with_input(input)
            .with_value(U256::ZERO);
        let tx_hash = self.submit(wallet, request).await?;
        info!(wallet = %wallet.address(), contract = %contract, tx = %tx_hash, "Requested balance return");
        Ok(tx_hash)
    }
}
