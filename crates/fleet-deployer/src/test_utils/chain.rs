use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use alloy_json_abi::JsonAbi;
use alloy_primitives::{keccak256, Address, Bytes, TxHash, U256};

use crate::{ChainClient, ChainError, CompiledArtifact, Deployment, Wallet};

/// A chain operation observed by [`MockChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    /// A contract creation
    Deploy {
        /// Deploying wallet
        wallet: Address,
        /// Nonce the transaction was built with
        nonce: u64,
        /// Creation bytecode
        bytecode: Bytes,
        /// Address of the created contract
        contract: Address,
    },
    /// A value transfer
    Transfer {
        /// Sending wallet
        wallet: Address,
        /// Nonce the transaction was built with
        nonce: u64,
        /// Recipient
        to: Address,
        /// Amount in wei
        amount: U256,
    },
    /// A drain call
    Drain {
        /// Calling wallet
        wallet: Address,
        /// Nonce the transaction was built with
        nonce: u64,
        /// Drained contract
        contract: Address,
    },
}

impl ChainCall {
    /// The wallet that submitted the call.
    pub const fn wallet(&self) -> Address {
        match self {
            Self::Deploy { wallet, .. } | Self::Transfer { wallet, .. } | Self::Drain { wallet, .. } => {
                *wallet
            }
        }
    }

    /// The nonce the call was built with.
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Deploy { nonce, .. } | Self::Transfer { nonce, .. } | Self::Drain { nonce, .. } => {
                *nonce
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockChainState {
    calls: Vec<ChainCall>,
    nonces: HashMap<Address, u64>,
    reject_deploys: HashSet<Address>,
    unmined_deploys: HashSet<Address>,
}

impl MockChainState {
    /// Reads the current nonce of `wallet` and advances it, as a node does on acceptance.
    fn next_nonce(&mut self, wallet: Address) -> u64 {
        let nonce = self.nonces.entry(wallet).or_default();
        let current = *nonce;
        *nonce += 1;
        current
    }
}

/// In-memory chain that records every submission.
///
/// Clones share state, so a test can keep a handle while the pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<MockChainState>>,
}

impl MockChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every deployment from `wallet` fail with [`ChainError::Rejected`].
    pub fn reject_deploys_from(&self, wallet: Address) {
        self.state().reject_deploys.insert(wallet);
    }

    /// Makes every deployment from `wallet` fail with [`ChainError::NotFound`].
    pub fn never_mine_deploys_from(&self, wallet: Address) {
        self.state().unmined_deploys.insert(wallet);
    }

    /// All calls in submission order.
    pub fn calls(&self) -> Vec<ChainCall> {
        self.state().calls.clone()
    }

    /// Calls submitted by `wallet`, in submission order.
    pub fn calls_from(&self, wallet: Address) -> Vec<ChainCall> {
        self.state().calls.iter().filter(|call| call.wallet() == wallet).cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, MockChainState> {
        self.state.lock().expect("mock chain state poisoned")
    }
}

fn tx_hash(call: &ChainCall) -> TxHash {
    keccak256(format!("{call:?}"))
}

impl ChainClient for MockChain {
    async fn deploy_contract(
        &self,
        artifact: &CompiledArtifact,
        wallet: &Wallet,
        _gas_limit: u64,
    ) -> Result<Deployment, ChainError> {
        let mut state = self.state();
        let from = wallet.address();
        if state.reject_deploys.contains(&from) {
            return Err(ChainError::Rejected("insufficient funds for gas * price + value".into()));
        }

        let nonce = state.next_nonce(from);
        let contract = from.create(nonce);
        let call = ChainCall::Deploy { wallet: from, nonce, bytecode: artifact.bytecode.clone(), contract };
        let hash = tx_hash(&call);
        state.calls.push(call);

        if state.unmined_deploys.contains(&from) {
            return Err(ChainError::NotFound(hash));
        }
        Ok(Deployment { address: contract, abi: artifact.abi.clone(), tx_hash: hash })
    }

    async fn transfer_value(
        &self,
        wallet: &Wallet,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.state();
        let from = wallet.address();
        let nonce = state.next_nonce(from);
        let call = ChainCall::Transfer { wallet: from, nonce, to, amount };
        let hash = tx_hash(&call);
        state.calls.push(call);
        Ok(hash)
    }

    async fn invoke_drain(
        &self,
        wallet: &Wallet,
        contract: Address,
        abi: &JsonAbi,
    ) -> Result<TxHash, ChainError> {
        if abi.function("MoneyBack").is_none() {
            return Err(ChainError::MissingEntryPoint("MoneyBack".into()));
        }
        let mut state = self.state();
        let from = wallet.address();
        let nonce = state.next_nonce(from);
        let call = ChainCall::Drain { wallet: from, nonce, contract };
        let hash = tx_hash(&call);
        state.calls.push(call);
        Ok(hash)
    }
}
