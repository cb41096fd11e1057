//! Deployer wallets.

use std::str::FromStr;

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_signer_local::{LocalSignerError, PrivateKeySigner};

/// A funded account that deploys, funds and drains one contract variant.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Wraps an existing signer.
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Creates a wallet with a freshly generated key.
    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    /// The wallet address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The underlying signer.
    pub const fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// A network wallet able to sign transaction requests.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl FromStr for Wallet {
    type Err = LocalSignerError;

    /// Parses a hex-encoded private key, with or without `0x`.
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        key.trim().parse().map(Self::new)
    }
}
