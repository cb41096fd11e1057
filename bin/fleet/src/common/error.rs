use std::path::PathBuf;

use fleet_deployer::AmountRangeError;

/// Configuration rejected at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Funding amount bounds are malformed or inverted
    #[error("Invalid funding amount: {0}")]
    Amount(#[from] AmountRangeError),

    /// Creation gas limit is zero
    #[error("Gas limit must be greater than zero")]
    ZeroGasLimit,

    /// Request timeout is zero
    #[error("Node timeout must be greater than zero")]
    ZeroTimeout,

    /// RPC endpoint is not a valid URL
    #[error("Invalid RPC URL '{url}': {reason}")]
    RpcUrl {
        /// The rejected value
        url: String,
        /// Parser message
        reason: String,
    },

    /// Canonical contract source could not be read
    #[error("Failed to read contract {path}: {source}")]
    ContractRead {
        /// Contract path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be created
    #[error("Failed to create log file {path}: {source}")]
    LogFile {
        /// Log file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading the wallet file
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Wallet file could not be read
    #[error("Failed to read wallet file {path}: {source}")]
    Read {
        /// Wallet file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A line is not a valid private key
    #[error("Invalid private key on line {line}: {reason}")]
    InvalidKey {
        /// One-based line number
        line: usize,
        /// Parser message
        reason: String,
    },

    /// The file holds no keys
    #[error("Wallet file {0} contains no keys")]
    Empty(PathBuf),
}
