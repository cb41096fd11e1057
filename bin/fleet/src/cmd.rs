use clap::Parser;

/// Main command enumeration for the fleet CLI tool
#[derive(Parser, Debug)]
#[command(infer_subcommands = true, version)]
pub enum MainCmd {
    /// Deploy, fund and drain one contract variant per wallet
    Deploy(crate::deploy::Cmd),
    /// Write contract variants without touching the chain
    Mutate(crate::mutate::Cmd),
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration
    #[error("{0}")]
    Config(#[from] crate::common::ConfigError),

    /// Wallet file could not be loaded
    #[error("{0}")]
    Wallet(#[from] crate::common::WalletError),

    /// `.env` file could not be parsed
    #[error("Failed to load .env: {0}")]
    DotEnv(#[from] dotenvy::Error),

    /// The compiler could not be set up
    #[error("Compiler error: {0}")]
    Compile(#[from] fleet_deployer::CompileError),

    /// The chain client could not be set up
    #[error("Chain error: {0}")]
    Chain(#[from] fleet_deployer::ChainError),

    /// The canonical source cannot be mutated
    #[error("Mutation error: {0}")]
    Mutation(#[from] fleet_deployer::MutationError),

    /// A variant could not be written
    #[error("Store error: {0}")]
    Store(#[from] fleet_deployer::StoreError),
}

impl MainCmd {
    /// Execute the main command
    pub async fn run(&self) -> Result<(), Error> {
        match self {
            Self::Deploy(cmd) => cmd.run().await,
            Self::Mutate(cmd) => cmd.run(),
        }
    }
}
