use std::path::PathBuf;

use clap::Parser;
use fleet_deployer::{ContractSource, RecordStore, SourceMutator};

use super::ConfigError;

/// Where variants come from and where they are written.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Variant Options")]
pub struct VariantArgs {
    /// Canonical Solidity source to mutate
    #[arg(long = "contract", env = "CONTRACT_PATH", default_value = "contract/CryptoSchool.sol")]
    pub contract: PathBuf,

    /// Output directory; variant `i` is written under `<out>/<i>/`
    #[arg(long = "out", env = "CREATE_CONTRACTS_PATH", default_value = "new_contracts")]
    pub out: PathBuf,

    /// Maximum number of newlines inserted at one site
    #[arg(long = "max-insertions", default_value_t = SourceMutator::DEFAULT_MAX_INSERTIONS)]
    pub max_insertions: usize,

    /// Seed for variant generation and funding amounts. Random when omitted.
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl VariantArgs {
    /// Reads the canonical source.
    pub fn load_source(&self) -> Result<ContractSource, ConfigError> {
        ContractSource::read(&self.contract)
            .map_err(|source| ConfigError::ContractRead { path: self.contract.clone(), source })
    }

    /// Record store rooted at the output directory.
    pub fn store(&self) -> RecordStore {
        RecordStore::new(&self.out)
    }
}
