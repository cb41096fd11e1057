//! Value types shared by the pipeline stages.

use std::path::Path;

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// The canonical contract source a batch is generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSource {
    file_name: String,
    text: String,
}

impl ContractSource {
    /// Creates a source from its file name (e.g. `CryptoSchool.sol`) and text.
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { file_name: file_name.into(), text: text.into() }
    }

    /// Reads a source file from disk, keeping only its file name.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, text })
    }

    /// The file name the source is compiled and stored under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The contract name selected from compiler output: the file name without its extension.
    pub fn contract_name(&self) -> &str {
        self.file_name.split('.').next().unwrap_or(&self.file_name)
    }
}

/// A whitespace-mutated copy of a [`ContractSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractVariant {
    source: ContractSource,
    inserted: usize,
}

impl ContractVariant {
    pub(crate) const fn new(source: ContractSource, inserted: usize) -> Self {
        Self { source, inserted }
    }

    /// The mutated source.
    pub const fn source(&self) -> &ContractSource {
        &self.source
    }

    /// The mutated source text.
    pub fn text(&self) -> &str {
        self.source.text()
    }

    /// Number of filler characters inserted into the canonical source.
    pub const fn inserted(&self) -> usize {
        self.inserted
    }
}

/// Compiler output for a single variant.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// Creation bytecode.
    pub bytecode: Bytes,
    /// Interface descriptor of the compiled contract.
    pub abi: JsonAbi,
}

/// The persisted outcome of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Creation bytecode that was deployed.
    pub bytecode: Bytes,
    /// Address of the deployed contract.
    pub address: Address,
    /// Address of the deploying wallet.
    pub owner: Address,
}
