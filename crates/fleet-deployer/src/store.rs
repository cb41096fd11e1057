//! Per-index persistence of generated sources and deployment records.
//!
//! Layout under the batch root:
//!
//! ```text
//! <root>/<index>/<ContractFile>.sol
//! <root>/<index>/data.json
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{ContractVariant, DeploymentRecord};

/// Errors raised while writing batch artifacts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to create a directory or write a file
    #[error("failed to write '{path}': {source}")]
    Write {
        /// The path that failed to write
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Failed to serialize a record
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes batch artifacts under a root directory, keyed by wallet index.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// File name of a deployment record.
    pub const RECORD_FILE: &'static str = "data.json";

    /// Creates a store rooted at `root`. Nothing is written until the first call.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The batch root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the artifacts of `index`.
    pub fn index_dir(&self, index: usize) -> PathBuf {
        self.root.join(index.to_string())
    }

    /// Path of the record file of `index`.
    pub fn record_path(&self, index: usize) -> PathBuf {
        self.index_dir(index).join(Self::RECORD_FILE)
    }

    /// Writes the source of `variant` to `<root>/<index>/<file name>`.
    pub fn write_variant(
        &self,
        index: usize,
        variant: &ContractVariant,
    ) -> Result<PathBuf, StoreError> {
        let path = self.index_dir(index).join(variant.source().file_name());
        write_file(&path, variant.text().as_bytes())?;
        debug!(index, path = %path.display(), "Wrote contract variant");
        Ok(path)
    }

    /// Writes `record` to `<root>/<index>/data.json`.
    pub fn persist(&self, record: &DeploymentRecord, index: usize) -> Result<PathBuf, StoreError> {
        let path = self.record_path(index);
        let json = serde_json::to_string_pretty(record)?;
        write_file(&path, json.as_bytes())?;
        debug!(index, path = %path.display(), "Wrote deployment record");
        Ok(path)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| StoreError::Write { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, contents).map_err(|source| StoreError::Write { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, Bytes};
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{ContractSource, SourceMutator};

    fn record() -> DeploymentRecord {
        DeploymentRecord {
            bytecode: Bytes::from_static(&[0x60, 0x80]),
            address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            owner: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
        }
    }

    #[test]
    fn persists_record_under_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("new_contracts"));

        let path = store.persist(&record(), 3).unwrap();
        assert_eq!(path, dir.path().join("new_contracts").join("3").join("data.json"));

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["bytecode"], "0x6080");
        let parsed: DeploymentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn writes_variant_next_to_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        let source = ContractSource::new("C.sol", "contract C {\n}\n");
        let variant =
            SourceMutator::default().mutate(&source, &mut StdRng::seed_from_u64(0)).unwrap();

        let path = store.write_variant(0, &variant).unwrap();
        assert_eq!(path, dir.path().join("0").join("C.sol"));
        assert_eq!(fs::read_to_string(path).unwrap(), variant.text());
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();

        let err = RecordStore::new(&blocker).persist(&record(), 0).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }
}
