//! Compilation of contract variants through `solc --standard-json`.

use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use alloy_json_abi::JsonAbi;
use alloy_primitives::{hex, Bytes};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, trace};

use crate::{CompiledArtifact, ContractVariant};

/// Errors raised while compiling a variant.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiler binary could not be executed
    #[error("solc toolchain unavailable at '{path}': {source}")]
    ToolchainUnavailable {
        /// Path of the compiler binary
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The compiler binary reports a different version than the pinned one
    #[error("solc version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// The pinned version
        expected: String,
        /// The version reported by the binary
        found: String,
    },

    /// The compiler rejected the source
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// The compiler output has no contract under the expected file and contract name
    #[error("contract '{contract}' not found in compiler output for '{file}'")]
    ContractNotFound {
        /// Source file name
        file: String,
        /// Expected contract name
        contract: String,
    },

    /// The compiler produced no creation bytecode (abstract contract or interface)
    #[error("compiler produced empty bytecode for '{contract}'")]
    EmptyBytecode {
        /// Contract name
        contract: String,
    },

    /// The bytecode object is not plain hex (e.g. unlinked library placeholders)
    #[error("invalid bytecode object: {0}")]
    InvalidBytecode(#[from] hex::FromHexError),

    /// The compiler output is not valid standard JSON
    #[error("invalid compiler output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    /// The pinned version could not be installed
    #[error("failed to install solc {version}: {reason}")]
    Install {
        /// The pinned version
        version: String,
        /// Installer message
        reason: String,
    },

    /// The compiler process failed without a diagnostic
    #[error("solc process failed: {0}")]
    Process(String),
}

/// Turns a contract variant into a deployable artifact.
pub trait Compiler {
    /// Compiles `variant`, selecting the contract named after its source file.
    fn compile(&self, variant: &ContractVariant) -> Result<CompiledArtifact, CompileError>;
}

/// Standard JSON output of `solc`, restricted to the fields read here.
#[derive(Debug, Deserialize)]
struct StandardJsonOutput {
    #[serde(default)]
    errors: Vec<Diagnostic>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, ContractOutput>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Diagnostic {
    severity: String,
    message: String,
    formatted_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContractOutput {
    abi: JsonAbi,
    evm: EvmOutput,
}

#[derive(Debug, Deserialize)]
struct EvmOutput {
    bytecode: BytecodeOutput,
}

#[derive(Debug, Deserialize)]
struct BytecodeOutput {
    object: String,
}

/// A `solc` binary pinned to one version for the whole run.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc: PathBuf,
    version: String,
    optimizer_runs: u32,
}

impl SolcCompiler {
    /// Default optimizer run count.
    pub const DEFAULT_OPTIMIZER_RUNS: u32 = 200;

    /// Uses the binary at `solc` after checking it reports `version`.
    pub fn new(solc: impl Into<PathBuf>, version: impl Into<String>) -> Result<Self, CompileError> {
        let compiler = Self {
            solc: solc.into(),
            version: version.into(),
            optimizer_runs: Self::DEFAULT_OPTIMIZER_RUNS,
        };
        compiler.check_version()?;
        Ok(compiler)
    }

    /// Resolves the binary for `version`, installing it through svm when `install` is set and no
    /// binary of that version is present.
    ///
    /// Priority: the `explicit` path, then the svm install of `version`, then `solc` on `PATH` if it
    /// reports `version`, then a fresh install. Without `install` the last step falls back to
    /// `solc` on `PATH`, which then fails the version check.
    pub async fn resolve(
        version: &str,
        explicit: Option<&Path>,
        install: bool,
    ) -> Result<Self, CompileError> {
        let solc = match locate(version, explicit, &svm::version_binary(version)) {
            Some(solc) => solc,
            None if install => install_solc(version).await?,
            None => PathBuf::from("solc"),
        };
        debug!(solc = %solc.display(), version, "Resolved solc binary");
        Self::new(solc, version)
    }

    /// Sets the optimizer run count.
    pub const fn with_optimizer_runs(mut self, runs: u32) -> Self {
        self.optimizer_runs = runs;
        self
    }

    /// The pinned compiler version.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn check_version(&self) -> Result<(), CompileError> {
        let output = Command::new(&self.solc).arg("--version").output().map_err(|source| {
            CompileError::ToolchainUnavailable { path: self.solc.clone(), source }
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let found = parse_version(&stdout).unwrap_or_default();
        if found != self.version {
            return Err(CompileError::VersionMismatch {
                expected: self.version.clone(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn standard_json_input(&self, variant: &ContractVariant) -> serde_json::Value {
        json!({
            "language": "Solidity",
            "sources": {
                variant.source().file_name(): { "content": variant.text() }
            },
            "settings": {
                "optimizer": { "enabled": true, "runs": self.optimizer_runs },
                "outputSelection": {
                    "*": { "*": ["metadata", "evm.bytecode", "abi"] }
                }
            }
        })
    }

    fn run(&self, input: &serde_json::Value) -> Result<Vec<u8>, CompileError> {
        let unavailable =
            |source| CompileError::ToolchainUnavailable { path: self.solc.clone(), source };

        let mut child = Command::new(&self.solc)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(unavailable)?;

        // The child is always reaped, even when it stops reading its input early.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(input.to_string().as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output().map_err(unavailable)?;

        if output.stdout.is_empty() || written.is_err() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompileError::Process(match written {
                Err(e) => format!("{}: failed to write input ({e}): {}", output.status, stderr.trim()),
                Ok(()) => format!("{}: {}", output.status, stderr.trim()),
            }));
        }
        Ok(output.stdout)
    }
}

impl Compiler for SolcCompiler {
    fn compile(&self, variant: &ContractVariant) -> Result<CompiledArtifact, CompileError> {
        let source = variant.source();
        let input = self.standard_json_input(variant);
        trace!(file = source.file_name(), version = %self.version, "Invoking solc");

        let output: StandardJsonOutput = serde_json::from_slice(&self.run(&input)?)?;
        select_artifact(output, source.file_name(), source.contract_name())
    }
}

fn select_artifact(
    mut output: StandardJsonOutput,
    file: &str,
    contract: &str,
) -> Result<CompiledArtifact, CompileError> {
    let errors: Vec<String> = output
        .errors
        .iter()
        .filter(|diagnostic| diagnostic.severity == "error")
        .map(|diagnostic| {
            diagnostic.formatted_message.clone().unwrap_or_else(|| diagnostic.message.clone())
        })
        .collect();
    if !errors.is_empty() {
        return Err(CompileError::InvalidSource(errors.join("\n")));
    }

    let compiled = output
        .contracts
        .get_mut(file)
        .and_then(|contracts| contracts.remove(contract))
        .ok_or_else(|| CompileError::ContractNotFound {
            file: file.to_string(),
            contract: contract.to_string(),
        })?;

    let bytecode = Bytes::from(hex::decode(compiled.evm.bytecode.object.trim())?);
    if bytecode.is_empty() {
        return Err(CompileError::EmptyBytecode { contract: contract.to_string() });
    }
    debug!(contract, size = bytecode.len(), "Compiled contract");
    Ok(CompiledArtifact { bytecode, abi: compiled.abi })
}

/// Finds an existing binary for `version`. `None` means it has to be installed.
///
/// `installed` is where svm keeps that version.
fn locate(version: &str, explicit: Option<&Path>, installed: &Path) -> Option<PathBuf> {
    if let Some(explicit) = explicit {
        return Some(explicit.to_path_buf());
    }
    if installed.is_file() {
        return Some(installed.to_path_buf());
    }
    let stdout = Command::new("solc").arg("--version").output().ok()?.stdout;
    (parse_version(&String::from_utf8_lossy(&stdout)) == Some(version)).then(|| "solc".into())
}

async fn install_solc(version: &str) -> Result<PathBuf, CompileError> {
    let failed =
        |reason: String| CompileError::Install { version: version.to_string(), reason };
    let parsed = semver::Version::parse(version).map_err(|e| failed(e.to_string()))?;
    info!(version, "Installing solc");
    let path = svm::install(&parsed).await.map_err(|e| failed(e.to_string()))?;
    info!(version, solc = %path.display(), "Installed solc");
    Ok(path)
}

/// Extracts `0.8.0` from `solc --version` output (`Version: 0.8.0+commit.c7dfd78e.Linux.g++`).
fn parse_version(stdout: &str) -> Option<&str> {
    let line = stdout.lines().find_map(|line| line.trim().strip_prefix("Version:"))?;
    line.trim().split(['+', '-']).next()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{ContractSource, SourceMutator};

    fn output(json: serde_json::Value) -> StandardJsonOutput {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parses_solc_version_banner() {
        let banner = "solc, the solidity compiler commandline interface\nVersion: 0.8.0+commit.c7dfd78e.Linux.g++\n";
        assert_eq!(parse_version(banner), Some("0.8.0"));
        assert_eq!(parse_version("Version: 0.8.26-develop.2024"), Some("0.8.26"));
        assert_eq!(parse_version("garbage"), None);
    }

    #[test]
    fn selects_contract_by_file_stem() {
        let out = output(json!({
            "contracts": {
                "C.sol": {
                    "C": {
                        "abi": [{"type": "function", "name": "MoneyBack", "inputs": [], "outputs": [], "stateMutability": "nonpayable"}],
                        "evm": { "bytecode": { "object": "6080604052" } }
                    }
                }
            }
        }));
        let artifact = select_artifact(out, "C.sol", "C").unwrap();
        assert_eq!(artifact.bytecode, Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]));
        assert!(artifact.abi.function("MoneyBack").is_some());
    }

    #[test]
    fn error_diagnostics_fail_compilation() {
        let out = output(json!({
            "errors": [
                {"severity": "warning", "message": "unused variable"},
                {"severity": "error", "message": "Expected '}'", "formattedMessage": "ParserError: Expected '}'"}
            ]
        }));
        let err = select_artifact(out, "C.sol", "C").unwrap_err();
        assert!(matches!(err, CompileError::InvalidSource(msg) if msg == "ParserError: Expected '}'"));
    }

    #[test]
    fn name_mismatch_is_an_error() {
        let out = output(json!({
            "contracts": {
                "C.sol": {
                    "Other": { "abi": [], "evm": { "bytecode": { "object": "6080" } } }
                }
            }
        }));
        assert!(matches!(
            select_artifact(out, "C.sol", "C"),
            Err(CompileError::ContractNotFound { contract, .. }) if contract == "C"
        ));
    }

    #[test]
    fn empty_bytecode_is_an_error() {
        let out = output(json!({
            "contracts": { "C.sol": { "C": { "abi": [], "evm": { "bytecode": { "object": "" } } } } }
        }));
        assert!(matches!(select_artifact(out, "C.sol", "C"), Err(CompileError::EmptyBytecode { .. })));
    }

    #[test]
    fn locate_prefers_explicit_then_installed() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("solc-0.0.0");
        let explicit = dir.path().join("custom-solc");

        assert_eq!(locate("0.0.0", Some(&explicit), &installed), Some(explicit.clone()));
        assert_eq!(locate("0.0.0", None, &installed), None);

        std::fs::write(&installed, b"").unwrap();
        assert_eq!(locate("0.0.0", None, &installed), Some(installed.clone()));
        assert_eq!(locate("0.0.0", Some(&explicit), &installed), Some(explicit));
    }

    #[tokio::test]
    async fn missing_version_is_installed_only_when_allowed() {
        let err = SolcCompiler::resolve("0.0.0-missing", None, false).await.unwrap_err();
        assert!(matches!(
            err,
            CompileError::ToolchainUnavailable { .. } | CompileError::VersionMismatch { .. }
        ));

        // An unparsable pin fails before any download starts.
        let err = SolcCompiler::resolve("not-a-version", None, true).await.unwrap_err();
        assert!(matches!(err, CompileError::Install { version, .. } if version == "not-a-version"));
    }

    /// Writes an executable `solc` stand-in that reports 0.8.0, stores its stdin next to itself
    /// and prints `stdout` for compilation requests.
    #[cfg(unix)]
    fn scripted_solc(dir: &Path, stdout: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("solc");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo 'solc, the solidity compiler commandline interface'\n  echo 'Version: 0.8.0+commit.c7dfd78e.Linux.g++'\n  exit 0\nfi\ncat > \"$(dirname \"$0\")/input.json\"\ncat <<'JSON'\n{stdout}\nJSON\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn standard_json_request_pins_optimizer_and_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let solc = scripted_solc(
            dir.path(),
            r#"{"contracts":{"C.sol":{"C":{"abi":[],"evm":{"bytecode":{"object":"6080"}}}}}}"#,
        );
        let compiler = SolcCompiler::new(&solc, "0.8.0").unwrap();
        let variant = SourceMutator::new(0)
            .mutate(&ContractSource::new("C.sol", "contract C {}\n"), &mut StdRng::seed_from_u64(0))
            .unwrap();

        let artifact = compiler.compile(&variant).unwrap();
        assert_eq!(artifact.bytecode, Bytes::from_static(&[0x60, 0x80]));

        let request: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("input.json")).unwrap())
                .unwrap();
        assert_eq!(request["language"], "Solidity");
        assert_eq!(request["settings"]["optimizer"], json!({ "enabled": true, "runs": 200 }));
        assert_eq!(request["sources"]["C.sol"]["content"], variant.text());
    }

    #[cfg(unix)]
    #[test]
    fn pinned_version_must_match_binary() {
        let dir = tempfile::tempdir().unwrap();
        let solc = scripted_solc(dir.path(), "{}");
        let err = SolcCompiler::new(&solc, "0.8.26").unwrap_err();
        assert!(matches!(err, CompileError::VersionMismatch { expected, found }
            if expected == "0.8.26" && found == "0.8.0"));
    }

    #[cfg(unix)]
    #[test]
    fn solc_exiting_without_output_is_a_process_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let solc = scripted_solc(dir.path(), "{}");
        let compiler = SolcCompiler::new(&solc, "0.8.0").unwrap();
        // Replace the stand-in with one that exits before reading a large input.
        std::fs::write(&solc, "#!/bin/sh\necho 'out of memory' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&solc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let text = format!("contract C {{\n{}}}\n", "// padding\n".repeat(20_000));
        let variant = SourceMutator::new(0)
            .mutate(&ContractSource::new("C.sol", text), &mut StdRng::seed_from_u64(0))
            .unwrap();
        let err = compiler.compile(&variant).unwrap_err();
        assert!(matches!(err, CompileError::Process(message) if message.contains("out of memory")));
    }

    #[test]
    fn missing_binary_is_toolchain_unavailable() {
        let err = SolcCompiler::new("/nonexistent/solc-0.0.0", "0.0.0").unwrap_err();
        assert!(matches!(err, CompileError::ToolchainUnavailable { .. }));
    }

    fn system_solc() -> Option<SolcCompiler> {
        let stdout = Command::new("solc").arg("--version").output().ok()?.stdout;
        let version = parse_version(&String::from_utf8_lossy(&stdout))?.to_string();
        SolcCompiler::new("solc", version).ok()
    }

    #[test]
    fn solc_compiles_variants_and_rejects_broken_source() {
        let Some(solc) = system_solc() else {
            eprintln!("skipping solc_compiles_variants_and_rejects_broken_source because solc is missing");
            return;
        };
        let text = "// SPDX-License-Identifier: MIT\npragma solidity >=0.8.0;\n\ncontract C {\n    constructor() {}\n\n    function MoneyBack() public {}\n}\n";
        let source = ContractSource::new("C.sol", text);
        let mut rng = StdRng::seed_from_u64(1);
        let variants = SourceMutator::default().generate_batch(&source, 2, 16, &mut rng).unwrap();

        let first = solc.compile(&variants[0]).unwrap();
        let second = solc.compile(&variants[1]).unwrap();
        assert_ne!(first.bytecode, second.bytecode);

        let broken = SourceMutator::new(0)
            .mutate(&ContractSource::new("C.sol", text.trim_end().trim_end_matches('}')), &mut rng)
            .unwrap();
        assert!(matches!(solc.compile(&broken), Err(CompileError::InvalidSource(_))));
    }
}
