use alloy_json_abi::JsonAbi;
use alloy_primitives::{keccak256, Bytes};

use crate::{CompileError, CompiledArtifact, Compiler, ContractVariant};

/// ABI exposing a single `MoneyBack()` function.
pub fn drain_abi() -> JsonAbi {
    serde_json::from_str(
        r#"[{"type":"function","name":"MoneyBack","inputs":[],"outputs":[],"stateMutability":"nonpayable"}]"#,
    )
    .expect("valid ABI")
}

/// Compiler double that rejects unbalanced braces and otherwise emits the source hash as
/// bytecode, so distinct sources yield distinct artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashingCompiler;

impl Compiler for HashingCompiler {
    fn compile(&self, variant: &ContractVariant) -> Result<CompiledArtifact, CompileError> {
        let text = variant.text();
        let mut depth: i64 = 0;
        for c in text.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                break;
            }
        }
        if depth != 0 {
            return Err(CompileError::InvalidSource(format!(
                "ParserError: unbalanced braces in {}",
                variant.source().file_name()
            )));
        }

        let mut bytecode = vec![0x60, 0x80, 0x60, 0x40];
        bytecode.extend_from_slice(keccak256(text.as_bytes()).as_slice());
        Ok(CompiledArtifact { bytecode: Bytes::from(bytecode), abi: drain_abi() })
    }
}

/// Wraps a compiler and fails the calls whose zero-based position is listed.
#[derive(Debug, Default)]
pub struct FailingCompiler<K> {
    inner: K,
    fail_on: Vec<usize>,
    calls: std::cell::Cell<usize>,
}

impl<K> FailingCompiler<K> {
    /// Fails the calls at the given positions and delegates the rest to `inner`.
    pub fn new(inner: K, fail_on: impl IntoIterator<Item = usize>) -> Self {
        Self { inner, fail_on: fail_on.into_iter().collect(), calls: Default::default() }
    }
}

impl<K: Compiler> Compiler for FailingCompiler<K> {
    fn compile(&self, variant: &ContractVariant) -> Result<CompiledArtifact, CompileError> {
        let call = self.calls.replace(self.calls.get() + 1);
        if self.fail_on.contains(&call) {
            return Err(CompileError::InvalidSource(format!("ParserError: injected failure #{call}")));
        }
        self.inner.compile(variant)
    }
}
