use std::fmt;

use crate::{ChainError, CompileError, MutationError, StoreError};

/// Progress of one wallet iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Nothing done yet
    Pending,
    /// A variant was generated and written to disk
    VariantGenerated,
    /// The variant was compiled
    Compiled,
    /// The contract was deployed and its receipt observed
    Deployed,
    /// The funding transfer was submitted
    Funded,
    /// The drain call was submitted
    Drained,
    /// The deployment record was written
    Recorded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::VariantGenerated => "variant-generated",
            Self::Compiled => "compiled",
            Self::Deployed => "deployed",
            Self::Funded => "funded",
            Self::Drained => "drained",
            Self::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

/// Any error a pipeline stage can raise.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Variant generation failed
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A chain operation failed
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Writing an artifact failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A wallet iteration that stopped before reaching `stage`.
#[derive(Debug, thiserror::Error)]
#[error("failed to reach stage '{stage}': {error}")]
pub struct StageFailure {
    /// The stage that was being entered
    pub stage: Stage,
    /// The underlying error
    #[source]
    pub error: PipelineError,
}

impl StageFailure {
    pub(crate) fn new(stage: Stage, error: impl Into<PipelineError>) -> Self {
        Self { stage, error: error.into() }
    }
}
