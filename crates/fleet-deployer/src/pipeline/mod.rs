//! Orchestration of a deployment batch.
//!
//! All variants are generated up front. Wallets are then processed strictly one after another:
//! compile, deploy, pause, fund, pause, drain, record. A failure aborts the remaining stages of
//! that wallet only; the batch moves on to the next index.

mod amount;
pub use amount::*;

mod delay;
pub use delay::*;

mod stage;
pub use stage::*;

use std::path::PathBuf;

use alloy_primitives::Address;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::{
    ChainClient, Compiler, ContractSource, ContractVariant, DeploymentRecord, MutationError,
    RecordStore, SourceMutator, StoreError, Wallet,
};

/// Parameters of a batch.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Gas limit of the contract creation transaction.
    pub gas_limit: u64,
    /// Range the funding amount is drawn from.
    pub amount: AmountRange,
    /// Upper bound of fillers inserted per site.
    pub max_insertions_per_site: usize,
    /// Draws per variant before a duplicate is accepted.
    pub max_variant_attempts: usize,
}

impl PipelineConfig {
    /// Default creation gas limit.
    pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

    /// Creates a configuration with default gas limit and mutation settings.
    pub const fn new(amount: AmountRange) -> Self {
        Self {
            gas_limit: Self::DEFAULT_GAS_LIMIT,
            amount,
            max_insertions_per_site: SourceMutator::DEFAULT_MAX_INSERTIONS,
            max_variant_attempts: SourceMutator::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// How a wallet iteration ended.
#[derive(Debug)]
pub enum WalletOutcome {
    /// Every stage completed and the record was written
    Recorded {
        /// The deployment record
        record: DeploymentRecord,
        /// Where the record was written
        path: PathBuf,
    },
    /// The chain side completed but the record could not be written
    Unpersisted {
        /// The deployment record
        record: DeploymentRecord,
        /// The persistence error
        error: StoreError,
    },
    /// The iteration stopped early
    Aborted(StageFailure),
}

/// Result of one wallet iteration.
#[derive(Debug)]
pub struct WalletReport {
    /// Sequence index of the wallet.
    pub index: usize,
    /// Address of the wallet.
    pub wallet: Address,
    /// How the iteration ended.
    pub outcome: WalletOutcome,
}

/// Result of a batch, one entry per wallet in sequence order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-wallet results.
    pub wallets: Vec<WalletReport>,
}

impl BatchReport {
    /// Deployment records that reached the chain, whether or not they were persisted.
    pub fn records(&self) -> impl Iterator<Item = &DeploymentRecord> {
        self.wallets.iter().filter_map(|report| match &report.outcome {
            WalletOutcome::Recorded { record, .. } | WalletOutcome::Unpersisted { record, .. } => {
                Some(record)
            }
            WalletOutcome::Aborted(_) => None,
        })
    }

    /// Number of fully recorded wallets.
    pub fn recorded(&self) -> usize {
        self.count(|outcome| matches!(outcome, WalletOutcome::Recorded { .. }))
    }

    /// Number of wallets whose record could not be written.
    pub fn unpersisted(&self) -> usize {
        self.count(|outcome| matches!(outcome, WalletOutcome::Unpersisted { .. }))
    }

    /// Number of aborted wallets.
    pub fn aborted(&self) -> usize {
        self.count(|outcome| matches!(outcome, WalletOutcome::Aborted(_)))
    }

    fn count(&self, predicate: impl Fn(&WalletOutcome) -> bool) -> usize {
        self.wallets.iter().filter(|report| predicate(&report.outcome)).count()
    }
}

/// Drives a batch through the compiler, the chain and the record store.
#[derive(Debug)]
pub struct Pipeline<C, K, D> {
    chain: C,
    compiler: K,
    delay: D,
    store: RecordStore,
    config: PipelineConfig,
    rng: StdRng,
}

impl<C, K, D> Pipeline<C, K, D>
where
    C: ChainClient,
    K: Compiler,
    D: DelayPolicy,
{
    /// Creates a pipeline seeded from OS entropy.
    pub fn new(chain: C, compiler: K, delay: D, store: RecordStore, config: PipelineConfig) -> Self {
        Self { chain, compiler, delay, store, config, rng: StdRng::from_os_rng() }
    }

    /// Replaces the random source used for mutation and funding amounts.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The chain client.
    pub const fn chain(&self) -> &C {
        &self.chain
    }

    /// The record store.
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Generates and writes one variant per wallet before any chain interaction.
    ///
    /// A source that cannot be mutated fails the whole batch. A variant that cannot be written
    /// only fails its own index.
    pub fn prepare_variants(
        &mut self,
        source: &ContractSource,
        count: usize,
    ) -> Result<Vec<Result<ContractVariant, StageFailure>>, MutationError> {
        let mutator = SourceMutator::new(self.config.max_insertions_per_site);
        let variants = mutator.generate_batch(
            source,
            count,
            self.config.max_variant_attempts,
            &mut self.rng,
        )?;

        Ok(variants
            .into_iter()
            .enumerate()
            .map(|(index, variant)| -> Result<ContractVariant, StageFailure> {
                let path = self
                    .store
                    .write_variant(index, &variant)
                    .map_err(|e| StageFailure::new(Stage::VariantGenerated, e))?;
                info!(index, path = %path.display(), "New contract variant created");
                Ok(variant)
            })
            .collect())
    }

    /// Runs the whole batch, one wallet per variant.
    pub async fn run(
        &mut self,
        source: &ContractSource,
        wallets: &[Wallet],
    ) -> Result<BatchReport, MutationError> {
        let total = wallets.len();
        let variants = self.prepare_variants(source, total)?;
        let mut report = BatchReport { wallets: Vec::with_capacity(total) };

        for (index, (wallet, variant)) in wallets.iter().zip(variants).enumerate() {
            let address = wallet.address();
            let outcome = match variant {
                Ok(variant) => self.process(index, wallet, &variant).await,
                Err(failure) => Err(failure),
            };

            let outcome = match outcome {
                Ok(record) => match self.store.persist(&record, index) {
                    Ok(path) => {
                        info!(index, wallet = %address, "Recorded deployment {}/{}", index + 1, total);
                        WalletOutcome::Recorded { record, path }
                    }
                    Err(error) => {
                        warn!(index, wallet = %address, contract = %record.address, %error, "Deployment succeeded but record was not written");
                        WalletOutcome::Unpersisted { record, error }
                    }
                },
                Err(failure) => {
                    error!(index, wallet = %address, stage = %failure.stage, error = %failure.error, "Wallet iteration aborted");
                    WalletOutcome::Aborted(failure)
                }
            };
            report.wallets.push(WalletReport { index, wallet: address, outcome });
        }

        info!(
            recorded = report.recorded(),
            unpersisted = report.unpersisted(),
            aborted = report.aborted(),
            "Batch finished"
        );
        Ok(report)
    }

    /// Moves one wallet from a generated variant to a drained contract.
    async fn process(
        &mut self,
        index: usize,
        wallet: &Wallet,
        variant: &ContractVariant,
    ) -> Result<DeploymentRecord, StageFailure> {
        let artifact = self
            .compiler
            .compile(variant)
            .map_err(|e| StageFailure::new(Stage::Compiled, e))?;
        debug!(index, size = artifact.bytecode.len(), "Loaded bytecode");

        let deployment = self
            .chain
            .deploy_contract(&artifact, wallet, self.config.gas_limit)
            .await
            .map_err(|e| StageFailure::new(Stage::Deployed, e))?;
        self.pause(Pause::AfterDeploy).await;

        let amount = self.config.amount.sample(&mut self.rng);
        self.chain
            .transfer_value(wallet, deployment.address, amount)
            .await
            .map_err(|e| StageFailure::new(Stage::Funded, e))?;
        self.pause(Pause::AfterFund).await;

        self.chain
            .invoke_drain(wallet, deployment.address, &deployment.abi)
            .await
            .map_err(|e| StageFailure::new(Stage::Drained, e))?;

        Ok(DeploymentRecord {
            bytecode: artifact.bytecode,
            address: deployment.address,
            owner: wallet.address(),
        })
    }

    async fn pause(&mut self, pause: Pause) {
        let duration = self.delay.delay(pause);
        if !duration.is_zero() {
            debug!(?pause, seconds = duration.as_secs(), "Pausing");
            tokio::time::sleep(duration).await;
        }
    }
}
