use clap::Parser;
use fleet_deployer::SourceMutator;
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use crate::{
    common::{LogArgs, VariantArgs},
    Error,
};

/// Write contract variants without touching the chain
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Number of variants to generate
    #[arg(long = "count", short = 'n', default_value_t = 1)]
    pub count: usize,

    /// Draws per variant before a duplicate is accepted
    #[arg(long = "max-attempts", default_value_t = SourceMutator::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,

    /// Variant configuration
    #[command(flatten)]
    pub variant_args: VariantArgs,

    /// Logging configuration
    #[command(flatten)]
    pub log_args: LogArgs,
}

impl Cmd {
    /// Execute the mutate command
    pub fn run(&self) -> Result<(), Error> {
        self.log_args.init()?;

        let source = self.variant_args.load_source()?;
        let mut rng = match self.variant_args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let variants = SourceMutator::new(self.variant_args.max_insertions).generate_batch(
            &source,
            self.count,
            self.max_attempts,
            &mut rng,
        )?;

        let store = self.variant_args.store();
        for (index, variant) in variants.iter().enumerate() {
            let path = store.write_variant(index, variant)?;
            info!(index, inserted = variant.inserted(), path = %path.display(), "New contract variant created");
        }
        info!(count = variants.len(), out = %store.root().display(), "Variants written");
        Ok(())
    }
}
