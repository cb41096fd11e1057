use std::{ops::RangeInclusive, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Points in a wallet iteration where the pipeline pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// After the deployment receipt was observed
    AfterDeploy,
    /// After the funding transfer was submitted
    AfterFund,
}

/// Decides how long the pipeline pauses between chain submissions.
pub trait DelayPolicy {
    /// The pause to take at `pause`.
    fn delay(&mut self, pause: Pause) -> Duration;
}

/// Never pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayPolicy for NoDelay {
    fn delay(&mut self, _pause: Pause) -> Duration {
        Duration::ZERO
    }
}

/// Pauses for a uniformly drawn number of seconds.
#[derive(Debug, Clone)]
pub struct RandomDelay {
    after_deploy: RangeInclusive<u64>,
    after_fund: RangeInclusive<u64>,
    rng: StdRng,
}

impl Default for RandomDelay {
    fn default() -> Self {
        Self::new(20..=40, 7..=15, StdRng::from_os_rng())
    }
}

impl RandomDelay {
    /// Creates a policy drawing seconds from the given ranges.
    pub const fn new(
        after_deploy: RangeInclusive<u64>,
        after_fund: RangeInclusive<u64>,
        rng: StdRng,
    ) -> Self {
        Self { after_deploy, after_fund, rng }
    }
}

impl DelayPolicy for RandomDelay {
    fn delay(&mut self, pause: Pause) -> Duration {
        let range = match pause {
            Pause::AfterDeploy => self.after_deploy.clone(),
            Pause::AfterFund => self.after_fund.clone(),
        };
        if range.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_secs(self.rng.random_range(range))
    }
}
