use alloy_primitives::{
    utils::{format_ether, parse_ether},
    U256,
};
use rand::Rng;

/// Errors raised while building an [`AmountRange`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountRangeError {
    /// A bound is not a decimal ether amount
    #[error("invalid ether amount '{0}'")]
    Parse(String),

    /// A bound does not fit in 128 bits of wei
    #[error("ether amount '{0}' is too large")]
    TooLarge(String),

    /// The lower bound exceeds the upper bound
    #[error("amount range is inverted: low {low} > high {high}")]
    Inverted {
        /// Lower bound in ether
        low: String,
        /// Upper bound in ether
        high: String,
    },
}

/// Inclusive range of funding amounts, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange {
    low: u128,
    high: u128,
}

impl AmountRange {
    /// Creates a range from wei bounds.
    pub fn new(low: u128, high: u128) -> Result<Self, AmountRangeError> {
        if low > high {
            return Err(AmountRangeError::Inverted {
                low: format_ether(U256::from(low)),
                high: format_ether(U256::from(high)),
            });
        }
        Ok(Self { low, high })
    }

    /// Creates a range from decimal ether bounds such as `"0.001"`.
    pub fn from_ether(low: &str, high: &str) -> Result<Self, AmountRangeError> {
        Self::new(parse_wei(low)?, parse_wei(high)?)
    }

    /// Lower bound in wei.
    pub const fn low(&self) -> u128 {
        self.low
    }

    /// Upper bound in wei.
    pub const fn high(&self) -> u128 {
        self.high
    }

    /// Draws an amount uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> U256 {
        U256::from(rng.random_range(self.low..=self.high))
    }
}

fn parse_wei(ether: &str) -> Result<u128, AmountRangeError> {
    let wei = parse_ether(ether.trim()).map_err(|_| AmountRangeError::Parse(ether.to_string()))?;
    wei.try_into().map_err(|_| AmountRangeError::TooLarge(ether.to_string()))
}
