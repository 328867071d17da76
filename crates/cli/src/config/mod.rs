use std::path::Path;

use accrual_kernels::TierRates;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment, Provider,
};

const ENV_PREFIX: &str = "ACCRUAL_";

/// Separates nested keys in environment variable names.
const ENV_KEY_SEPARATOR: &str = "__";

const DEFAULT_BATCH_SIZE: usize = 500;
const DEFAULT_TIER_RATES: [&str; 2] = ["1/10", "1/20"];

/// Configuration.
///
/// Unset flags are left out when serialized, so they never shadow values
/// from the config file or the environment.
#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of requests per batch.
    #[arg(long, global = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    /// Referral tier rates, as decimals or `n/d` fractions.
    ///
    /// The rate of tier `i` is the `i`-th value.
    #[arg(long = "tier-rate", value_delimiter = ',', global = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tier_rates: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: Some(DEFAULT_BATCH_SIZE),
            tier_rates: Some(DEFAULT_TIER_RATES.map(String::from).to_vec()),
        }
    }
}

impl Config {
    /// Load the config file at `path`, then apply `ACCRUAL_*` environment
    /// variables and finally the flags set in `self`.
    ///
    /// A missing file is treated as empty.
    pub fn resolve(&self, path: &Path) -> eyre::Result<Self> {
        Ok(self.layered_over(Toml::file(path)).extract()?)
    }

    fn layered_over(&self, file: impl Provider) -> Figment {
        Figment::from(file)
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_KEY_SEPARATOR))
            .merge(Serialized::defaults(self))
    }

    /// Returns the maximum number of requests per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Parse the configured tier rates.
    pub fn tier_rates(&self) -> eyre::Result<TierRates> {
        let rates = match self.tier_rates.as_ref() {
            Some(rates) => TierRates::from_ratios(rates)?,
            None => TierRates::from_ratios(DEFAULT_TIER_RATES)?,
        };
        Ok(rates)
    }
}
