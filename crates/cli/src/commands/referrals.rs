use std::path::PathBuf;

use accrual_kernels::{
    EarnRequest, EarnRequestBatch, EarnRequestFullBatch, GrantRequest, TierRates,
};
use serde::Deserialize;

use super::{
    utils::{print_json, read_json, validate_all},
    Command, Context,
};

/// Compute referral bonuses with the configured tier rates.
#[derive(Debug, clap::Args)]
pub struct Referrals {
    #[command(subcommand)]
    command: Kind,
}

#[derive(Debug, clap::Subcommand)]
enum Kind {
    /// Bonuses of earn requests.
    ///
    /// Input is a JSON array of earn requests, each with its `chain`.
    Earn {
        /// Path to the input file. Read from stdin if not provided.
        input: Option<PathBuf>,
    },
    /// Bonuses of grant requests.
    ///
    /// Input is a JSON array of grant requests, each with its `chain`.
    Grant {
        /// Path to the input file. Read from stdin if not provided.
        input: Option<PathBuf>,
    },
    /// Expand a batch with the bonuses of its entries.
    ///
    /// Input is a JSON object with a `batch` and its `chains`.
    Batch {
        /// Path to the input file. Read from stdin if not provided.
        input: Option<PathBuf>,
        /// The batch is a batch of unrelated requests.
        #[arg(long)]
        full: bool,
    },
}

/// A request together with its referral chain, nearest referrer first.
#[derive(Debug, Deserialize)]
struct Referred<T> {
    #[serde(flatten)]
    request: T,
    #[serde(default)]
    chain: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReferredBatch<T> {
    batch: T,
    #[serde(default)]
    chains: Vec<Vec<String>>,
}

impl Command for Referrals {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let tier_rates = ctx.config().tier_rates()?;
        match &self.command {
            Kind::Earn { input } => {
                let referred: Vec<Referred<EarnRequest>> = read_json(input.as_deref()).await?;
                print_json(&earn_bonuses(&referred, &tier_rates)?)
            }
            Kind::Grant { input } => {
                let referred: Vec<Referred<GrantRequest>> = read_json(input.as_deref()).await?;
                print_json(&grant_bonuses(&referred, &tier_rates)?)
            }
            Kind::Batch { input, full } => {
                if *full {
                    let referred: ReferredBatch<EarnRequestFullBatch> =
                        read_json(input.as_deref()).await?;
                    validate_all([&referred.batch])?;
                    let expanded = referred
                        .batch
                        .with_referral_bonuses(&referred.chains, &tier_rates)?;
                    print_json(&expanded)
                } else {
                    let referred: ReferredBatch<EarnRequestBatch> =
                        read_json(input.as_deref()).await?;
                    validate_all([&referred.batch])?;
                    let expanded = referred
                        .batch
                        .with_referral_bonuses(&referred.chains, &tier_rates)?;
                    print_json(&expanded)
                }
            }
        }
    }
}

fn earn_bonuses(
    referred: &[Referred<EarnRequest>],
    tier_rates: &TierRates,
) -> eyre::Result<Vec<EarnRequest>> {
    validate_all(referred.iter().map(|entry| &entry.request))?;
    let mut bonuses = Vec::new();
    for Referred { request, chain } in referred {
        bonuses.extend(request.referral_bonuses(chain, tier_rates)?);
    }
    Ok(bonuses)
}

fn grant_bonuses(
    referred: &[Referred<GrantRequest>],
    tier_rates: &TierRates,
) -> eyre::Result<Vec<GrantRequest>> {
    validate_all(referred.iter().map(|entry| &entry.request))?;
    Ok(referred
        .iter()
        .flat_map(|Referred { request, chain }| request.referral_bonuses(chain, tier_rates))
        .collect())
}
