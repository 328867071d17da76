use std::{borrow::Cow, collections::BTreeMap};

use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::{rate::parse_ratio, Error};

/// Multipliers applied to a base rate or amount at each referral tier.
///
/// Tier `0` is the nearest referrer. Tiers may be sparse; a chain position
/// without a configured tier earns at a zero rate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierRates(BTreeMap<usize, BigRational>);

impl TierRates {
    /// Create from `(tier, multiplier)` pairs.
    ///
    /// # Errors
    /// Returns [`Error::NegativeMultiplier`] if any multiplier is negative.
    pub fn new(rates: impl IntoIterator<Item = (usize, BigRational)>) -> crate::Result<Self> {
        let rates = rates.into_iter().collect::<BTreeMap<_, _>>();
        if rates.values().any(|rate| rate.is_negative()) {
            return Err(Error::NegativeMultiplier);
        }
        Ok(Self(rates))
    }

    /// Create from decimal or `n/d` strings, where the tier is the position
    /// in the list.
    pub fn from_ratios<S: AsRef<str>>(ratios: impl IntoIterator<Item = S>) -> crate::Result<Self> {
        let rates = ratios
            .into_iter()
            .enumerate()
            .map(|(tier, ratio)| {
                parse_ratio(ratio.as_ref())
                    .map(|rate| (tier, rate))
                    .ok_or(Error::InvalidArgument("malformed tier rate"))
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Self::new(rates)
    }

    /// Get the multiplier of the given tier.
    pub fn get(&self, tier: usize) -> Option<&BigRational> {
        self.0.get(&tier)
    }

    /// Number of configured tiers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no tier is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the configured tiers in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BigRational)> {
        self.0.iter().map(|(tier, rate)| (*tier, rate))
    }

    /// Walk a referral chain, pairing each referrer with its tier multiplier.
    ///
    /// Every position is yielded; a position without a configured tier
    /// gets a zero multiplier.
    pub(crate) fn along<'a, A: AsRef<str>>(
        &'a self,
        chain: &'a [A],
    ) -> impl Iterator<Item = (usize, &'a str, Cow<'a, BigRational>)> + 'a {
        chain.iter().enumerate().map(move |(tier, referrer)| {
            let referrer = referrer.as_ref();
            let rate = match self.get(tier) {
                Some(rate) => Cow::Borrowed(rate),
                None => {
                    tracing::trace!(tier, %referrer, "no rate for referral tier, using zero");
                    Cow::Owned(BigRational::zero())
                }
            };
            (tier, referrer, rate)
        })
    }
}
