use num_traits::Signed;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::{
    address::{is_eth_address, ETH_ADDR_LEN},
    rate::{format_fixed, parse_ratio, AMOUNT_FRACTION_DIGITS},
    Error, TierRates, Validate,
};

/// A one-time point or token grant to a user.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GrantRequest {
    id: Uuid,
    #[builder(setter(into))]
    user_addr: String,
    #[builder(setter(into))]
    amount: String,
    #[builder(setter(into))]
    source: String,
    #[builder(default, setter(into))]
    #[cfg_attr(feature = "serde", serde(default))]
    sub_source: String,
    #[builder(default, setter(strip_option, into))]
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    source_user: Option<String>,
    #[builder(setter(into))]
    category: String,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    grant_time: i64,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    exclude_referral: bool,
}

impl GrantRequest {
    /// Get the identifier.
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Get user address.
    pub fn user_addr(&self) -> &str {
        &self.user_addr
    }

    /// Get amount.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Get source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get sub-source.
    pub fn sub_source(&self) -> &str {
        &self.sub_source
    }

    /// Get category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Get grant time.
    pub fn grant_time(&self) -> i64 {
        self.grant_time
    }

    /// Returns whether referrers are excluded from this grant.
    pub fn exclude_referral(&self) -> bool {
        self.exclude_referral
    }

    /// The root grantee, lowercased.
    pub fn get_source_user(&self) -> String {
        self.source_user
            .as_deref()
            .filter(|user| !user.is_empty())
            .unwrap_or(&self.user_addr)
            .to_lowercase()
    }

    /// Derive the identifier of the bonus granted at `tier`.
    ///
    /// This is the name-based (v5) UUID of the big-endian tier index in the
    /// namespace of this grant's id, so it is stable across calls.
    pub fn bonus_id(&self, tier: u32) -> Uuid {
        Uuid::new_v5(&self.id, &tier.to_be_bytes())
    }

    /// Compute the referral bonuses of this grant.
    ///
    /// Each referrer in `chain` is granted `amount * tier_rate`, rendered
    /// with 20 fractional digits, so there is one bonus per chain position;
    /// a position without a configured tier is granted zero. Bonuses are
    /// themselves excluded from referral. Grants with a non-positive amount
    /// or that exclude referral yield no bonuses.
    ///
    /// Bonus ids are derived from a `u32` tier index, so positions past
    /// `u32::MAX` are not granted.
    ///
    /// # Panics
    /// Panics if the amount does not parse, which [`Validate::validate`]
    /// rules out.
    pub fn referral_bonuses<A: AsRef<str>>(&self, chain: &[A], tier_rates: &TierRates) -> Vec<Self> {
        let Some(amount) = parse_ratio(&self.amount) else {
            panic!("invalid amount: {}", self.amount);
        };
        if !amount.is_positive() {
            return Vec::new();
        }
        if self.exclude_referral {
            tracing::debug!(id = %self.id, "skipped referral bonuses of an excluded grant");
            return Vec::new();
        }

        let source_user = self.get_source_user();
        tier_rates
            .along(chain)
            .map_while(|(tier, referrer, tier_rate)| {
                Some(Self {
                    id: self.bonus_id(bonus_tier(tier)?),
                    user_addr: referrer.to_string(),
                    amount: format_fixed(&(&amount * &*tier_rate), AMOUNT_FRACTION_DIGITS),
                    source: self.source.clone(),
                    sub_source: self.sub_source.clone(),
                    source_user: Some(source_user.clone()),
                    category: self.category.clone(),
                    grant_time: self.grant_time,
                    exclude_referral: true,
                })
            })
            .collect()
    }
}

fn bonus_tier(tier: usize) -> Option<u32> {
    let tier = u32::try_from(tier).ok();
    if tier.is_none() {
        tracing::warn!("referral chain exceeds the tier index range, truncated");
    }
    tier
}

impl Validate for GrantRequest {
    fn validate(&self) -> crate::Result<()> {
        if self.user_addr.len() != ETH_ADDR_LEN || !is_eth_address(&self.user_addr) {
            return Err(Error::InvalidUserAddr);
        }
        if self.source.is_empty() {
            return Err(Error::EmptySource);
        }
        if self.category.is_empty() {
            return Err(Error::EmptyCategory);
        }
        if self.grant_time == 0 {
            return Err(Error::MissingGrantTime);
        }
        let amount =
            parse_ratio(&self.amount).ok_or_else(|| Error::InvalidAmount(self.amount.clone()))?;
        if !amount.is_positive() {
            return Err(Error::NegativeAmount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{gen_rand_evm_addr, gen_rand_evm_addrs};

    fn tier_rates() -> TierRates {
        TierRates::from_ratios(["1/10", "2/10", "3/10", "4/10"]).unwrap()
    }

    fn grant(amount: &str) -> GrantRequest {
        GrantRequest::builder()
            .id(Uuid::new_v4())
            .user_addr(gen_rand_evm_addr())
            .amount(amount)
            .source("kansas")
            .category("category")
            .grant_time(123_214_251)
            .build()
    }

    #[test]
    fn test_non_positive_amount_yields_nothing() {
        for amount in ["-100", "0"] {
            let bonuses = grant(amount).referral_bonuses(&gen_rand_evm_addrs(2), &tier_rates());
            assert!(bonuses.is_empty(), "{amount}");
        }
    }

    #[test]
    fn test_referral_bonuses() {
        let req = grant("100");
        let chain = gen_rand_evm_addrs(2);

        let bonuses = req.referral_bonuses(&chain, &tier_rates());
        assert_eq!(bonuses.len(), 2);

        let expected = ["10.00000000000000000000", "20.00000000000000000000"];
        for ((bonus, referrer), amount) in bonuses.iter().zip(&chain).zip(expected) {
            assert_ne!(bonus.id(), req.id());
            assert_eq!(bonus.user_addr(), referrer);
            assert_eq!(bonus.amount(), amount);
            assert_eq!(bonus.source(), req.source());
            assert_eq!(bonus.category(), req.category());
            assert_eq!(bonus.grant_time(), req.grant_time());
            assert_eq!(bonus.get_source_user(), req.get_source_user());
            assert!(bonus.exclude_referral());
            assert_eq!(bonus.validate(), Ok(()));
        }
        assert_ne!(bonuses[0].id(), bonuses[1].id());
    }

    #[test]
    fn test_one_bonus_per_chain_position() {
        let tiers = TierRates::from_ratios(["1/10"]).unwrap();
        let chain = gen_rand_evm_addrs(3);
        let bonuses = grant("100").referral_bonuses(&chain, &tiers);
        assert_eq!(bonuses.len(), chain.len());
        let amounts = bonuses.iter().map(GrantRequest::amount).collect::<Vec<_>>();
        assert_eq!(
            amounts,
            [
                "10.00000000000000000000",
                "0.00000000000000000000",
                "0.00000000000000000000",
            ]
        );
        assert_ne!(bonuses[1].id(), bonuses[2].id());
    }

    #[test]
    fn test_bonus_tier_range() {
        assert_eq!(bonus_tier(0), Some(0));
        assert_eq!(bonus_tier(u32::MAX as usize), Some(u32::MAX));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(bonus_tier(u32::MAX as usize + 1), None);
    }

    #[test]
    fn test_ids_are_stable() {
        let req = grant("100");
        let chain = gen_rand_evm_addrs(2);

        let first = req.referral_bonuses(&chain, &tier_rates());
        let second = req.referral_bonuses(&chain, &tier_rates());
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(first[1].id(), &req.bonus_id(1));
    }

    #[test]
    fn test_ids_differ_across_parents() {
        let chain = gen_rand_evm_addrs(1);
        let a = grant("100").referral_bonuses(&chain, &tier_rates());
        let b = grant("100").referral_bonuses(&chain, &tier_rates());
        assert_ne!(a[0].id(), b[0].id());
    }

    #[test]
    fn test_bonus_amount_rounding() {
        let tiers = TierRates::from_ratios(["1/3"]).unwrap();
        let bonuses = grant("2").referral_bonuses(&gen_rand_evm_addrs(1), &tiers);
        assert_eq!(bonuses[0].amount(), "0.66666666666666666667");
    }

    #[test]
    fn test_excluded_grant_yields_nothing() {
        let req = GrantRequest {
            exclude_referral: true,
            ..grant("100")
        };
        assert!(req
            .referral_bonuses(&gen_rand_evm_addrs(2), &tier_rates())
            .is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid amount")]
    fn test_malformed_amount_is_fatal() {
        grant("ten").referral_bonuses(&gen_rand_evm_addrs(1), &tier_rates());
    }

    #[test]
    fn test_source_user_is_lowercased() {
        let req = GrantRequest {
            user_addr: "0xABCDEF0123456789ABCDEF0123456789ABCDEF01".into(),
            ..grant("1")
        };
        assert_eq!(
            req.get_source_user(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_validate() {
        let cases = [
            ("valid", grant("100"), Ok(())),
            ("fractional amount", grant("1/3"), Ok(())),
            (
                "user address too long",
                GrantRequest {
                    user_addr: gen_rand_evm_addr() + "5",
                    ..grant("100")
                },
                Err(Error::InvalidUserAddr),
            ),
            (
                "user address not hex",
                GrantRequest {
                    user_addr: format!("0x{}", "z".repeat(40)),
                    ..grant("100")
                },
                Err(Error::InvalidUserAddr),
            ),
            (
                "empty source",
                GrantRequest {
                    source: String::new(),
                    ..grant("100")
                },
                Err(Error::EmptySource),
            ),
            (
                "empty category",
                GrantRequest {
                    category: String::new(),
                    ..grant("100")
                },
                Err(Error::EmptyCategory),
            ),
            (
                "missing grant time",
                GrantRequest {
                    grant_time: 0,
                    ..grant("100")
                },
                Err(Error::MissingGrantTime),
            ),
            (
                "malformed amount",
                grant("ten"),
                Err(Error::InvalidAmount("ten".into())),
            ),
            ("infinite amount", grant("inf"), Err(Error::InvalidAmount("inf".into()))),
            ("zero amount", grant("0"), Err(Error::NegativeAmount)),
            ("negative amount", grant("-1"), Err(Error::NegativeAmount)),
        ];
        for (name, req, expected) in cases {
            assert_eq!(req.validate(), expected, "{name}");
        }
    }
}
