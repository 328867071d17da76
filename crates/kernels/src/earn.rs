use typed_builder::TypedBuilder;

use crate::{
    address::ETH_ADDR_LEN,
    rate::{checked_earn_rate, multiply_by_tier},
    Error, TierRates, Validate,
};

/// An intent to continuously accrue rewards for one user from one source,
/// starting at a block or a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EarnRequest {
    #[builder(setter(into))]
    pub(crate) user_addr: String,
    #[builder(setter(into))]
    pub(crate) source: String,
    #[builder(setter(into))]
    pub(crate) sub_source: String,
    #[builder(default, setter(strip_option, into))]
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub(crate) source_user: Option<String>,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) start_block: i64,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) start_time: i64,
    #[builder(setter(into))]
    pub(crate) earn_rate: String,
}

impl EarnRequest {
    /// Get user address.
    pub fn user_addr(&self) -> &str {
        &self.user_addr
    }

    /// Get source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get sub-source.
    pub fn sub_source(&self) -> &str {
        &self.sub_source
    }

    /// Get the explicitly set source user, if any.
    pub fn source_user(&self) -> Option<&str> {
        self.source_user.as_deref().filter(|user| !user.is_empty())
    }

    /// Get start block.
    pub fn start_block(&self) -> i64 {
        self.start_block
    }

    /// Get start time.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Get earn rate.
    pub fn earn_rate(&self) -> &str {
        &self.earn_rate
    }

    /// The root earner whose referral chain this accrual flows through.
    pub fn get_source_user(&self) -> &str {
        self.source_user().unwrap_or(&self.user_addr)
    }

    /// Returns whether accrual is indexed by block rather than by time.
    pub fn is_per_block(&self) -> bool {
        self.start_block != 0
    }

    /// Returns whether this request was itself derived from a referral,
    /// i.e. its source user is set and is not the user.
    pub fn is_referral_derived(&self) -> bool {
        is_derived(&self.user_addr, self.source_user())
    }

    /// Compute the referral bonuses of this request.
    ///
    /// Each referrer in `chain` gets a request with the same source and
    /// start, `earn_rate * tier_rate` and this request's source user, so a
    /// non-derived request yields exactly one bonus per chain position. A
    /// position without a configured tier earns at rate `0`. Referral-derived requests are never
    /// propagated further and yield no bonuses.
    ///
    /// # Errors
    /// Returns the rate error if the earn rate is malformed, negative or
    /// infinite.
    pub fn referral_bonuses<A: AsRef<str>>(
        &self,
        chain: &[A],
        tier_rates: &TierRates,
    ) -> crate::Result<Vec<Self>> {
        if self.is_referral_derived() {
            tracing::debug!(
                user = %self.user_addr,
                source_user = %self.get_source_user(),
                "skipped referral bonuses of a referral-derived request"
            );
            return Ok(Vec::new());
        }
        if chain.is_empty() {
            return Ok(Vec::new());
        }

        let earn_rate = checked_earn_rate(&self.earn_rate)?;
        let source_user = self.get_source_user();
        let bonuses = tier_rates
            .along(chain)
            .map(|(_, referrer, tier_rate)| Self {
                user_addr: referrer.to_string(),
                source: self.source.clone(),
                sub_source: self.sub_source.clone(),
                source_user: Some(source_user.to_string()),
                start_block: self.start_block,
                start_time: self.start_time,
                earn_rate: multiply_by_tier(&earn_rate, &tier_rate),
            })
            .collect();
        Ok(bonuses)
    }
}

impl Validate for EarnRequest {
    fn validate(&self) -> crate::Result<()> {
        if self.start_time == 0 {
            return Err(Error::MissingStart);
        }
        checked_earn_rate(&self.earn_rate)?;
        if self.user_addr.len() != ETH_ADDR_LEN {
            return Err(Error::InvalidUserAddr);
        }
        if self.source.is_empty() {
            return Err(Error::EmptySource);
        }
        if self.sub_source.is_empty() {
            return Err(Error::EmptySubSource);
        }
        Ok(())
    }
}

/// Returns whether an entry with the given user and source user is
/// referral-derived.
pub(crate) fn is_derived(user_addr: &str, source_user: Option<&str>) -> bool {
    source_user.is_some_and(|source_user| {
        !source_user.is_empty() && !source_user.eq_ignore_ascii_case(user_addr)
    })
}

#[cfg(test)]
mod tests {
    use num_rational::BigRational;

    use super::*;
    use crate::test::{gen_rand_evm_addr, gen_rand_evm_addrs};

    fn request() -> EarnRequest {
        EarnRequest::builder()
            .user_addr(gen_rand_evm_addr())
            .source("source")
            .sub_source("sub")
            .start_time(1)
            .earn_rate("0.45")
            .build()
    }

    fn tier_rates() -> TierRates {
        TierRates::new([
            (0, BigRational::new(1.into(), 10.into())),
            (1, BigRational::new(1.into(), 20.into())),
            (2, BigRational::new(1.into(), 30.into())),
            (3, BigRational::new(1.into(), 40.into())),
        ])
        .unwrap()
    }

    #[test]
    fn test_validate() {
        let cases = [
            (
                "startBlock and startTime both zero",
                EarnRequest {
                    start_time: 0,
                    ..request()
                },
                Err(Error::MissingStart),
            ),
            (
                "startBlock and startTime both non-zero",
                EarnRequest {
                    start_block: 1,
                    ..request()
                },
                Ok(()),
            ),
            (
                "startTime only",
                EarnRequest {
                    start_time: 333_333,
                    ..request()
                },
                Ok(()),
            ),
            (
                "zero earn rate",
                EarnRequest {
                    earn_rate: "0".into(),
                    ..request()
                },
                Ok(()),
            ),
            (
                "unparsable earn rate",
                EarnRequest {
                    earn_rate: "lots".into(),
                    ..request()
                },
                Err(Error::InvalidEarnRate),
            ),
            (
                "negative earn rate",
                EarnRequest {
                    earn_rate: "-0.45".into(),
                    ..request()
                },
                Err(Error::NegativeRate),
            ),
            (
                "infinite earn rate",
                EarnRequest {
                    earn_rate: "Inf".into(),
                    ..request()
                },
                Err(Error::EarnRateInfinite),
            ),
            (
                "invalid user address",
                EarnRequest {
                    user_addr: gen_rand_evm_addr() + "f",
                    ..request()
                },
                Err(Error::InvalidUserAddr),
            ),
            (
                "empty source",
                EarnRequest {
                    source: String::new(),
                    ..request()
                },
                Err(Error::EmptySource),
            ),
            (
                "empty sub-source",
                EarnRequest {
                    sub_source: String::new(),
                    ..request()
                },
                Err(Error::EmptySubSource),
            ),
        ];
        for (name, req, expected) in cases {
            assert_eq!(req.validate(), expected, "{name}");
        }
    }

    #[test]
    fn test_validate_reports_first_failure() {
        let req = EarnRequest {
            start_time: 0,
            earn_rate: "-1".into(),
            source: String::new(),
            ..request()
        };
        assert_eq!(req.validate(), Err(Error::MissingStart));
        let req = EarnRequest {
            start_time: 1,
            ..req
        };
        assert_eq!(req.validate(), Err(Error::NegativeRate));
    }

    #[test]
    fn test_is_per_block() {
        assert!(EarnRequest {
            start_block: 1,
            ..request()
        }
        .is_per_block());
        assert!(!request().is_per_block());
    }

    #[test]
    fn test_get_source_user() {
        let req = request();
        assert_eq!(req.get_source_user(), req.user_addr());

        let root = gen_rand_evm_addr();
        let req = EarnRequest {
            source_user: Some(root.clone()),
            ..request()
        };
        assert_eq!(req.get_source_user(), root);

        let req = EarnRequest {
            source_user: Some(String::new()),
            ..request()
        };
        assert_eq!(req.get_source_user(), req.user_addr());
    }

    #[test]
    fn test_referral_bonuses() -> crate::Result<()> {
        let req = EarnRequest {
            start_block: 1,
            earn_rate: "100".into(),
            ..request()
        };
        let chain = gen_rand_evm_addrs(2);

        let bonuses = req.referral_bonuses(&chain, &tier_rates())?;
        assert_eq!(bonuses.len(), 2);
        for (bonus, referrer) in bonuses.iter().zip(&chain) {
            assert_eq!(bonus.user_addr(), referrer);
            assert_eq!(bonus.source_user(), Some(req.get_source_user()));
            assert_eq!(bonus.source(), req.source());
            assert_eq!(bonus.sub_source(), req.sub_source());
            assert_eq!(bonus.start_block(), req.start_block());
            assert_eq!(bonus.start_time(), req.start_time());
        }
        assert_eq!(bonuses[0].earn_rate(), "10");
        assert_eq!(bonuses[1].earn_rate(), "5");
        Ok(())
    }

    #[test]
    fn test_referral_bonuses_half_and_quarter() -> crate::Result<()> {
        let req = EarnRequest::builder()
            .user_addr(format!("0x{}", "ab".repeat(20)))
            .source("s")
            .sub_source("ss")
            .start_time(1000)
            .earn_rate("100")
            .build();
        let chain = ["0xA", "0xB"];
        let tiers = TierRates::from_ratios(["1/2", "1/4"])?;

        let bonuses = req.referral_bonuses(&chain, &tiers)?;
        let rates = bonuses
            .iter()
            .map(|bonus| (bonus.user_addr(), bonus.earn_rate()))
            .collect::<Vec<_>>();
        assert_eq!(rates, [("0xA", "50"), ("0xB", "25")]);
        Ok(())
    }

    #[test]
    fn test_referral_derived_requests_are_not_propagated() -> crate::Result<()> {
        let req = EarnRequest {
            earn_rate: "100".into(),
            source_user: Some(gen_rand_evm_addr()),
            ..request()
        };
        assert!(req.is_referral_derived());
        let bonuses = req.referral_bonuses(&gen_rand_evm_addrs(2), &tier_rates())?;
        assert!(bonuses.is_empty());

        for bonus in request().referral_bonuses(&gen_rand_evm_addrs(2), &tier_rates())? {
            assert!(bonus.is_referral_derived());
            assert!(bonus
                .referral_bonuses(&gen_rand_evm_addrs(3), &tier_rates())?
                .is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_source_user_equal_to_user_is_root() -> crate::Result<()> {
        let user = gen_rand_evm_addr();
        let req = EarnRequest {
            user_addr: user.clone(),
            source_user: Some(user.to_uppercase()),
            ..request()
        };
        assert!(!req.is_referral_derived());
        assert_eq!(
            req.referral_bonuses(&gen_rand_evm_addrs(2), &tier_rates())?
                .len(),
            2
        );
        Ok(())
    }

    #[test]
    fn test_chain_longer_than_tiers() -> crate::Result<()> {
        let req = EarnRequest {
            earn_rate: "100".into(),
            ..request()
        };
        let tiers = TierRates::from_ratios(["1/2", "1/4"])?;
        let chain = gen_rand_evm_addrs(3);
        let bonuses = req.referral_bonuses(&chain, &tiers)?;
        assert_eq!(bonuses.len(), chain.len());
        let rates = bonuses.iter().map(EarnRequest::earn_rate).collect::<Vec<_>>();
        assert_eq!(rates, ["50", "25", "0"]);
        assert_eq!(bonuses[2].user_addr(), chain[2]);
        Ok(())
    }

    #[test]
    fn test_referral_bonuses_invalid_rate() {
        let req = EarnRequest {
            earn_rate: "1..0".into(),
            ..request()
        };
        assert_eq!(
            req.referral_bonuses(&gen_rand_evm_addrs(1), &tier_rates()),
            Err(Error::InvalidEarnRate)
        );
    }

    #[test]
    fn test_referral_bonuses_empty_chain() -> crate::Result<()> {
        let chain: [&str; 0] = [];
        assert!(request().referral_bonuses(&chain, &tier_rates())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_referral_bonuses_are_deterministic() -> crate::Result<()> {
        let req = EarnRequest {
            earn_rate: "7".into(),
            ..request()
        };
        let chain = gen_rand_evm_addrs(4);
        let first = req.referral_bonuses(&chain, &tier_rates())?;
        let second = req.referral_bonuses(&chain, &tier_rates())?;
        assert_eq!(first, second);
        assert_eq!(first[2].earn_rate(), format!("0.2{}", "3".repeat(77)));
        Ok(())
    }
}
