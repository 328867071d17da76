use crate::{
    address::validate_eth_address,
    earn::is_derived,
    rate::{checked_earn_rate, multiply_by_tier},
    EarnRequest, Error, TierRates, Validate,
};

/// A batch of related earn requests.
///
/// All members share `source`, `sub_source`, `start_block` and
/// `start_time`; only the user and the earn rate vary per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EarnRequestBatch {
    user_addrs: Vec<String>,
    source: String,
    sub_source: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    source_users: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    start_block: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    start_time: i64,
    earn_rates: Vec<String>,
}

impl EarnRequestBatch {
    /// Batch related requests.
    ///
    /// # Errors
    /// - [`Error::EmptyBatch`] if `requests` is empty.
    /// - [`Error::BatchShapeMismatch`] if the requests disagree on any
    ///   shared field.
    pub fn try_from_requests(requests: &[EarnRequest]) -> crate::Result<Self> {
        if requests.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let mut batch = Self::default();
        for request in requests {
            batch.push(request)?;
        }
        Ok(batch)
    }

    /// Append a request, which must agree with the batch on every shared
    /// field. The first request of an empty batch sets the shared fields.
    pub fn push(&mut self, request: &EarnRequest) -> crate::Result<()> {
        if self.is_empty() {
            self.source = request.source.clone();
            self.sub_source = request.sub_source.clone();
            self.start_block = request.start_block;
            self.start_time = request.start_time;
        } else if self.start_block != request.start_block {
            return Err(Error::BatchShapeMismatch(
                "startBlock must be the same for all requests",
            ));
        } else if self.start_time != request.start_time {
            return Err(Error::BatchShapeMismatch(
                "startTime must be the same for all requests",
            ));
        } else if self.source != request.source {
            return Err(Error::BatchShapeMismatch(
                "source must be the same for all requests",
            ));
        } else if self.sub_source != request.sub_source {
            return Err(Error::BatchShapeMismatch(
                "subSource must be the same for all requests",
            ));
        }
        if self.source_users.len() != self.user_addrs.len() {
            self.source_users = self.user_addrs.clone();
        }
        self.user_addrs.push(request.user_addr.clone());
        self.source_users.push(request.get_source_user().to_string());
        self.earn_rates.push(request.earn_rate.clone());
        Ok(())
    }

    /// Get user addresses.
    pub fn user_addrs(&self) -> &[String] {
        &self.user_addrs
    }

    /// Get the shared source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the shared sub-source.
    pub fn sub_source(&self) -> &str {
        &self.sub_source
    }

    /// Get source users, empty when not tracked.
    pub fn source_users(&self) -> &[String] {
        &self.source_users
    }

    /// Get the shared start block.
    pub fn start_block(&self) -> i64 {
        self.start_block
    }

    /// Get the shared start time.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Get earn rates.
    pub fn earn_rates(&self) -> &[String] {
        &self.earn_rates
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.user_addrs.len()
    }

    /// Returns whether the batch has no entries.
    pub fn is_empty(&self) -> bool {
        self.user_addrs.is_empty()
    }

    /// Returns whether accrual is indexed by block rather than by time.
    pub fn is_per_block(&self) -> bool {
        self.start_block != 0
    }

    /// Iterate over the entries as requests.
    pub fn iter(&self) -> impl Iterator<Item = EarnRequest> + '_ {
        self.user_addrs
            .iter()
            .zip(&self.earn_rates)
            .enumerate()
            .map(|(idx, (user_addr, earn_rate))| EarnRequest {
                user_addr: user_addr.clone(),
                source: self.source.clone(),
                sub_source: self.sub_source.clone(),
                source_user: explicit_source_user(&self.source_users, idx).map(str::to_string),
                start_block: self.start_block,
                start_time: self.start_time,
                earn_rate: earn_rate.clone(),
            })
    }

    /// Expand the batch with the referral bonuses of its entries.
    ///
    /// `chains[i]` is the referral chain of entry `i`. The original entries
    /// keep positions `0..n`; the bonuses of entry `i` are appended
    /// contiguously, in tier order, after those of entry `i - 1`. Entries
    /// that are themselves referral-derived are not propagated.
    pub fn with_referral_bonuses<C, A>(
        &self,
        chains: &[C],
        tier_rates: &TierRates,
    ) -> crate::Result<Self>
    where
        C: AsRef<[A]>,
        A: AsRef<str>,
    {
        self.check_shape()?;
        if chains.len() > self.size() {
            return Err(Error::BatchShapeMismatch("more referral chains than entries"));
        }

        let mut out = Self {
            source_users: (0..self.size())
                .map(|idx| self.source_user_at(idx).to_string())
                .collect(),
            ..self.clone()
        };

        for (idx, chain) in chains.iter().enumerate() {
            let chain = chain.as_ref();
            if chain.is_empty() {
                continue;
            }
            let user_addr = &self.user_addrs[idx];
            if is_derived(user_addr, explicit_source_user(&self.source_users, idx)) {
                tracing::debug!(%user_addr, "skipped referral bonuses of a referral-derived entry");
                continue;
            }
            let earn_rate = checked_earn_rate(&self.earn_rates[idx])?;
            let source_user = self.source_user_at(idx);
            for (_, referrer, tier_rate) in tier_rates.along(chain) {
                out.user_addrs.push(referrer.to_string());
                out.source_users.push(source_user.to_string());
                out.earn_rates.push(multiply_by_tier(&earn_rate, &tier_rate));
            }
        }

        tracing::trace!(
            original = self.size(),
            expanded = out.size(),
            "expanded batch with referral bonuses"
        );
        Ok(out)
    }

    fn source_user_at(&self, idx: usize) -> &str {
        explicit_source_user(&self.source_users, idx).unwrap_or(&self.user_addrs[idx])
    }

    fn check_shape(&self) -> crate::Result<()> {
        if self.user_addrs.len() != self.earn_rates.len() {
            return Err(Error::BatchShapeMismatch(
                "userAddrs and earnRates must be the same length",
            ));
        }
        if !self.source_users.is_empty() && self.source_users.len() != self.user_addrs.len() {
            return Err(Error::BatchShapeMismatch(
                "sourceUsers must be the same length as userAddrs or empty",
            ));
        }
        Ok(())
    }
}

impl Validate for EarnRequestBatch {
    fn validate(&self) -> crate::Result<()> {
        if self.start_time == 0 {
            return Err(Error::MissingStart);
        }
        if self.is_empty() {
            return Err(Error::EmptyBatch);
        }
        self.check_shape()?;
        for user_addr in &self.user_addrs {
            validate_eth_address(user_addr)?;
        }
        for earn_rate in &self.earn_rates {
            checked_earn_rate(earn_rate)?;
        }
        if self.start_block < 0 {
            return Err(Error::NonPositiveStartBlock);
        }
        if self.start_time < 1 {
            return Err(Error::NonPositiveStartTime);
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

/// A batch of unrelated earn requests.
///
/// Every field is tracked per entry. `start_blocks` is `None` when any
/// member is time-indexed, which makes the whole batch time-indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EarnRequestFullBatch {
    user_addrs: Vec<String>,
    sources: Vec<String>,
    sub_sources: Vec<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    source_users: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    start_blocks: Option<Vec<i64>>,
    start_times: Vec<i64>,
    earn_rates: Vec<String>,
}

impl EarnRequestFullBatch {
    /// Batch unrelated requests.
    ///
    /// # Errors
    /// Returns [`Error::EmptyBatch`] if `requests` is empty.
    pub fn from_requests(requests: &[EarnRequest]) -> crate::Result<Self> {
        if requests.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let mut batch = Self::default();
        for request in requests {
            batch.push(request);
        }
        Ok(batch)
    }

    /// Append a request.
    ///
    /// Appending a time-indexed request drops the start blocks of the whole
    /// batch. Source users are only tracked once a referral-derived request
    /// is appended.
    pub fn push(&mut self, request: &EarnRequest) {
        if self.is_empty() {
            self.start_blocks = request.is_per_block().then(Vec::new);
            self.source_users.clear();
        }
        if !request.is_per_block() {
            self.start_blocks = None;
        } else if let Some(blocks) = self.start_blocks.as_mut() {
            blocks.push(request.start_block);
        }
        if self.source_users.is_empty() && request.is_referral_derived() {
            self.source_users = self.user_addrs.clone();
        }
        if !self.source_users.is_empty() {
            self.source_users.push(request.get_source_user().to_string());
        }
        self.user_addrs.push(request.user_addr.clone());
        self.sources.push(request.source.clone());
        self.sub_sources.push(request.sub_source.clone());
        self.start_times.push(request.start_time);
        self.earn_rates.push(request.earn_rate.clone());
    }

    /// Get user addresses.
    pub fn user_addrs(&self) -> &[String] {
        &self.user_addrs
    }

    /// Get sources.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Get sub-sources.
    pub fn sub_sources(&self) -> &[String] {
        &self.sub_sources
    }

    /// Get source users, empty when not tracked.
    pub fn source_users(&self) -> &[String] {
        &self.source_users
    }

    /// Get start blocks, `None` for a time-indexed batch.
    pub fn start_blocks(&self) -> Option<&[i64]> {
        self.start_blocks.as_deref()
    }

    /// Get start times.
    pub fn start_times(&self) -> &[i64] {
        &self.start_times
    }

    /// Get earn rates.
    pub fn earn_rates(&self) -> &[String] {
        &self.earn_rates
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.user_addrs.len()
    }

    /// Returns whether the batch has no entries.
    pub fn is_empty(&self) -> bool {
        self.user_addrs.is_empty()
    }

    /// Returns whether accrual is indexed by block rather than by time.
    pub fn is_per_block(&self) -> bool {
        self.start_blocks
            .as_ref()
            .is_some_and(|blocks| !blocks.is_empty())
    }

    /// Iterate over the entries as requests.
    ///
    /// Iteration stops at the shortest column.
    pub fn iter(&self) -> impl Iterator<Item = EarnRequest> + '_ {
        self.user_addrs
            .iter()
            .zip(&self.sources)
            .zip(&self.sub_sources)
            .zip(&self.start_times)
            .zip(&self.earn_rates)
            .enumerate()
            .map(
                |(idx, ((((user_addr, source), sub_source), start_time), earn_rate))| EarnRequest {
                    user_addr: user_addr.clone(),
                    source: source.clone(),
                    sub_source: sub_source.clone(),
                    source_user: explicit_source_user(&self.source_users, idx)
                        .map(str::to_string),
                    start_block: self.start_block_at(idx),
                    start_time: *start_time,
                    earn_rate: earn_rate.clone(),
                },
            )
    }

    /// Expand the batch with the referral bonuses of its entries.
    ///
    /// Ordering follows [`EarnRequestBatch::with_referral_bonuses`]; each
    /// bonus copies the source, sub-source, start block and start time of
    /// its entry. The result tracks source users, which survive
    /// serialization, so expanding it again never propagates its bonuses.
    /// Once it holds bonuses it no longer passes [`Validate::validate`].
    pub fn with_referral_bonuses<C, A>(
        &self,
        chains: &[C],
        tier_rates: &TierRates,
    ) -> crate::Result<Self>
    where
        C: AsRef<[A]>,
        A: AsRef<str>,
    {
        self.check_shape()?;
        if chains.len() > self.size() {
            return Err(Error::BatchShapeMismatch("more referral chains than entries"));
        }

        let per_block = self.is_per_block();
        let mut out = Self {
            source_users: (0..self.size())
                .map(|idx| self.source_user_at(idx).to_string())
                .collect(),
            start_blocks: per_block.then(|| self.start_blocks.clone().unwrap_or_default()),
            ..self.clone()
        };

        for (idx, chain) in chains.iter().enumerate() {
            let chain = chain.as_ref();
            if chain.is_empty() {
                continue;
            }
            let user_addr = &self.user_addrs[idx];
            if is_derived(user_addr, explicit_source_user(&self.source_users, idx)) {
                tracing::debug!(%user_addr, "skipped referral bonuses of a referral-derived entry");
                continue;
            }
            let earn_rate = checked_earn_rate(&self.earn_rates[idx])?;
            let source_user = self.source_user_at(idx);
            for (_, referrer, tier_rate) in tier_rates.along(chain) {
                out.user_addrs.push(referrer.to_string());
                out.sources.push(self.sources[idx].clone());
                out.sub_sources.push(self.sub_sources[idx].clone());
                out.source_users.push(source_user.to_string());
                if let Some(blocks) = out.start_blocks.as_mut() {
                    blocks.push(self.start_block_at(idx));
                }
                out.start_times.push(self.start_times[idx]);
                out.earn_rates.push(multiply_by_tier(&earn_rate, &tier_rate));
            }
        }

        tracing::trace!(
            original = self.size(),
            expanded = out.size(),
            "expanded full batch with referral bonuses"
        );
        Ok(out)
    }

    fn start_block_at(&self, idx: usize) -> i64 {
        self.start_blocks
            .as_ref()
            .and_then(|blocks| blocks.get(idx))
            .copied()
            .unwrap_or_default()
    }

    fn source_user_at(&self, idx: usize) -> &str {
        explicit_source_user(&self.source_users, idx).unwrap_or(&self.user_addrs[idx])
    }

    fn check_shape(&self) -> crate::Result<()> {
        let len = self.user_addrs.len();
        if len != self.sources.len() {
            return Err(Error::BatchShapeMismatch(
                "userAddrs and sources must be the same length",
            ));
        }
        if len != self.sub_sources.len() {
            return Err(Error::BatchShapeMismatch(
                "userAddrs and subSources must be the same length",
            ));
        }
        if len != self.start_times.len() {
            return Err(Error::BatchShapeMismatch(
                "userAddrs and startTimes must be the same length",
            ));
        }
        if self.is_per_block() && self.start_blocks.as_ref().map(Vec::len) != Some(len) {
            return Err(Error::BatchShapeMismatch(
                "startBlocks must be the same length as userAddrs or empty",
            ));
        }
        if len != self.earn_rates.len() {
            return Err(Error::BatchShapeMismatch(
                "userAddrs and earnRates must be the same length",
            ));
        }
        if !self.source_users.is_empty() && self.source_users.len() != len {
            return Err(Error::BatchShapeMismatch(
                "sourceUsers must be the same length as userAddrs or empty",
            ));
        }
        Ok(())
    }
}

impl Validate for EarnRequestFullBatch {
    fn validate(&self) -> crate::Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyBatch);
        }
        self.check_shape()?;
        let derived = self
            .user_addrs
            .iter()
            .enumerate()
            .any(|(idx, user_addr)| {
                is_derived(user_addr, explicit_source_user(&self.source_users, idx))
            });
        if derived {
            return Err(Error::BatchShapeMismatch(DERIVED_ENTRIES));
        }
        for user_addr in &self.user_addrs {
            validate_eth_address(user_addr)?;
        }
        if self.sources.iter().any(String::is_empty) {
            return Err(Error::EmptySource);
        }
        if self.sub_sources.iter().any(String::is_empty) {
            return Err(Error::EmptySubSource);
        }
        if self.start_blocks.iter().flatten().any(|block| *block < 0) {
            return Err(Error::NonPositiveStartBlock);
        }
        if self.start_times.iter().any(|time| *time < 1) {
            return Err(Error::NonPositiveStartTime);
        }
        for earn_rate in &self.earn_rates {
            checked_earn_rate(earn_rate)?;
        }
        Ok(())
    }
}

const DERIVED_ENTRIES: &str = "sourceUsers must be empty or match userAddrs";

fn explicit_source_user(source_users: &[String], idx: usize) -> Option<&str> {
    source_users
        .get(idx)
        .map(String::as_str)
        .filter(|user| !user.is_empty())
}
