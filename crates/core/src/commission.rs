use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::cache::{MemoryTtlCache, TtlCache};
use crate::domain::commission::{CommissionKind, CommissionSetting, FeeSplit};
use crate::domain::tariff::round_half_up;
use crate::errors::StoreError;

#[async_trait]
pub trait CommissionStore: Send + Sync {
    /// Active settings only; disabled rows are treated as absent.
    async fn find_active(&self, key: &str) -> Result<Option<CommissionSetting>, StoreError>;
}

fn cache_key(key: &str) -> String {
    format!("commission:{key}")
}

/// Cached lookup of named commission rates for auxiliary fees. Absent and
/// disabled settings fall back to the caller-supplied percentage; a fixed
/// setting has no fallback shape, so absence always means percentage.
/// The settings-CRUD collaborator calls `invalidate` after every write;
/// the calculator never invalidates itself. Reads never write the store.
pub struct CommissionCalculator<S> {
    store: S,
    cache: Arc<dyn TtlCache<Option<CommissionSetting>>>,
    ttl: Duration,
}

impl<S: CommissionStore> CommissionCalculator<S> {
    pub fn new(store: S, cache: Arc<dyn TtlCache<Option<CommissionSetting>>>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub fn with_memory_cache(store: S, ttl: Duration) -> Self {
        Self::new(store, Arc::new(MemoryTtlCache::default()), ttl)
    }

    pub async fn calculate(
        &self,
        amount: Decimal,
        key: &str,
        default_rate_percent: Decimal,
    ) -> Result<Decimal, StoreError> {
        match self.setting(key).await? {
            Some(setting) if setting.kind == CommissionKind::Fixed => Ok(setting.value),
            Some(setting) => Ok(round_half_up(amount * setting.value / Decimal::ONE_HUNDRED)),
            None => Ok(round_half_up(amount * default_rate_percent / Decimal::ONE_HUNDRED)),
        }
    }

    /// Divide an auxiliary fee between its two beneficiaries: the commission
    /// share and the remainder of the fee.
    pub async fn split(
        &self,
        amount: Decimal,
        key: &str,
        default_rate_percent: Decimal,
    ) -> Result<FeeSplit, StoreError> {
        let commission = self.calculate(amount, key, default_rate_percent).await?;
        Ok(FeeSplit { commission, remainder: round_half_up(amount - commission) })
    }

    pub fn invalidate(&self, key: &str) {
        debug!(setting = key, "invalidating commission cache entry");
        self.cache.invalidate(&cache_key(key));
    }

    async fn setting(&self, key: &str) -> Result<Option<CommissionSetting>, StoreError> {
        let cache_key = cache_key(key);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }
        // Negative lookups are cached too; callers hammer the same keys.
        let found = self.store.find_active(key).await?;
        self.cache.put(&cache_key, found.clone(), self.ttl);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::{CommissionCalculator, CommissionStore};
    use crate::domain::commission::{CommissionKind, CommissionSetting};
    use crate::errors::StoreError;

    #[derive(Default)]
    struct FakeCommissionStore {
        settings: HashMap<String, CommissionSetting>,
        reads: AtomicUsize,
    }

    impl FakeCommissionStore {
        fn with(settings: Vec<CommissionSetting>) -> Self {
            Self {
                settings: settings.into_iter().map(|s| (s.key.clone(), s)).collect(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommissionStore for &FakeCommissionStore {
        async fn find_active(&self, key: &str) -> Result<Option<CommissionSetting>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.settings.get(key).filter(|s| s.active).cloned())
        }
    }

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn percentage(key: &str, value: &str) -> CommissionSetting {
        CommissionSetting {
            key: key.to_string(),
            value: dec(value),
            kind: CommissionKind::Percentage,
            active: true,
        }
    }

    #[tokio::test]
    async fn absent_setting_falls_back_to_default_percentage() {
        let store = FakeCommissionStore::default();
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        let fee = calc.calculate(dec("1000"), "x", dec("15.0")).await.unwrap();
        assert_eq!(fee, dec("150.00"));
    }

    #[tokio::test]
    async fn fixed_setting_ignores_the_amount() {
        let store = FakeCommissionStore::with(vec![CommissionSetting {
            key: "x".to_string(),
            value: dec("500"),
            kind: CommissionKind::Fixed,
            active: true,
        }]);
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        let fee = calc.calculate(dec("1000"), "x", dec("15.0")).await.unwrap();
        assert_eq!(fee, dec("500"));
    }

    #[tokio::test]
    async fn percentage_setting_overrides_the_default() {
        let store = FakeCommissionStore::with(vec![percentage("home_delivery", "7.5")]);
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        let fee = calc.calculate(dec("200"), "home_delivery", dec("15.0")).await.unwrap();
        assert_eq!(fee, dec("15.00"));
    }

    #[tokio::test]
    async fn disabled_setting_behaves_as_absent() {
        let mut setting = percentage("late_pickup", "40");
        setting.active = false;
        let store = FakeCommissionStore::with(vec![setting]);
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        let fee = calc.calculate(dec("100"), "late_pickup", dec("10")).await.unwrap();
        assert_eq!(fee, dec("10.00"));
    }

    #[tokio::test]
    async fn lookups_are_cached_until_invalidated() {
        let store = FakeCommissionStore::with(vec![percentage("pickup", "5")]);
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        calc.calculate(dec("100"), "pickup", dec("10")).await.unwrap();
        calc.calculate(dec("100"), "pickup", dec("10")).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        calc.invalidate("pickup");
        calc.calculate(dec("100"), "pickup", dec("10")).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn negative_lookups_are_cached() {
        let store = FakeCommissionStore::default();
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        calc.calculate(dec("100"), "missing", dec("10")).await.unwrap();
        calc.calculate(dec("100"), "missing", dec("10")).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn split_hands_the_remainder_to_the_second_beneficiary() {
        let store = FakeCommissionStore::with(vec![percentage("pickup", "30")]);
        let calc = CommissionCalculator::with_memory_cache(&store, Duration::from_secs(3600));

        let split = calc.split(dec("90"), "pickup", dec("10")).await.unwrap();
        assert_eq!(split.commission, dec("27.00"));
        assert_eq!(split.remainder, dec("63.00"));
    }
}
