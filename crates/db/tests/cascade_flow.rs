use rust_decimal::Decimal;

use parcelrate_core::cascade::CascadeRepricer;
use parcelrate_core::domain::tariff::{
    BackofficeId, BaseRate, OverrideId, RateBlock, RateTier,
};
use parcelrate_core::domain::zone::ZoneId;
use parcelrate_core::errors::StoreError;
use parcelrate_core::rates::TariffStore;

use parcelrate_db::{connect_with_settings, fixtures, migrations, DbPool, SqlTariffStore};

fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

async fn seeded_pool() -> DbPool {
    // One connection: every in-memory SQLite connection is its own database.
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.unwrap();
    migrations::run_pending(&pool).await.unwrap();
    fixtures::seed(&pool).await.unwrap();
    pool
}

fn eu_base_rate(base: &str, markup: &str) -> BaseRate {
    BaseRate {
        id: fixtures::base_rate_id("1.5", fixtures::ZONE_EU),
        backoffice_id: BackofficeId(fixtures::BACKOFFICE.to_string()),
        tier: RateTier::new(dec("1.5")).unwrap(),
        zone_id: ZoneId(fixtures::ZONE_EU.to_string()),
        block: RateBlock::new(dec(base), dec(markup)).unwrap(),
        active: true,
    }
}

#[tokio::test]
async fn base_rate_edit_shifts_dependent_override() {
    let pool = seeded_pool().await;
    let store = SqlTariffStore::new(pool.clone());
    let repricer = CascadeRepricer::new(store);

    // Backoffice moves 1000/20 to 1200/25; the Lyon override sat at 1000/35.
    let old = eu_base_rate("1000", "20");
    let new = eu_base_rate("1200", "25");
    let report = repricer.on_base_rate_updated(&old, &new).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.updated, vec![OverrideId(fixtures::OVERRIDE_EU.to_string())]);
    assert_eq!(report.untouched, 0);

    let store = SqlTariffStore::new(pool);
    let row = store
        .fetch_override(&OverrideId(fixtures::OVERRIDE_EU.to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.version, 2);
    let block = &row.blocks[0].rate;
    assert_eq!(block.base_amount, dec("1200"));
    assert_eq!(block.markup_percent, dec("40"));
    assert_eq!(block.markup_amount, dec("480.00"));
    assert_eq!(block.total_amount, dec("1680.00"));
}

#[tokio::test]
async fn unchanged_base_rate_cascades_nothing() {
    let pool = seeded_pool().await;
    let store = SqlTariffStore::new(pool.clone());
    let repricer = CascadeRepricer::new(store);

    let same = eu_base_rate("1000", "20");
    let report = repricer.on_base_rate_updated(&same, &same).await.unwrap();

    assert!(report.is_clean());
    assert!(report.updated.is_empty());
    assert_eq!(report.untouched, 0);

    let store = SqlTariffStore::new(pool);
    let row = store
        .fetch_override(&OverrideId(fixtures::OVERRIDE_EU.to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.version, 1);
    assert_eq!(row.blocks[0].rate.markup_percent, dec("35"));
}

#[tokio::test]
async fn stale_override_save_is_rejected() {
    let pool = seeded_pool().await;
    let store = SqlTariffStore::new(pool);
    let id = OverrideId(fixtures::OVERRIDE_EU.to_string());

    let stale = store.fetch_override(&id).await.unwrap().unwrap();

    let mut first = stale.clone();
    first.blocks[0].rate = RateBlock::new(dec("1000"), dec("40")).unwrap();
    store.save_override(first).await.unwrap();

    let err = store.save_override(stale).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref conflicted) if *conflicted == id));

    // The first write survived untouched.
    let row = store.fetch_override(&id).await.unwrap().unwrap();
    assert_eq!(row.version, 2);
    assert_eq!(row.blocks[0].rate.markup_percent, dec("40"));
}
