use rust_decimal::Decimal;

use parcelrate_core::commission::CommissionCalculator;
use parcelrate_core::config::PricingConfig;
use parcelrate_core::domain::quote::RateSource;
use parcelrate_core::domain::shipment::ShipmentId;
use parcelrate_core::domain::tariff::{
    AgencyId, AgencyOverride, BackofficeId, CategoryId, OverrideBlock, OverrideId, RateBlock,
    RateTier,
};
use parcelrate_core::domain::zone::ZoneId;
use parcelrate_core::engine::{QuoteEngine, SimpleQuoteRequest};
use parcelrate_core::errors::{DomainError, ServiceError};
use parcelrate_core::rates::{TariffAdminStore, TariffStore};
use parcelrate_core::zones::ZoneDirectory;

use parcelrate_db::{
    connect_with_settings, fixtures, migrations, DbPool, SqlCommissionStore, SqlShipmentStore,
    SqlTariffStore, SqlZoneStore,
};

fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.unwrap();
    migrations::run_pending(&pool).await.unwrap();
    fixtures::seed(&pool).await.unwrap();
    pool
}

fn engine(pool: &DbPool) -> QuoteEngine<SqlZoneStore, SqlTariffStore, SqlShipmentStore> {
    let config = PricingConfig::default();
    let zones =
        ZoneDirectory::with_memory_cache(SqlZoneStore::new(pool.clone()), config.zone_cache_ttl());
    QuoteEngine::new(
        zones,
        SqlTariffStore::new(pool.clone()),
        SqlShipmentStore::new(pool.clone()),
        &config,
    )
}

fn simple_request(agency: Option<&str>, dest: &str) -> SimpleQuoteRequest {
    SimpleQuoteRequest {
        weight: dec("1.3"),
        dims: None,
        agency_id: agency.map(|a| AgencyId(a.to_string())),
        backoffice_id: Some(BackofficeId(fixtures::BACKOFFICE.to_string())),
        origin_zone: ZoneId(fixtures::ZONE_MAGHREB.to_string()),
        dest_zone: ZoneId(dest.to_string()),
    }
}

#[tokio::test]
async fn simple_quote_prefers_agency_override() {
    let pool = seeded_pool().await;
    let engine = engine(&pool);

    let priced = engine
        .price_simple(simple_request(Some(fixtures::AGENCY), fixtures::ZONE_EU))
        .await
        .unwrap();

    assert_eq!(priced.tier, RateTier::new(dec("1.5")).unwrap());
    assert_eq!(priced.source, RateSource::AgencyOverride);
    assert_eq!(priced.rate.base_amount, dec("1000"));
    assert_eq!(priced.rate.markup_percent, dec("35"));
    assert_eq!(priced.rate.total_amount, dec("1350.00"));
}

#[tokio::test]
async fn simple_quote_falls_back_to_base_rate() {
    let pool = seeded_pool().await;
    let engine = engine(&pool);

    let priced = engine.price_simple(simple_request(None, fixtures::ZONE_EU)).await.unwrap();

    assert_eq!(priced.source, RateSource::BaseRate);
    assert_eq!(priced.rate.base_amount, dec("1000"));
    assert_eq!(priced.rate.markup_percent, dec("20"));
    assert_eq!(priced.rate.total_amount, dec("1200.00"));
}

#[tokio::test]
async fn same_tier_overrides_on_two_zones_price_independently() {
    let pool = seeded_pool().await;

    // Lyon already overrides the tier-1.5 EU rate; give it a second
    // override on the same-tier Maghreb rate. Each destination must
    // resolve its own override row, not whichever the store lists first.
    let tariffs = SqlTariffStore::new(pool.clone());
    tariffs
        .insert_override(AgencyOverride {
            id: OverrideId("OV-LYON-MAGHREB".to_string()),
            agency_id: AgencyId(fixtures::AGENCY.to_string()),
            tariff_id: fixtures::base_rate_id("1.5", fixtures::ZONE_MAGHREB),
            version: 1,
            blocks: vec![OverrideBlock {
                zone_id: Some(ZoneId(fixtures::ZONE_MAGHREB.to_string())),
                rate: RateBlock::new(dec("1400"), dec("25")).unwrap(),
            }],
        })
        .await
        .unwrap();
    let engine = engine(&pool);

    let priced = engine
        .price_simple(simple_request(Some(fixtures::AGENCY), fixtures::ZONE_MAGHREB))
        .await
        .unwrap();
    assert_eq!(priced.source, RateSource::AgencyOverride);
    assert_eq!(priced.rate.markup_percent, dec("25"));
    assert_eq!(priced.rate.total_amount, dec("1750.00"));

    let priced = engine
        .price_simple(simple_request(Some(fixtures::AGENCY), fixtures::ZONE_EU))
        .await
        .unwrap();
    assert_eq!(priced.rate.markup_percent, dec("35"));
    assert_eq!(priced.rate.total_amount, dec("1350.00"));
}

#[tokio::test]
async fn unrelated_override_falls_back_to_the_base_rate() {
    let pool = seeded_pool().await;
    let engine = engine(&pool);

    // Lyon only overrides the tier-1.5 EU rate; a Maghreb destination
    // prices at the Maghreb base entry.
    let priced = engine
        .price_simple(simple_request(Some(fixtures::AGENCY), fixtures::ZONE_MAGHREB))
        .await
        .unwrap();

    assert_eq!(priced.source, RateSource::BaseRate);
    assert_eq!(priced.rate.markup_percent, dec("15"));
    assert_eq!(priced.rate.total_amount, dec("1610.00"));
}

#[tokio::test]
async fn override_without_destination_zone_block_is_an_error() {
    let pool = seeded_pool().await;

    // Corrupt the Lyon override so its block list no longer covers the
    // zone its base entry is keyed to. Pricing must surface that, not
    // fall back to the base rate.
    let tariffs = SqlTariffStore::new(pool.clone());
    let mut row = tariffs
        .fetch_override(&OverrideId(fixtures::OVERRIDE_EU.to_string()))
        .await
        .unwrap()
        .unwrap();
    row.blocks[0].zone_id = Some(ZoneId(fixtures::ZONE_MAGHREB.to_string()));
    tariffs.save_override(row).await.unwrap();
    let engine = engine(&pool);

    let err = engine
        .price_simple(simple_request(Some(fixtures::AGENCY), fixtures::ZONE_EU))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::ZoneNotInAgencyTariff { ref zone_id, .. })
            if zone_id.0 == fixtures::ZONE_EU
    ));
}

#[tokio::test]
async fn groupage_quote_prices_each_category_group() {
    let pool = seeded_pool().await;
    let engine = engine(&pool);

    let priced = engine
        .price_groupage(&ShipmentId(fixtures::SHIPMENT_GROUPAGE.to_string()))
        .await
        .unwrap();

    assert_eq!(priced.groups.len(), 2);

    // Groups come out keyed by category, uncategorised first.
    let misc = &priced.groups[0];
    assert_eq!(misc.category, None);
    assert_eq!(misc.weight, dec("30"));
    assert_eq!(misc.rate.total_amount, dec("660.00"));
    assert_eq!(misc.source, RateSource::BaseRate);

    let furniture = &priced.groups[1];
    assert_eq!(furniture.category, Some(CategoryId("furniture".to_string())));
    assert_eq!(furniture.weight, dec("200"));
    assert_eq!(furniture.rate.base_amount, dec("2000"));
    assert_eq!(furniture.rate.markup_percent, dec("12.5"));
    assert_eq!(furniture.rate.total_amount, dec("2250.00"));

    assert_eq!(priced.total_amount, dec("2910.00"));
}

#[tokio::test]
async fn commission_settings_drive_fee_splits() {
    let pool = seeded_pool().await;
    let config = PricingConfig::default();
    let calculator = CommissionCalculator::with_memory_cache(
        SqlCommissionStore::new(pool),
        config.commission_cache_ttl(),
    );

    // Percentage setting from the settings table.
    let fee = calculator.calculate(dec("1350"), "pickup_at_home", dec("10")).await.unwrap();
    assert_eq!(fee, dec("162.00"));

    // Fixed settings ignore the amount.
    let fee = calculator.calculate(dec("1350"), "late_pickup_penalty", dec("10")).await.unwrap();
    assert_eq!(fee, dec("25"));

    // Unknown keys fall back to the caller's default rate.
    let fee = calculator.calculate(dec("200"), "no_such_setting", dec("10")).await.unwrap();
    assert_eq!(fee, dec("20.00"));

    let split = calculator.split(dec("1350"), "pickup_at_home", dec("10")).await.unwrap();
    assert_eq!(split.commission, dec("162.00"));
    assert_eq!(split.remainder, dec("1188.00"));
}
