use rust_decimal::Decimal;

use parcelrate_core::domain::commission::{CommissionKind, CommissionSetting};
use parcelrate_core::domain::tariff::{
    AgencyId, AgencyOverride, BackofficeId, BaseRate, CategoryId, GroupageRate, OverrideBlock,
    OverrideId, RateBlock, RateTier, RouteKind, RouteLineId, TariffId, TransportMode,
};
use parcelrate_core::domain::zone::{Zone, ZoneId};
use parcelrate_core::errors::ServiceError;
use parcelrate_core::rates::TariffAdminStore;

use crate::repositories::{SqlCommissionStore, SqlTariffStore, SqlZoneStore};
use crate::DbPool;

/// Deterministic dataset backing the integration tests and local demos.
pub const BACKOFFICE: &str = "BO-1";
pub const AGENCY: &str = "AG-LYON";
pub const ZONE_EU: &str = "Z-EU";
pub const ZONE_MAGHREB: &str = "Z-MAGHREB";
pub const SHIPMENT_GROUPAGE: &str = "SH-GRP-1";
pub const OVERRIDE_EU: &str = "OV-LYON-15";

fn dec(value: &str) -> Decimal {
    value.parse().expect("fixture decimal")
}

fn tier(value: &str) -> RateTier {
    RateTier::new(dec(value)).expect("fixture tier")
}

pub fn base_rate_id(tier_value: &str, zone: &str) -> TariffId {
    TariffId(format!("BR-{tier_value}-{zone}"))
}

pub async fn seed(pool: &DbPool) -> Result<(), ServiceError> {
    let zones = SqlZoneStore::new(pool.clone());
    zones
        .insert_zone(Zone {
            id: ZoneId(ZONE_EU.to_string()),
            name: "Western Europe".to_string(),
            countries: vec!["France".to_string(), "Belgium".to_string(), "Italy".to_string()],
            active: true,
        })
        .await?;
    zones
        .insert_zone(Zone {
            id: ZoneId(ZONE_MAGHREB.to_string()),
            name: "Maghreb".to_string(),
            countries: vec!["Morocco".to_string(), "Tunisia".to_string()],
            active: true,
        })
        .await?;

    let tariffs = SqlTariffStore::new(pool.clone());
    for (t, zone, base, markup) in [
        ("1", ZONE_EU, "800", "10"),
        ("1.5", ZONE_EU, "1000", "20"),
        ("2", ZONE_EU, "1250", "20"),
        ("1.5", ZONE_MAGHREB, "1400", "15"),
    ] {
        tariffs
            .insert_base_rate(BaseRate {
                id: base_rate_id(t, zone),
                backoffice_id: BackofficeId(BACKOFFICE.to_string()),
                tier: tier(t),
                zone_id: ZoneId(zone.to_string()),
                block: RateBlock::new(dec(base), dec(markup)).expect("fixture block"),
                active: true,
            })
            .await?;
    }

    tariffs
        .insert_groupage_rate(GroupageRate {
            id: TariffId("GR-FURNITURE".to_string()),
            backoffice_id: BackofficeId(BACKOFFICE.to_string()),
            category: Some(CategoryId("furniture".to_string())),
            route_line: RouteLineId("R-MARSEILLE-TUNIS".to_string()),
            route_kind: RouteKind::Standard,
            mode: TransportMode::Road,
            block: RateBlock::new(dec("2000"), dec("12.5")).expect("fixture block"),
            active: true,
        })
        .await?;
    tariffs
        .insert_groupage_rate(GroupageRate {
            id: TariffId("GR-MISC".to_string()),
            backoffice_id: BackofficeId(BACKOFFICE.to_string()),
            category: None,
            route_line: RouteLineId("R-MARSEILLE-TUNIS".to_string()),
            route_kind: RouteKind::Standard,
            mode: TransportMode::Road,
            block: RateBlock::new(dec("600"), dec("10")).expect("fixture block"),
            active: true,
        })
        .await?;

    // The Lyon agency negotiated +15 over the backoffice markup on the
    // tier-1.5 EU rate.
    tariffs
        .insert_override(AgencyOverride {
            id: OverrideId(OVERRIDE_EU.to_string()),
            agency_id: AgencyId(AGENCY.to_string()),
            tariff_id: base_rate_id("1.5", ZONE_EU),
            version: 1,
            blocks: vec![OverrideBlock {
                zone_id: Some(ZoneId(ZONE_EU.to_string())),
                rate: RateBlock::new(dec("1000"), dec("35")).expect("fixture block"),
            }],
        })
        .await?;

    let commissions = SqlCommissionStore::new(pool.clone());
    commissions
        .upsert_setting(CommissionSetting {
            key: "pickup_at_home".to_string(),
            value: dec("12"),
            kind: CommissionKind::Percentage,
            active: true,
        })
        .await?;
    commissions
        .upsert_setting(CommissionSetting {
            key: "late_pickup_penalty".to_string(),
            value: dec("25"),
            kind: CommissionKind::Fixed,
            active: true,
        })
        .await?;

    seed_shipments(pool).await?;
    Ok(())
}

/// Shipment rows are owned by the shipment collaborator; tests seed them
/// with raw SQL since the core exposes no write path for them.
async fn seed_shipments(pool: &DbPool) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO shipments (id, agency_id, backoffice_id, route_line, mode, origin_zone, dest_zone) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(SHIPMENT_GROUPAGE)
    .bind(AGENCY)
    .bind(BACKOFFICE)
    .bind("R-MARSEILLE-TUNIS")
    .bind("road")
    .bind(ZONE_EU)
    .bind(ZONE_MAGHREB)
    .execute(pool)
    .await
    .map_err(|e| parcelrate_core::errors::StoreError::Backend(e.to_string()))?;

    for (id, weight, category) in
        [("PK-1", "120", Some("furniture")), ("PK-2", "80", Some("furniture")), ("PK-3", "30", None)]
    {
        sqlx::query(
            "INSERT INTO packages (id, shipment_id, weight, length, width, height, category) \
             VALUES (?, ?, ?, NULL, NULL, NULL, ?)",
        )
        .bind(id)
        .bind(SHIPMENT_GROUPAGE)
        .bind(weight)
        .bind(category)
        .execute(pool)
        .await
        .map_err(|e| parcelrate_core::errors::StoreError::Backend(e.to_string()))?;
    }
    Ok(())
}
