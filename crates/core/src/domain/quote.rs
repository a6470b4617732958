use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shipment::ShipmentId;
use crate::domain::tariff::{CategoryId, RateBlock, RateTier};
use crate::domain::zone::ZoneId;

/// Which table the priced block came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    AgencyOverride,
    BaseRate,
}

/// Priced output for a single package or shipment aggregate in simple mode.
/// Transient; produced per request, never persisted by the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedPackage {
    pub tier: RateTier,
    pub zone_id: ZoneId,
    pub rate: RateBlock,
    pub source: RateSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedGroup {
    pub category: Option<CategoryId>,
    pub weight: Decimal,
    pub rate: RateBlock,
    pub source: RateSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedShipment {
    pub shipment_id: ShipmentId,
    pub groups: Vec<PricedGroup>,
    pub total_amount: Decimal,
}
