use rust_decimal::Decimal;

use parcelrate_core::domain::tariff::{RateTier, RouteKind, TransportMode};
use parcelrate_core::errors::StoreError;

pub mod commission;
pub mod memory;
pub mod shipment;
pub mod tariff;
pub mod zone;

pub use commission::SqlCommissionStore;
pub use memory::{
    InMemoryCommissionStore, InMemoryShipmentStore, InMemoryTariffStore, InMemoryZoneStore,
};
pub use shipment::SqlShipmentStore;
pub use tariff::SqlTariffStore;
pub use zone::SqlZoneStore;

pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub(crate) fn parse_decimal(raw: &str, column: &str) -> Result<Decimal, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Decode(format!("column `{column}` holds non-decimal `{raw}`")))
}

pub(crate) fn parse_tier(raw: &str) -> Result<RateTier, StoreError> {
    let value = parse_decimal(raw, "tier")?;
    RateTier::new(value).map_err(|_| StoreError::Decode(format!("stored tier `{raw}` is invalid")))
}

pub(crate) fn parse_mode(raw: &str) -> Result<TransportMode, StoreError> {
    match raw {
        "road" => Ok(TransportMode::Road),
        "sea" => Ok(TransportMode::Sea),
        "air" => Ok(TransportMode::Air),
        other => Err(StoreError::Decode(format!("unknown transport mode `{other}`"))),
    }
}

pub(crate) fn mode_str(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Road => "road",
        TransportMode::Sea => "sea",
        TransportMode::Air => "air",
    }
}

pub(crate) fn parse_route_kind(raw: &str) -> Result<RouteKind, StoreError> {
    match raw {
        "standard" => Ok(RouteKind::Standard),
        "special" => Ok(RouteKind::Special),
        other => Err(StoreError::Decode(format!("unknown route kind `{other}`"))),
    }
}

pub(crate) fn route_kind_str(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Standard => "standard",
        RouteKind::Special => "special",
    }
}
