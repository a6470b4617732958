use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shipment::ShipmentId;
use crate::domain::tariff::{
    AgencyId, BackofficeId, CategoryId, OverrideId, RateTier, RouteLineId, TariffId, TransportMode,
};
use crate::domain::zone::{ZoneId, ZoneLookup};

/// Recoverable domain failures. Every not-found variant carries the lookup
/// key that missed so callers can report exactly what was unpriced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("zone not found for {0}")]
    ZoneNotFound(ZoneLookup),
    #[error("no tariff for tier {tier} in zone `{zone_id}`")]
    TariffNotFound { tier: RateTier, zone_id: ZoneId },
    #[error("no groupage tariff for category {category:?} on route `{route_line}` ({mode})")]
    GroupageTariffNotFound {
        category: Option<CategoryId>,
        route_line: RouteLineId,
        mode: TransportMode,
    },
    #[error("zone `{zone_id}` not found in agency `{agency_id}` tariff")]
    ZoneNotInAgencyTariff { agency_id: AgencyId, zone_id: ZoneId },
    #[error("shipment `{0}` not found")]
    ShipmentNotFound(ShipmentId),
    #[error("markup percent {0} outside [0, 100]")]
    MarkupOutOfRange(Decimal),
    #[error("negative amount {0}")]
    NegativeAmount(Decimal),
    #[error("invalid rate tier {0}: tiers are positive 0.5 increments")]
    InvalidTier(Decimal),
    #[error("agency `{agency_id}` already overrides tariff `{tariff_id}`")]
    DuplicateOverride { agency_id: AgencyId, tariff_id: TariffId },
    #[error("backoffice `{0}` already owns a special-route groupage tariff")]
    SpecialRouteAlreadyPriced(BackofficeId),
    #[error("country `{country}` already belongs to active zone `{zone_id}`")]
    CountryAlreadyZoned { country: String, zone_id: ZoneId },
}

/// Failures at the storage seam. `Conflict` marks an optimistic-version
/// miss on an override row; the cascade records it per row instead of
/// aborting.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("decode failure: {0}")]
    Decode(String),
    #[error("version conflict on override `{0}`")]
    Conflict(OverrideId),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Whether the failure maps to a caller-correctable response (a 404/422
    /// shape in the excluded API layer) rather than a backend outage.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Domain(_) => true,
            Self::Store(StoreError::Conflict(_)) => true,
            Self::Store(_) => false,
        }
    }
}
