pub mod cache;
pub mod cascade;
pub mod commission;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod rates;
pub mod tier;
pub mod zones;

pub use cache::{MemoryTtlCache, TtlCache};
pub use cascade::{CascadeFailure, CascadeReport, CascadeRepricer};
pub use commission::{CommissionCalculator, CommissionStore};
pub use config::{ConfigError, GroupageMarkupMode, PricingConfig};
pub use domain::commission::{CommissionKind, CommissionSetting, FeeSplit};
pub use domain::quote::{PricedGroup, PricedPackage, PricedShipment, RateSource};
pub use domain::shipment::{Dimensions, Package, Shipment, ShipmentId};
pub use domain::tariff::{
    AgencyId, AgencyOverride, BackofficeId, BaseRate, CategoryId, GroupageRate, OverrideBlock,
    OverrideId, RateBlock, RateTier, RouteKind, RouteLineId, TariffId, TransportMode,
};
pub use domain::zone::{Zone, ZoneId, ZoneLookup};
pub use engine::{QuoteEngine, ShipmentStore, SimpleQuoteRequest};
pub use errors::{DomainError, ServiceError, StoreError};
pub use rates::{TariffAdminStore, TariffStore};
pub use zones::{ZoneDirectory, ZoneStore};
