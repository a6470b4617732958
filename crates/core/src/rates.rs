use async_trait::async_trait;

use crate::domain::tariff::{
    AgencyId, AgencyOverride, BackofficeId, BaseRate, CategoryId, GroupageRate, OverrideId,
    RateTier, RouteLineId, TariffId, TransportMode,
};
use crate::domain::zone::ZoneId;
use crate::errors::{ServiceError, StoreError};

/// Read/write seam over the tariff tables. Every returned pricing block
/// carries all four money fields verbatim; `markup_amount` and
/// `total_amount` are stored at write time and never recomputed on read.
#[async_trait]
pub trait TariffStore: Send + Sync {
    /// Simple-mode lookup by (tier, destination zone), optionally scoped to
    /// one backoffice.
    async fn find_simple_rate(
        &self,
        backoffice: Option<&BackofficeId>,
        tier: RateTier,
        zone_id: &ZoneId,
    ) -> Result<Option<BaseRate>, StoreError>;

    /// Groupage-mode lookup by (category, route line, transport mode).
    async fn find_groupage_rate(
        &self,
        backoffice: &BackofficeId,
        category: Option<&CategoryId>,
        route_line: &RouteLineId,
        mode: TransportMode,
    ) -> Result<Option<GroupageRate>, StoreError>;

    /// Resolve the agency's override row whose linked base entry carries the
    /// given (tier, destination zone) pair, together with that base entry.
    /// An agency may override several same-tier base entries across zones,
    /// so the zone is part of the key.
    async fn find_override_for_tier(
        &self,
        agency: &AgencyId,
        tier: RateTier,
        zone_id: &ZoneId,
    ) -> Result<Option<(BaseRate, AgencyOverride)>, StoreError>;

    /// Override for one specific tariff entry, simple or groupage.
    async fn find_override_for_tariff(
        &self,
        agency: &AgencyId,
        tariff_id: &TariffId,
    ) -> Result<Option<AgencyOverride>, StoreError>;

    /// All override rows referencing a tariff entry; the cascade's dependent
    /// set.
    async fn list_overrides_for_tariff(
        &self,
        tariff_id: &TariffId,
    ) -> Result<Vec<AgencyOverride>, StoreError>;

    /// Fresh read of a single override row, used by the cascade's per-row
    /// read-modify-write.
    async fn fetch_override(&self, id: &OverrideId) -> Result<Option<AgencyOverride>, StoreError>;

    /// Persist an override row. Implementations check the row's `version`
    /// and answer `StoreError::Conflict` when it moved, so concurrent agency
    /// edits and cascades serialize instead of losing updates.
    async fn save_override(&self, row: AgencyOverride) -> Result<(), StoreError>;
}

/// Write seam used by the tariff-CRUD collaborators. Separated from the
/// read path because only they may create rows, and because the insert
/// invariants are domain errors, not storage errors.
#[async_trait]
pub trait TariffAdminStore: Send + Sync {
    async fn insert_base_rate(&self, rate: BaseRate) -> Result<(), ServiceError>;

    /// Enforces uniqueness per (backoffice, route line, mode) and the hard
    /// one-special-route-per-backoffice constraint.
    async fn insert_groupage_rate(&self, rate: GroupageRate) -> Result<(), ServiceError>;

    /// Enforces one override per (agency, tariff) pair.
    async fn insert_override(&self, row: AgencyOverride) -> Result<(), ServiceError>;

    /// Deleting a base entry cascades to its overrides.
    async fn delete_tariff(&self, tariff_id: &TariffId) -> Result<(), ServiceError>;
}
