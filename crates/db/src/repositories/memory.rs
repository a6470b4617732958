use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use parcelrate_core::commission::CommissionStore;
use parcelrate_core::domain::commission::CommissionSetting;
use parcelrate_core::domain::shipment::{Shipment, ShipmentId};
use parcelrate_core::domain::tariff::{
    AgencyId, AgencyOverride, BackofficeId, BaseRate, CategoryId, GroupageRate, OverrideId,
    RateTier, RouteKind, RouteLineId, TariffId, TransportMode,
};
use parcelrate_core::domain::zone::{Zone, ZoneId};
use parcelrate_core::engine::ShipmentStore;
use parcelrate_core::errors::{DomainError, ServiceError, StoreError};
use parcelrate_core::rates::{TariffAdminStore, TariffStore};
use parcelrate_core::zones::ZoneStore;

/// In-memory stores for tests and embedded use. Cheap clone handles share
/// one backing map, so a repricer and a test assertion can look at the
/// same state.
#[derive(Clone, Default)]
pub struct InMemoryZoneStore {
    zones: Arc<RwLock<HashMap<String, Zone>>>,
}

impl InMemoryZoneStore {
    pub async fn insert_zone(&self, zone: Zone) -> Result<(), ServiceError> {
        let mut zones = self.zones.write().await;
        if zone.active {
            for existing in zones.values() {
                if existing.id == zone.id || !existing.active {
                    continue;
                }
                for country in &zone.countries {
                    if existing.covers_country(country) {
                        return Err(DomainError::CountryAlreadyZoned {
                            country: country.clone(),
                            zone_id: existing.id.clone(),
                        }
                        .into());
                    }
                }
            }
        }
        zones.insert(zone.id.0.clone(), zone);
        Ok(())
    }
}

#[async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn find_by_id(&self, id: &ZoneId) -> Result<Option<Zone>, StoreError> {
        Ok(self.zones.read().await.get(&id.0).cloned())
    }

    async fn find_by_country(&self, country: &str) -> Result<Option<Zone>, StoreError> {
        Ok(self
            .zones
            .read()
            .await
            .values()
            .find(|z| z.active && z.covers_country(country))
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<Zone>, StoreError> {
        let mut zones: Vec<Zone> =
            self.zones.read().await.values().filter(|z| z.active).cloned().collect();
        zones.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(zones)
    }
}

#[derive(Default)]
struct TariffState {
    simple: HashMap<String, BaseRate>,
    groupage: HashMap<String, GroupageRate>,
    overrides: HashMap<String, AgencyOverride>,
}

#[derive(Clone, Default)]
pub struct InMemoryTariffStore {
    state: Arc<RwLock<TariffState>>,
    override_writes: Arc<AtomicUsize>,
}

impl InMemoryTariffStore {
    /// Number of override rows persisted so far; lets tests assert that a
    /// no-op cascade wrote nothing.
    pub fn override_writes(&self) -> usize {
        self.override_writes.load(Ordering::SeqCst)
    }

    pub async fn get_override(&self, id: &OverrideId) -> Option<AgencyOverride> {
        self.state.read().await.overrides.get(&id.0).cloned()
    }
}

#[async_trait]
impl TariffStore for InMemoryTariffStore {
    async fn find_simple_rate(
        &self,
        backoffice: Option<&BackofficeId>,
        tier: RateTier,
        zone_id: &ZoneId,
    ) -> Result<Option<BaseRate>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .simple
            .values()
            .find(|r| {
                r.active
                    && r.tier == tier
                    && &r.zone_id == zone_id
                    && backoffice.map_or(true, |b| &r.backoffice_id == b)
            })
            .cloned())
    }

    async fn find_groupage_rate(
        &self,
        backoffice: &BackofficeId,
        category: Option<&CategoryId>,
        route_line: &RouteLineId,
        mode: TransportMode,
    ) -> Result<Option<GroupageRate>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .groupage
            .values()
            .find(|r| {
                r.active
                    && &r.backoffice_id == backoffice
                    && r.category.as_ref() == category
                    && &r.route_line == route_line
                    && r.mode == mode
            })
            .cloned())
    }

    async fn find_override_for_tier(
        &self,
        agency: &AgencyId,
        tier: RateTier,
        zone_id: &ZoneId,
    ) -> Result<Option<(BaseRate, AgencyOverride)>, StoreError> {
        let state = self.state.read().await;
        for row in state.overrides.values() {
            if &row.agency_id != agency {
                continue;
            }
            if let Some(base) = state.simple.values().find(|r| {
                r.id == row.tariff_id && r.tier == tier && &r.zone_id == zone_id && r.active
            }) {
                return Ok(Some((base.clone(), row.clone())));
            }
        }
        Ok(None)
    }

    async fn find_override_for_tariff(
        &self,
        agency: &AgencyId,
        tariff_id: &TariffId,
    ) -> Result<Option<AgencyOverride>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .overrides
            .values()
            .find(|r| &r.agency_id == agency && &r.tariff_id == tariff_id)
            .cloned())
    }

    async fn list_overrides_for_tariff(
        &self,
        tariff_id: &TariffId,
    ) -> Result<Vec<AgencyOverride>, StoreError> {
        let mut rows: Vec<AgencyOverride> = self
            .state
            .read()
            .await
            .overrides
            .values()
            .filter(|r| &r.tariff_id == tariff_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(rows)
    }

    async fn fetch_override(&self, id: &OverrideId) -> Result<Option<AgencyOverride>, StoreError> {
        Ok(self.state.read().await.overrides.get(&id.0).cloned())
    }

    async fn save_override(&self, row: AgencyOverride) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.overrides.get(&row.id.0) else {
            return Err(StoreError::Conflict(row.id.clone()));
        };
        if stored.version != row.version {
            return Err(StoreError::Conflict(row.id.clone()));
        }
        let mut saved = row;
        saved.version += 1;
        state.overrides.insert(saved.id.0.clone(), saved);
        self.override_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TariffAdminStore for InMemoryTariffStore {
    async fn insert_base_rate(&self, rate: BaseRate) -> Result<(), ServiceError> {
        self.state.write().await.simple.insert(rate.id.0.clone(), rate);
        Ok(())
    }

    async fn insert_groupage_rate(&self, rate: GroupageRate) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        if rate.route_kind == RouteKind::Special
            && state.groupage.values().any(|r| {
                r.backoffice_id == rate.backoffice_id && r.route_kind == RouteKind::Special
            })
        {
            return Err(DomainError::SpecialRouteAlreadyPriced(rate.backoffice_id.clone()).into());
        }
        state.groupage.insert(rate.id.0.clone(), rate);
        Ok(())
    }

    async fn insert_override(&self, row: AgencyOverride) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        if state
            .overrides
            .values()
            .any(|r| r.agency_id == row.agency_id && r.tariff_id == row.tariff_id)
        {
            return Err(DomainError::DuplicateOverride {
                agency_id: row.agency_id.clone(),
                tariff_id: row.tariff_id.clone(),
            }
            .into());
        }
        state.overrides.insert(row.id.0.clone(), row);
        Ok(())
    }

    async fn delete_tariff(&self, tariff_id: &TariffId) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        state.simple.remove(&tariff_id.0);
        state.groupage.remove(&tariff_id.0);
        state.overrides.retain(|_, r| &r.tariff_id != tariff_id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCommissionStore {
    settings: Arc<RwLock<HashMap<String, CommissionSetting>>>,
}

impl InMemoryCommissionStore {
    pub async fn upsert_setting(&self, setting: CommissionSetting) {
        self.settings.write().await.insert(setting.key.clone(), setting);
    }
}

#[async_trait]
impl CommissionStore for InMemoryCommissionStore {
    async fn find_active(&self, key: &str) -> Result<Option<CommissionSetting>, StoreError> {
        Ok(self.settings.read().await.get(key).filter(|s| s.active).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryShipmentStore {
    shipments: Arc<RwLock<HashMap<String, Shipment>>>,
}

impl InMemoryShipmentStore {
    pub async fn insert_shipment(&self, shipment: Shipment) {
        self.shipments.write().await.insert(shipment.id.0.clone(), shipment);
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn find_shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>, StoreError> {
        Ok(self.shipments.read().await.get(&id.0).cloned())
    }
}
