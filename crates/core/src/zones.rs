use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{MemoryTtlCache, TtlCache};
use crate::domain::zone::{Zone, ZoneId, ZoneLookup};
use crate::errors::{DomainError, ServiceError, StoreError};

#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn find_by_id(&self, id: &ZoneId) -> Result<Option<Zone>, StoreError>;
    async fn find_by_country(&self, country: &str) -> Result<Option<Zone>, StoreError>;
    async fn list_active(&self) -> Result<Vec<Zone>, StoreError>;
}

const ACTIVE_LIST_KEY: &str = "zone:active";

fn id_key(id: &ZoneId) -> String {
    format!("zone:id:{id}")
}

fn country_key(country: &str) -> String {
    format!("zone:country:{}", country.to_ascii_lowercase())
}

/// Read-through cached zone lookups. Zones rarely change, so entries live
/// for hours; the zone-CRUD collaborator must call `invalidate` after any
/// zone write; the directory never observes writes on its own.
pub struct ZoneDirectory<S> {
    store: S,
    zone_cache: Arc<dyn TtlCache<Zone>>,
    list_cache: Arc<dyn TtlCache<Vec<Zone>>>,
    ttl: Duration,
}

impl<S: ZoneStore> ZoneDirectory<S> {
    pub fn new(
        store: S,
        zone_cache: Arc<dyn TtlCache<Zone>>,
        list_cache: Arc<dyn TtlCache<Vec<Zone>>>,
        ttl: Duration,
    ) -> Self {
        Self { store, zone_cache, list_cache, ttl }
    }

    pub fn with_memory_cache(store: S, ttl: Duration) -> Self {
        Self::new(
            store,
            Arc::new(MemoryTtlCache::default()),
            Arc::new(MemoryTtlCache::default()),
            ttl,
        )
    }

    pub async fn get_by_id(&self, id: &ZoneId) -> Result<Zone, ServiceError> {
        let key = id_key(id);
        if let Some(zone) = self.zone_cache.get(&key) {
            return Ok(zone);
        }
        let zone = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ZoneNotFound(ZoneLookup::ById(id.clone())))?;
        self.zone_cache.put(&key, zone.clone(), self.ttl);
        Ok(zone)
    }

    pub async fn get_by_country(&self, country: &str) -> Result<Zone, ServiceError> {
        let key = country_key(country);
        if let Some(zone) = self.zone_cache.get(&key) {
            return Ok(zone);
        }
        let zone = self.store.find_by_country(country).await?.ok_or_else(|| {
            DomainError::ZoneNotFound(ZoneLookup::ByCountry(country.to_string()))
        })?;
        self.zone_cache.put(&key, zone.clone(), self.ttl);
        Ok(zone)
    }

    pub async fn list_active(&self) -> Result<Vec<Zone>, ServiceError> {
        if let Some(zones) = self.list_cache.get(ACTIVE_LIST_KEY) {
            return Ok(zones);
        }
        let zones = self.store.list_active().await?;
        self.list_cache.put(ACTIVE_LIST_KEY, zones.clone(), self.ttl);
        Ok(zones)
    }

    /// Drop the id-keyed entry, every country-keyed entry of this zone, and
    /// the active-list entry. Called by the zone-CRUD collaborator after a
    /// write, with the zone as it was before the edit so renamed or removed
    /// countries are also flushed.
    pub fn invalidate(&self, zone: &Zone) {
        debug!(zone = %zone.id, "invalidating zone cache entries");
        self.zone_cache.invalidate(&id_key(&zone.id));
        for country in &zone.countries {
            self.zone_cache.invalidate(&country_key(country));
        }
        self.list_cache.invalidate(ACTIVE_LIST_KEY);
    }
}
