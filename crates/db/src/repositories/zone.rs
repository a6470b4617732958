use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use parcelrate_core::domain::zone::{Zone, ZoneId};
use parcelrate_core::errors::{DomainError, ServiceError, StoreError};
use parcelrate_core::zones::ZoneStore;

use super::backend;
use crate::DbPool;

#[derive(Clone)]
pub struct SqlZoneStore {
    pool: DbPool,
}

impl SqlZoneStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Zone writes belong to the zone-CRUD collaborator; this entry point
    /// enforces the one-active-zone-per-country invariant the read path
    /// relies on.
    pub async fn insert_zone(&self, zone: Zone) -> Result<(), ServiceError> {
        if zone.active {
            for existing in self.list_active().await? {
                if existing.id == zone.id {
                    continue;
                }
                for country in &zone.countries {
                    if existing.covers_country(country) {
                        return Err(DomainError::CountryAlreadyZoned {
                            country: country.clone(),
                            zone_id: existing.id,
                        }
                        .into());
                    }
                }
            }
        }

        let countries = serde_json::to_string(&zone.countries)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        sqlx::query(
            "INSERT INTO zones (id, name, countries, active) VALUES (?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, \
             countries = excluded.countries, active = excluded.active",
        )
        .bind(&zone.id.0)
        .bind(&zone.name)
        .bind(&countries)
        .bind(zone.active)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

fn decode_zone(row: &SqliteRow) -> Result<Zone, StoreError> {
    let countries: String = row.get("countries");
    let countries: Vec<String> = serde_json::from_str(&countries)
        .map_err(|e| StoreError::Decode(format!("zone countries blob: {e}")))?;
    Ok(Zone {
        id: ZoneId(row.get("id")),
        name: row.get("name"),
        countries,
        active: row.get::<i64, _>("active") != 0,
    })
}

#[async_trait]
impl ZoneStore for SqlZoneStore {
    async fn find_by_id(&self, id: &ZoneId) -> Result<Option<Zone>, StoreError> {
        let row = sqlx::query("SELECT id, name, countries, active FROM zones WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(decode_zone).transpose()
    }

    async fn find_by_country(&self, country: &str) -> Result<Option<Zone>, StoreError> {
        // Country membership lives in a JSON blob, so the scan happens
        // here; the directory's cache keeps this off the hot path.
        for zone in self.list_active().await? {
            if zone.covers_country(country) {
                return Ok(Some(zone));
            }
        }
        Ok(None)
    }

    async fn list_active(&self) -> Result<Vec<Zone>, StoreError> {
        let rows =
            sqlx::query("SELECT id, name, countries, active FROM zones WHERE active = 1 ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        rows.iter().map(decode_zone).collect()
    }
}
