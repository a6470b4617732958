use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use parcelrate_core::domain::tariff::{
    AgencyId, AgencyOverride, BackofficeId, BaseRate, CategoryId, GroupageRate, OverrideBlock,
    OverrideId, RateBlock, RateTier, RouteKind, RouteLineId, TariffId, TransportMode,
};
use parcelrate_core::domain::zone::ZoneId;
use parcelrate_core::errors::{DomainError, ServiceError, StoreError};
use parcelrate_core::rates::{TariffAdminStore, TariffStore};

use super::{
    backend, mode_str, parse_decimal, parse_mode, parse_route_kind, parse_tier, route_kind_str,
};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlTariffStore {
    pool: DbPool,
}

impl SqlTariffStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_blocks(&self, override_id: &OverrideId) -> Result<Vec<OverrideBlock>, StoreError> {
        let rows = sqlx::query(
            "SELECT zone_id, base_amount, markup_percent, markup_amount, total_amount \
             FROM override_blocks WHERE override_id = ? ORDER BY zone_id",
        )
        .bind(&override_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(decode_override_block).collect()
    }

    async fn hydrate_override(&self, row: &SqliteRow) -> Result<AgencyOverride, StoreError> {
        let id = OverrideId(row.get("id"));
        let blocks = self.load_blocks(&id).await?;
        Ok(AgencyOverride {
            id,
            agency_id: AgencyId(row.get("agency_id")),
            tariff_id: TariffId(row.get("tariff_id")),
            version: row.get("version"),
            blocks,
        })
    }
}

fn decode_rate_block(row: &SqliteRow) -> Result<RateBlock, StoreError> {
    Ok(RateBlock {
        base_amount: parse_decimal(&row.get::<String, _>("base_amount"), "base_amount")?,
        markup_percent: parse_decimal(&row.get::<String, _>("markup_percent"), "markup_percent")?,
        markup_amount: parse_decimal(&row.get::<String, _>("markup_amount"), "markup_amount")?,
        total_amount: parse_decimal(&row.get::<String, _>("total_amount"), "total_amount")?,
    })
}

fn decode_override_block(row: &SqliteRow) -> Result<OverrideBlock, StoreError> {
    Ok(OverrideBlock {
        zone_id: row.get::<Option<String>, _>("zone_id").map(ZoneId),
        rate: decode_rate_block(row)?,
    })
}

fn decode_base_rate(row: &SqliteRow) -> Result<BaseRate, StoreError> {
    Ok(BaseRate {
        id: TariffId(row.get("id")),
        backoffice_id: BackofficeId(row.get("backoffice_id")),
        tier: parse_tier(&row.get::<String, _>("tier"))?,
        zone_id: ZoneId(row.get("zone_id")),
        block: decode_rate_block(row)?,
        active: row.get::<i64, _>("active") != 0,
    })
}

fn decode_groupage_rate(row: &SqliteRow) -> Result<GroupageRate, StoreError> {
    Ok(GroupageRate {
        id: TariffId(row.get("id")),
        backoffice_id: BackofficeId(row.get("backoffice_id")),
        category: row.get::<Option<String>, _>("category").map(CategoryId),
        route_line: RouteLineId(row.get("route_line")),
        route_kind: parse_route_kind(&row.get::<String, _>("route_kind"))?,
        mode: parse_mode(&row.get::<String, _>("mode"))?,
        block: decode_rate_block(row)?,
        active: row.get::<i64, _>("active") != 0,
    })
}

#[async_trait]
impl TariffStore for SqlTariffStore {
    async fn find_simple_rate(
        &self,
        backoffice: Option<&BackofficeId>,
        tier: RateTier,
        zone_id: &ZoneId,
    ) -> Result<Option<BaseRate>, StoreError> {
        let row = match backoffice {
            Some(backoffice) => {
                sqlx::query(
                    "SELECT * FROM base_rates \
                     WHERE backoffice_id = ? AND tier = ? AND zone_id = ? AND active = 1",
                )
                .bind(&backoffice.0)
                .bind(tier.value().to_string())
                .bind(&zone_id.0)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM base_rates WHERE tier = ? AND zone_id = ? AND active = 1",
                )
                .bind(tier.value().to_string())
                .bind(&zone_id.0)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(backend)?;
        row.as_ref().map(decode_base_rate).transpose()
    }

    async fn find_groupage_rate(
        &self,
        backoffice: &BackofficeId,
        category: Option<&CategoryId>,
        route_line: &RouteLineId,
        mode: TransportMode,
    ) -> Result<Option<GroupageRate>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM groupage_rates \
             WHERE backoffice_id = ? AND category IS ? AND route_line = ? AND mode = ? \
             AND active = 1",
        )
        .bind(&backoffice.0)
        .bind(category.map(|c| c.0.clone()))
        .bind(&route_line.0)
        .bind(mode_str(mode))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(decode_groupage_rate).transpose()
    }

    async fn find_override_for_tier(
        &self,
        agency: &AgencyId,
        tier: RateTier,
        zone_id: &ZoneId,
    ) -> Result<Option<(BaseRate, AgencyOverride)>, StoreError> {
        // The zone is part of the base-rate key; without it an agency
        // overriding two same-tier entries would resolve arbitrarily.
        let Some(joined) = sqlx::query(
            "SELECT o.id AS override_id, b.* FROM agency_overrides o \
             JOIN base_rates b ON b.id = o.tariff_id \
             WHERE o.agency_id = ? AND b.tier = ? AND b.zone_id = ? AND b.active = 1",
        )
        .bind(&agency.0)
        .bind(tier.value().to_string())
        .bind(&zone_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        else {
            return Ok(None);
        };

        let base = decode_base_rate(&joined)?;
        let override_id = OverrideId(joined.get("override_id"));
        let Some(row) = self.fetch_override(&override_id).await? else {
            return Ok(None);
        };
        Ok(Some((base, row)))
    }

    async fn find_override_for_tariff(
        &self,
        agency: &AgencyId,
        tariff_id: &TariffId,
    ) -> Result<Option<AgencyOverride>, StoreError> {
        let row = sqlx::query(
            "SELECT id, agency_id, tariff_id, version FROM agency_overrides \
             WHERE agency_id = ? AND tariff_id = ?",
        )
        .bind(&agency.0)
        .bind(&tariff_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        match row {
            Some(row) => Ok(Some(self.hydrate_override(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list_overrides_for_tariff(
        &self,
        tariff_id: &TariffId,
    ) -> Result<Vec<AgencyOverride>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, agency_id, tariff_id, version FROM agency_overrides \
             WHERE tariff_id = ? ORDER BY id",
        )
        .bind(&tariff_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut overrides = Vec::with_capacity(rows.len());
        for row in &rows {
            overrides.push(self.hydrate_override(row).await?);
        }
        Ok(overrides)
    }

    async fn fetch_override(&self, id: &OverrideId) -> Result<Option<AgencyOverride>, StoreError> {
        let row = sqlx::query(
            "SELECT id, agency_id, tariff_id, version FROM agency_overrides WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        match row {
            Some(row) => Ok(Some(self.hydrate_override(&row).await?)),
            None => Ok(None),
        }
    }

    async fn save_override(&self, row: AgencyOverride) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Optimistic version check: an agency edit and a cascade racing on
        // the same row serialize here instead of overwriting each other.
        let updated = sqlx::query(
            "UPDATE agency_overrides SET version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(&row.id.0)
        .bind(row.version)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict(row.id.clone()));
        }

        sqlx::query("DELETE FROM override_blocks WHERE override_id = ?")
            .bind(&row.id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        for block in &row.blocks {
            sqlx::query(
                "INSERT INTO override_blocks \
                 (override_id, zone_id, base_amount, markup_percent, markup_amount, total_amount) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.id.0)
            .bind(block.zone_id.as_ref().map(|z| z.0.clone()))
            .bind(block.rate.base_amount.to_string())
            .bind(block.rate.markup_percent.to_string())
            .bind(block.rate.markup_amount.to_string())
            .bind(block.rate.total_amount.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }
}

#[async_trait]
impl TariffAdminStore for SqlTariffStore {
    async fn insert_base_rate(&self, rate: BaseRate) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO base_rates \
             (id, backoffice_id, tier, zone_id, base_amount, markup_percent, markup_amount, \
              total_amount, active) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&rate.id.0)
        .bind(&rate.backoffice_id.0)
        .bind(rate.tier.value().to_string())
        .bind(&rate.zone_id.0)
        .bind(rate.block.base_amount.to_string())
        .bind(rate.block.markup_percent.to_string())
        .bind(rate.block.markup_amount.to_string())
        .bind(rate.block.total_amount.to_string())
        .bind(rate.active)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn insert_groupage_rate(&self, rate: GroupageRate) -> Result<(), ServiceError> {
        if rate.route_kind == RouteKind::Special {
            let existing = sqlx::query(
                "SELECT id FROM groupage_rates WHERE backoffice_id = ? AND route_kind = 'special'",
            )
            .bind(&rate.backoffice_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
            if existing.is_some() {
                return Err(
                    DomainError::SpecialRouteAlreadyPriced(rate.backoffice_id.clone()).into()
                );
            }
        }

        sqlx::query(
            "INSERT INTO groupage_rates \
             (id, backoffice_id, category, route_line, route_kind, mode, base_amount, \
              markup_percent, markup_amount, total_amount, active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&rate.id.0)
        .bind(&rate.backoffice_id.0)
        .bind(rate.category.as_ref().map(|c| c.0.clone()))
        .bind(&rate.route_line.0)
        .bind(route_kind_str(rate.route_kind))
        .bind(mode_str(rate.mode))
        .bind(rate.block.base_amount.to_string())
        .bind(rate.block.markup_percent.to_string())
        .bind(rate.block.markup_amount.to_string())
        .bind(rate.block.total_amount.to_string())
        .bind(rate.active)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn insert_override(&self, row: AgencyOverride) -> Result<(), ServiceError> {
        let duplicate = sqlx::query(
            "SELECT id FROM agency_overrides WHERE agency_id = ? AND tariff_id = ?",
        )
        .bind(&row.agency_id.0)
        .bind(&row.tariff_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        if duplicate.is_some() {
            return Err(DomainError::DuplicateOverride {
                agency_id: row.agency_id.clone(),
                tariff_id: row.tariff_id.clone(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query(
            "INSERT INTO agency_overrides (id, agency_id, tariff_id, version) VALUES (?, ?, ?, ?)",
        )
        .bind(&row.id.0)
        .bind(&row.agency_id.0)
        .bind(&row.tariff_id.0)
        .bind(row.version)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        for block in &row.blocks {
            sqlx::query(
                "INSERT INTO override_blocks \
                 (override_id, zone_id, base_amount, markup_percent, markup_amount, total_amount) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.id.0)
            .bind(block.zone_id.as_ref().map(|z| z.0.clone()))
            .bind(block.rate.base_amount.to_string())
            .bind(block.rate.markup_percent.to_string())
            .bind(block.rate.markup_amount.to_string())
            .bind(block.rate.total_amount.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn delete_tariff(&self, tariff_id: &TariffId) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        // Override blocks go with their rows via the FK cascade.
        sqlx::query("DELETE FROM agency_overrides WHERE tariff_id = ?")
            .bind(&tariff_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM base_rates WHERE id = ?")
            .bind(&tariff_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM groupage_rates WHERE id = ?")
            .bind(&tariff_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }
}
