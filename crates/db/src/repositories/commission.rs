use async_trait::async_trait;
use sqlx::Row;

use parcelrate_core::commission::CommissionStore;
use parcelrate_core::domain::commission::{CommissionKind, CommissionSetting};
use parcelrate_core::errors::StoreError;

use super::{backend, parse_decimal};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlCommissionStore {
    pool: DbPool,
}

impl SqlCommissionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Settings writes belong to the commission-CRUD collaborator, which
    /// must invalidate the calculator cache for `setting.key` afterwards.
    pub async fn upsert_setting(&self, setting: CommissionSetting) -> Result<(), StoreError> {
        let kind = match setting.kind {
            CommissionKind::Percentage => "percentage",
            CommissionKind::Fixed => "fixed",
        };
        sqlx::query(
            "INSERT INTO commission_settings (key, value, kind, active) VALUES (?, ?, ?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, kind = excluded.kind, \
             active = excluded.active",
        )
        .bind(&setting.key)
        .bind(setting.value.to_string())
        .bind(kind)
        .bind(setting.active)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl CommissionStore for SqlCommissionStore {
    async fn find_active(&self, key: &str) -> Result<Option<CommissionSetting>, StoreError> {
        let Some(row) = sqlx::query(
            "SELECT key, value, kind, active FROM commission_settings WHERE key = ? AND active = 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        else {
            return Ok(None);
        };

        let kind = match row.get::<String, _>("kind").as_str() {
            "percentage" => CommissionKind::Percentage,
            "fixed" => CommissionKind::Fixed,
            other => {
                return Err(StoreError::Decode(format!("unknown commission kind `{other}`")));
            }
        };
        Ok(Some(CommissionSetting {
            key: row.get("key"),
            value: parse_decimal(&row.get::<String, _>("value"), "value")?,
            kind,
            active: true,
        }))
    }
}
