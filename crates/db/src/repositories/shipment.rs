use async_trait::async_trait;
use sqlx::Row;

use parcelrate_core::domain::shipment::{Dimensions, Package, Shipment, ShipmentId};
use parcelrate_core::domain::tariff::{AgencyId, BackofficeId, CategoryId, RouteLineId};
use parcelrate_core::domain::zone::ZoneId;
use parcelrate_core::engine::ShipmentStore;
use parcelrate_core::errors::StoreError;

use super::{backend, parse_decimal, parse_mode};
use crate::DbPool;

/// Read-only view over the shipment collaborator's rows.
#[derive(Clone)]
pub struct SqlShipmentStore {
    pool: DbPool,
}

impl SqlShipmentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShipmentStore for SqlShipmentStore {
    async fn find_shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>, StoreError> {
        let Some(head) = sqlx::query(
            "SELECT id, agency_id, backoffice_id, route_line, mode, origin_zone, dest_zone \
             FROM shipments WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT weight, length, width, height, category FROM packages \
             WHERE shipment_id = ? ORDER BY id",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut packages = Vec::with_capacity(rows.len());
        for row in &rows {
            let dims = match (
                row.get::<Option<String>, _>("length"),
                row.get::<Option<String>, _>("width"),
                row.get::<Option<String>, _>("height"),
            ) {
                (Some(l), Some(w), Some(h)) => Some(Dimensions {
                    length: parse_decimal(&l, "length")?,
                    width: parse_decimal(&w, "width")?,
                    height: parse_decimal(&h, "height")?,
                }),
                _ => None,
            };
            packages.push(Package {
                weight: parse_decimal(&row.get::<String, _>("weight"), "weight")?,
                dims,
                category: row.get::<Option<String>, _>("category").map(CategoryId),
            });
        }

        Ok(Some(Shipment {
            id: ShipmentId(head.get("id")),
            agency_id: AgencyId(head.get("agency_id")),
            backoffice_id: BackofficeId(head.get("backoffice_id")),
            route_line: RouteLineId(head.get("route_line")),
            mode: parse_mode(&head.get::<String, _>("mode"))?,
            origin_zone: ZoneId(head.get("origin_zone")),
            dest_zone: ZoneId(head.get("dest_zone")),
            packages,
        }))
    }
}
