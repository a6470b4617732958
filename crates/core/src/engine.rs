use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{GroupageMarkupMode, PricingConfig};
use crate::domain::quote::{PricedGroup, PricedPackage, PricedShipment, RateSource};
use crate::domain::shipment::{Dimensions, Shipment, ShipmentId};
use crate::domain::tariff::{round_half_up, AgencyId, BackofficeId, CategoryId};
use crate::domain::zone::ZoneId;
use crate::errors::{DomainError, ServiceError, StoreError};
use crate::rates::TariffStore;
use crate::tier::{resolve_tier, round_to_tier, shipment_reference_index};
use crate::zones::{ZoneDirectory, ZoneStore};

/// Read seam to the shipment collaborator's package rows. The engine only
/// ever reads.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    async fn find_shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>, StoreError>;
}

#[derive(Clone, Debug)]
pub struct SimpleQuoteRequest {
    pub weight: Decimal,
    pub dims: Option<Dimensions>,
    pub agency_id: Option<AgencyId>,
    pub backoffice_id: Option<BackofficeId>,
    pub origin_zone: ZoneId,
    pub dest_zone: ZoneId,
}

/// Orchestrates tier resolution, zone lookup and tariff resolution into a
/// priced quote. Agency overrides win over base rates in simple mode; a
/// zone missing inside a found override is an error, never a fallback.
pub struct QuoteEngine<Z, T, H> {
    zones: ZoneDirectory<Z>,
    tariffs: T,
    shipments: H,
    volumetric_divisor: Decimal,
    groupage_markup: GroupageMarkupMode,
}

impl<Z, T, H> QuoteEngine<Z, T, H>
where
    Z: ZoneStore,
    T: TariffStore,
    H: ShipmentStore,
{
    pub fn new(zones: ZoneDirectory<Z>, tariffs: T, shipments: H, config: &PricingConfig) -> Self {
        Self {
            zones,
            tariffs,
            shipments,
            volumetric_divisor: config.volumetric_divisor,
            groupage_markup: config.groupage_markup,
        }
    }

    pub async fn price_simple(
        &self,
        request: SimpleQuoteRequest,
    ) -> Result<PricedPackage, ServiceError> {
        let tier = resolve_tier(request.weight, request.dims.as_ref(), self.volumetric_divisor)?;
        // Both endpoints must exist even though only the destination is
        // priced; an unknown origin is a caller mistake worth surfacing.
        self.zones.get_by_id(&request.origin_zone).await?;
        let dest = self.zones.get_by_id(&request.dest_zone).await?;

        if let Some(agency_id) = &request.agency_id {
            if let Some((_, row)) =
                self.tariffs.find_override_for_tier(agency_id, tier, &dest.id).await?
            {
                let block = row.block_for_zone(Some(&dest.id)).ok_or_else(|| {
                    DomainError::ZoneNotInAgencyTariff {
                        agency_id: agency_id.clone(),
                        zone_id: dest.id.clone(),
                    }
                })?;
                debug!(%tier, zone = %dest.id, agency = %agency_id, "priced from agency override");
                return Ok(PricedPackage {
                    tier,
                    zone_id: dest.id,
                    rate: block.rate.clone(),
                    source: RateSource::AgencyOverride,
                });
            }
        }

        let base = self
            .tariffs
            .find_simple_rate(request.backoffice_id.as_ref(), tier, &dest.id)
            .await?
            .ok_or(DomainError::TariffNotFound { tier, zone_id: dest.id.clone() })?;
        debug!(%tier, zone = %dest.id, "priced from base tariff");
        Ok(PricedPackage {
            tier,
            zone_id: dest.id,
            rate: base.block,
            source: RateSource::BaseRate,
        })
    }

    /// Simple-mode pricing of a whole shipment: weight and volume are
    /// aggregated over all packages before tiering.
    pub async fn price_simple_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<PricedPackage, ServiceError> {
        let shipment = self.load_shipment(shipment_id).await?;
        let index = shipment_reference_index(&shipment.packages, self.volumetric_divisor);
        let tier = round_to_tier(index)?;

        self.zones.get_by_id(&shipment.origin_zone).await?;
        let dest = self.zones.get_by_id(&shipment.dest_zone).await?;

        if let Some((_, row)) =
            self.tariffs.find_override_for_tier(&shipment.agency_id, tier, &dest.id).await?
        {
            let block = row.block_for_zone(Some(&dest.id)).ok_or_else(|| {
                DomainError::ZoneNotInAgencyTariff {
                    agency_id: shipment.agency_id.clone(),
                    zone_id: dest.id.clone(),
                }
            })?;
            return Ok(PricedPackage {
                tier,
                zone_id: dest.id,
                rate: block.rate.clone(),
                source: RateSource::AgencyOverride,
            });
        }

        let base = self
            .tariffs
            .find_simple_rate(Some(&shipment.backoffice_id), tier, &dest.id)
            .await?
            .ok_or(DomainError::TariffNotFound { tier, zone_id: dest.id.clone() })?;
        Ok(PricedPackage {
            tier,
            zone_id: dest.id,
            rate: base.block,
            source: RateSource::BaseRate,
        })
    }

    /// Groupage pricing: shipment packages grouped by product category,
    /// each group priced at the (category, route, mode) tariff, group
    /// totals summed. Agency markup at the category level is governed by
    /// the deployment's `GroupageMarkupMode`.
    pub async fn price_groupage(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<PricedShipment, ServiceError> {
        let shipment = self.load_shipment(shipment_id).await?;

        let mut weights: BTreeMap<Option<CategoryId>, Decimal> = BTreeMap::new();
        for package in &shipment.packages {
            *weights.entry(package.category.clone()).or_insert(Decimal::ZERO) += package.weight;
        }

        let mut groups = Vec::with_capacity(weights.len());
        let mut total = Decimal::ZERO;
        for (category, weight) in weights {
            let rate = self
                .tariffs
                .find_groupage_rate(
                    &shipment.backoffice_id,
                    category.as_ref(),
                    &shipment.route_line,
                    shipment.mode,
                )
                .await?
                .ok_or_else(|| DomainError::GroupageTariffNotFound {
                    category: category.clone(),
                    route_line: shipment.route_line.clone(),
                    mode: shipment.mode,
                })?;

            let (block, source) = match self.groupage_markup {
                GroupageMarkupMode::BaseOnly => (rate.block, RateSource::BaseRate),
                GroupageMarkupMode::AgencyOverride => {
                    match self
                        .tariffs
                        .find_override_for_tariff(&shipment.agency_id, &rate.id)
                        .await?
                        .and_then(|row| row.block_for_zone(None).map(|b| b.rate.clone()))
                    {
                        Some(rate) => (rate, RateSource::AgencyOverride),
                        None => (rate.block, RateSource::BaseRate),
                    }
                }
            };

            total += block.total_amount;
            groups.push(PricedGroup { category, weight, rate: block, source });
        }

        Ok(PricedShipment {
            shipment_id: shipment.id,
            groups,
            total_amount: round_half_up(total),
        })
    }

    async fn load_shipment(&self, id: &ShipmentId) -> Result<Shipment, ServiceError> {
        Ok(self
            .shipments
            .find_shipment(id)
            .await?
            .ok_or_else(|| DomainError::ShipmentNotFound(id.clone()))?)
    }
}
