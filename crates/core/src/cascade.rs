use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::tariff::{
    AgencyOverride, BaseRate, GroupageRate, OverrideId, RateBlock, TariffId,
};
use crate::domain::zone::ZoneId;
use crate::errors::StoreError;
use crate::rates::TariffStore;

/// Outcome of one propagation run: best-effort with visibility. A failed
/// row never aborts the remaining rows; callers get the full picture.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub updated: Vec<OverrideId>,
    pub untouched: usize,
    pub failures: Vec<CascadeFailure>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CascadeFailure {
    pub override_id: OverrideId,
    pub error: StoreError,
}

impl CascadeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Propagates a base tariff edit to every dependent agency override.
///
/// The shift is additive: an agency that negotiated +10 over the backoffice
/// markup keeps its +10 relative offset after the backoffice moves, subject
/// to the [0, 100] clamp. Clamp truncation is silent. Base amounts are
/// copied, never renegotiated. Each dependent row is refetched and saved on
/// its own so a concurrent agency edit is not blindly overwritten.
pub struct CascadeRepricer<S> {
    store: S,
}

impl<S: TariffStore> CascadeRepricer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Invoked by the tariff-CRUD collaborator after persisting a simple
    /// base rate edit, before it reports success to its caller.
    pub async fn on_base_rate_updated(
        &self,
        old: &BaseRate,
        new: &BaseRate,
    ) -> Result<CascadeReport, StoreError> {
        self.propagate(&new.id, Some(&new.zone_id), &old.block, &new.block).await
    }

    /// Groupage variant: override rows carry a single zone-less block.
    pub async fn on_groupage_rate_updated(
        &self,
        old: &GroupageRate,
        new: &GroupageRate,
    ) -> Result<CascadeReport, StoreError> {
        self.propagate(&new.id, None, &old.block, &new.block).await
    }

    async fn propagate(
        &self,
        tariff_id: &TariffId,
        zone_id: Option<&ZoneId>,
        old: &RateBlock,
        new: &RateBlock,
    ) -> Result<CascadeReport, StoreError> {
        let delta = new.markup_percent - old.markup_percent;
        let base_changed = new.base_amount != old.base_amount;

        let mut report = CascadeReport::default();
        if delta.is_zero() && !base_changed {
            // Nothing moved; zero reads, zero writes.
            return Ok(report);
        }

        let dependents = self.store.list_overrides_for_tariff(tariff_id).await?;
        debug!(
            tariff = %tariff_id,
            dependents = dependents.len(),
            %delta,
            base_changed,
            "cascading base tariff edit"
        );

        for dependent in dependents {
            match self.reprice_row(&dependent.id, zone_id, delta, base_changed, new).await {
                Ok(true) => report.updated.push(dependent.id),
                Ok(false) => report.untouched += 1,
                Err(error) => {
                    warn!(override_id = %dependent.id, %error, "cascade row failed, continuing");
                    report.failures.push(CascadeFailure { override_id: dependent.id, error });
                }
            }
        }
        Ok(report)
    }

    /// Read-modify-write on one override row against its current state, not
    /// the snapshot taken when listing dependents. Returns whether a write
    /// happened.
    async fn reprice_row(
        &self,
        id: &OverrideId,
        zone_id: Option<&ZoneId>,
        delta: Decimal,
        base_changed: bool,
        new: &RateBlock,
    ) -> Result<bool, StoreError> {
        let Some(mut row) = self.store.fetch_override(id).await? else {
            // Deleted since listing; nothing to do.
            return Ok(false);
        };
        let Some(changed) = shift_block(&mut row, zone_id, delta, base_changed, new) else {
            return Ok(false);
        };
        if !changed {
            return Ok(false);
        }
        self.store.save_override(row).await?;
        Ok(true)
    }
}

/// Apply the delta shift and base-amount copy to the matching block.
/// `None` when the row has no block for this zone; `Some(false)` when the
/// block matched but nothing actually changed (clamp truncated to the same
/// value, or the base was already current).
fn shift_block(
    row: &mut AgencyOverride,
    zone_id: Option<&ZoneId>,
    delta: Decimal,
    base_changed: bool,
    new: &RateBlock,
) -> Option<bool> {
    let block = row.block_for_zone_mut(zone_id)?;

    let shifted = if delta.is_zero() {
        block.rate.markup_percent
    } else {
        clamp_percent(block.rate.markup_percent + delta)
    };
    let base_amount = if base_changed { new.base_amount } else { block.rate.base_amount };

    if shifted == block.rate.markup_percent && base_amount == block.rate.base_amount {
        return Some(false);
    }
    block.rate = RateBlock::derive(base_amount, shifted);
    Some(true)
}

fn clamp_percent(percent: Decimal) -> Decimal {
    percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}
