use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::zone::ZoneId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TariffId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackofficeId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgencyId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteLineId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideId(pub String);

macro_rules! display_id {
    ($($name:ident),+ $(,)?) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_id!(TariffId, BackofficeId, AgencyId, CategoryId, RouteLineId, OverrideId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Road,
    Sea,
    Air,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Road => f.write_str("road"),
            Self::Sea => f.write_str("sea"),
            Self::Air => f.write_str("air"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Standard,
    /// At most one groupage tariff per backoffice may carry this kind.
    Special,
}

/// Discrete pricing bracket in 0.5 increments, always positive.
/// Derived from weight/volume, never stored on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RateTier(Decimal);

impl RateTier {
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        let twice = value * Decimal::TWO;
        if value <= Decimal::ZERO || twice != twice.trunc() {
            return Err(DomainError::InvalidTier(value));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for RateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money rounding used on every write path: 2 decimal places, half away
/// from zero. Banker's rounding diverges by cents on .xx5 boundaries and
/// must not be substituted.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The four-field pricing block shared by base entries and override blocks.
/// `markup_amount` and `total_amount` are derived but stored, and consumers
/// read them verbatim without recomputation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBlock {
    pub base_amount: Decimal,
    pub markup_percent: Decimal,
    pub markup_amount: Decimal,
    pub total_amount: Decimal,
}

impl RateBlock {
    pub fn new(base_amount: Decimal, markup_percent: Decimal) -> Result<Self, DomainError> {
        if base_amount < Decimal::ZERO {
            return Err(DomainError::NegativeAmount(base_amount));
        }
        validate_markup_percent(markup_percent)?;
        Ok(Self::derive(base_amount, markup_percent))
    }

    /// Recompute the derived fields from already-validated inputs. The
    /// cascade calls this after its clamp, which keeps the percent in range.
    pub(crate) fn derive(base_amount: Decimal, markup_percent: Decimal) -> Self {
        let markup_amount = round_half_up(base_amount * markup_percent / Decimal::ONE_HUNDRED);
        let total_amount = round_half_up(base_amount + markup_amount);
        Self { base_amount, markup_percent, markup_amount, total_amount }
    }
}

pub fn validate_markup_percent(percent: Decimal) -> Result<(), DomainError> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(DomainError::MarkupOutOfRange(percent));
    }
    Ok(())
}

/// Simple-mode base tariff: one row per (backoffice, tier, destination zone),
/// owned by exactly one backoffice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRate {
    pub id: TariffId,
    pub backoffice_id: BackofficeId,
    pub tier: RateTier,
    pub zone_id: ZoneId,
    pub block: RateBlock,
    pub active: bool,
}

/// Groupage-mode base tariff: one row per (category, route line, transport
/// mode), unique per (backoffice, route line, mode).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupageRate {
    pub id: TariffId,
    pub backoffice_id: BackofficeId,
    pub category: Option<CategoryId>,
    pub route_line: RouteLineId,
    pub route_kind: RouteKind,
    pub mode: TransportMode,
    pub block: RateBlock,
    pub active: bool,
}

/// Per-zone pricing block inside an agency override. Simple-mode overrides
/// carry one block per zone; groupage overrides carry a single block with
/// no zone key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideBlock {
    pub zone_id: Option<ZoneId>,
    pub rate: RateBlock,
}

/// Agency-level override of one base tariff. The agency owns only the
/// markup percent; base amounts are always copied from the linked base
/// entry, never independently true. One override per (agency, tariff).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyOverride {
    pub id: OverrideId,
    pub agency_id: AgencyId,
    pub tariff_id: TariffId,
    /// Optimistic-concurrency token; bumped on every persisted change so an
    /// agency edit and a backoffice cascade cannot silently overwrite each
    /// other.
    pub version: i64,
    pub blocks: Vec<OverrideBlock>,
}

impl AgencyOverride {
    pub fn block_for_zone(&self, zone_id: Option<&ZoneId>) -> Option<&OverrideBlock> {
        self.blocks.iter().find(|b| b.zone_id.as_ref() == zone_id)
    }

    pub fn block_for_zone_mut(&mut self, zone_id: Option<&ZoneId>) -> Option<&mut OverrideBlock> {
        self.blocks.iter_mut().find(|b| b.zone_id.as_ref() == zone_id)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{round_half_up, RateBlock, RateTier};
    use crate::errors::DomainError;

    #[test]
    fn tier_accepts_half_increments_only() {
        assert!(RateTier::new(Decimal::new(10, 1)).is_ok());
        assert!(RateTier::new(Decimal::new(15, 1)).is_ok());
        assert!(RateTier::new(Decimal::new(125, 2)).is_err());
        assert!(RateTier::new(Decimal::ZERO).is_err());
        assert!(RateTier::new(Decimal::new(-5, 1)).is_err());
    }

    #[test]
    fn tier_equality_ignores_trailing_zeroes() {
        let a = RateTier::new(Decimal::new(20, 1)).unwrap();
        let b = RateTier::new(Decimal::from(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derived_amounts_follow_half_up_rule() {
        let block = RateBlock::new(Decimal::from(1000), Decimal::new(125, 1)).unwrap();
        assert_eq!(block.markup_amount, Decimal::new(12500, 2));
        assert_eq!(block.total_amount, Decimal::new(112500, 2));
    }

    #[test]
    fn half_cent_boundary_rounds_away_from_zero() {
        // 333 * 50% = 166.50 exactly; 0.005 boundaries must go up.
        let block = RateBlock::new(Decimal::from(333), Decimal::from(50)).unwrap();
        assert_eq!(block.markup_amount, Decimal::new(16650, 2));
        assert_eq!(round_half_up(Decimal::new(1005, 3)), Decimal::new(101, 2));
    }

    #[test]
    fn markup_outside_range_is_rejected() {
        let err = RateBlock::new(Decimal::from(100), Decimal::from(101)).unwrap_err();
        assert!(matches!(err, DomainError::MarkupOutOfRange(_)));
        let err = RateBlock::new(Decimal::from(100), Decimal::from(-1)).unwrap_err();
        assert!(matches!(err, DomainError::MarkupOutOfRange(_)));
    }

    #[test]
    fn negative_base_amount_is_rejected() {
        let err = RateBlock::new(Decimal::from(-10), Decimal::from(10)).unwrap_err();
        assert!(matches!(err, DomainError::NegativeAmount(_)));
    }
}
