use rust_decimal::Decimal;

use crate::domain::shipment::{Dimensions, Package};
use crate::domain::tariff::RateTier;
use crate::errors::DomainError;

/// Industry-standard divisor for volumetric weight in cm³/kg.
pub const DEFAULT_VOLUMETRIC_DIVISOR: i64 = 5000;

pub fn default_divisor() -> Decimal {
    Decimal::from(DEFAULT_VOLUMETRIC_DIVISOR)
}

pub fn volumetric_weight(dims: &Dimensions, divisor: Decimal) -> Decimal {
    dims.length * dims.width * dims.height / divisor
}

/// The measurement fed into tier rounding: the greater of real and
/// volumetric weight when all three dimensions are positive, the real
/// weight alone otherwise.
pub fn reference_index(weight: Decimal, dims: Option<&Dimensions>, divisor: Decimal) -> Decimal {
    match dims {
        Some(d)
            if d.length > Decimal::ZERO
                && d.width > Decimal::ZERO
                && d.height > Decimal::ZERO =>
        {
            weight.max(volumetric_weight(d, divisor))
        }
        _ => weight,
    }
}

/// Round a reference index to the nearest half-tier. A fractional part of
/// exactly 0.5 stays at the half-tier; anything above moves to the next
/// whole tier. This asymmetry is deliberate and priced-in.
pub fn round_to_tier(index: Decimal) -> Result<RateTier, DomainError> {
    if index <= Decimal::ZERO {
        return Err(DomainError::InvalidTier(index));
    }
    let whole = index.floor();
    let frac = index - whole;
    let half = Decimal::new(5, 1);

    let tier = if frac.is_zero() {
        whole
    } else if frac <= half {
        whole + half
    } else {
        whole + Decimal::ONE
    };
    RateTier::new(tier)
}

/// Reference index for a whole shipment: weights and volumetric weights are
/// summed across all packages before comparison, never averaged or tiered
/// per package. Packages without three positive dimensions contribute
/// weight only.
pub fn shipment_reference_index(packages: &[Package], divisor: Decimal) -> Decimal {
    let weight: Decimal = packages.iter().map(|p| p.weight).sum();
    let volume: Decimal = packages
        .iter()
        .filter_map(|p| p.dims.as_ref())
        .filter(|d| d.length > Decimal::ZERO && d.width > Decimal::ZERO && d.height > Decimal::ZERO)
        .map(|d| volumetric_weight(d, divisor))
        .sum();
    if volume > Decimal::ZERO {
        weight.max(volume)
    } else {
        weight
    }
}

/// Tier for a weight/dimensions pair in one step.
pub fn resolve_tier(
    weight: Decimal,
    dims: Option<&Dimensions>,
    divisor: Decimal,
) -> Result<RateTier, DomainError> {
    round_to_tier(reference_index(weight, dims, divisor))
}
