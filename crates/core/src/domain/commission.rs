use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionKind {
    Percentage,
    Fixed,
}

/// Named commission rate applied to auxiliary fees (pickup-at-home,
/// home-delivery, late-pickup penalty). Read-mostly; cached by the
/// calculator with explicit invalidation on write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSetting {
    pub key: String,
    pub value: Decimal,
    pub kind: CommissionKind,
    pub active: bool,
}

/// An auxiliary fee divided between two beneficiaries: the commission share
/// and whatever remains of the fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub commission: Decimal,
    pub remainder: Decimal,
}
