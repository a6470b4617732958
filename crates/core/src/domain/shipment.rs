use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tariff::{AgencyId, BackofficeId, CategoryId, RouteLineId, TransportMode};
use crate::domain::zone::ZoneId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentId(pub String);

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical dimensions in centimetres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub weight: Decimal,
    pub dims: Option<Dimensions>,
    /// Packages with no category form their own "uncategorized" group in
    /// groupage pricing.
    pub category: Option<CategoryId>,
}

/// Shipment attributes as read from the shipment collaborator. The core
/// never writes these rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub agency_id: AgencyId,
    pub backoffice_id: BackofficeId,
    pub route_line: RouteLineId,
    pub mode: TransportMode,
    pub origin_zone: ZoneId,
    pub dest_zone: ZoneId,
    pub packages: Vec<Package>,
}

impl Shipment {
    /// Aggregate weight across all packages. Summed, never averaged.
    pub fn total_weight(&self) -> Decimal {
        self.packages.iter().map(|p| p.weight).sum()
    }
}
