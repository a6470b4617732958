pub mod commission;
pub mod quote;
pub mod shipment;
pub mod tariff;
pub mod zone;
