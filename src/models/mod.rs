pub mod labels;
pub mod order;
pub mod shipment;
pub mod status;
