use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Parcel box sizes available at the pack station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BoxSize {
    S,
    M,
    L,
}

/// Count of small/medium/large boxes for the current shipment.
///
/// Serialized as `{"S": n, "M": n, "L": n}` on every wire payload that
/// carries box counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxQuantities {
    #[serde(rename = "S")]
    pub small: u32,
    #[serde(rename = "M")]
    pub medium: u32,
    #[serde(rename = "L")]
    pub large: u32,
}

impl BoxQuantities {
    pub fn total(&self) -> u32 {
        self.small + self.medium + self.large
    }

    pub fn get(&self, size: BoxSize) -> u32 {
        match size {
            BoxSize::S => self.small,
            BoxSize::M => self.medium,
            BoxSize::L => self.large,
        }
    }

    pub fn increment(&mut self, size: BoxSize) {
        let slot = self.slot(size);
        *slot = slot.saturating_add(1);
    }

    pub fn decrement(&mut self, size: BoxSize) {
        let slot = self.slot(size);
        *slot = slot.saturating_sub(1);
    }

    /// Store an operator-edited count: floored and clamped at zero, so
    /// negative or non-finite input can never survive as a quantity.
    pub fn set(&mut self, size: BoxSize, raw: f64) {
        *self.slot(size) = normalize_count(raw);
    }

    fn slot(&mut self, size: BoxSize) -> &mut u32 {
        match size {
            BoxSize::S => &mut self.small,
            BoxSize::M => &mut self.medium,
            BoxSize::L => &mut self.large,
        }
    }
}

/// Floor and clamp a numeric edit into a non-negative integer.
pub fn normalize_count(raw: f64) -> u32 {
    if raw.is_finite() && raw >= 0.0 {
        raw.floor().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Carrier linkage reported back to the backend once labels printed.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentMetadata {
    #[serde(rename = "parcelId", skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub boxes: BoxQuantities,
}

/// Format the backend should produce labels in: thermal label markup
/// (A6 ZPL) or full-page documents (A4 PDF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelTypeHint {
    LabelPrinter,
    NormalPrinter,
}

/// One shippable line in a label request.
#[derive(Debug, Clone, Serialize)]
pub struct LabelItem {
    pub sku: String,
    pub ean: String,
    pub qty: u32,
}

/// Request body for the carrier label endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LabelRequest {
    #[serde(rename = "orderId")]
    pub order_id: i64,
    #[serde(rename = "orderNumber", skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub address: AddressText,
    pub items: Vec<LabelItem>,
    pub boxes: BoxQuantities,
    pub label_type: LabelTypeHint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<i64>,
}

/// Shipping address as a single compact editable line.
#[derive(Debug, Clone, Serialize)]
pub struct AddressText {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_floors_and_clamps() {
        assert_eq!(normalize_count(3.9), 3);
        assert_eq!(normalize_count(0.0), 0);
        assert_eq!(normalize_count(-2.0), 0);
        assert_eq!(normalize_count(f64::NAN), 0);
        assert_eq!(normalize_count(f64::INFINITY), 0);
        assert_eq!(normalize_count(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn decrement_stops_at_zero() {
        let mut boxes = BoxQuantities::default();
        boxes.decrement(BoxSize::M);
        assert_eq!(boxes.medium, 0);
        boxes.increment(BoxSize::M);
        boxes.increment(BoxSize::S);
        assert_eq!(boxes.total(), 2);
    }

    #[test]
    fn set_normalizes_operator_input() {
        let mut boxes = BoxQuantities::default();
        boxes.set(BoxSize::L, 2.7);
        assert_eq!(boxes.large, 2);
        boxes.set(BoxSize::L, -1.0);
        assert_eq!(boxes.large, 0);
    }

    #[test]
    fn wire_shape_uses_size_letters() {
        let boxes = BoxQuantities { small: 1, medium: 2, large: 0 };
        let json = serde_json::to_value(&boxes).unwrap();
        assert_eq!(json, serde_json::json!({"S": 1, "M": 2, "L": 0}));
    }
}
