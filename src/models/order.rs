use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::shipment::BoxQuantities;
use crate::models::status::CanonStatus;
use crate::pick::PickLine;

/// A work item leased to this operator by the pack queue.
///
/// The backend sends many more fields than the station needs; anything
/// not listed here is ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimedOrder {
    #[serde(default)]
    pub order_id: i64,
    #[serde(default)]
    pub order_number: Option<String>,

    #[serde(default, rename = "productos")]
    pub products: Vec<OrderProduct>,

    /// Raw backend/carrier status string, folded via
    /// [`ClaimedOrder::canon_status`] before any workflow decision.
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub shipping_address1: Option<String>,
    #[serde(default)]
    pub shipping_address2: Option<String>,
    #[serde(default)]
    pub shipping_zip: Option<String>,
    #[serde(default)]
    pub shipping_city: Option<String>,
    #[serde(default)]
    pub shipping_province: Option<String>,
    #[serde(default)]
    pub shipping_country: Option<String>,
    #[serde(default)]
    pub shipping_phone: Option<String>,

    /// Box-count defaults suggested by the backend.
    #[serde(default)]
    pub cajas_s: Option<i64>,
    #[serde(default)]
    pub cajas_m: Option<i64>,
    #[serde(default)]
    pub cajas_l: Option<i64>,

    /// Carrier linkage, forwarded verbatim on the label request.
    #[serde(default)]
    pub shipping_product_id: Option<i64>,
    #[serde(default)]
    pub contract_id: Option<i64>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One product line inside a claimed order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub quantity: u32,
}

impl ClaimedOrder {
    /// Map the order's products into pick lines, all starting at zero
    /// picked.
    pub fn pick_lines(&self) -> Vec<PickLine> {
        self.products
            .iter()
            .map(|p| PickLine {
                title: p
                    .name
                    .clone()
                    .or_else(|| p.sku.clone())
                    .unwrap_or_else(|| "Item".to_string()),
                reference: p.sku.clone().unwrap_or_default(),
                barcode: p.ean.clone().unwrap_or_default(),
                location: p.location.clone().unwrap_or_default(),
                weight: p.weight.unwrap_or(0.0),
                ordered: p.quantity,
                picked: 0,
            })
            .collect()
    }

    /// Compact one-line shipping address, blank parts skipped.
    pub fn address_text(&self) -> String {
        let zip_city = format!(
            "{} {}",
            self.shipping_zip.as_deref().unwrap_or(""),
            self.shipping_city.as_deref().unwrap_or("")
        )
        .trim()
        .to_string();

        [
            self.customer_name.as_deref().unwrap_or(""),
            self.shipping_address1.as_deref().unwrap_or(""),
            self.shipping_address2.as_deref().unwrap_or(""),
            &zip_city,
            self.shipping_province.as_deref().unwrap_or(""),
            self.shipping_country.as_deref().unwrap_or(""),
            self.shipping_phone.as_deref().unwrap_or(""),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" · ")
    }

    /// Canonical workflow state for this order. Missing raw status folds
    /// to unprepared, which is the only claimable state anyway.
    pub fn canon_status(&self) -> CanonStatus {
        CanonStatus::from_raw(self.status.as_deref().unwrap_or(""))
    }

    /// Box-count defaults from the order; non-positive values become 0.
    pub fn initial_boxes(&self) -> BoxQuantities {
        let clamp = |v: Option<i64>| v.filter(|n| *n > 0).unwrap_or(0) as u32;
        BoxQuantities {
            small: clamp(self.cajas_s),
            medium: clamp(self.cajas_m),
            large: clamp(self.cajas_l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_json() -> serde_json::Value {
        serde_json::json!({
            "order_id": 42,
            "order_number": "#1042",
            "productos": [
                {"name": "Blue Mug", "sku": "MUG-BL", "ean": "8412345678905", "location": "A-03-2", "weight": 0.35, "quantity": 2},
                {"sku": "MUG-RD", "quantity": 1}
            ],
            "customer_name": "Jane Roe",
            "shipping_address1": "Calle Mayor 1",
            "shipping_zip": "28001",
            "shipping_city": "Madrid",
            "shipping_country": "ES",
            "cajas_s": 1,
            "cajas_m": -2,
            "shipping_product_id": 8,
            "status": "to pack",
            "some_unknown_field": true
        })
    }

    #[test]
    fn deserializes_with_unknown_fields() {
        let order: ClaimedOrder = serde_json::from_value(order_json()).unwrap();
        assert_eq!(order.order_id, 42);
        assert_eq!(order.products.len(), 2);
        assert_eq!(order.shipping_product_id, Some(8));
    }

    #[test]
    fn pick_lines_default_missing_fields() {
        let order: ClaimedOrder = serde_json::from_value(order_json()).unwrap();
        let lines = order.pick_lines();
        assert_eq!(lines[0].title, "Blue Mug");
        assert_eq!(lines[0].ordered, 2);
        assert_eq!(lines[0].picked, 0);
        // Second line has no name, the SKU stands in as title.
        assert_eq!(lines[1].title, "MUG-RD");
        assert_eq!(lines[1].barcode, "");
    }

    #[test]
    fn address_text_skips_blanks() {
        let order: ClaimedOrder = serde_json::from_value(order_json()).unwrap();
        assert_eq!(order.address_text(), "Jane Roe · Calle Mayor 1 · 28001 Madrid · ES");
    }

    #[test]
    fn status_folds_to_canonical_state() {
        let mut order: ClaimedOrder = serde_json::from_value(order_json()).unwrap();
        assert!(order.canon_status().is_editable());

        order.status = Some("Enviado".into());
        assert!(!order.canon_status().is_editable());

        order.status = None;
        assert!(order.canon_status().is_editable());
    }

    #[test]
    fn initial_boxes_clamp_non_positive() {
        let order: ClaimedOrder = serde_json::from_value(order_json()).unwrap();
        let boxes = order.initial_boxes();
        assert_eq!(boxes.small, 1);
        assert_eq!(boxes.medium, 0);
        assert_eq!(boxes.large, 0);
    }
}
