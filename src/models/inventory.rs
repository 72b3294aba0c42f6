// src/models/inventory.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One material's running balance, in tons (converted at the read boundary).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i32,
    pub material_name: String,
    pub current_stock_tons: f64,
}

// Administrative stock correction, outside the normal custody/sorting flow.
// The delta may be negative; stock is allowed to go below zero.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentPayload {
    #[validate(length(min = 1, message = "material name is required"))]
    pub material_name: String,
    pub delta_tons: f64,
}
