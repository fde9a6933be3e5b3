//! Canonical product record sent to the catalog service.

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized cabinet product, one per mapped export row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub primary_sku: String,
    pub secondary_sku: String,
    pub brand: String,
    pub door_style: String,
    /// Base category taken from the title, e.g. `Wall` or `Base`.
    pub cabinet_type: String,
    pub discount: f64,
    pub cost_factor: f64,
    pub assembly_fee: f64,
    pub assembly_cost: f64,
    pub retail_price: f64,
    /// Always 0 out of the mapper; computed by the importer from the effective discount.
    pub discount_price: f64,
    pub height: f64,
    pub width: f64,
    pub weight: f64,
    pub doors: u32,
    pub species: String,
    pub image_path: String,
    pub categories: String,
    pub tags: String,
    pub publish: bool,
    /// Set when the title did not match the structured pattern and brand/style fell back to defaults.
    pub low_confidence: bool,
}

impl ProductRecord {
    /// Price after applying `discount` percent, never negative.
    pub fn discounted(retail_price: f64, discount: f64) -> f64 {
        (retail_price * (1.0 - discount / 100.0)).max(0.0)
    }
}

/// What the catalog service returns for a created product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProduct {
    pub id: String,
    #[serde(default)]
    pub primary_sku: Option<String>,
}
