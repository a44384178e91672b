use serde::{Deserialize, Serialize};

use crate::domain::{CategoryId, ProductId, SupplierId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Category name resolved when products are joined with categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_ids: Option<Vec<SupplierId>>,
    #[serde(default)]
    pub quantity_in_stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_key: Option<Vec<String>>,
}

impl Product {
    /// Supplier ids referenced by this product, empty when none are listed.
    pub fn supplier_ids(&self) -> &[SupplierId] {
        self.supplier_ids.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quantity: Option<u32>,
}
