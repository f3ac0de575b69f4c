//! Catalog products.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::Money;

/// A product in the shop catalog.
///
/// Orders only ever read products; the price is copied into each order line
/// at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

impl Product {
    /// Creates a product without a description.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
        }
    }

    /// Sets the catalog description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
