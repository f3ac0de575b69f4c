//! Value objects for the order domain.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::{Money, Product};

/// One product line of an order.
///
/// The name and unit price are snapshots taken from the catalog when the
/// line was added, so later catalog changes never alter an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product name at order time.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit at order time.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Creates an order line for `quantity` units of a catalog product.
    pub fn for_product(product: &Product, quantity: u32) -> Self {
        Self::new(product.id, product.name.clone(), quantity, product.price)
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_item_total_price() {
        let item = OrderItem::new(1, "Widget", 3, Money::new(dec!(10.00)));
        assert_eq!(item.total_price(), Money::new(dec!(30.00)));
    }

    #[test]
    fn test_order_item_snapshots_product() {
        let product = Product::new(7, "Lamp", Money::new(dec!(5.50)));
        let item = OrderItem::for_product(&product, 2);

        assert_eq!(item.product_id, ProductId::new(7));
        assert_eq!(item.product_name, "Lamp");
        assert_eq!(item.unit_price, Money::new(dec!(5.50)));
        assert_eq!(item.total_price(), Money::new(dec!(11.00)));
    }
}
