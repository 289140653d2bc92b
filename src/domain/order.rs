//! Order aggregate: line items and the derived total.
//!
//! The aggregate is pure in-memory state. Stock checks here are a fast
//! fail against the caller-supplied product snapshot; the inventory
//! ledger's locked check remains authoritative.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{OrderError, Result};

/// Product state as visible to the caller at attach time. May be stale
/// when read without a lock.
#[derive(Clone, Debug)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// One (product, quantity, captured price) entry within an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrderAggregate {
    items: Vec<LineItem>,
}

impl OrderAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the aggregate from already-persisted line items.
    pub fn with_items(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attaches a line item, capturing the product's current price when
    /// no override is given. Rejects quantities that exceed the stock
    /// visible in `product`. Returns the captured line item.
    pub fn attach_item(
        &mut self,
        product: &ProductSnapshot,
        quantity: i32,
        price_override: Option<Decimal>,
    ) -> Result<LineItem> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity);
        }
        if quantity > product.stock {
            return Err(OrderError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }
        let unit_price = price_override.unwrap_or(product.price);
        if unit_price < Decimal::ZERO {
            return Err(OrderError::InvalidPrice);
        }
        let item = LineItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price,
        };
        self.items.push(item.clone());
        Ok(item)
    }

    /// Recomputes the order total from current line items. Must be
    /// called explicitly after line items change; there is no implicit
    /// recalculation hook.
    pub fn recompute_total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, price: Decimal, stock: i32) -> ProductSnapshot {
        ProductSnapshot { id: Uuid::new_v4(), name: name.into(), price, stock }
    }

    #[test]
    fn total_is_exact_sum_of_line_totals() {
        let mut order = OrderAggregate::new();
        order.attach_item(&snapshot("Product 1", Decimal::new(10000, 2), 10), 2, None).unwrap();
        order.attach_item(&snapshot("Product 2", Decimal::new(20000, 2), 5), 1, None).unwrap();
        assert_eq!(order.recompute_total(), Decimal::new(40000, 2));
    }

    #[test]
    fn price_override_is_captured_instead_of_catalog_price() {
        let mut order = OrderAggregate::new();
        order
            .attach_item(&snapshot("P", Decimal::new(10000, 2), 10), 3, Some(Decimal::new(9050, 2)))
            .unwrap();
        assert_eq!(order.items()[0].unit_price, Decimal::new(9050, 2));
        assert_eq!(order.recompute_total(), Decimal::new(27150, 2));
    }

    #[test]
    fn attach_rejects_quantity_over_visible_stock() {
        let mut order = OrderAggregate::new();
        let err = order
            .attach_item(&snapshot("Product 2", Decimal::new(20000, 2), 5), 10, None)
            .unwrap_err();
        match err {
            OrderError::InsufficientStock { product, available } => {
                assert_eq!(product, "Product 2");
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(order.is_empty());
    }

    #[test]
    fn attach_rejects_non_positive_quantity() {
        let mut order = OrderAggregate::new();
        assert!(matches!(
            order.attach_item(&snapshot("P", Decimal::ONE, 5), 0, None),
            Err(OrderError::InvalidQuantity)
        ));
    }

    #[test]
    fn attach_rejects_negative_price_override() {
        let mut order = OrderAggregate::new();
        assert!(matches!(
            order.attach_item(&snapshot("P", Decimal::ONE, 5), 1, Some(Decimal::new(-100, 2))),
            Err(OrderError::InvalidPrice)
        ));
    }

    #[test]
    fn empty_order_has_zero_total() {
        let order = OrderAggregate::new();
        assert!(order.is_empty());
        assert_eq!(order.recompute_total(), Decimal::ZERO);
    }
}
