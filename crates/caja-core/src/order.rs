//! # Order Pricing
//!
//! Turns the items a cashier submitted into priced lines, using a snapshot
//! of the catalog taken before any stock is touched.
//!
//! ```text
//! items[] ──► EmptyOrder? ──► too many lines?
//!               │
//!               ▼   for each item, in order
//!         ProductNotFound ──► InvalidQuantity ──► InsufficientStock
//!               │
//!               ▼
//!         subtotal = unit_price × quantity   (price frozen here)
//!         total    = Σ subtotal              (overflow → TooLarge)
//! ```
//!
//! The stock check is cumulative per product: two lines for the same
//! product must fit into its stock together.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};
use crate::validation::{validate_notes, validate_order_size, ValidationResult};

/// One requested line: which product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
}

impl OrderItem {
    pub fn new(product_id: &str, quantity: i64) -> Self {
        OrderItem {
            product_id: product_id.to_string(),
            quantity,
        }
    }
}

/// A sale as submitted at the register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSale {
    /// Checks the parts of the request that do not need the catalog.
    /// Line-level checks happen in [`price_order`].
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyOrder);
        }
        validate_order_size(self.items.len())?;
        validate_notes(self.notes.as_deref())?;
        Ok(())
    }

    /// Distinct product ids in the order, first-seen order.
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id.clone());
            }
        }
        ids
    }
}

/// A cancellation request. The reason is optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CancelSale {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelSale {
    pub fn validate(&self) -> ValidationResult<()> {
        crate::validation::validate_cancel_reason(self.reason.as_deref())
    }
}

/// A line after pricing, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// The whole priced order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Money,
}

impl PricedOrder {
    /// Total quantity per product, in first-seen order.
    pub fn quantities_by_product(&self) -> Vec<(String, i64)> {
        let mut out: Vec<(String, i64)> = Vec::new();
        for line in &self.lines {
            match out.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, qty)) => *qty += line.quantity,
                None => out.push((line.product_id.clone(), line.quantity)),
            }
        }
        out
    }
}

/// Prices `items` against `catalog` (product id → product).
///
/// Inactive products count as missing. Nothing here mutates stock; the
/// caller reserves it afterwards inside its transaction.
pub fn price_order(items: &[OrderItem], catalog: &HashMap<String, Product>) -> CoreResult<PricedOrder> {
    if items.is_empty() {
        return Err(CoreError::EmptyOrder);
    }
    validate_order_size(items.len())?;

    let mut requested: HashMap<&str, i64> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Money::ZERO;

    for item in items {
        let product = catalog
            .get(&item.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        if item.quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }

        let wanted = requested.entry(product.id.as_str()).or_insert(0);
        *wanted = wanted.saturating_add(item.quantity);
        if !product.can_fulfil(*wanted) {
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available: product.stock,
                requested: *wanted,
            });
        }

        let unit_price = product.price();
        let subtotal = unit_price
            .checked_times(item.quantity)
            .ok_or_else(|| too_large("subtotal"))?;
        total = total.checked_add(subtotal).ok_or_else(|| too_large("total"))?;
        lines.push(PricedLine {
            product_id: product.id.clone(),
            product_code: product.code.clone(),
            product_name: product.name.clone(),
            quantity: item.quantity,
            unit_price,
            subtotal,
        });
    }

    Ok(PricedOrder { lines, total })
}

fn too_large(field: &str) -> CoreError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(products: &[Product]) -> HashMap<String, Product> {
        products.iter().map(|p| (p.id.clone(), p.clone())).collect()
    }

    #[test]
    fn test_prices_simple_order() {
        let p = Product::new("P", "Producto", 500, 10);
        let order = price_order(&[OrderItem::new(&p.id, 3)], &catalog(&[p])).unwrap();

        assert_eq!(order.total.cents(), 1500);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].unit_price.cents(), 500);
        assert_eq!(order.lines[0].subtotal.cents(), 1500);
    }

    #[test]
    fn test_total_equals_sum_of_lines() {
        let a = Product::new("A", "A", 199, 50);
        let b = Product::new("B", "B", 1, 50);
        let c = Product::new("C", "C", 2350, 50);
        let items = [
            OrderItem::new(&a.id, 7),
            OrderItem::new(&b.id, 13),
            OrderItem::new(&c.id, 2),
        ];

        let order = price_order(&items, &catalog(&[a, b, c])).unwrap();
        let sum: Money = order.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(order.total, sum);
        assert_eq!(order.total.cents(), 199 * 7 + 13 + 2350 * 2);
    }

    #[test]
    fn test_empty_order() {
        assert!(matches!(
            price_order(&[], &HashMap::new()),
            Err(CoreError::EmptyOrder)
        ));
    }

    #[test]
    fn test_unknown_and_inactive_products() {
        let mut p = Product::new("P", "P", 100, 10);
        let missing = price_order(&[OrderItem::new("nope", 1)], &catalog(&[p.clone()]));
        assert!(matches!(missing, Err(CoreError::ProductNotFound(id)) if id == "nope"));

        p.is_active = false;
        let inactive = price_order(&[OrderItem::new(&p.id, 1)], &catalog(&[p.clone()]));
        assert!(matches!(inactive, Err(CoreError::ProductNotFound(_))));
    }

    #[test]
    fn test_invalid_quantity() {
        let p = Product::new("P", "P", 100, 10);
        let result = price_order(&[OrderItem::new(&p.id, 0)], &catalog(&[p.clone()]));
        assert!(matches!(result, Err(CoreError::InvalidQuantity { quantity: 0, .. })));

        let result = price_order(&[OrderItem::new(&p.id, -2)], &catalog(&[p]));
        assert!(matches!(result, Err(CoreError::InvalidQuantity { quantity: -2, .. })));
    }

    #[test]
    fn test_insufficient_stock() {
        let p = Product::new("P", "P", 100, 2);
        let result = price_order(&[OrderItem::new(&p.id, 5)], &catalog(&[p]));
        match result {
            Err(CoreError::InsufficientStock {
                code,
                available,
                requested,
            }) => {
                assert_eq!(code, "P");
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_stock_check_is_cumulative_per_product() {
        let p = Product::new("P", "P", 100, 5);
        let items = [OrderItem::new(&p.id, 3), OrderItem::new(&p.id, 3)];
        let result = price_order(&items, &catalog(&[p]));
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock { requested: 6, .. })
        ));
    }

    #[test]
    fn test_later_failure_rejects_whole_order() {
        let ok = Product::new("OK", "OK", 100, 10);
        let short = Product::new("SHORT", "Short", 100, 1);
        let items = [OrderItem::new(&ok.id, 1), OrderItem::new(&short.id, 2)];
        assert!(price_order(&items, &catalog(&[ok, short])).is_err());
    }

    #[test]
    fn test_too_many_lines() {
        let p = Product::new("P", "P", 1, 1000);
        let items: Vec<_> = (0..101).map(|_| OrderItem::new(&p.id, 1)).collect();
        assert!(matches!(
            price_order(&items, &catalog(&[p])),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_amount_overflow_is_a_validation_error() {
        let pricey = Product::new("P", "P", i64::MAX / 2, 10);
        let result = price_order(&[OrderItem::new(&pricey.id, 3)], &catalog(&[pricey.clone()]));
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::TooLarge { ref field })) if field == "subtotal"
        ));

        // Each line fits, their sum does not.
        let items = [OrderItem::new(&pricey.id, 2), OrderItem::new(&pricey.id, 1)];
        let result = price_order(&items, &catalog(&[pricey]));
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::TooLarge { ref field })) if field == "total"
        ));
    }

    #[test]
    fn test_huge_quantity_on_a_repeated_line_is_short_stock() {
        let p = Product::new("P", "P", 1, 10);
        let items = [OrderItem::new(&p.id, 5), OrderItem::new(&p.id, i64::MAX)];
        assert!(matches!(
            price_order(&items, &catalog(&[p])),
            Err(CoreError::InsufficientStock { requested: i64::MAX, .. })
        ));
    }

    #[test]
    fn test_quantities_by_product() {
        let a = Product::new("A", "A", 100, 10);
        let b = Product::new("B", "B", 100, 10);
        let items = [
            OrderItem::new(&a.id, 2),
            OrderItem::new(&b.id, 1),
            OrderItem::new(&a.id, 3),
        ];
        let order = price_order(&items, &catalog(&[a.clone(), b.clone()])).unwrap();
        assert_eq!(
            order.quantities_by_product(),
            vec![(a.id.clone(), 5), (b.id.clone(), 1)]
        );
    }

    #[test]
    fn test_new_sale_defaults_and_validation() {
        let sale: NewSale = serde_json::from_str(
            r#"{"items":[{"productId":"p-1","quantity":2},{"productId":"p-1","quantity":1}]}"#,
        )
        .unwrap();
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert_eq!(sale.product_ids(), vec!["p-1".to_string()]);
        assert!(sale.validate().is_ok());

        let empty = NewSale {
            items: vec![],
            payment_method: PaymentMethod::Card,
            notes: None,
        };
        assert!(matches!(empty.validate(), Err(CoreError::EmptyOrder)));

        let chatty = NewSale {
            items: vec![OrderItem::new("p-1", 1)],
            payment_method: PaymentMethod::Card,
            notes: Some("x".repeat(501)),
        };
        assert!(matches!(chatty.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_fractional_quantity_is_rejected_at_deserialization() {
        let parsed: Result<NewSale, _> =
            serde_json::from_str(r#"{"items":[{"productId":"p-1","quantity":1.5}]}"#);
        assert!(parsed.is_err());
    }
}
