//! Request cost aggregation.
//!
//! Pure arithmetic over a request's lines joined with current catalog prices:
//! retail/wholesale totals, per-unit and per-item averages, and each line's
//! share of the total. Values stay unrounded `Decimal`s here; display
//! rounding happens at the export boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RequestItemDetail;

/// Derived view over a request's items. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSummary {
    pub total_cost: Decimal,
    pub total_quantity: i64,
    pub total_retail_cost: Decimal,
    pub total_wholesale_cost: Decimal,
    pub items_count: usize,
    pub avg_price_per_item: Decimal,
    pub avg_price_per_unit: Decimal,
    pub items: Vec<ItemBreakdown>,
}

/// One line of the summary with its share of the request total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBreakdown {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// `line_total / total_cost * 100`, 0 when the total is 0.
    pub percentage: Decimal,
}

/// Wholesale price of an item, falling back to 85% of retail when the catalog
/// carries no explicit wholesale price.
pub fn effective_wholesale_price(item: &RequestItemDetail) -> Decimal {
    item.wholesale_price
        .unwrap_or_else(|| item.price * Decimal::new(85, 2))
}

pub fn summarize(items: &[RequestItemDetail]) -> RequestSummary {
    let mut total_cost = Decimal::ZERO;
    let mut total_wholesale_cost = Decimal::ZERO;
    let mut total_quantity: i64 = 0;

    for item in items {
        let quantity = Decimal::from(item.quantity);
        total_cost += item.price * quantity;
        total_wholesale_cost += effective_wholesale_price(item) * quantity;
        total_quantity += i64::from(item.quantity);
    }

    let items_count = items.len();
    let avg_price_per_item = if items_count > 0 {
        total_cost / Decimal::from(items_count)
    } else {
        Decimal::ZERO
    };
    let avg_price_per_unit = if total_quantity > 0 {
        total_cost / Decimal::from(total_quantity)
    } else {
        Decimal::ZERO
    };

    let breakdown = items
        .iter()
        .map(|item| {
            let line_total = item.price * Decimal::from(item.quantity);
            let percentage = if total_cost > Decimal::ZERO {
                line_total / total_cost * Decimal::from(100)
            } else {
                Decimal::ZERO
            };
            ItemBreakdown {
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.price,
                line_total,
                percentage,
            }
        })
        .collect();

    RequestSummary {
        total_cost,
        total_quantity,
        total_retail_cost: total_cost,
        total_wholesale_cost,
        items_count,
        avg_price_per_item,
        avg_price_per_unit,
        items: breakdown,
    }
}
