//! Tabular export adapter.
//!
//! Renders an aggregated request into a generic row/column report for a
//! downstream spreadsheet writer. This module guarantees row ordering and
//! the literal totals-row values; column widths, fonts and the XLSX binary
//! itself are the writer's concern.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::summary::RequestSummary;
use crate::{Request, Shop};

pub const REPORT_COLUMNS: [&str; 5] =
    ["Товар", "Количество", "Цена за ед.", "Сумма", "% от общей суммы"];
pub const TOTALS_LABEL: &str = "ИТОГО:";
pub const DEFAULT_BUSINESS_TYPE: &str = "ИП";

/// Header block plus a fixed-column table, ready for a spreadsheet writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDocument {
    pub title: String,
    /// Free-text key/value rows rendered above the table.
    pub header: Vec<(String, String)>,
    pub columns: Vec<String>,
    /// One row per item, sorted by product name.
    pub rows: Vec<Vec<String>>,
    pub totals: Vec<String>,
}

/// Currency cells are rounded to whole units, percentages to one decimal
/// place (banker's rounding on both).
fn money(value: Decimal) -> String {
    format!("{} ₸", value.round_dp(0))
}

fn percent(value: Decimal) -> String {
    format!("{}%", value.round_dp(1))
}

fn pieces(quantity: i64) -> String {
    format!("{quantity} шт.")
}

pub fn build_report(request: &Request, shop: &Shop, summary: &RequestSummary) -> TableDocument {
    let business_type = shop
        .business_type
        .clone()
        .unwrap_or_else(|| DEFAULT_BUSINESS_TYPE.to_string());

    let header = vec![
        ("Магазин:".to_string(), shop.name.clone()),
        ("Тип организации:".to_string(), business_type),
        (
            "Дата отправки:".to_string(),
            request.created_at.format("%d.%m.%Y %H:%M").to_string(),
        ),
    ];

    let mut lines = summary.items.clone();
    lines.sort_by(|a, b| a.product_name.cmp(&b.product_name));

    let rows = lines
        .iter()
        .map(|line| {
            vec![
                line.product_name.clone(),
                pieces(i64::from(line.quantity)),
                money(line.unit_price),
                money(line.line_total),
                percent(line.percentage),
            ]
        })
        .collect();

    let totals = vec![
        TOTALS_LABEL.to_string(),
        pieces(summary.total_quantity),
        String::new(),
        money(summary.total_cost),
        "100%".to_string(),
    ];

    TableDocument {
        title: format!("ЗАЯВКА #{}", request.id),
        header,
        columns: REPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        totals,
    }
}
