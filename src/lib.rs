//! Supply Portal
//!
//! Self-hosted supplier/retail replenishment portal.
//!
//! ## Features
//! - Global product catalog managed by admins
//! - Shops owned by suppliers
//! - Replenishment requests with a status-gated lifecycle
//! - Cost aggregation (retail/wholesale splits, per-item shares)
//! - Tabular report export for a downstream spreadsheet writer

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod export;
pub mod service;
pub mod store;
pub mod summary;

// =============================================================================
// Core Types
// =============================================================================

/// A replenishment ask from a shop to its owning supplier.
///
/// `supplier_id` is denormalized from the shop at creation time and never
/// diverges from `shops.supplier_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Request {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub supplier_id: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request lifecycle. `Processing` is a valid stored value with no inbound
/// transition wired; it is kept for forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (product, quantity) line of a bulk submission. Parsed once at the HTTP
/// boundary; quantities that are not positive are discarded, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A request line joined with its catalog product, as returned by
/// `RequestStore::get_items` (ordered by product name).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestItemDetail {
    pub product_id: Uuid,
    pub product_name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub quantity: i32,
}

/// Listing row: a request header joined with shop and supplier names plus an
/// item count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestOverview {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub shop_name: String,
    pub supplier_name: String,
    pub status: RequestStatus,
    pub items_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Global catalog entry. Prices are read live at aggregation time, not frozen
/// into the request.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shop {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub name: String,
    pub info: Option<String>,
    pub business_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Supplier profile. `user_id` points into the external auth service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
