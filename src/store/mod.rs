//! Persistence seam.
//!
//! Every mutating operation runs against an explicit connection scope owned
//! by the implementation; nothing is shared across requests except the pool.
//! `replace_all_items` and `delete_request` are transactional so a concurrent
//! reader never observes a half-replaced item set.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    Category, ItemInput, Product, Request, RequestItemDetail, RequestOverview, RequestStatus,
    Result, Shop, Supplier,
};

mod pg;
#[cfg(test)]
pub(crate) mod memory;

pub use pg::PgStore;

#[async_trait]
pub trait RequestStore: Send + Sync {
    // ---- requests -----------------------------------------------------------

    async fn insert_request(&self, shop_id: Uuid, supplier_id: Uuid) -> Result<Request>;

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>>;

    /// All requests, newest first, with shop/supplier names and item counts.
    async fn list_requests(&self) -> Result<Vec<RequestOverview>>;

    async fn list_shop_requests(&self, shop_id: Uuid) -> Result<Vec<RequestOverview>>;

    /// Sets the status and bumps `updated_at`. `NotFound` when no such request.
    async fn update_status(&self, id: Uuid, status: RequestStatus) -> Result<Request>;

    /// Deletes the request's items, then the request itself, atomically.
    async fn delete_request(&self, id: Uuid) -> Result<()>;

    // ---- request items ------------------------------------------------------

    /// Lines joined with their catalog products, ordered by product name.
    async fn get_items(&self, request_id: Uuid) -> Result<Vec<RequestItemDetail>>;

    /// Overwrites the quantity when the (request, product) pair already
    /// exists, inserts otherwise.
    async fn upsert_item(&self, request_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()>;

    /// No-op when the pair is absent.
    async fn remove_item(&self, request_id: Uuid, product_id: Uuid) -> Result<()>;

    /// Replaces the whole item set in one transaction: delete everything,
    /// reinsert entries with `quantity > 0` (duplicates collapse, last wins),
    /// bump the request's `updated_at`.
    async fn replace_all_items(&self, request_id: Uuid, items: &[ItemInput]) -> Result<()>;

    // ---- lookups ------------------------------------------------------------

    async fn get_shop(&self, id: Uuid) -> Result<Option<Shop>>;

    async fn get_supplier_by_user(&self, user_id: Uuid) -> Result<Option<Supplier>>;

    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Supplier's own shops, or every shop when `supplier_id` is `None`.
    async fn list_shops(&self, supplier_id: Option<Uuid>) -> Result<Vec<Shop>>;

    async fn insert_product(
        &self,
        category_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
        price: rust_decimal::Decimal,
        wholesale_price: Option<rust_decimal::Decimal>,
        image_url: Option<&str>,
    ) -> Result<Product>;

    async fn insert_category(&self, name: &str, description: Option<&str>) -> Result<Category>;

    async fn insert_shop(
        &self,
        supplier_id: Uuid,
        name: &str,
        info: Option<&str>,
        business_type: Option<&str>,
    ) -> Result<Shop>;

    // ---- audit --------------------------------------------------------------

    /// Callers treat this as best-effort; a failure here must never fail the
    /// primary operation.
    async fn log_action(
        &self,
        user_id: Uuid,
        action: &str,
        entity: &str,
        entity_id: Option<Uuid>,
    ) -> Result<()>;
}
