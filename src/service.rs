//! Request lifecycle.
//!
//! Status-gated mutations over requests: suppliers create and edit pending
//! requests against their own shops, admins complete, reopen and delete
//! them. Every mutation writes a best-effort audit record and, when a NATS
//! client is configured, publishes a small event; neither may fail the
//! primary operation.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::export::{build_report, TableDocument};
use crate::store::RequestStore;
use crate::summary::{summarize, RequestSummary};
use crate::{
    Category, ItemInput, PortalError, Product, Request, RequestItemDetail, RequestOverview,
    RequestStatus, Result, Shop, Supplier,
};

/// A request header with its lines and the derived cost summary.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub request: Request,
    pub items: Vec<RequestItemDetail>,
    pub summary: RequestSummary,
}

#[derive(Clone)]
pub struct RequestService<S> {
    store: S,
    events: Option<async_nats::Client>,
}

impl<S: RequestStore> RequestService<S> {
    pub fn new(store: S, events: Option<async_nats::Client>) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- lifecycle ----------------------------------------------------------

    /// Creates a `pending` request for one of the acting supplier's shops with
    /// an initial (possibly empty) item set.
    pub async fn create(
        &self,
        user_id: Uuid,
        shop_id: Uuid,
        items: Vec<ItemInput>,
    ) -> Result<Request> {
        let supplier = self.acting_supplier(user_id).await?;
        let shop = self
            .store
            .get_shop(shop_id)
            .await?
            .ok_or(PortalError::NotFound("shop"))?;
        if shop.supplier_id != supplier.id {
            return Err(PortalError::Forbidden("shop belongs to another supplier"));
        }

        let request = self.store.insert_request(shop.id, supplier.id).await?;
        self.store.replace_all_items(request.id, &items).await?;

        self.audit(user_id, "create", "request", Some(request.id)).await;
        self.publish("requests.created", &request).await;
        Ok(request)
    }

    /// Replaces the item set of a pending request owned by the acting
    /// supplier.
    pub async fn edit(
        &self,
        user_id: Uuid,
        request_id: Uuid,
        items: Vec<ItemInput>,
    ) -> Result<Request> {
        let supplier = self.acting_supplier(user_id).await?;
        let request = self.get(request_id).await?;
        if request.supplier_id != supplier.id {
            return Err(PortalError::Forbidden("request belongs to another supplier"));
        }
        if request.status != RequestStatus::Pending {
            return Err(PortalError::InvalidState(format!(
                "cannot edit request in status '{}'",
                request.status
            )));
        }

        self.store.replace_all_items(request.id, &items).await?;

        self.audit(user_id, "update", "request", Some(request.id)).await;
        let updated = self.get(request_id).await?;
        self.publish("requests.updated", &updated).await;
        Ok(updated)
    }

    /// Admin action: `pending | processing` → `completed`.
    pub async fn mark_processed(&self, user_id: Uuid, request_id: Uuid) -> Result<Request> {
        let request = self.get(request_id).await?;
        if request.status == RequestStatus::Completed {
            return Err(PortalError::InvalidState(format!(
                "cannot mark request in status '{}' as processed",
                request.status
            )));
        }

        let updated = self
            .store
            .update_status(request_id, RequestStatus::Completed)
            .await?;
        self.audit(user_id, "update", "request", Some(request_id)).await;
        self.publish("requests.completed", &updated).await;
        Ok(updated)
    }

    /// Admin action: `completed` → `pending`, allowing a correction cycle.
    pub async fn reopen(&self, user_id: Uuid, request_id: Uuid) -> Result<Request> {
        let request = self.get(request_id).await?;
        if request.status != RequestStatus::Completed {
            return Err(PortalError::InvalidState(format!(
                "cannot reopen request in status '{}'",
                request.status
            )));
        }

        let updated = self
            .store
            .update_status(request_id, RequestStatus::Pending)
            .await?;
        self.audit(user_id, "update", "request", Some(request_id)).await;
        self.publish("requests.reopened", &updated).await;
        Ok(updated)
    }

    /// Admin action: removes the request and its items in any state.
    pub async fn delete(&self, user_id: Uuid, request_id: Uuid) -> Result<()> {
        let request = self.get(request_id).await?;
        self.store.delete_request(request.id).await?;

        self.audit(user_id, "delete", "request", Some(request.id)).await;
        self.publish("requests.deleted", &request).await;
        Ok(())
    }

    // ---- read side ----------------------------------------------------------

    /// Request header, lines and cost summary. With `acting_user` set, the
    /// resolved supplier must own the request.
    pub async fn view(&self, request_id: Uuid, acting_user: Option<Uuid>) -> Result<RequestView> {
        let request = self.get(request_id).await?;
        if let Some(user_id) = acting_user {
            let supplier = self.acting_supplier(user_id).await?;
            if request.supplier_id != supplier.id {
                return Err(PortalError::Forbidden("request belongs to another supplier"));
            }
        }

        let items = self.store.get_items(request.id).await?;
        let summary = summarize(&items);
        Ok(RequestView { request, items, summary })
    }

    pub async fn list_requests(&self) -> Result<Vec<RequestOverview>> {
        self.store.list_requests().await
    }

    /// Requests of one shop. With `acting_user` set, the resolved supplier
    /// must own the shop.
    pub async fn shop_requests(
        &self,
        shop_id: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<Vec<RequestOverview>> {
        let shop = self
            .store
            .get_shop(shop_id)
            .await?
            .ok_or(PortalError::NotFound("shop"))?;
        if let Some(user_id) = acting_user {
            let supplier = self.acting_supplier(user_id).await?;
            if shop.supplier_id != supplier.id {
                return Err(PortalError::Forbidden("shop belongs to another supplier"));
            }
        }
        self.store.list_shop_requests(shop.id).await
    }

    /// Report for the downstream spreadsheet writer.
    pub async fn export(&self, request_id: Uuid) -> Result<TableDocument> {
        let request = self.get(request_id).await?;
        let shop = self
            .store
            .get_shop(request.shop_id)
            .await?
            .ok_or(PortalError::NotFound("shop"))?;
        let items = self.store.get_items(request.id).await?;
        Ok(build_report(&request, &shop, &summarize(&items)))
    }

    // ---- catalog & shop plumbing --------------------------------------------

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.store.list_products().await
    }

    pub async fn create_product(
        &self,
        user_id: Uuid,
        category_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        wholesale_price: Option<Decimal>,
        image_url: Option<&str>,
    ) -> Result<Product> {
        if price <= Decimal::ZERO {
            return Err(PortalError::Validation("price must be positive".into()));
        }
        if wholesale_price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(PortalError::Validation("wholesale price must be positive".into()));
        }
        let product = self
            .store
            .insert_product(category_id, name, description, price, wholesale_price, image_url)
            .await?;
        self.audit(user_id, "create", "product", Some(product.id)).await;
        Ok(product)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.store.list_categories().await
    }

    pub async fn create_category(
        &self,
        user_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category> {
        let category = self.store.insert_category(name, description).await?;
        self.audit(user_id, "create", "category", Some(category.id)).await;
        Ok(category)
    }

    /// Supplier's own shops, or every shop when `acting_user` is `None`.
    pub async fn list_shops(&self, acting_user: Option<Uuid>) -> Result<Vec<Shop>> {
        match acting_user {
            Some(user_id) => {
                let supplier = self.acting_supplier(user_id).await?;
                self.store.list_shops(Some(supplier.id)).await
            }
            None => self.store.list_shops(None).await,
        }
    }

    pub async fn create_shop(
        &self,
        user_id: Uuid,
        name: &str,
        info: Option<&str>,
        business_type: Option<&str>,
    ) -> Result<Shop> {
        let supplier = self.acting_supplier(user_id).await?;
        let shop = self
            .store
            .insert_shop(supplier.id, name, info, business_type)
            .await?;
        self.audit(user_id, "create", "shop", Some(shop.id)).await;
        Ok(shop)
    }

    // ---- internals ----------------------------------------------------------

    async fn get(&self, request_id: Uuid) -> Result<Request> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or(PortalError::NotFound("request"))
    }

    async fn acting_supplier(&self, user_id: Uuid) -> Result<Supplier> {
        self.store
            .get_supplier_by_user(user_id)
            .await?
            .ok_or(PortalError::Forbidden("no supplier profile for user"))
    }

    async fn audit(&self, user_id: Uuid, action: &str, entity: &str, entity_id: Option<Uuid>) {
        if let Err(err) = self.store.log_action(user_id, action, entity, entity_id).await {
            tracing::warn!(%err, action, entity, "audit log write failed");
        }
    }

    async fn publish(&self, subject: &str, request: &Request) {
        let Some(client) = &self.events else { return };
        let payload = serde_json::json!({
            "request_id": request.id,
            "shop_id": request.shop_id,
            "supplier_id": request.supplier_id,
            "status": request.status,
        });
        if let Err(err) = client
            .publish(subject.to_string(), payload.to_string().into())
            .await
        {
            tracing::warn!(%err, subject, "event publish failed");
        }
    }
}
