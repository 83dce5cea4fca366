//! In-memory store used by unit tests. Mirrors the contract documented on
//! `RequestStore`, including the replace/upsert semantics the Postgres
//! implementation gets from `ON CONFLICT`.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Mutex;
use uuid::Uuid;

use super::RequestStore;
use crate::{
    Category, ItemInput, PortalError, Product, Request, RequestItemDetail, RequestOverview,
    RequestStatus, Result, Shop, Supplier,
};

#[derive(Debug, Clone)]
struct StoredItem {
    request_id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
struct AuditRecord {
    user_id: Uuid,
    action: String,
    entity: String,
    entity_id: Option<Uuid>,
}

#[derive(Default)]
struct Inner {
    requests: Vec<Request>,
    items: Vec<StoredItem>,
    products: Vec<Product>,
    categories: Vec<Category>,
    shops: Vec<Shop>,
    suppliers: Vec<Supplier>,
    logs: Vec<AuditRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_supplier(&self, user_id: Uuid) -> Supplier {
        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::now_v7(),
            user_id,
            name: "Test Supplier".into(),
            info: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().suppliers.push(supplier.clone());
        supplier
    }

    pub fn seed_shop(&self, supplier_id: Uuid) -> Shop {
        let now = Utc::now();
        let shop = Shop {
            id: Uuid::now_v7(),
            supplier_id,
            name: "Test Shop".into(),
            info: None,
            business_type: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().shops.push(shop.clone());
        shop
    }

    pub fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        wholesale_price: Option<Decimal>,
    ) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(),
            category_id: None,
            name: name.into(),
            description: None,
            price,
            wholesale_price,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().products.push(product.clone());
        product
    }

    pub fn audit_count(&self) -> usize {
        self.inner.lock().unwrap().logs.len()
    }
}

fn overview(inner: &Inner, request: &Request) -> RequestOverview {
    let shop = inner.shops.iter().find(|s| s.id == request.shop_id);
    let supplier = inner.suppliers.iter().find(|s| s.id == request.supplier_id);
    let items_count = inner
        .items
        .iter()
        .filter(|i| i.request_id == request.id)
        .count() as i64;
    RequestOverview {
        id: request.id,
        shop_id: request.shop_id,
        shop_name: shop.map(|s| s.name.clone()).unwrap_or_default(),
        supplier_name: supplier.map(|s| s.name.clone()).unwrap_or_default(),
        status: request.status,
        items_count,
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, shop_id: Uuid, supplier_id: Uuid) -> Result<Request> {
        let now = Utc::now();
        let request = Request {
            id: Uuid::now_v7(),
            shop_id,
            supplier_id,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().requests.push(request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(&self) -> Result<Vec<RequestOverview>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<_> = inner.requests.iter().map(|r| overview(&inner, r)).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_shop_requests(&self, shop_id: Uuid) -> Result<Vec<RequestOverview>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<_> = inner
            .requests
            .iter()
            .filter(|r| r.shop_id == shop_id)
            .map(|r| overview(&inner, r))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update_status(&self, id: Uuid, status: RequestStatus) -> Result<Request> {
        let mut inner = self.inner.lock().unwrap();
        let request = inner
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PortalError::NotFound("request"))?;
        request.status = status;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    async fn delete_request(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.items.retain(|i| i.request_id != id);
        inner.requests.retain(|r| r.id != id);
        Ok(())
    }

    async fn get_items(&self, request_id: Uuid) -> Result<Vec<RequestItemDetail>> {
        let inner = self.inner.lock().unwrap();
        let mut details: Vec<_> = inner
            .items
            .iter()
            .filter(|i| i.request_id == request_id)
            .filter_map(|i| {
                let product = inner.products.iter().find(|p| p.id == i.product_id)?;
                Some(RequestItemDetail {
                    product_id: i.product_id,
                    product_name: product.name.clone(),
                    description: product.description.clone(),
                    price: product.price,
                    wholesale_price: product.wholesale_price,
                    quantity: i.quantity,
                })
            })
            .collect();
        details.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        Ok(details)
    }

    async fn upsert_item(&self, request_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .items
            .iter_mut()
            .find(|i| i.request_id == request_id && i.product_id == product_id)
        {
            Some(existing) => existing.quantity = quantity,
            None => inner.items.push(StoredItem { request_id, product_id, quantity }),
        }
        Ok(())
    }

    async fn remove_item(&self, request_id: Uuid, product_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .items
            .retain(|i| !(i.request_id == request_id && i.product_id == product_id));
        Ok(())
    }

    async fn replace_all_items(&self, request_id: Uuid, items: &[ItemInput]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.items.retain(|i| i.request_id != request_id);
        for item in items.iter().filter(|i| i.quantity > 0) {
            match inner
                .items
                .iter_mut()
                .find(|i| i.request_id == request_id && i.product_id == item.product_id)
            {
                Some(existing) => existing.quantity = item.quantity,
                None => inner.items.push(StoredItem {
                    request_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                }),
            }
        }
        if let Some(request) = inner.requests.iter_mut().find(|r| r.id == request_id) {
            request.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_shop(&self, id: Uuid) -> Result<Option<Shop>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.shops.iter().find(|s| s.id == id).cloned())
    }

    async fn get_supplier_by_user(&self, user_id: Uuid) -> Result<Option<Supplier>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.suppliers.iter().find(|s| s.user_id == user_id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let inner = self.inner.lock().unwrap();
        let mut products = inner.products.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let inner = self.inner.lock().unwrap();
        let mut categories = inner.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_shops(&self, supplier_id: Option<Uuid>) -> Result<Vec<Shop>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .shops
            .iter()
            .filter(|s| supplier_id.map_or(true, |id| s.supplier_id == id))
            .cloned()
            .collect())
    }

    async fn insert_product(
        &self,
        category_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        wholesale_price: Option<Decimal>,
        image_url: Option<&str>,
    ) -> Result<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(),
            category_id,
            name: name.into(),
            description: description.map(Into::into),
            price,
            wholesale_price,
            image_url: image_url.map(Into::into),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().products.push(product.clone());
        Ok(product)
    }

    async fn insert_category(&self, name: &str, description: Option<&str>) -> Result<Category> {
        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(),
            name: name.into(),
            description: description.map(Into::into),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().categories.push(category.clone());
        Ok(category)
    }

    async fn insert_shop(
        &self,
        supplier_id: Uuid,
        name: &str,
        info: Option<&str>,
        business_type: Option<&str>,
    ) -> Result<Shop> {
        let now = Utc::now();
        let shop = Shop {
            id: Uuid::now_v7(),
            supplier_id,
            name: name.into(),
            info: info.map(Into::into),
            business_type: business_type.map(Into::into),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().shops.push(shop.clone());
        Ok(shop)
    }

    async fn log_action(
        &self,
        user_id: Uuid,
        action: &str,
        entity: &str,
        entity_id: Option<Uuid>,
    ) -> Result<()> {
        self.inner.lock().unwrap().logs.push(AuditRecord {
            user_id,
            action: action.into(),
            entity: entity.into(),
            entity_id,
        });
        Ok(())
    }
}
