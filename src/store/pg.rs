//! PostgreSQL store.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::RequestStore;
use crate::{
    Category, ItemInput, PortalError, Product, Request, RequestItemDetail, RequestOverview,
    RequestStatus, Result, Shop, Supplier,
};

const OVERVIEW_SELECT: &str = "SELECT r.id, r.shop_id, sh.name AS shop_name, s.name AS supplier_name, r.status, \
            COUNT(ri.id) AS items_count, r.created_at, r.updated_at \
     FROM requests r \
     JOIN shops sh ON sh.id = r.shop_id \
     JOIN suppliers s ON s.id = r.supplier_id \
     LEFT JOIN request_items ri ON ri.request_id = r.id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn insert_request(&self, shop_id: Uuid, supplier_id: Uuid) -> Result<Request> {
        let request = sqlx::query_as::<_, Request>(
            "INSERT INTO requests (id, shop_id, supplier_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, 'pending', NOW(), NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(shop_id)
        .bind(supplier_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn list_requests(&self) -> Result<Vec<RequestOverview>> {
        let sql = format!(
            "{OVERVIEW_SELECT} GROUP BY r.id, sh.name, s.name ORDER BY r.created_at DESC"
        );
        let rows = sqlx::query_as::<_, RequestOverview>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_shop_requests(&self, shop_id: Uuid) -> Result<Vec<RequestOverview>> {
        let sql = format!(
            "{OVERVIEW_SELECT} WHERE r.shop_id = $1 \
             GROUP BY r.id, sh.name, s.name ORDER BY r.created_at DESC"
        );
        let rows = sqlx::query_as::<_, RequestOverview>(&sql)
            .bind(shop_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_status(&self, id: Uuid, status: RequestStatus) -> Result<Request> {
        sqlx::query_as::<_, Request>(
            "UPDATE requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PortalError::NotFound("request"))
    }

    async fn delete_request(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM request_items WHERE request_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_items(&self, request_id: Uuid) -> Result<Vec<RequestItemDetail>> {
        let items = sqlx::query_as::<_, RequestItemDetail>(
            "SELECT ri.product_id, p.name AS product_name, p.description, p.price, \
                    p.wholesale_price, ri.quantity \
             FROM request_items ri \
             JOIN products p ON p.id = ri.product_id \
             WHERE ri.request_id = $1 \
             ORDER BY p.name",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn upsert_item(&self, request_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()> {
        sqlx::query(
            "INSERT INTO request_items (id, request_id, product_id, quantity) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (request_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
        )
        .bind(Uuid::now_v7())
        .bind(request_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, request_id: Uuid, product_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM request_items WHERE request_id = $1 AND product_id = $2")
            .bind(request_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_all_items(&self, request_id: Uuid, items: &[ItemInput]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM request_items WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        for item in items.iter().filter(|i| i.quantity > 0) {
            sqlx::query(
                "INSERT INTO request_items (id, request_id, product_id, quantity) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (request_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
            )
            .bind(Uuid::now_v7())
            .bind(request_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE requests SET updated_at = NOW() WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_shop(&self, id: Uuid) -> Result<Option<Shop>> {
        let shop = sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shop)
    }

    async fn get_supplier_by_user(&self, user_id: Uuid) -> Result<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn list_shops(&self, supplier_id: Option<Uuid>) -> Result<Vec<Shop>> {
        let shops = match supplier_id {
            Some(supplier_id) => {
                sqlx::query_as::<_, Shop>(
                    "SELECT * FROM shops WHERE supplier_id = $1 ORDER BY created_at DESC",
                )
                .bind(supplier_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Shop>("SELECT * FROM shops ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(shops)
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
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, category_id, name, description, price, wholesale_price, \
                                   image_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(category_id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(wholesale_price)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn insert_category(&self, name: &str, description: Option<&str>) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn insert_shop(
        &self,
        supplier_id: Uuid,
        name: &str,
        info: Option<&str>,
        business_type: Option<&str>,
    ) -> Result<Shop> {
        let shop = sqlx::query_as::<_, Shop>(
            "INSERT INTO shops (id, supplier_id, name, info, business_type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(supplier_id)
        .bind(name)
        .bind(info)
        .bind(business_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(shop)
    }

    async fn log_action(
        &self,
        user_id: Uuid,
        action: &str,
        entity: &str,
        entity_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO logs (id, user_id, action, entity, entity_id) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
