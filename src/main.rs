//! Supply Portal - supplier/retail replenishment service
//!
//! Authentication and session handling live in an upstream proxy; the
//! authenticated identity arrives as `x-user-id` / `x-user-role` headers.

use anyhow::Result;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use supply_portal::export::TableDocument;
use supply_portal::service::{RequestService, RequestView};
use supply_portal::store::PgStore;
use supply_portal::{
    Category, ItemInput, PortalError, Product, Request, RequestOverview, Shop,
};

#[derive(Clone)]
pub struct AppState {
    pub service: RequestService<PgStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => async_nats::connect(url.as_str()).await.ok(),
        Err(_) => None,
    };
    let state = AppState { service: RequestService::new(PgStore::new(db), nats) };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "supply-portal"})) }))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/categories", get(list_categories).post(create_category))
        .route("/api/v1/shops", get(list_shops).post(create_shop))
        .route("/api/v1/shops/:shop_id/requests", get(shop_requests).post(create_request))
        .route("/api/v1/requests", get(list_requests))
        .route("/api/v1/requests/:id", get(view_request).delete(delete_request))
        .route("/api/v1/requests/:id/items", put(edit_request))
        .route("/api/v1/requests/:id/process", post(mark_processed))
        .route("/api/v1/requests/:id/reopen", post(reopen_request))
        .route("/api/v1/requests/:id/export", get(export_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("supply-portal listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

// =============================================================================
// Identity & error plumbing
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role { Admin, Supplier }

/// Identity forwarded by the upstream auth proxy.
pub struct ActingUser { pub user_id: Uuid, pub role: Role }

impl ActingUser {
    fn require_admin(&self) -> Result<(), (StatusCode, String)> {
        if self.role == Role::Admin { Ok(()) } else { Err((StatusCode::FORBIDDEN, "admin role required".to_string())) }
    }

    fn require_supplier(&self) -> Result<(), (StatusCode, String)> {
        if self.role == Role::Supplier { Ok(()) } else { Err((StatusCode::FORBIDDEN, "supplier role required".to_string())) }
    }

    /// `Some(user_id)` when ownership must be enforced, `None` for admins.
    fn supplier_scope(&self) -> Option<Uuid> {
        match self.role { Role::Admin => None, Role::Supplier => Some(self.user_id) }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing or invalid x-user-id header".to_string()))?;
        let role = match parts.headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
            Some("admin") => Role::Admin,
            Some("supplier") => Role::Supplier,
            _ => return Err((StatusCode::UNAUTHORIZED, "missing or invalid x-user-role header".to_string())),
        };
        Ok(ActingUser { user_id, role })
    }
}

fn http_error(err: PortalError) -> (StatusCode, String) {
    let status = match &err {
        PortalError::NotFound(_) => StatusCode::NOT_FOUND,
        PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
        PortalError::InvalidState(_) => StatusCode::CONFLICT,
        PortalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PortalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn invalid(err: validator::ValidationErrors) -> (StatusCode, String) {
    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
}

// =============================================================================
// Catalog & shop plumbing
// =============================================================================

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    s.service.list_products().await.map(Json).map_err(http_error)
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateProductPayload {
    #[validate(length(min = 1))] pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

async fn create_product(State(s): State<AppState>, actor: ActingUser, Json(r): Json<CreateProductPayload>) -> Result<(StatusCode, Json<Product>), (StatusCode, String)> {
    actor.require_admin()?;
    r.validate().map_err(invalid)?;
    let product = s.service
        .create_product(actor.user_id, r.category_id, &r.name, r.description.as_deref(), r.price, r.wholesale_price, r.image_url.as_deref())
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>, (StatusCode, String)> {
    s.service.list_categories().await.map(Json).map_err(http_error)
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1))] pub name: String,
    pub description: Option<String>,
}

async fn create_category(State(s): State<AppState>, actor: ActingUser, Json(r): Json<CreateCategoryPayload>) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    actor.require_admin()?;
    r.validate().map_err(invalid)?;
    let category = s.service
        .create_category(actor.user_id, &r.name, r.description.as_deref())
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_shops(State(s): State<AppState>, actor: ActingUser) -> Result<Json<Vec<Shop>>, (StatusCode, String)> {
    s.service.list_shops(actor.supplier_scope()).await.map(Json).map_err(http_error)
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateShopPayload {
    #[validate(length(min = 1))] pub name: String,
    pub info: Option<String>,
    pub business_type: Option<String>,
}

async fn create_shop(State(s): State<AppState>, actor: ActingUser, Json(r): Json<CreateShopPayload>) -> Result<(StatusCode, Json<Shop>), (StatusCode, String)> {
    actor.require_supplier()?;
    r.validate().map_err(invalid)?;
    let shop = s.service
        .create_shop(actor.user_id, &r.name, r.info.as_deref(), r.business_type.as_deref())
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(shop)))
}

// =============================================================================
// Request lifecycle
// =============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct ItemsPayload { pub items: Vec<ItemInput> }

async fn create_request(State(s): State<AppState>, actor: ActingUser, Path(shop_id): Path<Uuid>, Json(r): Json<ItemsPayload>) -> Result<(StatusCode, Json<Request>), (StatusCode, String)> {
    actor.require_supplier()?;
    let request = s.service.create(actor.user_id, shop_id, r.items).await.map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn edit_request(State(s): State<AppState>, actor: ActingUser, Path(id): Path<Uuid>, Json(r): Json<ItemsPayload>) -> Result<Json<Request>, (StatusCode, String)> {
    actor.require_supplier()?;
    s.service.edit(actor.user_id, id, r.items).await.map(Json).map_err(http_error)
}

async fn list_requests(State(s): State<AppState>, actor: ActingUser) -> Result<Json<Vec<RequestOverview>>, (StatusCode, String)> {
    actor.require_admin()?;
    s.service.list_requests().await.map(Json).map_err(http_error)
}

async fn shop_requests(State(s): State<AppState>, actor: ActingUser, Path(shop_id): Path<Uuid>) -> Result<Json<Vec<RequestOverview>>, (StatusCode, String)> {
    s.service.shop_requests(shop_id, actor.supplier_scope()).await.map(Json).map_err(http_error)
}

async fn view_request(State(s): State<AppState>, actor: ActingUser, Path(id): Path<Uuid>) -> Result<Json<RequestView>, (StatusCode, String)> {
    s.service.view(id, actor.supplier_scope()).await.map(Json).map_err(http_error)
}

async fn mark_processed(State(s): State<AppState>, actor: ActingUser, Path(id): Path<Uuid>) -> Result<Json<Request>, (StatusCode, String)> {
    actor.require_admin()?;
    s.service.mark_processed(actor.user_id, id).await.map(Json).map_err(http_error)
}

async fn reopen_request(State(s): State<AppState>, actor: ActingUser, Path(id): Path<Uuid>) -> Result<Json<Request>, (StatusCode, String)> {
    actor.require_admin()?;
    s.service.reopen(actor.user_id, id).await.map(Json).map_err(http_error)
}

async fn delete_request(State(s): State<AppState>, actor: ActingUser, Path(id): Path<Uuid>) -> Result<StatusCode, (StatusCode, String)> {
    actor.require_admin()?;
    s.service.delete(actor.user_id, id).await.map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_request(State(s): State<AppState>, actor: ActingUser, Path(id): Path<Uuid>) -> Result<Json<TableDocument>, (StatusCode, String)> {
    actor.require_admin()?;
    s.service.export(id).await.map(Json).map_err(http_error)
}
