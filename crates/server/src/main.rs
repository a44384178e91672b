use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shared::{
    domain::SupplierId,
    error::{ApiError, ErrorCode},
    protocol::{Category, Product, Supplier},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod catalog;
mod config;

use app_state::AppState;
use catalog::CatalogData;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let state = AppState {
        catalog: Arc::new(CatalogData::seeded()),
        fail_products: settings.fail_products,
    };
    let app = build_router(state, &settings.api_prefix);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(
        %addr,
        prefix = %settings.api_prefix,
        fail_products = settings.fail_products,
        "catalog server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState, api_prefix: &str) -> Router {
    let routes = Router::new()
        .route("/products", get(list_products))
        .route("/productCategories", get(list_categories))
        .route("/suppliers", get(list_suppliers))
        .route("/suppliers/:supplier_id", get(get_supplier))
        .with_state(state);

    let routes = if api_prefix.is_empty() {
        routes
    } else {
        Router::new().nest(api_prefix, routes)
    };
    routes.route("/healthz", get(healthz))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, (StatusCode, Json<ApiError>)> {
    if state.fail_products {
        warn!("failing product listing on request");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, "Internal Error")),
        ));
    }
    Ok(Json(state.catalog.products.clone()))
}

async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.catalog.categories.clone())
}

async fn list_suppliers(State(state): State<AppState>) -> Json<Vec<Supplier>> {
    Json(state.catalog.suppliers.clone())
}

async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<i64>,
) -> Result<Json<Supplier>, (StatusCode, Json<ApiError>)> {
    state
        .catalog
        .supplier(SupplierId(supplier_id))
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!(
                    "supplier {supplier_id} not found"
                ))),
            )
        })
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
