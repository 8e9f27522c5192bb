//! HTTP surface
//!
//! All business routes live under `/api/v1` and require a bearer token;
//! `/health` is open.

mod auth;
mod handlers;

pub use auth::CurrentUser;

use axum::{
    extract::FromRequest,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MailConfig;
use crate::error::AppError;
use crate::feed::FeedSource;
use crate::mail::Mailer;
use crate::services::{CartService, CatalogImporter, CatalogQuery, ContactService};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub importer: Arc<CatalogImporter>,
    pub catalog: Arc<CatalogQuery>,
    pub carts: Arc<CartService>,
    pub contacts: Arc<ContactService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, feeds: Arc<dyn FeedSource>, mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        Self {
            importer: Arc::new(CatalogImporter::new(store.clone(), feeds)),
            catalog: Arc::new(CatalogQuery::new(store.clone())),
            carts: Arc::new(CartService::new(store.clone(), mailer, mail)),
            contacts: Arc::new(ContactService::new(store.clone())),
            store,
        }
    }
}

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/partner/update", post(handlers::import_feed))
        .route("/products", get(handlers::list_products))
        .route("/products/:id", get(handlers::get_product))
        .route("/orders", get(handlers::list_orders))
        .route("/cart", get(handlers::show_cart))
        .route("/cart/items", post(handlers::add_items))
        .route("/cart/remove", post(handlers::remove_items))
        .route("/cart/confirm", post(handlers::confirm_cart))
        .route(
            "/contacts",
            get(handlers::list_contacts).post(handlers::create_contact).delete(handlers::delete_contact),
        );

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "catalog-cart"})) }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
