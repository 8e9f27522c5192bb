use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AppJson, AppState, CurrentUser};
use crate::domain::aggregates::{
    AddedItems, CartOutcome, Confirmation, Contact, OrderView, Product, ProductDetail, RemovalReport,
};
use crate::domain::value_objects::ProductId;
use crate::error::Result;
use crate::services::{AddItem, ContactRequest, ImportSummary, RemoveItem};

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<AddItem>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemsRequest {
    pub items: Vec<RemoveItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    pub address: Option<String>,
}

pub async fn import_feed(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(r): AppJson<ImportRequest>,
) -> Result<Json<ImportSummary>> {
    Ok(Json(s.importer.import_from_url(&user, &r.url).await?))
}

pub async fn list_products(State(s): State<AppState>, _user: CurrentUser) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_products().await?))
}

pub async fn get_product(
    State(s): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    Ok(Json(s.catalog.get_product(id).await?))
}

pub async fn list_orders(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(s.carts.list_orders(&user).await?))
}

pub async fn show_cart(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartOutcome<OrderView>>> {
    Ok(Json(s.carts.show_cart(&user).await?))
}

pub async fn add_items(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(r): AppJson<AddItemsRequest>,
) -> Result<(StatusCode, Json<AddedItems>)> {
    Ok((StatusCode::CREATED, Json(s.carts.add_items(&user, &r.items).await?)))
}

pub async fn remove_items(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(r): AppJson<RemoveItemsRequest>,
) -> Result<Json<CartOutcome<RemovalReport>>> {
    Ok(Json(s.carts.remove_items(&user, &r.items).await?))
}

pub async fn confirm_cart(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(r): AppJson<ConfirmRequest>,
) -> Result<Json<CartOutcome<Confirmation>>> {
    Ok(Json(s.carts.confirm_cart(&user, r.address.as_deref()).await?))
}

pub async fn list_contacts(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Contact>>> {
    Ok(Json(s.contacts.list(&user).await?))
}

pub async fn create_contact(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(r): AppJson<ContactRequest>,
) -> Result<(StatusCode, Json<Contact>)> {
    Ok((StatusCode::CREATED, Json(s.contacts.create(&user, &r).await?)))
}

pub async fn delete_contact(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(r): AppJson<ContactRequest>,
) -> Result<Json<Value>> {
    let deleted = s.contacts.delete(&user, &r).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
