//! In-process store with the same semantics as the Postgres schema.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! copy of the tables, so transactions are serialised and an uncommitted
//! transaction leaves no trace.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::domain::aggregates::{
    Category, Contact, Listing, ListingParameter, NewOrderItem, NewProductInfo, Order, OrderItem, OrderLine,
    Parameter, Product, ProductInfo, ProductParameter, Shop, User,
};
use crate::domain::value_objects::{
    CategoryId, OrderId, OrderStatus, ParameterId, ProductId, ProductInfoId, ShopId, UserId,
};
use crate::error::{AppError, Result};

#[derive(Clone, Debug, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<UserId, (User, String)>,
    shops: BTreeMap<ShopId, Shop>,
    categories: BTreeMap<CategoryId, Category>,
    shop_categories: BTreeSet<(ShopId, CategoryId)>,
    products: BTreeMap<ProductId, Product>,
    product_infos: BTreeMap<ProductInfoId, ProductInfo>,
    parameters: BTreeMap<ParameterId, Parameter>,
    product_parameters: BTreeMap<i64, ProductParameter>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<i64, OrderItem>,
    contacts: BTreeMap<i64, Contact>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Row counts per table, for inspecting the store from tests and tooling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub shops: usize,
    pub categories: usize,
    pub shop_categories: usize,
    pub products: usize,
    pub product_infos: usize,
    pub parameters: usize,
    pub product_parameters: usize,
    pub orders: usize,
    pub order_items: usize,
    pub contacts: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account that authenticates with `token`.
    pub async fn add_user(&self, username: &str, email: &str, token: &str) -> User {
        let mut tables = self.tables.lock().await;
        let user = User { id: tables.next_id(), username: username.to_string(), email: email.to_string() };
        tables.users.insert(user.id, (user.clone(), token.to_string()));
        user
    }

    pub async fn counts(&self) -> TableCounts {
        let t = self.tables.lock().await;
        TableCounts {
            shops: t.shops.len(),
            categories: t.categories.len(),
            shop_categories: t.shop_categories.len(),
            products: t.products.len(),
            product_infos: t.product_infos.len(),
            parameters: t.parameters.len(),
            product_parameters: t.product_parameters.len(),
            orders: t.orders.len(),
            order_items: t.order_items.len(),
            contacts: t.contacts.len(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_user_by_token(&mut self, token: &str) -> Result<Option<User>> {
        Ok(self.work.users.values().find(|(_, t)| t == token).map(|(u, _)| u.clone()))
    }

    async fn get_or_create_shop(&mut self, name: &str, user_id: UserId, url: &str) -> Result<Shop> {
        let t = &mut self.work;
        if let Some(shop) = t.shops.values().find(|s| s.name == name && s.user_id == Some(user_id)) {
            return Ok(shop.clone());
        }
        if t.shops.values().any(|s| s.user_id == Some(user_id)) {
            return Err(AppError::Conflict(format!("user {user_id} already owns a shop")));
        }
        let id = t.next_id();
        let shop = Shop { id, name: name.to_string(), user_id: Some(user_id), url: url.to_string() };
        t.shops.insert(id, shop.clone());
        Ok(shop)
    }

    async fn get_or_create_category(&mut self, id: CategoryId, name: &str) -> Result<Category> {
        let t = &mut self.work;
        match t.categories.get(&id) {
            Some(c) if c.name == name => return Ok(c.clone()),
            Some(c) => return Err(AppError::Conflict(format!("category {id} already exists as '{}'", c.name))),
            None => {}
        }
        if t.categories.values().any(|c| c.name == name) {
            return Err(AppError::Conflict(format!("category '{name}' already exists")));
        }
        let category = Category { id, name: name.to_string() };
        t.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn link_shop_category(&mut self, shop_id: ShopId, category_id: CategoryId) -> Result<()> {
        self.work.shop_categories.insert((shop_id, category_id));
        Ok(())
    }

    async fn delete_shop_listings(&mut self, shop_id: ShopId) -> Result<u64> {
        let t = &mut self.work;
        let ids: BTreeSet<ProductInfoId> = t.product_infos.values().filter(|i| i.shop_id == shop_id).map(|i| i.id).collect();
        t.product_infos.retain(|id, _| !ids.contains(id));
        t.product_parameters.retain(|_, p| !ids.contains(&p.product_info_id));
        t.order_items.retain(|_, o| !ids.contains(&o.product_info_id));
        Ok(ids.len() as u64)
    }

    async fn get_or_create_product(&mut self, name: &str, category_id: Option<CategoryId>) -> Result<Product> {
        let t = &mut self.work;
        if let Some(p) = t.products.values().find(|p| p.name == name) {
            if p.category_id == category_id {
                return Ok(p.clone());
            }
            return Err(AppError::Conflict(format!("product '{name}' already exists in another category")));
        }
        let id = t.next_id();
        let product = Product { id, name: name.to_string(), category_id };
        t.products.insert(id, product.clone());
        Ok(product)
    }

    async fn insert_product_info(&mut self, info: NewProductInfo) -> Result<ProductInfo> {
        let t = &mut self.work;
        let row = ProductInfo {
            id: t.next_id(),
            product_id: info.product_id,
            shop_id: info.shop_id,
            model: info.model,
            name: info.name,
            quantity: info.quantity,
            price: info.price,
            price_rrc: info.price_rrc,
            external_id: info.external_id,
        };
        t.product_infos.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_or_create_parameter(&mut self, name: &str) -> Result<Parameter> {
        let t = &mut self.work;
        if let Some(p) = t.parameters.values().find(|p| p.name == name) {
            return Ok(p.clone());
        }
        let parameter = Parameter { id: t.next_id(), name: name.to_string() };
        t.parameters.insert(parameter.id, parameter.clone());
        Ok(parameter)
    }

    async fn insert_product_parameter(
        &mut self,
        product_info_id: ProductInfoId,
        parameter_id: ParameterId,
        value: &str,
    ) -> Result<ProductParameter> {
        let t = &mut self.work;
        let row = ProductParameter { id: t.next_id(), product_info_id, parameter_id, value: value.to_string() };
        t.product_parameters.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.work.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.work.categories.get(&id).cloned())
    }

    async fn product_listings(&mut self, product_id: ProductId) -> Result<Vec<Listing>> {
        let t = &self.work;
        let listings = t
            .product_infos
            .values()
            .filter(|i| i.product_id == product_id)
            .map(|info| {
                let parameters = t
                    .product_parameters
                    .values()
                    .filter(|pp| pp.product_info_id == info.id)
                    .filter_map(|pp| {
                        t.parameters.get(&pp.parameter_id).map(|p| ListingParameter { name: p.name.clone(), value: pp.value.clone() })
                    })
                    .collect();
                Listing {
                    info: info.clone(),
                    shop_name: t.shops.get(&info.shop_id).map(|s| s.name.clone()).unwrap_or_default(),
                    parameters,
                }
            })
            .collect();
        Ok(listings)
    }

    async fn find_product_info(&mut self, id: ProductInfoId) -> Result<Option<ProductInfo>> {
        Ok(self.work.product_infos.get(&id).cloned())
    }

    async fn withdraw_stock(&mut self, id: ProductInfoId, quantity: i32) -> Result<ProductInfo> {
        let info = self.work.product_infos.get_mut(&id).ok_or_else(|| AppError::not_found("listing", id))?;
        info.withdraw(quantity).map_err(|e| AppError::Conflict(e.to_string()))?;
        Ok(info.clone())
    }

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<Order>> {
        Ok(self.work.orders.values().find(|o| o.user_id == user_id && o.is_cart()).cloned())
    }

    async fn get_or_create_cart(&mut self, user_id: UserId) -> Result<Order> {
        if let Some(cart) = self.find_cart(user_id).await? {
            return Ok(cart);
        }
        let t = &mut self.work;
        let order = Order { id: t.next_id(), user_id, status: OrderStatus::Cart, created_at: Utc::now() };
        t.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list_orders(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.work.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let t = &self.work;
        Ok(t
            .order_items
            .values()
            .filter(|i| i.order_id == order_id)
            .filter_map(|item| {
                t.product_infos.get(&item.product_info_id).map(|info| OrderLine {
                    item: item.clone(),
                    name: info.name.clone(),
                    unit_price: info.price,
                })
            })
            .collect())
    }

    async fn insert_order_item(&mut self, order_id: OrderId, item: NewOrderItem) -> Result<OrderItem> {
        let t = &mut self.work;
        let row = OrderItem {
            id: t.next_id(),
            order_id,
            product_info_id: item.product_info_id,
            shop_id: item.shop_id,
            quantity: item.quantity,
        };
        t.order_items.insert(row.id, row.clone());
        Ok(row)
    }

    async fn set_order_item_quantity(&mut self, id: i64, quantity: i32) -> Result<()> {
        let item = self.work.order_items.get_mut(&id).ok_or_else(|| AppError::not_found("order item", id))?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_order_item(&mut self, id: i64) -> Result<()> {
        self.work.order_items.remove(&id);
        Ok(())
    }

    async fn transition_order(&mut self, id: OrderId, from: OrderStatus, to: OrderStatus) -> Result<()> {
        let t = &mut self.work;
        let order = t.orders.get(&id).ok_or_else(|| AppError::not_found("order", id))?;
        if order.status != from {
            return Err(AppError::Conflict(format!("order {id} is no longer {from}")));
        }
        if to == OrderStatus::Cart && t.orders.values().any(|o| o.id != id && o.user_id == order.user_id && o.is_cart()) {
            return Err(AppError::Conflict(format!("user {} already has a cart", order.user_id)));
        }
        if let Some(order) = t.orders.get_mut(&id) {
            order.status = to;
        }
        Ok(())
    }

    async fn list_contacts(&mut self, user_id: UserId) -> Result<Vec<Contact>> {
        Ok(self.work.contacts.values().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn find_contact_by_kind(&mut self, user_id: UserId, kind: &str) -> Result<Option<Contact>> {
        Ok(self.work.contacts.values().find(|c| c.user_id == user_id && c.kind == kind).cloned())
    }

    async fn insert_contact(&mut self, user_id: UserId, kind: &str, value: &str) -> Result<Contact> {
        let t = &mut self.work;
        let contact = Contact { id: t.next_id(), user_id, kind: kind.to_string(), value: value.to_string() };
        t.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn delete_contacts(&mut self, user_id: UserId, kind: &str, value: &str) -> Result<u64> {
        let before = self.work.contacts.len();
        self.work.contacts.retain(|_, c| !(c.user_id == user_id && c.matches(kind, value)));
        Ok((before - self.work.contacts.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
