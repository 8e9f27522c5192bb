//! Data store
//!
//! Every service operation runs inside one [`StoreTx`]: changes become
//! visible on [`StoreTx::commit`] and are discarded when the transaction is
//! dropped uncommitted. Get-or-create methods return an existing row
//! unchanged and are backed by unique constraints, so a concurrent
//! duplicate surfaces as a conflict rather than a second row.

mod memory;
mod postgres;

pub use memory::{MemoryStore, TableCounts};
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::domain::aggregates::{
    Category, Contact, Listing, NewOrderItem, NewProductInfo, Order, OrderItem, OrderLine, Parameter, Product,
    ProductInfo, ProductParameter, Shop, User,
};
use crate::domain::value_objects::{
    CategoryId, OrderId, OrderStatus, ParameterId, ProductId, ProductInfoId, ShopId, UserId,
};
use crate::error::Result;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn find_user_by_token(&mut self, token: &str) -> Result<Option<User>>;

    // Catalog
    async fn get_or_create_shop(&mut self, name: &str, user_id: UserId, url: &str) -> Result<Shop>;
    async fn get_or_create_category(&mut self, id: CategoryId, name: &str) -> Result<Category>;
    async fn link_shop_category(&mut self, shop_id: ShopId, category_id: CategoryId) -> Result<()>;
    /// Removes every listing of the shop, cascading to its parameters and order lines.
    async fn delete_shop_listings(&mut self, shop_id: ShopId) -> Result<u64>;
    async fn get_or_create_product(&mut self, name: &str, category_id: Option<CategoryId>) -> Result<Product>;
    async fn insert_product_info(&mut self, info: NewProductInfo) -> Result<ProductInfo>;
    async fn get_or_create_parameter(&mut self, name: &str) -> Result<Parameter>;
    async fn insert_product_parameter(
        &mut self,
        product_info_id: ProductInfoId,
        parameter_id: ParameterId,
        value: &str,
    ) -> Result<ProductParameter>;
    async fn list_products(&mut self) -> Result<Vec<Product>>;
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;
    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>>;
    async fn product_listings(&mut self, product_id: ProductId) -> Result<Vec<Listing>>;
    async fn find_product_info(&mut self, id: ProductInfoId) -> Result<Option<ProductInfo>>;
    /// Subtracts `quantity` from the listing's stock without a floor.
    async fn withdraw_stock(&mut self, id: ProductInfoId, quantity: i32) -> Result<ProductInfo>;

    // Orders
    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<Order>>;
    async fn get_or_create_cart(&mut self, user_id: UserId) -> Result<Order>;
    async fn list_orders(&mut self, user_id: UserId) -> Result<Vec<Order>>;
    /// Lines of an order in insertion order.
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>>;
    async fn insert_order_item(&mut self, order_id: OrderId, item: NewOrderItem) -> Result<OrderItem>;
    async fn set_order_item_quantity(&mut self, id: i64, quantity: i32) -> Result<()>;
    async fn delete_order_item(&mut self, id: i64) -> Result<()>;
    /// Moves an order from `from` to `to`; an order no longer in `from` is a conflict.
    async fn transition_order(&mut self, id: OrderId, from: OrderStatus, to: OrderStatus) -> Result<()>;

    // Contacts
    async fn list_contacts(&mut self, user_id: UserId) -> Result<Vec<Contact>>;
    async fn find_contact_by_kind(&mut self, user_id: UserId, kind: &str) -> Result<Option<Contact>>;
    async fn insert_contact(&mut self, user_id: UserId, kind: &str, value: &str) -> Result<Contact>;
    async fn delete_contacts(&mut self, user_id: UserId, kind: &str, value: &str) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
