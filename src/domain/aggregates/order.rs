//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{OrderId, OrderStatus, ProductInfoId, ShopId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem { pub id: i64, pub order_id: OrderId, pub product_info_id: ProductInfoId, pub shop_id: ShopId, pub quantity: i32 }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrderItem { pub product_info_id: ProductInfoId, pub shop_id: ShopId, pub quantity: i32 }

/// An order line joined with the listing it points at.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub item: OrderItem,
    pub name: String,
    pub unit_price: i64,
}

impl OrderLine {
    pub fn line_total(&self) -> i64 { self.unit_price * i64::from(self.item.quantity) }
}

/// An order with its lines, as returned to callers.
#[derive(Clone, Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub total: i64,
}

impl OrderView {
    pub fn new(order: Order, items: Vec<OrderLine>) -> Self {
        let total = items.iter().map(OrderLine::line_total).sum();
        Self { order, items, total }
    }
}

impl Order {
    pub fn is_cart(&self) -> bool { self.status == OrderStatus::Cart }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if !self.is_cart() { return Err(OrderError::NotACart(self.status)); }
        self.status = OrderStatus::Confirmed;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NotACart(OrderStatus) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::NotACart(s) => write!(f, "order is {s}, only a cart can be confirmed") }
    }
}
