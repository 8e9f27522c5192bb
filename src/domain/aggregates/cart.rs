//! Cart Aggregate
//!
//! A cart is an [`Order`](super::Order) in `cart` status. Lines are never
//! merged on add, so one listing may appear on several lines; removal always
//! targets the first line found for a listing.

use serde::Serialize;
use crate::domain::aggregates::order::{OrderItem, OrderView};
use crate::domain::value_objects::{OrderId, ProductInfoId};

/// What happens to a cart line when a removal is applied to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineChange { Delete, Reduce(i32), Keep }

impl LineChange {
    pub fn plan(item: &OrderItem, requested: i32) -> Self {
        if requested <= 0 { return Self::Keep; }
        let remaining = item.quantity.saturating_sub(requested);
        if remaining <= 0 { Self::Delete } else { Self::Reduce(remaining) }
    }
}

/// Picks the line a removal applies to: the first one for that listing.
pub fn matching_line<'a>(items: &'a [OrderItem], product_info_id: ProductInfoId) -> Option<&'a OrderItem> {
    items.iter().find(|i| i.product_info_id == product_info_id)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport { pub deleted: usize, pub reduced: usize, pub ignored: usize }

/// Result of an operation that needs an active cart.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CartOutcome<T> {
    Empty,
    Done(T),
}

impl<T> CartOutcome<T> {
    pub fn is_empty(&self) -> bool { matches!(self, Self::Empty) }
    pub fn into_done(self) -> Option<T> { match self { Self::Done(v) => Some(v), Self::Empty => None } }
}

/// Lines appended by an add-items call.
#[derive(Clone, Debug, Serialize)]
pub struct AddedItems { pub order_id: OrderId, pub items: Vec<OrderItem> }

/// A confirmed order, as reported back to the customer.
#[derive(Clone, Debug, Serialize)]
pub struct Confirmation { pub order: OrderView, pub address: String }
