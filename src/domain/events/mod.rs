//! Domain events
use crate::domain::value_objects::{OrderId, ShopId, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Catalog(CatalogEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogEvent {
    Imported { shop_id: ShopId, shop_name: String, listings: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    Confirmed { order_id: OrderId, user_id: UserId, address: String, lines: Vec<ConfirmedLine> },
}

/// One confirmed line as shown to the customer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedLine { pub name: String, pub quantity: i32 }

impl DomainEvent {
    /// Emits the event on the `events` tracing target.
    pub fn record(&self) {
        match self {
            Self::Catalog(CatalogEvent::Imported { shop_id, shop_name, listings }) => {
                tracing::info!(target: "events", shop_id, %shop_name, listings, "catalog imported");
            }
            Self::Order(OrderEvent::Confirmed { order_id, user_id, lines, .. }) => {
                tracing::info!(target: "events", order_id, user_id, lines = lines.len(), "order confirmed");
            }
        }
    }
}
