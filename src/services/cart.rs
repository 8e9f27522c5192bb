//! Cart/Order engine
//!
//! A user has at most one order in `cart` status. Adding items appends
//! lines (never merges), removing items shrinks or deletes the first
//! matching line, and confirming flips the order to `confirmed` and
//! withdraws every line's quantity from the listing's stock.

use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::config::MailConfig;
use crate::domain::aggregates::{
    cart, AddedItems, CartOutcome, Confirmation, LineChange, NewOrderItem, Order, OrderView, RemovalReport, User,
};
use crate::domain::events::{ConfirmedLine, DomainEvent, OrderEvent};
use crate::domain::value_objects::{ProductInfoId, ShopId};
use crate::error::{AppError, Result};
use crate::mail::{Mail, Mailer};
use crate::store::Store;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddItem {
    #[serde(alias = "id")]
    pub product_info_id: ProductInfoId,
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub shop_id: ShopId,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemoveItem {
    /// The listing (product info) id of the cart line.
    pub product_id: ProductInfoId,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

fn validate_all<T: Validate>(entries: &[T]) -> Result<()> {
    for (idx, entry) in entries.iter().enumerate() {
        entry.validate().map_err(|e| AppError::Validation(format!("items[{idx}]: {e}")))?;
    }
    Ok(())
}

pub struct CartService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        Self { store, mailer, mail }
    }

    pub async fn get_or_create_cart(&self, user: &User) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let cart = tx.get_or_create_cart(user.id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    pub async fn show_cart(&self, user: &User) -> Result<CartOutcome<OrderView>> {
        let mut tx = self.store.begin().await?;
        let Some(cart) = tx.find_cart(user.id).await? else {
            return Ok(CartOutcome::Empty);
        };
        let lines = tx.order_lines(cart.id).await?;
        Ok(CartOutcome::Done(OrderView::new(cart, lines)))
    }

    /// The user's orders of every status, newest first.
    pub async fn list_orders(&self, user: &User) -> Result<Vec<OrderView>> {
        let mut tx = self.store.begin().await?;
        let mut views = Vec::new();
        for order in tx.list_orders(user.id).await? {
            let lines = tx.order_lines(order.id).await?;
            views.push(OrderView::new(order, lines));
        }
        Ok(views)
    }

    #[tracing::instrument(skip(self, user, items), fields(user_id = user.id, items = items.len()))]
    pub async fn add_items(&self, user: &User, items: &[AddItem]) -> Result<AddedItems> {
        validate_all(items)?;

        let mut tx = self.store.begin().await?;
        let cart = tx.get_or_create_cart(user.id).await?;
        let mut added = Vec::with_capacity(items.len());
        for item in items {
            let listing = tx
                .find_product_info(item.product_info_id)
                .await?
                .ok_or_else(|| AppError::not_found("listing", item.product_info_id))?;
            if listing.shop_id != item.shop_id {
                return Err(AppError::Validation(format!(
                    "listing {} belongs to shop {}, not {}",
                    listing.id, listing.shop_id, item.shop_id
                )));
            }
            let line = NewOrderItem { product_info_id: item.product_info_id, shop_id: item.shop_id, quantity: item.quantity };
            added.push(tx.insert_order_item(cart.id, line).await?);
        }
        tx.commit().await?;

        tracing::debug!(order_id = cart.id, added = added.len(), "Items added to cart");
        Ok(AddedItems { order_id: cart.id, items: added })
    }

    #[tracing::instrument(skip(self, user, items), fields(user_id = user.id, items = items.len()))]
    pub async fn remove_items(&self, user: &User, items: &[RemoveItem]) -> Result<CartOutcome<RemovalReport>> {
        validate_all(items)?;

        let mut tx = self.store.begin().await?;
        let Some(cart) = tx.find_cart(user.id).await? else {
            return Ok(CartOutcome::Empty);
        };
        let mut lines: Vec<_> = tx.order_lines(cart.id).await?.into_iter().map(|l| l.item).collect();

        let mut report = RemovalReport::default();
        for removal in items {
            let Some(line) = cart::matching_line(&lines, removal.product_id).cloned() else {
                report.ignored += 1;
                continue;
            };
            match LineChange::plan(&line, removal.quantity) {
                LineChange::Delete => {
                    tx.delete_order_item(line.id).await?;
                    lines.retain(|l| l.id != line.id);
                    report.deleted += 1;
                }
                LineChange::Keep => report.ignored += 1,
                LineChange::Reduce(quantity) => {
                    tx.set_order_item_quantity(line.id, quantity).await?;
                    if let Some(l) = lines.iter_mut().find(|l| l.id == line.id) {
                        l.quantity = quantity;
                    }
                    report.reduced += 1;
                }
            }
        }
        tx.commit().await?;
        Ok(CartOutcome::Done(report))
    }

    /// Confirms the cart for delivery to the contact whose type is `address`.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn confirm_cart(&self, user: &User, address: Option<&str>) -> Result<CartOutcome<Confirmation>> {
        let label = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::Validation("address is required to place an order".to_string()))?;

        let mut tx = self.store.begin().await?;
        let contact = tx.find_contact_by_kind(user.id, label).await?.ok_or_else(|| AppError::not_found("address", label))?;
        let Some(mut cart) = tx.find_cart(user.id).await? else {
            return Ok(CartOutcome::Empty);
        };
        let lines = tx.order_lines(cart.id).await?;
        if lines.is_empty() {
            return Ok(CartOutcome::Empty);
        }

        // A concurrent confirm of the same cart fails at this flip, before any stock moves.
        let from = cart.status;
        cart.confirm().map_err(|e| AppError::Conflict(e.to_string()))?;
        tx.transition_order(cart.id, from, cart.status).await?;

        for line in &lines {
            let listing = tx.withdraw_stock(line.item.product_info_id, line.item.quantity).await?;
            if listing.is_oversold() {
                tracing::warn!(listing_id = listing.id, quantity = listing.quantity, "Listing oversold");
            }
        }
        tx.commit().await?;

        let event = OrderEvent::Confirmed {
            order_id: cart.id,
            user_id: user.id,
            address: contact.value.clone(),
            lines: lines.iter().map(|l| ConfirmedLine { name: l.name.clone(), quantity: l.item.quantity }).collect(),
        };
        DomainEvent::Order(event.clone()).record();
        self.notify(user, &event).await?;

        Ok(CartOutcome::Done(Confirmation { order: OrderView::new(cart, lines), address: contact.value }))
    }

    async fn notify(&self, user: &User, event: &OrderEvent) -> Result<()> {
        let mail = Mail::order_confirmed(&self.mail.from, &user.email, &user.username, event);
        match self.mailer.send(mail).await {
            Ok(()) => Ok(()),
            Err(e) if self.mail.fail_silently => {
                tracing::warn!(error = %e, user_id = user.id, "Confirmation mail not delivered");
                Ok(())
            }
            Err(e) => Err(AppError::Mail(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductInfo;
    use crate::domain::value_objects::OrderStatus;
    use crate::feed::tests::SAMPLE;
    use crate::services::testing::{RecordingMailer, StaticFeed, FEED_URL};
    use crate::services::CatalogImporter;
    use crate::store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        mailer: Arc<RecordingMailer>,
        carts: CartService,
        customer: User,
        listing: ProductInfo,
    }

    async fn fixture_with(mailer: RecordingMailer, fail_silently: bool) -> Fixture {
        let store = MemoryStore::new();
        let partner = store.add_user("partner", "p@example.com", "pt").await;
        let customer = store.add_user("ann", "ann@example.com", "ct").await;
        CatalogImporter::new(Arc::new(store.clone()), Arc::new(StaticFeed::new(SAMPLE)))
            .import_from_url(&partner, FEED_URL)
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let product = tx.list_products().await.unwrap().remove(0);
        let listing = tx.product_listings(product.id).await.unwrap().remove(0).info;
        tx.insert_contact(customer.id, "home", "1 Main St").await.unwrap();
        tx.commit().await.unwrap();

        let mailer = Arc::new(mailer);
        let config = MailConfig { from: "shop@example.com".into(), fail_silently };
        let carts = CartService::new(Arc::new(store.clone()), mailer.clone(), config);
        Fixture { store, mailer, carts, customer, listing }
    }

    async fn fixture() -> Fixture {
        fixture_with(RecordingMailer::default(), true).await
    }

    fn add(listing: &ProductInfo, quantity: i32) -> AddItem {
        AddItem { product_info_id: listing.id, quantity, shop_id: listing.shop_id }
    }

    async fn stock(f: &Fixture) -> i32 {
        let mut tx = f.store.begin().await.unwrap();
        tx.find_product_info(f.listing.id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_add_items_never_merges() {
        let f = fixture().await;
        let first = f.carts.add_items(&f.customer, &[add(&f.listing, 1), add(&f.listing, 2)]).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let second = f.carts.add_items(&f.customer, &[add(&f.listing, 3)]).await.unwrap();
        assert_eq!(second.order_id, first.order_id);

        let cart = f.carts.show_cart(&f.customer).await.unwrap().into_done().unwrap();
        let quantities: Vec<i32> = cart.items.iter().map(|l| l.item.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 3]);
        assert_eq!(cart.total, 600);
        assert_eq!(f.store.counts().await.orders, 1);
    }

    #[tokio::test]
    async fn test_add_items_rejects_whole_batch() {
        let f = fixture().await;
        let bad_quantity = f.carts.add_items(&f.customer, &[add(&f.listing, 1), add(&f.listing, -1)]).await;
        assert!(matches!(bad_quantity, Err(AppError::Validation(_))));

        let unknown = AddItem { product_info_id: 9999, quantity: 1, shop_id: f.listing.shop_id };
        let missing = f.carts.add_items(&f.customer, &[add(&f.listing, 1), unknown]).await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));

        let wrong_shop = AddItem { shop_id: f.listing.shop_id + 100, ..add(&f.listing, 1) };
        assert!(matches!(f.carts.add_items(&f.customer, &[wrong_shop]).await, Err(AppError::Validation(_))));

        let counts = f.store.counts().await;
        assert_eq!((counts.orders, counts.order_items), (0, 0));
    }

    #[tokio::test]
    async fn test_remove_items() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 3)]).await.unwrap();

        let report = f.carts.remove_items(&f.customer, &[RemoveItem { product_id: f.listing.id, quantity: 1 }]).await.unwrap();
        assert_eq!(report.into_done(), Some(RemovalReport { deleted: 0, reduced: 1, ignored: 0 }));
        let cart = f.carts.show_cart(&f.customer).await.unwrap().into_done().unwrap();
        assert_eq!(cart.items[0].item.quantity, 2);

        let report = f.carts.remove_items(&f.customer, &[RemoveItem { product_id: 4242, quantity: 1 }]).await.unwrap();
        assert_eq!(report.into_done(), Some(RemovalReport { deleted: 0, reduced: 0, ignored: 1 }));

        let report = f.carts.remove_items(&f.customer, &[RemoveItem { product_id: f.listing.id, quantity: 5 }]).await.unwrap();
        assert_eq!(report.into_done(), Some(RemovalReport { deleted: 1, reduced: 0, ignored: 0 }));
        assert_eq!(f.store.counts().await.order_items, 0);
    }

    #[tokio::test]
    async fn test_remove_targets_first_duplicate_line() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 1), add(&f.listing, 4)]).await.unwrap();
        let removals = [RemoveItem { product_id: f.listing.id, quantity: 1 }, RemoveItem { product_id: f.listing.id, quantity: 1 }];
        let report = f.carts.remove_items(&f.customer, &removals).await.unwrap().into_done().unwrap();
        assert_eq!(report, RemovalReport { deleted: 1, reduced: 1, ignored: 0 });
        let cart = f.carts.show_cart(&f.customer).await.unwrap().into_done().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].item.quantity, 3);
    }

    #[tokio::test]
    async fn test_remove_zero_quantity_is_ignored() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 3)]).await.unwrap();
        let report = f.carts.remove_items(&f.customer, &[RemoveItem { product_id: f.listing.id, quantity: 0 }]).await.unwrap();
        assert_eq!(report.into_done(), Some(RemovalReport { deleted: 0, reduced: 0, ignored: 1 }));
        let cart = f.carts.show_cart(&f.customer).await.unwrap().into_done().unwrap();
        assert_eq!(cart.items[0].item.quantity, 3);
    }

    #[tokio::test]
    async fn test_remove_without_cart() {
        let f = fixture().await;
        let outcome = f.carts.remove_items(&f.customer, &[RemoveItem { product_id: f.listing.id, quantity: 1 }]).await.unwrap();
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_cart() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 3)]).await.unwrap();

        let confirmation = f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap().into_done().unwrap();
        assert_eq!(confirmation.order.order.status, OrderStatus::Confirmed);
        assert_eq!(confirmation.address, "1 Main St");
        assert_eq!(stock(&f).await, 2);
        assert!(f.carts.show_cart(&f.customer).await.unwrap().is_empty());

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ann@example.com");
        assert!(sent[0].body.contains("P1 (3 pcs)"));

        let orders = f.carts.list_orders(&f.customer).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_second_confirm_withdraws_nothing() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 2)]).await.unwrap();
        assert!(!f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap().is_empty());
        assert!(f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap().is_empty());
        assert_eq!(stock(&f).await, 3);
        assert_eq!(f.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_may_oversell() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 4), add(&f.listing, 4)]).await.unwrap();
        f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap();
        assert_eq!(stock(&f).await, -3);
    }

    #[tokio::test]
    async fn test_confirm_out_of_range_stock_rolls_back() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, i32::MAX), add(&f.listing, i32::MAX)]).await.unwrap();
        let err = f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(stock(&f).await, 5);
        assert!(!f.carts.show_cart(&f.customer).await.unwrap().is_empty());
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_empty_cart_is_noop() {
        let f = fixture().await;
        assert!(f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap().is_empty());

        f.carts.get_or_create_cart(&f.customer).await.unwrap();
        let before = f.store.counts().await;
        assert!(f.carts.confirm_cart(&f.customer, Some("home")).await.unwrap().is_empty());
        assert_eq!(f.store.counts().await, before);
        assert_eq!(stock(&f).await, 5);
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_requires_known_address() {
        let f = fixture().await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 1)]).await.unwrap();
        assert!(matches!(f.carts.confirm_cart(&f.customer, None).await, Err(AppError::Validation(_))));
        assert!(matches!(f.carts.confirm_cart(&f.customer, Some("  ")).await, Err(AppError::Validation(_))));
        assert!(matches!(f.carts.confirm_cart(&f.customer, Some("office")).await, Err(AppError::NotFound { .. })));
        assert_eq!(stock(&f).await, 5);
    }

    #[tokio::test]
    async fn test_mail_failure_modes() {
        let f = fixture_with(RecordingMailer::failing(), true).await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 1)]).await.unwrap();
        assert!(f.carts.confirm_cart(&f.customer, Some("home")).await.is_ok());

        let f = fixture_with(RecordingMailer::failing(), false).await;
        f.carts.add_items(&f.customer, &[add(&f.listing, 1)]).await.unwrap();
        assert!(matches!(f.carts.confirm_cart(&f.customer, Some("home")).await, Err(AppError::Mail(_))));
        // The order was committed before the mail went out.
        assert!(f.carts.show_cart(&f.customer).await.unwrap().is_empty());
        assert_eq!(stock(&f).await, 4);
    }
}
