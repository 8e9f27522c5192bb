//! Catalog import
//!
//! Applies a partner's feed to the catalog:
//! 1. get-or-create the partner's shop
//! 2. get-or-create every category and attach it to the shop
//! 3. drop all of the shop's current listings
//! 4. insert a fresh listing per good, under a get-or-create product
//! 5. attach each good's parameters to its new listing
//!
//! The feed is fetched and fully parsed before the store is touched, and
//! steps 1-5 share one transaction, so an import either lands completely or
//! not at all. Listings absent from the feed disappear.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::aggregates::{NewProductInfo, User};
use crate::domain::events::{CatalogEvent, DomainEvent};
use crate::domain::value_objects::{FeedUrl, ShopId, UserId};
use crate::error::{AppError, Result};
use crate::feed::{Feed, FeedSource};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub shop_id: ShopId,
    pub shop: String,
    pub categories: usize,
    pub listings: usize,
    pub parameters: usize,
    pub replaced_listings: u64,
}

pub struct CatalogImporter {
    store: Arc<dyn Store>,
    feeds: Arc<dyn FeedSource>,
}

impl CatalogImporter {
    pub fn new(store: Arc<dyn Store>, feeds: Arc<dyn FeedSource>) -> Self {
        Self { store, feeds }
    }

    #[tracing::instrument(skip(self, owner), fields(user_id = owner.id))]
    pub async fn import_from_url(&self, owner: &User, url: &str) -> Result<ImportSummary> {
        let url = FeedUrl::parse(url).map_err(|e| AppError::Validation(e.to_string()))?;
        let bytes = self.feeds.fetch(&url).await?;
        let feed = Feed::parse(&bytes)?;
        self.apply(owner.id, &url, &feed).await
    }

    pub async fn apply(&self, owner: UserId, url: &FeedUrl, feed: &Feed) -> Result<ImportSummary> {
        let mut tx = self.store.begin().await?;

        let shop = tx.get_or_create_shop(&feed.shop, owner, url.as_str()).await?;

        let mut categories = BTreeSet::new();
        for category in &feed.categories {
            let category = tx.get_or_create_category(category.id, &category.name).await?;
            tx.link_shop_category(shop.id, category.id).await?;
            categories.insert(category.id);
        }

        let replaced_listings = tx.delete_shop_listings(shop.id).await?;

        let mut parameters = 0;
        for good in &feed.goods {
            let product = tx.get_or_create_product(&good.name, Some(good.category)).await?;
            let info = tx
                .insert_product_info(NewProductInfo {
                    product_id: product.id,
                    shop_id: shop.id,
                    model: good.model.clone(),
                    name: good.name.clone(),
                    quantity: good.quantity,
                    price: good.price,
                    price_rrc: good.price_rrc,
                    external_id: good.id,
                })
                .await?;

            for (name, value) in &good.parameters {
                let parameter = tx.get_or_create_parameter(name).await?;
                tx.insert_product_parameter(info.id, parameter.id, &value.to_string()).await?;
                parameters += 1;
            }
        }

        tx.commit().await?;

        DomainEvent::Catalog(CatalogEvent::Imported {
            shop_id: shop.id,
            shop_name: shop.name.clone(),
            listings: feed.goods.len(),
        })
        .record();

        Ok(ImportSummary {
            shop_id: shop.id,
            shop: shop.name,
            categories: categories.len(),
            listings: feed.goods.len(),
            parameters,
            replaced_listings,
        })
    }
}
