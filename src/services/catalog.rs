use std::sync::Arc;

use crate::domain::aggregates::{Product, ProductDetail};
use crate::domain::value_objects::ProductId;
use crate::error::{AppError, Result};
use crate::store::Store;

/// Read-only access to the catalog for customers.
pub struct CatalogQuery {
    store: Arc<dyn Store>,
}

impl CatalogQuery {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        tx.list_products().await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail> {
        let mut tx = self.store.begin().await?;
        let product = tx.find_product(id).await?.ok_or_else(|| AppError::not_found("product", id))?;
        let category = match product.category_id {
            Some(category_id) => tx.find_category(category_id).await?,
            None => None,
        };
        let listings = tx.product_listings(id).await?;
        Ok(ProductDetail { product, category, listings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::SAMPLE;
    use crate::services::testing::{StaticFeed, FEED_URL};
    use crate::services::CatalogImporter;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_product_detail() {
        let store = MemoryStore::new();
        let partner = store.add_user("partner", "p@example.com", "pt").await;
        CatalogImporter::new(Arc::new(store.clone()), Arc::new(StaticFeed::new(SAMPLE)))
            .import_from_url(&partner, FEED_URL)
            .await
            .unwrap();

        let catalog = CatalogQuery::new(Arc::new(store));
        let products = catalog.list_products().await.unwrap();
        assert_eq!(products.len(), 1);

        let detail = catalog.get_product(products[0].id).await.unwrap();
        assert_eq!(detail.category.map(|c| c.name), Some("X".to_string()));
        assert_eq!(detail.listings.len(), 1);
        assert_eq!(detail.listings[0].shop_name, "A");
        assert_eq!(detail.listings[0].parameters.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let catalog = CatalogQuery::new(Arc::new(MemoryStore::new()));
        assert!(matches!(catalog.get_product(404).await, Err(AppError::NotFound { .. })));
    }
}
