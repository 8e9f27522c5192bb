use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;

use super::{Store, StoreTx};
use crate::config::DatabaseConfig;
use crate::domain::aggregates::{
    Category, Contact, Listing, ListingParameter, NewOrderItem, NewProductInfo, Order, OrderItem, OrderLine,
    Parameter, Product, ProductInfo, ProductParameter, Shop, StockOverflow, User,
};
use crate::domain::value_objects::{
    CategoryId, OrderId, OrderStatus, ParameterId, ProductId, ProductInfoId, ShopId, UserId,
};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and brings the schema up to date.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        Ok(Box::new(PgTx { tx: self.pool.begin().await? }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    info: ProductInfo,
    shop_name: String,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_user_by_token(&mut self, token: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT id, username, email FROM users WHERE api_token = $1")
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn get_or_create_shop(&mut self, name: &str, user_id: UserId, url: &str) -> Result<Shop> {
        let existing = sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE name = $1 AND user_id = $2")
            .bind(name)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        if let Some(shop) = existing {
            return Ok(shop);
        }
        Ok(sqlx::query_as::<_, Shop>("INSERT INTO shops (name, user_id, url) VALUES ($1, $2, $3) RETURNING *")
            .bind(name)
            .bind(user_id)
            .bind(url)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn get_or_create_category(&mut self, id: CategoryId, name: &str) -> Result<Category> {
        let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 AND name = $2")
            .bind(id)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        if let Some(category) = existing {
            return Ok(category);
        }
        Ok(sqlx::query_as::<_, Category>("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING *")
            .bind(id)
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn link_shop_category(&mut self, shop_id: ShopId, category_id: CategoryId) -> Result<()> {
        sqlx::query("INSERT INTO shop_categories (shop_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(shop_id)
            .bind(category_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_shop_listings(&mut self, shop_id: ShopId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM product_infos WHERE shop_id = $1").bind(shop_id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn get_or_create_product(&mut self, name: &str, category_id: Option<CategoryId>) -> Result<Product> {
        let existing = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE name = $1 AND category_id IS NOT DISTINCT FROM $2",
        )
        .bind(name)
        .bind(category_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        if let Some(product) = existing {
            return Ok(product);
        }
        Ok(sqlx::query_as::<_, Product>("INSERT INTO products (name, category_id) VALUES ($1, $2) RETURNING *")
            .bind(name)
            .bind(category_id)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn insert_product_info(&mut self, info: NewProductInfo) -> Result<ProductInfo> {
        Ok(sqlx::query_as::<_, ProductInfo>(
            "INSERT INTO product_infos (product_id, shop_id, model, name, quantity, price, price_rrc, external_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(info.product_id)
        .bind(info.shop_id)
        .bind(&info.model)
        .bind(&info.name)
        .bind(info.quantity)
        .bind(info.price)
        .bind(info.price_rrc)
        .bind(info.external_id)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn get_or_create_parameter(&mut self, name: &str) -> Result<Parameter> {
        sqlx::query("INSERT INTO parameters (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *self.tx)
            .await?;
        Ok(sqlx::query_as::<_, Parameter>("SELECT * FROM parameters WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn insert_product_parameter(
        &mut self,
        product_info_id: ProductInfoId,
        parameter_id: ParameterId,
        value: &str,
    ) -> Result<ProductParameter> {
        Ok(sqlx::query_as::<_, ProductParameter>(
            "INSERT INTO product_parameters (product_info_id, parameter_id, value) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(product_info_id)
        .bind(parameter_id)
        .bind(value)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name").fetch_all(&mut *self.tx).await?)
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&mut *self.tx).await?)
    }

    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(&mut *self.tx).await?)
    }

    async fn product_listings(&mut self, product_id: ProductId) -> Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            "SELECT pi.*, s.name AS shop_name FROM product_infos pi JOIN shops s ON s.id = pi.shop_id \
             WHERE pi.product_id = $1 ORDER BY pi.id",
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let ids: Vec<ProductInfoId> = rows.iter().map(|r| r.info.id).collect();
        let params: Vec<(ProductInfoId, String, String)> = sqlx::query_as(
            "SELECT pp.product_info_id, p.name, pp.value FROM product_parameters pp \
             JOIN parameters p ON p.id = pp.parameter_id WHERE pp.product_info_id = ANY($1) ORDER BY pp.id",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut by_listing: HashMap<ProductInfoId, Vec<ListingParameter>> = HashMap::new();
        for (info_id, name, value) in params {
            by_listing.entry(info_id).or_default().push(ListingParameter { name, value });
        }
        Ok(rows
            .into_iter()
            .map(|r| Listing { parameters: by_listing.remove(&r.info.id).unwrap_or_default(), info: r.info, shop_name: r.shop_name })
            .collect())
    }

    async fn find_product_info(&mut self, id: ProductInfoId) -> Result<Option<ProductInfo>> {
        Ok(sqlx::query_as::<_, ProductInfo>("SELECT * FROM product_infos WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn withdraw_stock(&mut self, id: ProductInfoId, quantity: i32) -> Result<ProductInfo> {
        sqlx::query_as::<_, ProductInfo>("UPDATE product_infos SET quantity = quantity - $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(quantity)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| match &e {
                // numeric_value_out_of_range
                sqlx::Error::Database(db) if db.code().as_deref() == Some("22003") => {
                    AppError::Conflict(StockOverflow { listing: id, quantity }.to_string())
                }
                _ => AppError::from(e),
            })?
            .ok_or_else(|| AppError::not_found("listing", id))
    }

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 AND status = 'cart'")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn get_or_create_cart(&mut self, user_id: UserId) -> Result<Order> {
        sqlx::query(
            "INSERT INTO orders (user_id, status) VALUES ($1, 'cart') \
             ON CONFLICT (user_id) WHERE status = 'cart' DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 AND status = 'cart'")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn list_orders(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(sqlx::query_as::<_, OrderLine>(
            "SELECT oi.*, pi.name, pi.price AS unit_price FROM order_items oi \
             JOIN product_infos pi ON pi.id = oi.product_info_id WHERE oi.order_id = $1 ORDER BY oi.id",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?)
    }

    async fn insert_order_item(&mut self, order_id: OrderId, item: NewOrderItem) -> Result<OrderItem> {
        Ok(sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (order_id, product_info_id, shop_id, quantity) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(order_id)
        .bind(item.product_info_id)
        .bind(item.shop_id)
        .bind(item.quantity)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn set_order_item_quantity(&mut self, id: i64, quantity: i32) -> Result<()> {
        let result = sqlx::query("UPDATE order_items SET quantity = $2 WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("order item", id));
        }
        Ok(())
    }

    async fn delete_order_item(&mut self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM order_items WHERE id = $1").bind(id).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn transition_order(&mut self, id: OrderId, from: OrderStatus, to: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("order {id} is no longer {from}")));
        }
        Ok(())
    }

    async fn list_contacts(&mut self, user_id: UserId) -> Result<Vec<Contact>> {
        Ok(sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_contact_by_kind(&mut self, user_id: UserId, kind: &str) -> Result<Option<Contact>> {
        Ok(sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE user_id = $1 AND kind = $2 ORDER BY id LIMIT 1")
            .bind(user_id)
            .bind(kind)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_contact(&mut self, user_id: UserId, kind: &str, value: &str) -> Result<Contact> {
        Ok(sqlx::query_as::<_, Contact>("INSERT INTO contacts (user_id, kind, value) VALUES ($1, $2, $3) RETURNING *")
            .bind(user_id)
            .bind(kind)
            .bind(value)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn delete_contacts(&mut self, user_id: UserId, kind: &str, value: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM contacts WHERE user_id = $1 AND kind = $2 AND value = $3")
            .bind(user_id)
            .bind(kind)
            .bind(value)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
