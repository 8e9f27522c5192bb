//! Catalog Aggregate
//!
//! Shops, categories and products as supplied by partner feeds. A
//! [`ProductInfo`] is one shop's listing of a product and is the unit a
//! customer actually puts into a cart.

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{CategoryId, ParameterId, ProductId, ProductInfoId, ShopId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shop { pub id: ShopId, pub name: String, pub user_id: Option<UserId>, pub url: String }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category { pub id: CategoryId, pub name: String }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product { pub id: ProductId, pub name: String, pub category_id: Option<CategoryId> }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductInfo {
    pub id: ProductInfoId,
    pub product_id: ProductId,
    pub shop_id: ShopId,
    pub model: String,
    pub name: String,
    /// May drop below zero when confirmed orders outrun stock.
    pub quantity: i32,
    pub price: i64,
    pub price_rrc: i64,
    pub external_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Parameter { pub id: ParameterId, pub name: String }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductParameter { pub id: i64, pub product_info_id: ProductInfoId, pub parameter_id: ParameterId, pub value: String }

/// Fields of a listing about to be inserted.
#[derive(Clone, Debug)]
pub struct NewProductInfo {
    pub product_id: ProductId,
    pub shop_id: ShopId,
    pub model: String,
    pub name: String,
    pub quantity: i32,
    pub price: i64,
    pub price_rrc: i64,
    pub external_id: i64,
}

/// A parameter value attached to a listing, resolved to its name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingParameter { pub name: String, pub value: String }

/// A listing together with the owning shop's name and its parameters.
#[derive(Clone, Debug, Serialize)]
pub struct Listing {
    #[serde(flatten)]
    pub info: ProductInfo,
    pub shop_name: String,
    pub parameters: Vec<ListingParameter>,
}

/// Full view of a product across every shop that lists it.
#[derive(Clone, Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub listings: Vec<Listing>,
}

impl ProductInfo {
    pub fn is_oversold(&self) -> bool { self.quantity < 0 }

    /// Takes `quantity` units out of stock. There is no floor, only the
    /// integer range of the column.
    pub fn withdraw(&mut self, quantity: i32) -> Result<(), StockOverflow> {
        self.quantity = self
            .quantity
            .checked_sub(quantity)
            .ok_or(StockOverflow { listing: self.id, quantity })?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOverflow { pub listing: ProductInfoId, pub quantity: i32 }
impl std::error::Error for StockOverflow {}
impl std::fmt::Display for StockOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "withdrawing {} from listing {} leaves stock out of range", self.quantity, self.listing)
    }
}
