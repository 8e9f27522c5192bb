//! Aggregates module
pub mod catalog;
pub mod order;
pub mod cart;
pub mod contact;

pub use catalog::{Category, Listing, ListingParameter, NewProductInfo, Parameter, Product, ProductDetail, ProductInfo, ProductParameter, Shop, StockOverflow};
pub use order::{NewOrderItem, Order, OrderError, OrderItem, OrderLine, OrderView};
pub use cart::{AddedItems, CartOutcome, Confirmation, LineChange, RemovalReport};
pub use contact::{Contact, User};
