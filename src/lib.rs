//! Catalog & Cart Service
//!
//! Partners publish their price list as a YAML feed at a URL; customers
//! browse the resulting catalog, build a cart and confirm it into an order
//! delivered to one of their saved contacts.
//!
//! ## Features
//! - Feed import that replaces a shop's listings atomically
//! - Product browsing with per-shop listings and parameters
//! - Cart and order lifecycle with stock withdrawal on confirmation
//! - Per-user contact directory

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod mail;
pub mod services;
pub mod store;

pub use api::{router, AppState};
pub use config::AppConfig;
pub use error::{AppError, Result};
