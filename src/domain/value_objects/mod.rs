//! Value Objects for the catalog and cart

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type ShopId = i64;
pub type CategoryId = i64;
pub type ProductId = i64;
pub type ProductInfoId = i64;
pub type ParameterId = i64;
pub type OrderId = i64;

/// Supplier feed location, validated before anything is fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedUrl(String);

impl FeedUrl {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, FeedUrlError> {
        let value = value.as_ref().trim();
        if value.is_empty() { return Err(FeedUrlError::Empty); }
        let url = Url::parse(value).map_err(|e| FeedUrlError::Malformed(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FeedUrlError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none() { return Err(FeedUrlError::Malformed("missing host".into())); }
        Ok(Self(url.to_string()))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for FeedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum FeedUrlError { Empty, Malformed(String), UnsupportedScheme(String) }
impl std::error::Error for FeedUrlError {}
impl fmt::Display for FeedUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "feed url is empty"),
            Self::Malformed(e) => write!(f, "feed url is malformed: {e}"),
            Self::UnsupportedScheme(s) => write!(f, "feed url scheme '{s}' is not supported"),
        }
    }
}

/// Order lifecycle. Only `Cart -> Confirmed` is driven by the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Cart,
    Confirmed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "confirmed" => Ok(Self::Confirmed),
            "canceled" => Ok(Self::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown order status '{}'", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_feed_url() {
        assert_eq!(FeedUrl::parse(" https://supplier.example/price.yaml ").unwrap().as_str(), "https://supplier.example/price.yaml");
        assert_eq!(FeedUrl::parse(""), Err(FeedUrlError::Empty));
        assert!(matches!(FeedUrl::parse("not a url"), Err(FeedUrlError::Malformed(_))));
        assert!(matches!(FeedUrl::parse("ftp://supplier.example/x"), Err(FeedUrlError::UnsupportedScheme(_))));
    }
    #[test]
    fn test_order_status_round_trip() {
        for status in [OrderStatus::Cart, OrderStatus::Confirmed, OrderStatus::Canceled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
