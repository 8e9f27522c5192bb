//! Supplier feeds
//!
//! A feed is a YAML (or JSON) price list:
//!
//! ```yaml
//! shop: Svyaznoy
//! categories:
//!   - id: 224
//!     name: Smartphones
//! goods:
//!   - id: 4216292
//!     category: 224
//!     model: apple/iphone/xs-max
//!     name: Smartphone Apple iPhone XS Max 512GB (gold)
//!     price: 110000
//!     price_rrc: 116990
//!     quantity: 14
//!     parameters:
//!       "Screen (inch)": 6.5
//!       Color: gold
//! ```
//!
//! Parsing and validation happen entirely before the importer touches the
//! store, so a bad feed never causes a catalog write.

mod source;

pub use source::{FeedSource, HttpFeedSource};

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;
use validator::Validate;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed fetch failed: {0}")]
    Fetch(String),

    #[error("Feed exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Feed could not be parsed: {0}")]
    Parse(String),

    #[error("Feed is invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Feed {
    #[validate(length(min = 1))]
    pub shop: String,
    pub categories: Vec<FeedCategory>,
    pub goods: Vec<FeedGood>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeedCategory {
    #[validate(range(min = 0))]
    pub id: i64,
    #[validate(length(min = 1))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeedGood {
    #[validate(range(min = 0))]
    pub id: i64,
    #[validate(length(min = 1))]
    pub name: String,
    pub category: i64,
    pub model: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub price_rrc: i64,
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// Parameter values arrive as YAML scalars and are stored as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            // `6.0` stays `6.0` rather than `6`
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl Feed {
    /// Parses raw feed bytes and checks the result is importable.
    pub fn parse(bytes: &[u8]) -> Result<Self, FeedError> {
        let feed: Feed = serde_yaml::from_slice(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;
        feed.check()?;
        Ok(feed)
    }

    fn check(&self) -> Result<(), FeedError> {
        self.validate().map_err(|e| FeedError::Invalid(e.to_string()))?;

        let mut categories: HashMap<i64, &str> = HashMap::new();
        for (idx, category) in self.categories.iter().enumerate() {
            category.validate().map_err(|e| FeedError::Invalid(format!("categories[{idx}]: {e}")))?;
            if let Some(previous) = categories.insert(category.id, &category.name) {
                if previous != category.name {
                    return Err(FeedError::Invalid(format!(
                        "category {} is declared as both '{previous}' and '{}'",
                        category.id, category.name
                    )));
                }
            }
        }

        for (idx, good) in self.goods.iter().enumerate() {
            good.validate().map_err(|e| FeedError::Invalid(format!("goods[{idx}]: {e}")))?;
            if !categories.contains_key(&good.category) {
                return Err(FeedError::Invalid(format!(
                    "goods[{idx}] '{}' refers to undeclared category {}",
                    good.name, good.category
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
shop: A
categories:
  - id: 1
    name: X
goods:
  - id: 1
    category: 1
    model: m
    name: P1
    price: 100
    price_rrc: 120
    quantity: 5
    parameters:
      color: red
      "Screen (inch)": 6.5
      RAM: 4
      NFC: true
"#;

    #[test]
    fn test_parse_yaml_feed() {
        let feed = Feed::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(feed.shop, "A");
        assert_eq!(feed.categories.len(), 1);
        let good = &feed.goods[0];
        assert_eq!((good.price, good.price_rrc, good.quantity), (100, 120, 5));
        assert_eq!(good.parameters["color"].to_string(), "red");
        assert_eq!(good.parameters["Screen (inch)"].to_string(), "6.5");
        assert_eq!(good.parameters["RAM"].to_string(), "4");
        assert_eq!(good.parameters["NFC"].to_string(), "true");
    }

    #[test]
    fn test_float_parameters_keep_their_form() {
        let yaml = SAMPLE.replace("\"Screen (inch)\": 6.5", "\"Screen (inch)\": 6.0\n      Weight: 0.25");
        let feed = Feed::parse(yaml.as_bytes()).unwrap();
        let params = &feed.goods[0].parameters;
        assert_eq!(params["Screen (inch)"], ParameterValue::Float(6.0));
        assert_eq!(params["Screen (inch)"].to_string(), "6.0");
        assert_eq!(params["Weight"].to_string(), "0.25");
    }

    #[test]
    fn test_parse_json_feed() {
        let json = r#"{"shop":"A","categories":[{"id":1,"name":"X"}],"goods":[{"id":1,"name":"P1","category":1,"model":"m","price":100,"price_rrc":120,"quantity":5,"parameters":{"color":"red"}}]}"#;
        let feed = Feed::parse(json.as_bytes()).unwrap();
        assert_eq!(feed.goods[0].name, "P1");
    }

    #[test]
    fn test_unparseable_feed() {
        assert!(matches!(Feed::parse(b"shop: [unclosed"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let feed = SAMPLE.replace("    price_rrc: 120\n", "");
        assert!(matches!(Feed::parse(feed.as_bytes()), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_negative_price_rejected() {
        let feed = SAMPLE.replace("price: 100", "price: -1");
        assert!(matches!(Feed::parse(feed.as_bytes()), Err(FeedError::Invalid(_))));
    }

    #[test]
    fn test_undeclared_category_rejected() {
        let feed = SAMPLE.replace("    category: 1\n", "    category: 9\n");
        let err = Feed::parse(feed.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("undeclared category 9"));
    }

    #[test]
    fn test_conflicting_category_names_rejected() {
        let feed = SAMPLE.replace("    name: X\n", "    name: X\n  - id: 1\n    name: Y\n");
        assert!(matches!(Feed::parse(feed.as_bytes()), Err(FeedError::Invalid(_))));
    }
}
