//! Users and their delivery contacts

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::UserId;

/// An authenticated customer or partner account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User { pub id: UserId, pub username: String, pub email: String }

/// A labelled contact such as a delivery address. `kind` is free text and
/// is what confirm-cart resolves an address label against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Contact {
    pub fn matches(&self, kind: &str, value: &str) -> bool { self.kind == kind && self.value == value }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_contact_wire_name() {
        let c = Contact { id: 1, user_id: 2, kind: "home".into(), value: "1 Main St".into() };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "home");
        assert!(c.matches("home", "1 Main St"));
        assert!(!c.matches("home", "2 Main St"));
    }
}
