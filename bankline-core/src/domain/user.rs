//! User domain model

use serde::{Deserialize, Serialize};

/// An online-banking user known to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Engine-internal unique id
    pub id: u32,
    pub name: String,
    /// Login name at the bank
    pub user_id: String,
    pub customer_id: String,
}

impl User {
    pub fn new(id: u32, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            id,
            name: String::new(),
            customer_id: user_id.clone(),
            user_id,
        }
    }
}
