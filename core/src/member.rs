//! Directory mirror of platform users.
//!
//! The ledger never creates or removes members; the auth/profile
//! services upsert them. Admin reporting filters on these rows.

use crate::types::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub name:    String,
    pub email:   String,
    pub active:  bool,
}

impl Member {
    pub fn new(user_id: &str, name: &str, email: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name:    name.to_string(),
            email:   email.to_string(),
            active:  true,
        }
    }
}
