use serde::{Deserialize, Serialize};

use super::status::Role;

/// Profile of the logged-in user, as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The identity a session acts under. Drives order visibility in the store
/// and actor checks in the gate; built once at login and immutable for the
/// session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub role: Role,
    /// Restaurant ids owned by this user. Only populated for the restaurant
    /// role.
    pub owned_restaurant_ids: Vec<String>,
}

impl SessionIdentity {
    pub fn customer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Customer,
            owned_restaurant_ids: Vec::new(),
        }
    }

    pub fn restaurant_owner(
        user_id: impl Into<String>,
        owned_restaurant_ids: Vec<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Restaurant,
            owned_restaurant_ids,
        }
    }

    pub fn rider(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Rider,
            owned_restaurant_ids: Vec::new(),
        }
    }

    pub fn owns_restaurant(&self, restaurant_id: &str) -> bool {
        self.owned_restaurant_ids
            .iter()
            .any(|id| id == restaurant_id)
    }
}
