use serde::{Deserialize, Serialize};

/// A restaurant listing. `owner_id` lets a restaurant-role session derive the
/// set of restaurants it manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: String,
    pub owner_id: String,
}

/// A menu entry. `price` is the current menu price in minor currency units;
/// orders capture their own immutable price snapshot at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub price: i64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}
