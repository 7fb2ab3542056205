//! Customer cart: a single-restaurant staging area for an order, persisted
//! per user so it survives restarts. Adding an item from a different
//! restaurant silently replaces the cart, matching the one-restaurant-per-
//! order rule the backend enforces.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{CreateOrderItem, CreateOrderRequest};
use crate::domain::FoodItem;
use crate::error::CartError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub food_item_id: String,
    pub name: String,
    /// Price captured at add time, in minor currency units. The order keeps
    /// this snapshot even if the restaurant reprices the item later.
    pub unit_price: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub restaurant_id: Option<String>,
    pub items: Vec<CartLine>,
}

impl CartState {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds one unit of `item`. A cart holds items from one restaurant at a
    /// time; adding from a different restaurant resets the cart to this
    /// single item.
    pub fn add_item(&mut self, item: &FoodItem) {
        if self.restaurant_id.as_deref() != Some(item.restaurant_id.as_str()) {
            debug!(restaurant_id = %item.restaurant_id, "cart switching restaurant");
            self.restaurant_id = Some(item.restaurant_id.clone());
            self.items.clear();
        }
        match self.items.iter_mut().find(|line| line.food_item_id == item.id) {
            Some(line) => line.quantity += 1,
            None => self.items.push(CartLine {
                food_item_id: item.id.clone(),
                name: item.name.clone(),
                unit_price: item.price,
                quantity: 1,
            }),
        }
    }

    /// Sets the quantity of a line. Zero removes the line; removing the last
    /// line clears the restaurant binding so any restaurant may be added next.
    pub fn update_quantity(&mut self, food_item_id: &str, quantity: u32) {
        if quantity == 0 {
            self.items.retain(|line| line.food_item_id != food_item_id);
        } else if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.food_item_id == food_item_id)
        {
            line.quantity = quantity;
        }
        if self.items.is_empty() {
            self.restaurant_id = None;
        }
    }

    pub fn remove_item(&mut self, food_item_id: &str) {
        self.update_quantity(food_item_id, 0);
    }

    pub fn clear(&mut self) {
        self.restaurant_id = None;
        self.items.clear();
    }

    pub fn total_price(&self) -> i64 {
        self.items
            .iter()
            .map(|line| line.unit_price * i64::from(line.quantity))
            .sum()
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Freezes the cart into an order request. `None` while the cart is
    /// empty; the price snapshots carried in each line become the order's
    /// immutable `unit_price_snapshot`s.
    pub fn to_order_request(&self, delivery_address: &str) -> Option<CreateOrderRequest> {
        let restaurant_id = self.restaurant_id.clone()?;
        if self.items.is_empty() {
            return None;
        }
        Some(CreateOrderRequest {
            restaurant_id,
            items: self
                .items
                .iter()
                .map(|line| CreateOrderItem {
                    food_item_id: line.food_item_id.clone(),
                    quantity: line.quantity,
                    unit_price_snapshot: line.unit_price,
                })
                .collect(),
            delivery_address: delivery_address.to_string(),
        })
    }
}

/// Per-user cart persistence. Synchronous on purpose: carts are tiny and the
/// session serializes access behind its own lock.
pub trait CartRepository: Send + Sync {
    fn load(&self, user_id: &str) -> Result<CartState, CartError>;
    fn save(&self, user_id: &str, cart: &CartState) -> Result<(), CartError>;
    fn clear(&self, user_id: &str) -> Result<(), CartError>;
}

/// Volatile repository for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: Mutex<HashMap<String, CartState>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CartState>> {
        self.carts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CartRepository for InMemoryCartRepository {
    fn load(&self, user_id: &str) -> Result<CartState, CartError> {
        Ok(self.lock().get(user_id).cloned().unwrap_or_default())
    }

    fn save(&self, user_id: &str, cart: &CartState) -> Result<(), CartError> {
        self.lock().insert(user_id.to_string(), cart.clone());
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<(), CartError> {
        self.lock().remove(user_id);
        Ok(())
    }
}

/// Carts persisted as one JSON file keyed by user id.
pub struct JsonFileCartRepository {
    path: PathBuf,
}

impl JsonFileCartRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<HashMap<String, CartState>, CartError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(CartError::Storage(e)),
        }
    }

    fn write_all(&self, carts: &HashMap<String, CartState>) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(carts)?)?;
        Ok(())
    }
}

impl CartRepository for JsonFileCartRepository {
    fn load(&self, user_id: &str) -> Result<CartState, CartError> {
        Ok(self.read_all()?.remove(user_id).unwrap_or_default())
    }

    fn save(&self, user_id: &str, cart: &CartState) -> Result<(), CartError> {
        let mut carts = self.read_all()?;
        carts.insert(user_id.to_string(), cart.clone());
        self.write_all(&carts)
    }

    fn clear(&self, user_id: &str) -> Result<(), CartError> {
        let mut carts = self.read_all()?;
        if carts.remove(user_id).is_some() {
            self.write_all(&carts)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(id: &str, restaurant: &str, price: i64) -> FoodItem {
        FoodItem {
            id: id.to_string(),
            restaurant_id: restaurant.to_string(),
            name: format!("item {id}"),
            price,
            available: true,
        }
    }

    #[test]
    fn repeated_adds_accumulate_quantity() {
        let mut cart = CartState::default();
        let burger = food("f1", "r1", 550);
        cart.add_item(&burger);
        cart.add_item(&burger);
        cart.add_item(&food("f2", "r1", 300));

        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), 2 * 550 + 300);
        assert_eq!(cart.restaurant_id.as_deref(), Some("r1"));
    }

    #[test]
    fn adding_from_another_restaurant_resets_the_cart() {
        let mut cart = CartState::default();
        cart.add_item(&food("f1", "r1", 550));
        cart.add_item(&food("f9", "r2", 800));

        assert_eq!(cart.restaurant_id.as_deref(), Some("r2"));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].food_item_id, "f9");
    }

    #[test]
    fn zero_quantity_removes_and_emptying_unbinds_restaurant() {
        let mut cart = CartState::default();
        cart.add_item(&food("f1", "r1", 550));
        cart.update_quantity("f1", 3);
        assert_eq!(cart.total_items(), 3);

        cart.update_quantity("f1", 0);
        assert!(cart.is_empty());
        assert_eq!(cart.restaurant_id, None);
    }

    #[test]
    fn order_request_carries_price_snapshots() {
        let mut cart = CartState::default();
        cart.add_item(&food("f1", "r1", 550));
        cart.update_quantity("f1", 2);

        let request = cart.to_order_request("12 Main St").unwrap();
        assert_eq!(request.restaurant_id, "r1");
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.items[0].unit_price_snapshot, 550);
        assert_eq!(request.delivery_address, "12 Main St");

        assert!(CartState::default().to_order_request("12 Main St").is_none());
    }

    #[test]
    fn json_repository_round_trips_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileCartRepository::new(dir.path().join("carts.json"));

        let mut cart = CartState::default();
        cart.add_item(&food("f1", "r1", 550));
        repo.save("u1", &cart).unwrap();

        assert_eq!(repo.load("u1").unwrap(), cart);
        assert!(repo.load("u2").unwrap().is_empty());

        repo.clear("u1").unwrap();
        assert!(repo.load("u1").unwrap().is_empty());
    }
}
