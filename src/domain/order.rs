use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// A single line of an order. `unit_price_snapshot` is captured at order
/// creation and never changes afterwards; later menu price edits must not
/// retroactively alter a placed order's total. Amounts are minor currency
/// units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub food_item_id: String,
    pub quantity: u32,
    pub unit_price_snapshot: i64,
}

/// A customer purchase progressing through the status lifecycle. Field names
/// follow the backend's camelCase wire format; every push event and REST
/// response carries the full snapshot, never a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub customer_id: String,
    pub restaurant_id: String,
    #[serde(default)]
    pub rider_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Composite-state sanity check: a rider is assigned exactly from
    /// `PICKED_BY_RIDER` onwards, and `total_amount` matches the item
    /// snapshots. Inconsistent snapshots are a backend bug; the store logs
    /// them but still applies last-writer-wins.
    pub fn is_consistent(&self) -> bool {
        let rider_ok = match self.status {
            OrderStatus::PickedByRider | OrderStatus::Delivered => self.rider_id.is_some(),
            _ => self.rider_id.is_none(),
        };
        rider_ok
            && self.items.iter().all(|item| item.quantity > 0)
            && self.total_amount == order_total(&self.items)
    }
}

/// Sum of `quantity * unit_price_snapshot` over all items. The backend stores
/// this at creation; the client recomputes it only for display and for
/// consistency checks, never to overwrite the stored value.
pub fn order_total(items: &[OrderItem]) -> i64 {
    items
        .iter()
        .map(|item| i64::from(item.quantity) * item.unit_price_snapshot)
        .sum()
}
