//! The per-session order projection. The backend is the system of record;
//! this store holds "orders this session cares about", keyed by order id,
//! merged from REST snapshots and push events under a single-writer actor.

pub mod views;

mod service;

pub use service::{MergeOutcome, OrderStoreClient, OrderStoreService, SnapshotReport};
