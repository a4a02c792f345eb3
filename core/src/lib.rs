// src/lib.rs

//! Stockroom: an asynchronous inventory and cart ledger.
//!
//! Owners register items with stock levels and prices, open per-customer
//! carts, add items to them and check the carts out. The crate keeps the
//! records consistent under concurrent callers:
//!  - a cart's `total_amount` always equals the sum of its line item subtotals;
//!  - an item's `stock_quantity` never goes below zero;
//!  - checkout reduces stock for every line item and completes the cart in one
//!    transaction, or changes nothing.
//!
//! Components, leaves first:
//!  - [`ItemStore`]: item records.
//!  - [`CartStore`]: cart headers and their joined line items.
//!  - [`Ledger`]: every mutation spanning more than one record.
//!  - [`QueryFacade`]: read-side aggregates for dashboards.
//!
//! All four are obtained from a [`Stockroom`], which wires them to one
//! [`LedgerStore`] (in memory, or PostgreSQL with the `postgres` feature).

pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod store;

mod carts;
mod items;
mod ledger;
mod queries;
mod retry;
mod stockroom;

// --- Re-exports for the Public API ---

pub use crate::carts::CartStore;
pub use crate::items::ItemStore;
pub use crate::ledger::Ledger;
pub use crate::queries::{ActivityEntry, DashboardSummary, QueryFacade};
pub use crate::stockroom::Stockroom;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{RetryConfig, StockroomConfig};
pub use crate::error::{LedgerError, LedgerResult};
pub use crate::model::{
  Cart, CartDetails, CartId, CartLine, CartLineItem, CartStatus, Item, ItemId, ItemPatch, LineItemId, NewItem, OwnerId,
};
pub use crate::store::{LedgerStore, MemoryStore, StoreTx};
#[cfg(feature = "postgres")]
pub use crate::store::PgStore;
