// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use stockroom::{
  Cart, CartId, Item, ManualClock, MemoryStore, NewItem, OwnerId, RetryConfig, Stockroom, StockroomConfig,
};
use tracing::Level;

// --- Fixture ---
pub struct Fixture {
  pub stockroom: Stockroom,
  pub store: MemoryStore,
  pub clock: ManualClock,
  pub owner: OwnerId,
}

pub fn start_instant() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

/// Short timeout, no retries: a failing test should fail fast.
pub fn test_config() -> StockroomConfig {
  StockroomConfig {
    operation_timeout: Duration::from_secs(2),
    retry: RetryConfig::disabled(),
    search_limit_max: 50,
  }
}

pub fn fixture() -> Fixture {
  fixture_with(test_config())
}

pub fn fixture_with(config: StockroomConfig) -> Fixture {
  setup_tracing();
  let store = MemoryStore::new();
  let clock = ManualClock::new(start_instant());
  let stockroom = Stockroom::with_parts(Arc::new(store.clone()), Arc::new(clock.clone()), config);
  Fixture {
    stockroom,
    store,
    clock,
    owner: OwnerId::new(),
  }
}

impl Fixture {
  pub async fn item(&self, name: &str, stock: i32, threshold: i32, price: Decimal) -> Item {
    self
      .stockroom
      .items()
      .create_item(
        self.owner,
        NewItem {
          name: name.to_string(),
          stock_quantity: stock,
          low_stock_threshold: threshold,
          price,
        },
      )
      .await
      .expect("item fixture should be valid")
  }

  pub async fn cart(&self, customer: &str) -> Cart {
    self
      .stockroom
      .carts()
      .create_cart(self.owner, customer, None)
      .await
      .expect("cart fixture should be valid")
  }

  pub async fn stock_of(&self, item: &Item) -> i32 {
    self.stockroom.items().get_item(item.id).await.unwrap().stock_quantity
  }

  /// Asserts the stored total equals the sum of the stored line subtotals.
  pub async fn assert_total_consistent(&self, cart_id: CartId) {
    let details = self.stockroom.carts().get_cart(cart_id).await.unwrap();
    let sum: Decimal = details.lines.iter().map(|line| line.line_item.subtotal).sum();
    assert_eq!(details.cart.total_amount, sum, "cart total drifted from its line items");
  }
}

// --- Helper for Tracing Setup ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
