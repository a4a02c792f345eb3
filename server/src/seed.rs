// stockroom_server/src/seed.rs

//! Demo inventory loaded at startup when `SEED_DEMO_DATA` is set.

use rust_decimal::Decimal;
use stockroom::{NewItem, OwnerId, Stockroom};
use tracing::{info, instrument};

use crate::errors::Result;

/// (name, stock, low-stock threshold, price in cents)
const DEMO_ITEMS: &[(&str, i32, i32, i64)] = &[
  ("Espresso Beans 1kg", 24, 5, 2450),
  ("Oat Milk 1L", 12, 6, 325),
  ("Paper Cups (50)", 40, 10, 799),
  ("Ceramic Mug", 8, 3, 1200),
  ("Pour-Over Filters", 2, 4, 550),
  ("Chocolate Croissant", 15, 5, 375),
];

/// Seeds the demo inventory for `owner_id` unless that owner already has
/// items. Returns the number of items created.
#[instrument(name = "seed::demo_inventory", skip(stockroom), fields(owner_id = %owner_id))]
pub async fn seed_demo_inventory(stockroom: &Stockroom, owner_id: OwnerId) -> Result<usize> {
  let items = stockroom.items();
  if !items.list_items(owner_id).await?.is_empty() {
    info!("Owner already has inventory; skipping demo seed.");
    return Ok(0);
  }

  for &(name, stock_quantity, low_stock_threshold, cents) in DEMO_ITEMS {
    items
      .create_item(
        owner_id,
        NewItem {
          name: name.to_string(),
          stock_quantity,
          low_stock_threshold,
          price: Decimal::new(cents, 2),
        },
      )
      .await?;
  }
  info!(count = DEMO_ITEMS.len(), "Demo inventory seeded.");
  Ok(DEMO_ITEMS.len())
}
