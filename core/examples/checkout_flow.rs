// stockroom/examples/checkout_flow.rs

use rust_decimal_macros::dec;
use std::sync::Arc;
use stockroom::{LedgerError, MemoryStore, NewItem, OwnerId, Stockroom};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Checkout Flow Example ---");

  // 1. Wire a stockroom to an in-memory store
  let stockroom = Stockroom::new(Arc::new(MemoryStore::new()));
  let owner = OwnerId::new();

  // 2. Register an item
  let widget = stockroom
    .items()
    .create_item(
      owner,
      NewItem {
        name: "Widget".into(),
        stock_quantity: 10,
        low_stock_threshold: 3,
        price: dec!(5.00),
      },
    )
    .await?;

  // 3. Open a cart and add the item twice; the second add merges
  let cart = stockroom.carts().create_cart(owner, "Alice", None).await?;
  stockroom.ledger().add_to_cart(cart.id, widget.id, 4).await?;
  let line = stockroom.ledger().add_to_cart(cart.id, widget.id, 3).await?;
  info!(quantity = line.quantity, subtotal = %line.subtotal, "Line item after merge");

  // 4. Check out, reducing inventory
  let completed = stockroom.ledger().checkout(cart.id, true).await?;
  let widget = stockroom.items().get_item(widget.id).await?;
  info!(total = %completed.total_amount, remaining = widget.stock_quantity, "Checked out");

  // 5. A second cart asks for more than is left
  let greedy = stockroom.carts().create_cart(owner, "Bob", None).await?;
  let line = stockroom.ledger().add_to_cart(greedy.id, widget.id, 3).await?;
  stockroom.ledger().update_line_item_quantity(line.id, 5).await?;
  match stockroom.ledger().checkout(greedy.id, true).await {
    Err(LedgerError::InsufficientStock { requested, available, .. }) => {
      info!(requested, available, "Checkout refused, nothing changed");
    }
    other => anyhow::bail!("expected an insufficient stock error, got {:?}", other),
  }

  let low = stockroom.queries().low_stock_items(owner).await?;
  info!(low_stock = low.len(), "Low stock report");
  Ok(())
}
