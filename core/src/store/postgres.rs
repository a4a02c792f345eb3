// core/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{lock_order, LedgerStore, StoreTx};
use crate::error::{LedgerError, LedgerResult};
use crate::model::{Cart, CartId, CartLine, CartLineItem, CartStatus, Item, ItemId, LineItemId, OwnerId};

/// PostgreSQL store. Row locks are `SELECT ... FOR UPDATE` inside a
/// database transaction; dropping a [`StoreTx`] rolls it back.
#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

#[derive(FromRow)]
struct CartLineRow {
  id: LineItemId,
  cart_id: CartId,
  item_id: ItemId,
  quantity: i32,
  price_at_time: Decimal,
  subtotal: Decimal,
  created_at: DateTime<Utc>,
  item_name: Option<String>,
  available_stock: Option<i32>,
}

impl From<CartLineRow> for CartLine {
  fn from(row: CartLineRow) -> Self {
    CartLine::new(
      CartLineItem {
        id: row.id,
        cart_id: row.cart_id,
        item_id: row.item_id,
        quantity: row.quantity,
        price_at_time: row.price_at_time,
        subtotal: row.subtotal,
        created_at: row.created_at,
      },
      row.item_name,
      row.available_stock,
    )
  }
}

/// Escapes `LIKE` metacharacters so user input matches literally.
fn like_pattern(query: &str) -> String {
  let mut pattern = String::with_capacity(query.len() + 2);
  pattern.push('%');
  for ch in query.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(ch);
  }
  pattern.push('%');
  pattern
}

fn sql_limit(limit: usize) -> i64 {
  i64::try_from(limit).unwrap_or(i64::MAX)
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> LedgerResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .acquire_timeout(acquire_timeout)
      .connect(database_url)
      .await?;
    info!(max_connections, "Connected to PostgreSQL.");
    Ok(Self { pool })
  }

  /// Applies the embedded schema migrations.
  pub async fn migrate(&self) -> LedgerResult<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(LedgerError::storage)?;
    info!("Ledger schema migrations applied.");
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl LedgerStore for PgStore {
  #[instrument(name = "PgStore::begin", skip(self), err(Display))]
  async fn begin(&self) -> LedgerResult<Box<dyn StoreTx>> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgTx { tx }))
  }

  async fn item(&self, id: ItemId) -> LedgerResult<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(
      "SELECT id, owner_id, name, stock_quantity, low_stock_threshold, price, created_at, updated_at \
       FROM items WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(item)
  }

  async fn items_by_owner(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>> {
    let items = sqlx::query_as::<_, Item>(
      "SELECT id, owner_id, name, stock_quantity, low_stock_threshold, price, created_at, updated_at \
       FROM items WHERE owner_id = $1 ORDER BY name ASC, id ASC",
    )
    .bind(owner_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn search_items(&self, owner_id: OwnerId, query: &str, limit: usize) -> LedgerResult<Vec<Item>> {
    let items = sqlx::query_as::<_, Item>(
      "SELECT id, owner_id, name, stock_quantity, low_stock_threshold, price, created_at, updated_at \
       FROM items WHERE owner_id = $1 AND name ILIKE $2 ESCAPE '\\' \
       ORDER BY name ASC, id ASC LIMIT $3",
    )
    .bind(owner_id)
    .bind(like_pattern(query))
    .bind(sql_limit(limit))
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn low_stock_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>> {
    let items = sqlx::query_as::<_, Item>(
      "SELECT id, owner_id, name, stock_quantity, low_stock_threshold, price, created_at, updated_at \
       FROM items WHERE owner_id = $1 AND stock_quantity <= low_stock_threshold \
       ORDER BY stock_quantity ASC, name ASC, id ASC",
    )
    .bind(owner_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn cart(&self, id: CartId) -> LedgerResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(
      "SELECT id, owner_id, customer_name, status, notes, total_amount, created_at, updated_at, completed_at \
       FROM carts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(cart)
  }

  async fn cart_lines(&self, cart_id: CartId) -> LedgerResult<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
      "SELECT li.id, li.cart_id, li.item_id, li.quantity, li.price_at_time, li.subtotal, li.created_at, \
              i.name AS item_name, i.stock_quantity AS available_stock \
       FROM cart_line_items li LEFT JOIN items i ON i.id = li.item_id \
       WHERE li.cart_id = $1 ORDER BY li.created_at ASC, li.id ASC",
    )
    .bind(cart_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
  }

  async fn line_item(&self, id: LineItemId) -> LedgerResult<Option<CartLineItem>> {
    let line = sqlx::query_as::<_, CartLineItem>(
      "SELECT id, cart_id, item_id, quantity, price_at_time, subtotal, created_at \
       FROM cart_line_items WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(line)
  }

  async fn carts_by_owner(&self, owner_id: OwnerId, status: Option<CartStatus>) -> LedgerResult<Vec<Cart>> {
    let carts = sqlx::query_as::<_, Cart>(
      "SELECT id, owner_id, customer_name, status, notes, total_amount, created_at, updated_at, completed_at \
       FROM carts WHERE owner_id = $1 AND ($2::cart_status IS NULL OR status = $2) \
       ORDER BY created_at DESC, id DESC",
    )
    .bind(owner_id)
    .bind(status)
    .fetch_all(&self.pool)
    .await?;
    Ok(carts)
  }

  async fn completed_revenue(&self, owner_id: OwnerId, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Decimal> {
    let total = sqlx::query_scalar::<_, Decimal>(
      "SELECT COALESCE(SUM(total_amount), 0) FROM carts \
       WHERE owner_id = $1 AND status = 'completed' AND completed_at >= $2 AND completed_at < $3",
    )
    .bind(owner_id)
    .bind(start)
    .bind(end)
    .fetch_one(&self.pool)
    .await?;
    Ok(total)
  }

  async fn recent_carts(&self, owner_id: OwnerId, limit: usize) -> LedgerResult<Vec<Cart>> {
    let carts = sqlx::query_as::<_, Cart>(
      "SELECT id, owner_id, customer_name, status, notes, total_amount, created_at, updated_at, completed_at \
       FROM carts WHERE owner_id = $1 \
       ORDER BY GREATEST(completed_at, created_at) DESC, id DESC LIMIT $2",
    )
    .bind(owner_id)
    .bind(sql_limit(limit))
    .fetch_all(&self.pool)
    .await?;
    Ok(carts)
  }
}

struct PgTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
  async fn lock_cart(&mut self, id: CartId) -> LedgerResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(
      "SELECT id, owner_id, customer_name, status, notes, total_amount, created_at, updated_at, completed_at \
       FROM carts WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *self.tx)
    .await?;
    debug!(cart_id = %id, found = cart.is_some(), "Cart row locked");
    Ok(cart)
  }

  async fn lock_items(&mut self, ids: &[ItemId]) -> LedgerResult<Vec<Item>> {
    // One statement per row keeps the acquisition order explicit.
    let mut items = Vec::with_capacity(ids.len());
    for id in lock_order(ids) {
      let item = sqlx::query_as::<_, Item>(
        "SELECT id, owner_id, name, stock_quantity, low_stock_threshold, price, created_at, updated_at \
         FROM items WHERE id = $1 FOR UPDATE",
      )
      .bind(id)
      .fetch_optional(&mut *self.tx)
      .await?;
      items.extend(item);
    }
    Ok(items)
  }

  async fn line_items(&mut self, cart_id: CartId) -> LedgerResult<Vec<CartLineItem>> {
    let lines = sqlx::query_as::<_, CartLineItem>(
      "SELECT id, cart_id, item_id, quantity, price_at_time, subtotal, created_at \
       FROM cart_line_items WHERE cart_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(cart_id)
    .fetch_all(&mut *self.tx)
    .await?;
    Ok(lines)
  }

  async fn item_in_active_cart(&mut self, item_id: ItemId) -> LedgerResult<bool> {
    let referenced = sqlx::query_scalar::<_, bool>(
      "SELECT EXISTS (SELECT 1 FROM cart_line_items li JOIN carts c ON c.id = li.cart_id \
       WHERE li.item_id = $1 AND c.status = 'active')",
    )
    .bind(item_id)
    .fetch_one(&mut *self.tx)
    .await?;
    Ok(referenced)
  }

  async fn put_item(&mut self, item: &Item) -> LedgerResult<()> {
    sqlx::query(
      "INSERT INTO items (id, owner_id, name, stock_quantity, low_stock_threshold, price, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
       ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, stock_quantity = EXCLUDED.stock_quantity, \
         low_stock_threshold = EXCLUDED.low_stock_threshold, price = EXCLUDED.price, updated_at = EXCLUDED.updated_at",
    )
    .bind(item.id)
    .bind(item.owner_id)
    .bind(&item.name)
    .bind(item.stock_quantity)
    .bind(item.low_stock_threshold)
    .bind(item.price)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn delete_item(&mut self, id: ItemId) -> LedgerResult<()> {
    sqlx::query("DELETE FROM items WHERE id = $1")
      .bind(id)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn put_cart(&mut self, cart: &Cart) -> LedgerResult<()> {
    sqlx::query(
      "INSERT INTO carts (id, owner_id, customer_name, status, notes, total_amount, created_at, updated_at, completed_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
       ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, notes = EXCLUDED.notes, \
         total_amount = EXCLUDED.total_amount, updated_at = EXCLUDED.updated_at, completed_at = EXCLUDED.completed_at",
    )
    .bind(cart.id)
    .bind(cart.owner_id)
    .bind(&cart.customer_name)
    .bind(cart.status)
    .bind(&cart.notes)
    .bind(cart.total_amount)
    .bind(cart.created_at)
    .bind(cart.updated_at)
    .bind(cart.completed_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn put_line_item(&mut self, line: &CartLineItem) -> LedgerResult<()> {
    // subtotal is a generated column
    sqlx::query(
      "INSERT INTO cart_line_items (id, cart_id, item_id, quantity, price_at_time, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (id) DO UPDATE SET quantity = EXCLUDED.quantity",
    )
    .bind(line.id)
    .bind(line.cart_id)
    .bind(line.item_id)
    .bind(line.quantity)
    .bind(line.price_at_time)
    .bind(line.created_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn delete_line_item(&mut self, id: LineItemId) -> LedgerResult<()> {
    sqlx::query("DELETE FROM cart_line_items WHERE id = $1")
      .bind(id)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn commit(self: Box<Self>) -> LedgerResult<()> {
    self.tx.commit().await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn like_pattern_escapes_metacharacters() {
    assert_eq!(like_pattern("wid"), "%wid%");
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    assert_eq!(like_pattern(""), "%%");
  }

  #[test]
  fn uuid_binding_matches_id_order() {
    let a = ItemId::from_uuid(Uuid::from_u128(1));
    let b = ItemId::from_uuid(Uuid::from_u128(2));
    assert_eq!(lock_order(&[b, a, b]), vec![a, b]);
  }
}
