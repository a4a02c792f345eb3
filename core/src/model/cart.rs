// core/src/model/cart.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{require_name, CartId, ItemId, LineItemId, OwnerId, MONEY_SCALE};
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "cart_status", rename_all = "lowercase")
)]
pub enum CartStatus {
  Active,
  Completed,
  Cancelled,
}

impl CartStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      CartStatus::Active => "active",
      CartStatus::Completed => "completed",
      CartStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, CartStatus::Active)
  }

  /// Only `active -> completed` and `active -> cancelled` are legal.
  pub fn can_transition_to(&self, next: CartStatus) -> bool {
    matches!(
      (self, next),
      (CartStatus::Active, CartStatus::Completed) | (CartStatus::Active, CartStatus::Cancelled)
    )
  }
}

impl fmt::Display for CartStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CartStatus {
  type Err = LedgerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "active" => Ok(CartStatus::Active),
      "completed" => Ok(CartStatus::Completed),
      "cancelled" => Ok(CartStatus::Cancelled),
      other => Err(LedgerError::validation(
        "status",
        format!("unknown cart status '{}'", other),
      )),
    }
  }
}

/// A customer's shopping session. `total_amount` is derived from the line
/// items and `completed_at` is set exactly when `status` is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Cart {
  pub id: CartId,
  pub owner_id: OwnerId,
  pub customer_name: String,
  pub status: CartStatus,
  pub notes: Option<String>,
  pub total_amount: Decimal,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

impl Cart {
  pub fn new(owner_id: OwnerId, customer_name: &str, notes: Option<&str>, now: DateTime<Utc>) -> LedgerResult<Self> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    Ok(Self {
      id: CartId::new(),
      owner_id,
      customer_name: require_name("customer_name", customer_name)?,
      status: CartStatus::Active,
      notes,
      total_amount: zero_money(),
      created_at: now,
      updated_at: now,
      completed_at: None,
    })
  }

  pub fn is_active(&self) -> bool {
    self.status == CartStatus::Active
  }

  pub fn ensure_active(&self) -> LedgerResult<()> {
    if self.is_active() {
      Ok(())
    } else {
      Err(LedgerError::InvalidState(format!(
        "cart {} is {} and can no longer be modified",
        self.id, self.status
      )))
    }
  }

  pub fn transition(&mut self, next: CartStatus, now: DateTime<Utc>) -> LedgerResult<()> {
    if !self.status.can_transition_to(next) {
      return Err(LedgerError::InvalidState(format!(
        "cart {} cannot move from {} to {}",
        self.id, self.status, next
      )));
    }
    self.status = next;
    self.updated_at = now;
    if next == CartStatus::Completed {
      self.completed_at = Some(now);
    }
    Ok(())
  }

  pub fn set_total(&mut self, total: Decimal, now: DateTime<Utc>) {
    self.total_amount = total;
    self.updated_at = now;
  }

  /// Timestamp used to order recent activity: completion if any, else creation.
  pub fn last_activity_at(&self) -> DateTime<Utc> {
    match self.completed_at {
      Some(completed_at) if completed_at > self.created_at => completed_at,
      _ => self.created_at,
    }
  }
}

/// One item-and-quantity entry of a cart. `price_at_time` is fixed when the
/// line is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CartLineItem {
  pub id: LineItemId,
  pub cart_id: CartId,
  pub item_id: ItemId,
  pub quantity: i32,
  pub price_at_time: Decimal,
  pub subtotal: Decimal,
  pub created_at: DateTime<Utc>,
}

impl CartLineItem {
  pub fn new(cart_id: CartId, item_id: ItemId, quantity: i32, price_at_time: Decimal, now: DateTime<Utc>) -> Self {
    Self {
      id: LineItemId::new(),
      cart_id,
      item_id,
      quantity,
      price_at_time,
      subtotal: line_subtotal(quantity, price_at_time),
      created_at: now,
    }
  }

  pub fn set_quantity(&mut self, quantity: i32) {
    self.quantity = quantity;
    self.subtotal = line_subtotal(quantity, self.price_at_time);
  }
}

/// A line item joined with the referenced item's current name and stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
  #[serde(flatten)]
  pub line_item: CartLineItem,
  pub item_name: Option<String>,
  pub available_stock: Option<i32>,
  /// Quantity is above the item's current stock. Display-only; checkout is
  /// where the limit is enforced.
  pub exceeds_stock: bool,
}

impl CartLine {
  pub fn new(line_item: CartLineItem, item_name: Option<String>, available_stock: Option<i32>) -> Self {
    let exceeds_stock = available_stock.is_some_and(|stock| line_item.quantity > stock);
    Self {
      line_item,
      item_name,
      available_stock,
      exceeds_stock,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartDetails {
  #[serde(flatten)]
  pub cart: Cart,
  pub lines: Vec<CartLine>,
}

fn line_subtotal(quantity: i32, price: Decimal) -> Decimal {
  let mut subtotal = Decimal::from(quantity) * price;
  subtotal.rescale(MONEY_SCALE);
  subtotal
}

fn zero_money() -> Decimal {
  let mut zero = Decimal::ZERO;
  zero.rescale(MONEY_SCALE);
  zero
}

/// Exact sum of the line subtotals.
pub fn cart_total<'a>(lines: impl IntoIterator<Item = &'a CartLineItem>) -> Decimal {
  lines.into_iter().fold(zero_money(), |acc, line| acc + line.subtotal)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn status_transitions_only_leave_active() {
    use CartStatus::*;
    assert!(Active.can_transition_to(Completed));
    assert!(Active.can_transition_to(Cancelled));
    for from in [Completed, Cancelled] {
      for to in [Active, Completed, Cancelled] {
        assert!(!from.can_transition_to(to), "{} -> {} must be rejected", from, to);
      }
    }
    assert!(!Active.can_transition_to(Active));
  }

  #[test]
  fn completing_stamps_completed_at() {
    let now = Utc::now();
    let mut cart = Cart::new(OwnerId::new(), "Alice", Some("  "), now).unwrap();
    assert_eq!(cart.notes, None);
    assert_eq!(cart.total_amount.to_string(), "0.00");

    cart.transition(CartStatus::Completed, now).unwrap();
    assert_eq!(cart.completed_at, Some(now));
    assert!(matches!(
      cart.transition(CartStatus::Cancelled, now),
      Err(LedgerError::InvalidState(_))
    ));
    assert!(cart.ensure_active().is_err());
  }

  #[test]
  fn cancelling_leaves_completed_at_empty() {
    let now = Utc::now();
    let mut cart = Cart::new(OwnerId::new(), "Bob", None, now).unwrap();
    cart.transition(CartStatus::Cancelled, now).unwrap();
    assert_eq!(cart.status, CartStatus::Cancelled);
    assert_eq!(cart.completed_at, None);
  }

  #[test]
  fn subtotal_follows_quantity_and_keeps_price() {
    let now = Utc::now();
    let mut line = CartLineItem::new(CartId::new(), ItemId::new(), 4, dec!(5.00), now);
    assert_eq!(line.subtotal, dec!(20.00));
    line.set_quantity(7);
    assert_eq!(line.subtotal, dec!(35.00));
    assert_eq!(line.price_at_time, dec!(5.00));

    let other = CartLineItem::new(line.cart_id, ItemId::new(), 3, dec!(1.25), now);
    assert_eq!(cart_total([&line, &other]), dec!(38.75));
    assert_eq!(cart_total(&Vec::new()).to_string(), "0.00");
  }

  #[test]
  fn cart_line_flags_overshoot() {
    let now = Utc::now();
    let line = CartLineItem::new(CartId::new(), ItemId::new(), 5, dec!(1), now);
    assert!(CartLine::new(line.clone(), Some("Widget".into()), Some(2)).exceeds_stock);
    assert!(!CartLine::new(line.clone(), Some("Widget".into()), Some(5)).exceeds_stock);
    assert!(!CartLine::new(line, None, None).exceeds_stock);
  }

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!("Completed".parse::<CartStatus>().unwrap(), CartStatus::Completed);
    assert!("pending".parse::<CartStatus>().is_err());
  }
}
