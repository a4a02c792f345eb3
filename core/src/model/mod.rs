// core/src/model/mod.rs

//! Canonical records owned by the ledger: items, carts and cart line items.

mod cart;
mod ids;
mod item;

pub use cart::{cart_total, Cart, CartDetails, CartLine, CartLineItem, CartStatus};
pub use ids::{CartId, ItemId, LineItemId, OwnerId};
pub use item::{Item, ItemPatch, NewItem};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LedgerError, LedgerResult};

/// Longest accepted item or customer name, in characters.
pub const MAX_NAME_CHARS: usize = 200;

/// Largest amount representable by the `NUMERIC(12, 2)` money columns.
pub fn max_money() -> Decimal {
  Decimal::new(999_999_999_999, 2)
}

/// Money values carry exactly two decimal places.
pub const MONEY_SCALE: u32 = 2;

pub(crate) fn require_name(field: &'static str, value: &str) -> LedgerResult<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(LedgerError::validation(field, "must not be empty"));
  }
  if trimmed.chars().count() > MAX_NAME_CHARS {
    return Err(LedgerError::validation(
      field,
      format!("must be at most {} characters", MAX_NAME_CHARS),
    ));
  }
  Ok(trimmed.to_string())
}

pub(crate) fn require_non_negative(field: &'static str, value: i32) -> LedgerResult<i32> {
  if value < 0 {
    return Err(LedgerError::validation(field, format!("must not be negative (got {})", value)));
  }
  Ok(value)
}

pub(crate) fn require_money(field: &'static str, value: Decimal) -> LedgerResult<Decimal> {
  if value.is_sign_negative() && !value.is_zero() {
    return Err(LedgerError::validation(field, format!("must not be negative (got {})", value)));
  }
  let mut normalized = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
  if normalized > max_money() {
    return Err(LedgerError::validation(field, format!("must not exceed {}", max_money())));
  }
  normalized.rescale(MONEY_SCALE);
  Ok(normalized)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn names_are_trimmed_and_required() {
    assert_eq!(require_name("name", "  Widget ").unwrap(), "Widget");
    assert!(matches!(
      require_name("name", "   "),
      Err(LedgerError::Validation { field: "name", .. })
    ));
    assert!(require_name("name", &"x".repeat(MAX_NAME_CHARS + 1)).is_err());
  }

  #[test]
  fn money_is_normalised_to_two_places() {
    assert_eq!(require_money("price", dec!(5)).unwrap().to_string(), "5.00");
    assert_eq!(require_money("price", dec!(1.005)).unwrap(), dec!(1.01));
    assert_eq!(require_money("price", dec!(0)).unwrap(), dec!(0));
    assert!(require_money("price", dec!(-0.01)).is_err());
    assert!(require_money("price", dec!(100000000000)).is_err());
  }
}
