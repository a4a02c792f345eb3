// core/src/model/item.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{require_money, require_name, require_non_negative, ItemId, OwnerId};
use crate::error::LedgerResult;

/// A stocked product. `stock_quantity` is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Item {
  pub id: ItemId,
  pub owner_id: OwnerId,
  pub name: String,
  pub stock_quantity: i32,
  pub low_stock_threshold: i32,
  pub price: Decimal,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering an item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
  pub name: String,
  pub stock_quantity: i32,
  pub low_stock_threshold: i32,
  pub price: Decimal,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
  pub name: Option<String>,
  pub stock_quantity: Option<i32>,
  pub low_stock_threshold: Option<i32>,
  pub price: Option<Decimal>,
}

impl Item {
  pub fn new(owner_id: OwnerId, fields: NewItem, now: DateTime<Utc>) -> LedgerResult<Self> {
    Ok(Self {
      id: ItemId::new(),
      owner_id,
      name: require_name("name", &fields.name)?,
      stock_quantity: require_non_negative("stock_quantity", fields.stock_quantity)?,
      low_stock_threshold: require_non_negative("low_stock_threshold", fields.low_stock_threshold)?,
      price: require_money("price", fields.price)?,
      created_at: now,
      updated_at: now,
    })
  }

  /// Merges `patch` into the item. Nothing is changed unless every
  /// provided field is valid.
  pub fn apply(&mut self, patch: ItemPatch, now: DateTime<Utc>) -> LedgerResult<()> {
    let name = match patch.name {
      Some(name) => require_name("name", &name)?,
      None => self.name.clone(),
    };
    let stock_quantity = match patch.stock_quantity {
      Some(qty) => require_non_negative("stock_quantity", qty)?,
      None => self.stock_quantity,
    };
    let low_stock_threshold = match patch.low_stock_threshold {
      Some(threshold) => require_non_negative("low_stock_threshold", threshold)?,
      None => self.low_stock_threshold,
    };
    let price = match patch.price {
      Some(price) => require_money("price", price)?,
      None => self.price,
    };

    self.name = name;
    self.stock_quantity = stock_quantity;
    self.low_stock_threshold = low_stock_threshold;
    self.price = price;
    self.updated_at = now;
    Ok(())
  }

  pub fn is_low_stock(&self) -> bool {
    self.stock_quantity <= self.low_stock_threshold
  }
}

impl ItemPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.stock_quantity.is_none() && self.low_stock_threshold.is_none() && self.price.is_none()
  }
}
