// core/src/queries.rs

//! Query Facade: read-side aggregates over committed state.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{LedgerError, LedgerResult};
use crate::model::{CartId, CartStatus, Item, OwnerId, MONEY_SCALE};
use crate::stockroom::Shared;

/// One row of the recent activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
  pub cart_id: CartId,
  pub customer_name: String,
  pub amount: Decimal,
  /// Completion time for completed carts, creation time otherwise.
  pub timestamp: DateTime<Utc>,
  pub status: CartStatus,
}

/// Dashboard figures for one owner. Periods are UTC calendar boundaries
/// around the instant the summary was taken for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
  pub active_carts: usize,
  pub completed_today: usize,
  pub total_revenue: Decimal,
  pub average_cart_value: Decimal,
  pub low_stock_items: usize,
  pub revenue_today: Decimal,
  /// The seven days before today plus today.
  pub revenue_this_week: Decimal,
  pub revenue_this_month: Decimal,
}

#[derive(Debug, Clone)]
pub struct QueryFacade {
  shared: Arc<Shared>,
}

impl QueryFacade {
  pub(crate) fn new(shared: Arc<Shared>) -> Self {
    Self { shared }
  }

  /// Items at or below their low-stock threshold, lowest stock first.
  #[instrument(name = "queries::low_stock_items", skip(self))]
  pub async fn low_stock_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>> {
    self
      .shared
      .guarded("low_stock_items", || self.shared.store.low_stock_items(owner_id))
      .await
  }

  /// Revenue of carts completed in `[start, end)`. An empty or inverted
  /// range yields zero.
  #[instrument(name = "queries::revenue_in_range", skip(self))]
  pub async fn revenue_in_range(&self, owner_id: OwnerId, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Decimal> {
    if end <= start {
      return Ok(money(Decimal::ZERO));
    }
    let revenue = self
      .shared
      .guarded("revenue_in_range", || self.shared.store.completed_revenue(owner_id, start, end))
      .await?;
    Ok(money(revenue))
  }

  /// The `limit` carts with the latest activity, newest first.
  #[instrument(name = "queries::recent_activity", skip(self))]
  pub async fn recent_activity(&self, owner_id: OwnerId, limit: usize) -> LedgerResult<Vec<ActivityEntry>> {
    let limit = limit.min(self.shared.config.search_limit_max);
    if limit == 0 {
      return Ok(Vec::new());
    }
    let carts = self
      .shared
      .guarded("recent_activity", || self.shared.store.recent_carts(owner_id, limit))
      .await?;
    Ok(
      carts
        .into_iter()
        .map(|cart| ActivityEntry {
          cart_id: cart.id,
          timestamp: cart.last_activity_at(),
          customer_name: cart.customer_name,
          amount: cart.total_amount,
          status: cart.status,
        })
        .collect(),
    )
  }

  /// Aggregates for the dashboard as of `now`.
  #[instrument(name = "queries::dashboard_summary", skip(self))]
  pub async fn dashboard_summary(&self, owner_id: OwnerId, now: DateTime<Utc>) -> LedgerResult<DashboardSummary> {
    let periods = Periods::around(now)?;

    let active_carts = self
      .shared
      .guarded("active_carts", || {
        self.shared.store.carts_by_owner(owner_id, Some(CartStatus::Active))
      })
      .await?
      .len();
    let completed = self
      .shared
      .guarded("completed_carts", || {
        self.shared.store.carts_by_owner(owner_id, Some(CartStatus::Completed))
      })
      .await?;
    let low_stock_items = self.low_stock_items(owner_id).await?.len();

    let completed_today = completed
      .iter()
      .filter(|cart| {
        cart
          .completed_at
          .is_some_and(|at| at >= periods.day_start && at < periods.next_day_start)
      })
      .count();
    let total_revenue = money(completed.iter().map(|cart| cart.total_amount).sum());
    let average_cart_value = if completed.is_empty() {
      money(Decimal::ZERO)
    } else {
      money(total_revenue / Decimal::from(completed.len()))
    };

    let revenue_today = self
      .revenue_in_range(owner_id, periods.day_start, periods.next_day_start)
      .await?;
    let revenue_this_week = self
      .revenue_in_range(owner_id, periods.week_start, periods.next_day_start)
      .await?;
    let revenue_this_month = self
      .revenue_in_range(owner_id, periods.month_start, periods.next_month_start)
      .await?;

    debug!(active_carts, completed = completed.len(), "Dashboard summary computed");
    Ok(DashboardSummary {
      active_carts,
      completed_today,
      total_revenue,
      average_cart_value,
      low_stock_items,
      revenue_today,
      revenue_this_week,
      revenue_this_month,
    })
  }
}

/// UTC period boundaries used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Periods {
  day_start: DateTime<Utc>,
  next_day_start: DateTime<Utc>,
  week_start: DateTime<Utc>,
  month_start: DateTime<Utc>,
  next_month_start: DateTime<Utc>,
}

impl Periods {
  fn around(now: DateTime<Utc>) -> LedgerResult<Self> {
    let today = now.date_naive();
    let first_of_month = today.with_day(1).ok_or_else(out_of_range)?;
    let first_of_next_month = first_of_month
      .checked_add_months(Months::new(1))
      .ok_or_else(out_of_range)?;

    let day_start = midnight(today);
    Ok(Self {
      day_start,
      next_day_start: day_start + Duration::days(1),
      week_start: day_start - Duration::days(7),
      month_start: midnight(first_of_month),
      next_month_start: midnight(first_of_next_month),
    })
  }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(NaiveTime::MIN).and_utc()
}

fn out_of_range() -> LedgerError {
  LedgerError::validation("now", "date is outside the supported calendar range")
}

fn money(value: Decimal) -> Decimal {
  let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
  rounded.rescale(MONEY_SCALE);
  rounded
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn periods_follow_utc_calendar() {
    let now = Utc.with_ymd_and_hms(2024, 12, 31, 15, 30, 0).unwrap();
    let periods = Periods::around(now).unwrap();
    assert_eq!(periods.day_start, Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
    assert_eq!(periods.next_day_start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(periods.week_start, Utc.with_ymd_and_hms(2024, 12, 24, 0, 0, 0).unwrap());
    assert_eq!(periods.month_start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
    assert_eq!(periods.next_month_start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn averages_are_rounded_to_cents() {
    let third = Decimal::from(10) / Decimal::from(3);
    assert_eq!(money(third).to_string(), "3.33");
    assert_eq!(money(Decimal::ZERO).to_string(), "0.00");
  }
}
