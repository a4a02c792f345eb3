// tests/item_store_tests.rs
mod common;

use common::*;
use rust_decimal_macros::dec;
use stockroom::{ItemPatch, LedgerError, NewItem, OwnerId};

#[tokio::test]
async fn test_create_item_normalises_fields() {
  let fx = fixture();
  let item = fx
    .stockroom
    .items()
    .create_item(
      fx.owner,
      NewItem {
        name: "  Espresso Beans ".into(),
        stock_quantity: 12,
        low_stock_threshold: 4,
        price: dec!(9.5),
      },
    )
    .await
    .unwrap();

  assert_eq!(item.name, "Espresso Beans");
  assert_eq!(item.price.to_string(), "9.50");
  assert_eq!(item.created_at, start_instant());

  let fetched = fx.stockroom.items().get_item(item.id).await.unwrap();
  assert_eq!(fetched, item);
}

#[tokio::test]
async fn test_create_item_rejects_invalid_fields() {
  let fx = fixture();
  let items = fx.stockroom.items();
  let valid = || NewItem {
    name: "Mug".into(),
    stock_quantity: 1,
    low_stock_threshold: 0,
    price: dec!(3),
  };

  let cases = [
    NewItem { name: "".into(), ..valid() },
    NewItem { stock_quantity: -1, ..valid() },
    NewItem { low_stock_threshold: -5, ..valid() },
    NewItem { price: dec!(-0.50), ..valid() },
  ];
  for case in cases {
    let err = items.create_item(fx.owner, case).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation { .. }), "unexpected error: {err}");
  }
  assert!(items.list_items(fx.owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_missing_item_is_not_found() {
  let fx = fixture();
  let err = fx.stockroom.items().get_item(stockroom::ItemId::new()).await.unwrap_err();
  assert!(matches!(err, LedgerError::NotFound { entity: "item", .. }));
}

#[tokio::test]
async fn test_update_item_merges_and_revalidates() {
  let fx = fixture();
  let item = fx.item("Teapot", 5, 1, dec!(20.00)).await;
  fx.clock.advance(chrono::Duration::minutes(1));

  let updated = fx
    .stockroom
    .items()
    .update_item(
      item.id,
      ItemPatch {
        price: Some(dec!(22.5)),
        ..Default::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(updated.price, dec!(22.50));
  assert_eq!(updated.name, "Teapot");
  assert_eq!(updated.stock_quantity, 5);
  assert!(updated.updated_at > item.updated_at);

  let err = fx
    .stockroom
    .items()
    .update_item(
      item.id,
      ItemPatch {
        name: Some("Kettle".into()),
        stock_quantity: Some(-3),
        ..Default::default()
      },
    )
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::Validation { field: "stock_quantity", .. }));
  assert_eq!(fx.stockroom.items().get_item(item.id).await.unwrap().name, "Teapot");
}

#[tokio::test]
async fn test_search_is_case_insensitive_ordered_and_bounded() {
  let fx = fixture();
  fx.item("green tea", 1, 0, dec!(1)).await;
  fx.item("Black Tea", 1, 0, dec!(1)).await;
  fx.item("Teaspoon", 1, 0, dec!(1)).await;
  fx.item("Coffee", 1, 0, dec!(1)).await;

  let items = fx.stockroom.items();
  let names = |found: Vec<stockroom::Item>| found.into_iter().map(|i| i.name).collect::<Vec<_>>();

  assert_eq!(
    names(items.search_items(fx.owner, "TEA", 10).await.unwrap()),
    vec!["Black Tea", "Teaspoon", "green tea"]
  );
  assert_eq!(items.search_items(fx.owner, "tea", 2).await.unwrap().len(), 2);
  assert!(items.search_items(fx.owner, "tea", 0).await.unwrap().is_empty());
  assert_eq!(items.search_items(fx.owner, "", 10).await.unwrap().len(), 4);

  // another owner's inventory is invisible
  assert!(items.search_items(OwnerId::new(), "tea", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_limit_is_clamped() {
  let mut config = test_config();
  config.search_limit_max = 3;
  let fx = fixture_with(config);
  for n in 0..5 {
    fx.item(&format!("Widget {n}"), 1, 0, dec!(1)).await;
  }
  let found = fx.stockroom.items().search_items(fx.owner, "widget", 100).await.unwrap();
  assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn test_decrement_stock_never_goes_negative() {
  let fx = fixture();
  let item = fx.item("Filter Papers", 5, 2, dec!(4.00)).await;
  let items = fx.stockroom.items();

  let after = items.decrement_stock(item.id, 3).await.unwrap();
  assert_eq!(after.stock_quantity, 2);

  match items.decrement_stock(item.id, 3).await.unwrap_err() {
    LedgerError::InsufficientStock {
      item_id,
      requested,
      available,
    } => {
      assert_eq!(item_id, item.id);
      assert_eq!(requested, 3);
      assert_eq!(available, 2);
    }
    other => panic!("expected insufficient stock, got {other}"),
  }
  assert_eq!(fx.stock_of(&item).await, 2);

  assert!(matches!(
    items.decrement_stock(item.id, 0).await,
    Err(LedgerError::Validation { field: "amount", .. })
  ));
  assert_eq!(items.decrement_stock(item.id, 2).await.unwrap().stock_quantity, 0);
}

#[tokio::test]
async fn test_delete_item_blocked_by_active_cart_only() {
  let fx = fixture();
  let item = fx.item("Grinder", 3, 1, dec!(45.00)).await;
  let cart = fx.cart("Dana").await;
  fx.stockroom.ledger().add_to_cart(cart.id, item.id, 1).await.unwrap();

  let err = fx.stockroom.items().delete_item(item.id).await.unwrap_err();
  assert!(matches!(err, LedgerError::Conflict(_)));

  fx.stockroom.ledger().checkout(cart.id, true).await.unwrap();
  fx.stockroom.items().delete_item(item.id).await.unwrap();
  assert!(matches!(
    fx.stockroom.items().get_item(item.id).await,
    Err(LedgerError::NotFound { .. })
  ));

  // the completed cart keeps its line item as history
  let details = fx.stockroom.carts().get_cart(cart.id).await.unwrap();
  assert_eq!(details.lines.len(), 1);
  assert_eq!(details.lines[0].item_name, None);
}

#[tokio::test]
async fn test_delete_missing_item_is_not_found() {
  let fx = fixture();
  let err = fx.stockroom.items().delete_item(stockroom::ItemId::new()).await.unwrap_err();
  assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_list_items_orders_by_name() {
  let fx = fixture();
  fx.item("b", 1, 0, dec!(1)).await;
  fx.item("a", 1, 0, dec!(1)).await;
  fx.item("c", 1, 0, dec!(1)).await;
  let names: Vec<String> = fx
    .stockroom
    .items()
    .list_items(fx.owner)
    .await
    .unwrap()
    .into_iter()
    .map(|item| item.name)
    .collect();
  assert_eq!(names, vec!["a", "b", "c"]);
}
