// tests/api_tests.rs

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use stockroom::OwnerId;
use stockroom_server::config::AppConfig;
use stockroom_server::state::AppState;
use stockroom_server::web::configure_app_routes;

fn test_state() -> AppState {
  AppState::in_memory(AppConfig::from_vars(|_| None).unwrap())
}

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

fn user_header(owner: OwnerId) -> (&'static str, String) {
  ("X-User-ID", owner.to_string())
}

async fn json_body(resp: ServiceResponse) -> Value {
  test::read_body_json(resp).await
}

#[actix_web::test]
async fn test_health_reports_memory_store() {
  let app = app!(test_state());
  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["store"], "memory");
}

#[actix_web::test]
async fn test_requests_without_user_are_unauthorized() {
  let app = app!(test_state());
  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/items").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body = json_body(resp).await;
  assert_eq!(body["kind"], "auth");
}

#[actix_web::test]
async fn test_full_checkout_over_http() {
  let app = app!(test_state());
  let owner = OwnerId::new();

  // create an item
  let req = test::TestRequest::post()
    .uri("/api/v1/items")
    .insert_header(user_header(owner))
    .set_json(json!({ "name": "Widget", "stock_quantity": 10, "low_stock_threshold": 3, "price": "5.00" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let item_id = json_body(resp).await["item"]["id"].as_str().unwrap().to_string();

  // open a cart
  let req = test::TestRequest::post()
    .uri("/api/v1/carts")
    .insert_header(user_header(owner))
    .set_json(json!({ "customer_name": "Alice" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let cart_id = json_body(resp).await["cart"]["id"].as_str().unwrap().to_string();

  // add twice; the second add merges
  for quantity in [4, 3] {
    let req = test::TestRequest::post()
      .uri(&format!("/api/v1/carts/{cart_id}/items"))
      .insert_header(user_header(owner))
      .set_json(json!({ "item_id": item_id, "quantity": quantity }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/carts/{cart_id}"))
    .insert_header(user_header(owner))
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert_eq!(body["cart"]["total_amount"], "35.00");
  assert_eq!(body["cart"]["lines"].as_array().unwrap().len(), 1);
  assert_eq!(body["cart"]["lines"][0]["quantity"], 7);
  assert_eq!(body["cart"]["lines"][0]["item_name"], "Widget");

  // checkout
  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/carts/{cart_id}/checkout"))
    .insert_header(user_header(owner))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["cart"]["status"], "completed");

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/items/{item_id}"))
    .insert_header(user_header(owner))
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert_eq!(body["item"]["stock_quantity"], 3);

  // a second checkout is a state conflict
  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/carts/{cart_id}/checkout"))
    .insert_header(user_header(owner))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(resp).await["kind"], "invalid_state");

  // the completed cart shows up in the dashboard
  let req = test::TestRequest::get()
    .uri("/api/v1/dashboard")
    .insert_header(user_header(owner))
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert_eq!(body["summary"]["total_revenue"], "35.00");
  assert_eq!(body["summary"]["low_stock_items"], 1);
}

#[actix_web::test]
async fn test_insufficient_stock_reports_available_quantity() {
  let state = test_state();
  let app = app!(state);
  let owner = OwnerId::new();
  let stockroom = &state.stockroom;

  let item = stockroom
    .items()
    .create_item(
      owner,
      stockroom::NewItem {
        name: "Scarce".into(),
        stock_quantity: 2,
        low_stock_threshold: 1,
        price: rust_decimal_macros::dec!(1.00),
      },
    )
    .await
    .unwrap();
  let cart = stockroom.carts().create_cart(owner, "Ben", None).await.unwrap();
  let line = stockroom.ledger().add_to_cart(cart.id, item.id, 2).await.unwrap();

  let req = test::TestRequest::patch()
    .uri(&format!("/api/v1/cart-items/{}", line.id))
    .insert_header(user_header(owner))
    .set_json(json!({ "quantity": 5 }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/carts/{}/checkout", cart.id))
    .insert_header(user_header(owner))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json_body(resp).await;
  assert_eq!(body["kind"], "insufficient_stock");
  assert_eq!(body["item_id"], item.id.to_string());
  assert_eq!(body["requested"], 5);
  assert_eq!(body["available"], 2);

  // checkout without inventory reduction is still allowed
  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/carts/{}/checkout?reduce_inventory=false", cart.id))
    .insert_header(user_header(owner))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(stockroom.items().get_item(item.id).await.unwrap().stock_quantity, 2);
}

#[actix_web::test]
async fn test_other_owners_records_are_not_found() {
  let state = test_state();
  let app = app!(state);
  let owner = OwnerId::new();
  let intruder = OwnerId::new();

  let cart = state.stockroom.carts().create_cart(owner, "Cleo", None).await.unwrap();
  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/carts/{}", cart.id))
    .insert_header(user_header(intruder))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["kind"], "not_found");

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/carts/{}/cancel", cart.id))
    .insert_header(user_header(intruder))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::get()
    .uri("/api/v1/carts?status=active")
    .insert_header(user_header(intruder))
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert!(body["carts"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_malformed_requests_are_validation_errors() {
  let app = app!(test_state());
  let owner = OwnerId::new();

  let req = test::TestRequest::post()
    .uri("/api/v1/items")
    .insert_header(user_header(owner))
    .set_json(json!({ "name": "", "stock_quantity": 1, "low_stock_threshold": 0, "price": "1.00" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body = json_body(resp).await;
  assert_eq!(body["kind"], "validation");
  assert_eq!(body["field"], "name");

  let req = test::TestRequest::post()
    .uri("/api/v1/items")
    .insert_header(user_header(owner))
    .set_json(json!({ "name": "No price" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::get()
    .uri("/api/v1/items/not-a-uuid")
    .insert_header(user_header(owner))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::get()
    .uri("/api/v1/carts?status=pending")
    .insert_header(user_header(owner))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_delete_item_in_active_cart_conflicts() {
  let state = test_state();
  let app = app!(state);
  let owner = OwnerId::new();
  let item = state
    .stockroom
    .items()
    .create_item(
      owner,
      stockroom::NewItem {
        name: "Busy".into(),
        stock_quantity: 4,
        low_stock_threshold: 1,
        price: rust_decimal_macros::dec!(2.00),
      },
    )
    .await
    .unwrap();
  let cart = state.stockroom.carts().create_cart(owner, "Dev", None).await.unwrap();
  state.stockroom.ledger().add_to_cart(cart.id, item.id, 1).await.unwrap();

  let delete = || {
    test::TestRequest::delete()
      .uri(&format!("/api/v1/items/{}", item.id))
      .insert_header(user_header(owner))
      .to_request()
  };
  let resp = test::call_service(&app, delete()).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(resp).await["kind"], "conflict");

  state.stockroom.ledger().cancel_cart(cart.id).await.unwrap();
  assert_eq!(test::call_service(&app, delete()).await.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_search_and_low_stock_routes() {
  let state = test_state();
  let app = app!(state);
  let owner = OwnerId::new();
  stockroom_server::seed::seed_demo_inventory(&state.stockroom, owner).await.unwrap();

  let req = test::TestRequest::get()
    .uri("/api/v1/items/search?q=MILK")
    .insert_header(user_header(owner))
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  let items = body["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["name"], "Oat Milk 1L");

  let req = test::TestRequest::get()
    .uri("/api/v1/items/low-stock")
    .insert_header(user_header(owner))
    .to_request();
  let body = json_body(test::call_service(&app, req).await).await;
  assert_eq!(body["items"][0]["name"], "Pour-Over Filters");
}
