// tests/http_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::*;
use serde_json::{json, Value};
use serial_test::serial;
use storefront::db::OrderStore;
use storefront::models::OrderStatus;
use storefront::web::routes::configure_app_routes;
use uuid::Uuid;

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

#[actix_web::test]
#[serial]
async fn health_endpoint() {
  let h = harness(providers_with(vec![]));
  let app = app!(h.state);
  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({"status": "ok"}));
}

#[actix_web::test]
#[serial]
async fn chat_turns_over_http() {
  let h = harness(providers_with(vec![]));
  let app = app!(h.state);

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/chat/{}", BUYER))
    .set_json(json!({"type": "buy", "product_id": KETTLE_ID}))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  let reply = &body["replies"][0];
  assert_eq!(reply["kind"], "payment_options");
  assert_eq!(reply["options"].as_array().map(Vec::len), Some(6));
  let order_id = reply["order_id"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/chat/{}", BUYER))
    .set_json(json!({"type": "choose_payment", "order_id": order_id, "method": "cash"}))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["replies"][0]["kind"], "text");
  assert!(body["replies"][0]["text"].as_str().unwrap().contains("phone number"));

  // Unknown products come back as a neutral reply, not an HTTP error.
  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/chat/{}", BUYER))
    .set_json(json!({"type": "buy", "product_id": 999}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["replies"][1]["kind"], "main_menu");
}

#[actix_web::test]
#[serial]
async fn chat_rejects_unknown_input_shapes() {
  let h = harness(providers_with(vec![]));
  let app = app!(h.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/chat/1")
    .set_json(json!({"type": "teleport"}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn liqpay_webhook_signature_gate() {
  let h = harness(providers_with(vec![]));
  let order_id = h
    .state
    .orders
    .create_order(BUYER, KETTLE_ID, KETTLE_PRICE)
    .await
    .unwrap();
  let app = app!(h.state);

  let (data, _) = liqpay_callback(order_id, "success");
  let req = test::TestRequest::post()
    .uri("/webhook/liqpay")
    .set_form([("data", data.as_str()), ("signature", "forged")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(h.order(order_id).await.status, OrderStatus::Pending);

  let (data, signature) = liqpay_callback(order_id, "success");
  let req = test::TestRequest::post()
    .uri("/webhook/liqpay")
    .set_form([("data", data.as_str()), ("signature", signature.as_str())])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(test::read_body(resp).await, "OK");
  assert_eq!(h.order(order_id).await.status, OrderStatus::Paid);
}

#[actix_web::test]
#[serial]
async fn monobank_webhook_token_gate() {
  let h = harness(providers_with(vec![]));
  let order_id = h
    .state
    .orders
    .create_order(BUYER, KETTLE_ID, KETTLE_PRICE)
    .await
    .unwrap();
  let app = app!(h.state);

  let req = test::TestRequest::post()
    .uri("/webhook/monobank?token=wrong")
    .set_payload(monobank_body(order_id, "success"))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  let req = test::TestRequest::post()
    .uri("/webhook/monobank")
    .set_payload(monobank_body(order_id, "success"))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
  assert_eq!(h.order(order_id).await.status, OrderStatus::Pending);

  let req = test::TestRequest::post()
    .uri(&format!("/webhook/monobank?token={}", MONOBANK_WEBHOOK_TOKEN))
    .set_payload(monobank_body(order_id, "success"))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(h.order(order_id).await.status, OrderStatus::Paid);

  // Authentic but unparseable bodies are still acknowledged.
  let req = test::TestRequest::post()
    .uri(&format!("/webhook/monobank?token={}", MONOBANK_WEBHOOK_TOKEN))
    .set_payload("{")
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let req = test::TestRequest::post()
    .uri(&format!("/webhook/monobank?token={}", MONOBANK_WEBHOOK_TOKEN))
    .set_payload(monobank_body(Uuid::new_v4(), "success"))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
