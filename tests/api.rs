//! HTTP tests over the in-memory store.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use grocery_commerce::auth::{Claims, Role};
use grocery_commerce::domain::aggregates::{Address, Order, PaymentType, PostalAddress, PricedLine, Product, ProductDetails, User};
use grocery_commerce::domain::value_objects::{Money, Quantity};
use grocery_commerce::payments::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, PaymentMetadata};
use grocery_commerce::publisher::EventPublisher;
use grocery_commerce::store::Repository;
use grocery_commerce::{api, AppConfig, AppState};

const WEBHOOK_SECRET: &str = "whsec_test";
const ADMIN_EMAIL: &str = "admin@grocer.io";

struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        Ok(CheckoutSession { id: format!("cs_{}", request.order_id), url: format!("https://checkout.test/{}", request.order_id) })
    }

    async fn session_metadata(&self, _payment_intent_id: &str) -> Result<Option<PaymentMetadata>, PaymentError> {
        Ok(None)
    }
}

struct Harness {
    app: Router,
    state: AppState,
    repo: Repository,
    user: User,
    address: Address,
    product: Product,
}

impl Harness {
    async fn new() -> Self {
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("integration-secret".to_string()),
            "ADMIN_EMAIL" => Some(ADMIN_EMAIL.to_string()),
            "STRIPE_WEBHOOK_SECRET" => Some(WEBHOOK_SECRET.to_string()),
            _ => None,
        })
        .unwrap();
        let repo = Repository::in_memory();
        let state = AppState::new(config, repo.clone(), Arc::new(StubGateway), EventPublisher::disabled());

        let user = User::register("Asha", "asha@example.com", "$2b$10$hash");
        repo.insert(&user).await.unwrap();
        let address = Address::new(user.id(), postal());
        repo.insert(&address).await.unwrap();
        let product = Product::create(details("Alphonso Mango", "120", "100"), vec!["mango.png".into()]).unwrap();
        repo.insert(&product).await.unwrap();

        Self { app: api::router(state.clone()), state, repo, user, address, product }
    }

    fn token(&self, sub: &str, role: Role, email: Option<&str>) -> String {
        let claims = Claims::new(sub, role, email.map(str::to_string), chrono::Duration::hours(1));
        self.state.tokens().sign(&claims).unwrap()
    }

    fn shopper(&self) -> String { self.token(&self.user.id().to_string(), Role::User, None) }
    fn admin(&self) -> String { self.token("admin", Role::Admin, Some(ADMIN_EMAIL)) }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn webhook(&self, payload: &Value, signature: &str) -> StatusCode {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/stripe")
            .header("stripe-signature", signature)
            .body(Body::from(payload.to_string()))
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap().status()
    }

    /// An online order awaiting payment, as left behind by a checkout redirect.
    async fn unpaid_online_order(&self) -> Order {
        let line = PricedLine { product_id: self.product.id(), quantity: Quantity::ONE, unit_price: self.product.offer_price() };
        let order = Order::place(self.user.id(), self.address.id(), PaymentType::Online, vec![line]).unwrap();
        self.repo.insert(&order).await.unwrap();
        order
    }
}

fn postal() -> PostalAddress {
    PostalAddress {
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        email: "asha@example.com".into(),
        street: "12 Market Road".into(),
        city: "Pune".into(),
        state: "MH".into(),
        zipcode: "411001".into(),
        country: "India".into(),
        phone: "9876543210".into(),
    }
}

fn details(name: &str, price: &str, offer: &str) -> ProductDetails {
    ProductDetails {
        name: name.into(),
        description: vec!["Sweet".into()],
        category: "Fruits".into(),
        price: Money::new(Decimal::from_str(price).unwrap()),
        offer_price: Money::new(Decimal::from_str(offer).unwrap()),
        best_seller: false,
    }
}

fn sign(payload: &Value) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn payment_event(kind: &str, order: &Order) -> Value {
    json!({
        "id": "evt_1",
        "type": kind,
        "data": { "object": { "id": "pi_1", "metadata": { "orderId": order.id().to_string(), "userId": order.user_id().to_string() } } }
    })
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new().await;
    let (status, body) = h.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_uses_envelope() {
    let h = Harness::new().await;
    let (status, body) = h.call(Method::GET, "/order/user", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "message": "Not Authorized" }));
}

#[tokio::test]
async fn test_admin_token_requires_configured_email() {
    let h = Harness::new().await;
    let forged = h.token("admin", Role::Admin, Some("someone@else.io"));
    let (_, body) = h.call(Method::GET, "/admin/orders", Some(&forged), None).await;
    assert_eq!(body["success"], false);

    let (_, body) = h.call(Method::GET, "/admin/orders", Some(&h.admin()), None).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_cod_order_flow() {
    let h = Harness::new().await;
    let token = h.shopper();
    let place = json!({ "items": [{ "product": h.product.id().to_string(), "quantity": 2 }], "address": h.address.id().to_string() });
    let (_, body) = h.call(Method::POST, "/order/cod", Some(&token), Some(place)).await;
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["message"], "Order Placed Successfully");
    let order_id = body["orderId"].as_str().unwrap().to_string();

    let (_, body) = h.call(Method::GET, &format!("/order/{order_id}"), Some(&token), None).await;
    assert_eq!(body["order"]["status"], "Order Placed");
    assert_eq!(body["order"]["items"][0]["name"], "Alphonso Mango");
    // 2 x 100 plus 2% tax
    assert_eq!(body["order"]["totalAmount"], 204.0);
    assert_eq!(body["order"]["items"][0]["price"], 100.0);

    let (_, body) = h.call(Method::GET, "/order/user", Some(&token), None).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let approve = json!({ "orderId": order_id });
    let (_, body) = h.call(Method::PUT, "/admin/order/approve", Some(&h.admin()), Some(approve)).await;
    assert_eq!(body["success"], true, "{body}");
    let shipped = json!({ "orderId": order_id, "status": "Shipped" });
    let (_, body) = h.call(Method::PUT, "/admin/order/update-status", Some(&h.admin()), Some(shipped)).await;
    assert_eq!(body["order"]["status"], "Shipped");
}

#[tokio::test]
async fn test_order_placement_rejects_missing_address() {
    let h = Harness::new().await;
    let place = json!({ "items": [{ "product": h.product.id().to_string(), "quantity": 1 }] });
    let (_, body) = h.call(Method::POST, "/order/cod", Some(&h.shopper()), Some(place)).await;
    assert_eq!(body, json!({ "success": false, "message": "Invalid data" }));
}

#[tokio::test]
async fn test_non_owner_cannot_delete_order() {
    let h = Harness::new().await;
    let order = h.unpaid_online_order().await;
    let stranger = h.token(&grocery_commerce::domain::value_objects::UserId::new().to_string(), Role::User, None);
    let (status, body) = h.call(Method::POST, "/order/delete", Some(&stranger), Some(json!({ "orderId": order.id().to_string() }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let (_, body) = h.call(Method::POST, "/order/delete", Some(&h.shopper()), Some(json!({ "orderId": order.id().to_string() }))).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_online_order_returns_checkout_url() {
    let h = Harness::new().await;
    let place = json!({ "items": [{ "product": h.product.id().to_string(), "quantity": 1 }], "address": h.address.id().to_string() });
    let (_, body) = h.call(Method::POST, "/order/stripe", Some(&h.shopper()), Some(place)).await;
    assert_eq!(body["success"], true, "{body}");
    let order_id = body["orderId"].as_str().unwrap();
    assert_eq!(body["url"], format!("https://checkout.test/{order_id}"));

    // Unpaid online orders stay out of the shopper's list.
    let (_, body) = h.call(Method::GET, "/order/user", Some(&h.shopper()), None).await;
    assert!(body["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let h = Harness::new().await;
    let order = h.unpaid_online_order().await;
    let payload = payment_event("payment_intent.succeeded", &order);
    let status = h.webhook(&payload, "t=1,v1=deadbeef").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored: Order = h.repo.find(&order.id()).await.unwrap().unwrap();
    assert!(!stored.is_paid());
}

#[tokio::test]
async fn test_webhook_payment_succeeded_marks_paid_and_clears_cart() {
    let h = Harness::new().await;
    let token = h.shopper();
    let (_, body) = h.call(Method::POST, "/cart/add", Some(&token), Some(json!({ "productId": h.product.id().to_string() }))).await;
    assert_eq!(body["success"], true, "{body}");
    h.state.cart_sync().wait_idle().await;

    let order = h.unpaid_online_order().await;
    let payload = payment_event("payment_intent.succeeded", &order);
    assert_eq!(h.webhook(&payload, &sign(&payload)).await, StatusCode::OK);
    // Redelivery is harmless.
    assert_eq!(h.webhook(&payload, &sign(&payload)).await, StatusCode::OK);

    let stored: Order = h.repo.find(&order.id()).await.unwrap().unwrap();
    assert!(stored.is_paid());
    h.state.cart_sync().wait_idle().await;
    let (_, body) = h.call(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(body["totalCount"], 0);
}

#[tokio::test]
async fn test_webhook_payment_failed_removes_order() {
    let h = Harness::new().await;
    let order = h.unpaid_online_order().await;
    let payload = payment_event("payment_intent.payment_failed", &order);
    assert_eq!(h.webhook(&payload, &sign(&payload)).await, StatusCode::OK);

    let (_, body) = h.call(Method::GET, &format!("/order/{}", order.id()), Some(&h.shopper()), None).await;
    assert_eq!(body, json!({ "success": false, "message": "Order not found" }));
}

#[tokio::test]
async fn test_cart_flow() {
    let h = Harness::new().await;
    let token = h.shopper();
    let product_id = h.product.id().to_string();

    h.call(Method::POST, "/cart/add", Some(&token), Some(json!({ "productId": product_id }))).await;
    h.call(Method::POST, "/cart/add", Some(&token), Some(json!({ "productId": product_id }))).await;
    let (_, body) = h.call(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(body["totalCount"], 2);

    h.call(Method::POST, "/cart/remove", Some(&token), Some(json!({ "productId": product_id }))).await;
    let (_, body) = h.call(Method::POST, "/cart/set", Some(&token), Some(json!({ "productId": product_id, "quantity": 5 }))).await;
    assert_eq!(body["cartItems"][&product_id], 5);

    h.state.cart_sync().wait_idle().await;
    let stored: User = h.repo.find(&h.user.id()).await.unwrap().unwrap();
    assert_eq!(stored.cart().total_count(), 5);

    let (_, body) = h.call(Method::POST, "/cart/update", Some(&token), Some(json!({ "cartItems": {} }))).await;
    assert_eq!(body["success"], true);
    let (_, body) = h.call(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(body["totalCount"], 0);
}

#[tokio::test]
async fn test_cart_rejects_unknown_product() {
    let h = Harness::new().await;
    let unknown = grocery_commerce::domain::value_objects::ProductId::new().to_string();
    let (_, body) = h.call(Method::POST, "/cart/add", Some(&h.shopper()), Some(json!({ "productId": unknown }))).await;
    assert_eq!(body, json!({ "success": false, "message": "Product not found" }));
}

#[tokio::test]
async fn test_rating_upsert_updates_aggregate() {
    let h = Harness::new().await;
    let token = h.shopper();
    let product_id = h.product.id().to_string();

    let (_, body) = h.call(Method::POST, "/rating/add", Some(&token), Some(json!({ "productId": product_id, "rating": 4, "review": "Good" }))).await;
    assert_eq!(body["message"], "Rating added successfully");
    let (_, body) = h.call(Method::POST, "/rating/add", Some(&token), Some(json!({ "productId": product_id, "rating": 2 }))).await;
    assert_eq!(body["message"], "Rating updated successfully");
    assert_eq!(body["totalRatings"], 1);
    assert_eq!(body["averageRating"], 2.0);

    let (_, body) = h.call(Method::GET, &format!("/rating/product/{product_id}"), None, None).await;
    assert_eq!(body["ratings"].as_array().unwrap().len(), 1);

    let (_, body) = h.call(Method::POST, "/rating/add", Some(&token), Some(json!({ "productId": product_id, "rating": 6 }))).await;
    assert_eq!(body, json!({ "success": false, "message": "Rating must be between 1 and 5" }));
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let h = Harness::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/cart/add")
        .header("authorization", format!("Bearer {}", h.shopper()))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_admin_category_management() {
    let h = Harness::new().await;
    let admin = h.admin();
    let (_, body) = h.call(Method::POST, "/admin/category/add", Some(&admin), Some(json!({ "name": "Dairy" }))).await;
    assert_eq!(body["success"], true, "{body}");
    let (_, body) = h.call(Method::POST, "/admin/category/add", Some(&admin), Some(json!({ "name": "dairy" }))).await;
    assert_eq!(body, json!({ "success": false, "message": "Category already exists" }));

    let (_, body) = h.call(Method::GET, "/admin/categories", Some(&h.shopper()), None).await;
    assert_eq!(body["success"], false);
}
