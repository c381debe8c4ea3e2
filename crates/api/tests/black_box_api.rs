use chrono::{Duration as ChronoDuration, Utc};
use gadgetbazar_auth::{DualIssuerVerifier, Hs256JwtValidator, IdTokenClaims, JwtValidator};
use gadgetbazar_infra::Services;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

const ADMIN_SECRET: &str = "test-admin-secret";
const USER_SECRET: &str = "test-user-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let admin: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(ADMIN_SECRET));
        let customer: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(USER_SECRET));
        let app = gadgetbazar_api::app::build_app(
            Services::in_memory(),
            DualIssuerVerifier::new(Some(admin), Some(customer)),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        read(req.send().await.unwrap()).await
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, token, body).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PUT, path, token, body).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(secret: &str, uid: &str) -> String {
    let now = Utc::now();
    let claims = IdTokenClaims {
        sub: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        name: None,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token() -> String {
    mint_jwt(ADMIN_SECRET, "admin-1")
}

fn customer_token(uid: &str) -> String {
    mint_jwt(USER_SECRET, uid)
}

async fn create_product(srv: &TestServer, name: &str, price: u64, stock: u32) -> String {
    let (status, body) = srv
        .post(
            "/admin/products",
            &admin_token(),
            json!({ "name": name, "price": price, "stockQuantity": stock }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn order_body(product_id: &str, quantity: u32) -> Value {
    json!({
        "items": [{ "productId": product_id, "quantity": quantity }],
        "shippingAddress": "House 12, Road 5, Dhanmondi, Dhaka",
        "phone": "01712345678",
        "paymentMethod": "cash_on_delivery"
    })
}

#[tokio::test]
async fn health_and_catalog_are_public() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = srv.get("/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/whoami", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let forged = mint_jwt("not-a-known-secret", "mallory");
    let (status, _) = srv.get("/orders", Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_are_refused_admin_routes() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/admin/stats", Some(&customer_token("shopper"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = srv.get("/admin/stats", Some(&admin_token())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn whoami_creates_the_user_and_admin_tokens_promote() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/whoami", Some(&customer_token("nadia"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["uid"], "nadia");
    assert_eq!(body["data"]["role"], "customer");
    let id = body["data"]["id"].clone();

    let (_, body) = srv.get("/whoami", Some(&mint_jwt(ADMIN_SECRET, "nadia"))).await;
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["role"], "admin");

    // A later customer token does not demote.
    let (_, body) = srv.get("/whoami", Some(&customer_token("nadia"))).await;
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn last_unit_goes_to_one_order_and_admins_are_notified() {
    let srv = TestServer::spawn().await;
    // Make the admin known before any order so it receives the fan-out.
    srv.get("/whoami", Some(&admin_token())).await;
    let product_id = create_product(&srv, "Redmi Note 13", 24_999, 3).await;

    let (status, body) = srv
        .post("/orders", &customer_token("first"), order_body(&product_id, 2))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["totalAmount"], 49_998);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = srv
        .post("/orders", &customer_token("second"), order_body(&product_id, 2))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    let (_, body) = srv.get(&format!("/products/{product_id}"), None).await;
    assert_eq!(body["data"]["stockQuantity"], 1);

    let (_, body) = srv.get("/notifications", Some(&admin_token())).await;
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["type"].as_str())
        .collect();
    assert_eq!(kinds, vec!["new_order"]);
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let srv = TestServer::spawn().await;
    let product_id = create_product(&srv, "Anker Power Bank", 3_200, 10).await;

    let (_, body) = srv
        .post("/orders", &customer_token("owner"), order_body(&product_id, 1))
        .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .get(&format!("/orders/{order_id}"), Some(&customer_token("owner")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentProducts"][0]["stockQuantity"], 9);

    let (status, body) = srv
        .get(&format!("/orders/{order_id}"), Some(&customer_token("stranger")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn status_change_notifies_the_owner() {
    let srv = TestServer::spawn().await;
    let product_id = create_product(&srv, "Xiaomi Band 8", 4_500, 4).await;
    let owner = customer_token("buyer");

    let (_, body) = srv.post("/orders", &owner, order_body(&product_id, 1)).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .put(
            &format!("/admin/orders/{order_id}/status"),
            &admin_token(),
            json!({ "status": "shipped" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "shipped");

    let (_, body) = srv.get("/notifications/unread-count", Some(&owner)).await;
    assert_eq!(body["data"]["count"], 1);

    let (status, body) = srv
        .put("/notifications/read-all", &owner, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 1);
}

#[tokio::test]
async fn restock_fans_out_to_waiting_customers() {
    let srv = TestServer::spawn().await;
    let product_id = create_product(&srv, "DJI Mini 4", 95_000, 0).await;
    let waiting = customer_token("waiting");

    let (status, _) = srv
        .post("/wishlist", &waiting, json!({ "productId": product_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = srv
        .post("/restock-requests", &waiting, json!({ "productId": product_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = srv
        .post(
            &format!("/admin/products/{product_id}/restock"),
            &admin_token(),
            json!({ "quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["product"]["stockQuantity"], 5);
    assert_eq!(body["data"]["restockRequestsFulfilled"], 1);

    let (_, body) = srv.get("/notifications", Some(&waiting)).await;
    let mut kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["type"].as_str())
        .collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec!["restock", "restock_complete"]);
}

#[tokio::test]
async fn bad_input_uses_the_error_envelope() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/products/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let missing = uuid::Uuid::now_v7();
    let (status, body) = srv.get(&format!("/products/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PRODUCT_NOT_FOUND");

    let (status, body) = srv
        .post(
            "/orders",
            &customer_token("empty"),
            json!({
                "items": [],
                "shippingAddress": "Sylhet",
                "phone": "01812345678",
                "paymentMethod": "bkash"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let token = customer_token("careless");

    // No shippingAddress.
    let (status, body) = srv
        .post(
            "/orders",
            &token,
            json!({ "items": [], "phone": "1", "paymentMethod": "bkash" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let res = srv
        .client
        .post(srv.url("/cart"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = srv
        .get("/admin/orders?status=lost", Some(&admin_token()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
