//! Router tests against a real database. Each test gets a fresh database with
//! `migrations/` applied.
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test db -- --ignored

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use storefront_api::config::Config;
use storefront_api::db::products::{ProductChildren, ProductInput, ProductRepository};
use storefront_api::db::users::UserRepository;
use storefront_api::domain::aggregates::{Gender, Role};
use storefront_api::domain::value_objects::{Email, Slug};
use storefront_api::events::EventPublisher;
use storefront_api::{routes, AppState};

fn state(pool: PgPool) -> AppState {
    let env = HashMap::from([
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("JWT_SECRET", "database-test-secret-0123456789abcdef".to_string()),
    ]);
    let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
    AppState::new(&config, pool, EventPublisher::default())
}

async fn send(s: &AppState, req: Request<Body>) -> (StatusCode, Value) {
    let app: Router = routes::router(s.clone(), CorsLayer::permissive());
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn call(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri).header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Customer row plus a session token for it.
async fn customer(s: &AppState, email: &str) -> (Uuid, String) {
    let user = UserRepository::new(&s.db).create(&Email::parse(email).unwrap(), "unused-hash", "Ada").await.unwrap();
    let token = s.tokens.issue(user.id, &user.email, user.role).unwrap();
    (user.id, token)
}

fn admin_token(s: &AppState) -> String {
    s.tokens.issue(Uuid::now_v7(), "admin@example.com", Role::Admin).unwrap()
}

async fn product(s: &AppState, name: &str, cents: i64, gender: Gender, sizes: &[&str]) -> Uuid {
    let input = ProductInput {
        name: name.to_string(),
        slug: Slug::from_name(name).unwrap(),
        description: Some(format!("{name} in soft cotton")),
        price: Decimal::new(cents, 2),
        compare_at_price: None,
        stock: 10,
        gender,
        featured: false,
        category_id: None,
        children: ProductChildren { sizes: Some(sizes.iter().map(|s| s.to_string()).collect()), ..Default::default() },
    };
    ProductRepository::new(&s.db).create(&input).await.unwrap().product.id
}

fn order_body(items: Value) -> Value {
    json!({
        "items": items,
        "shippingAddress": {
            "fullName": "Ada Lovelace", "addressLine1": "1 Main St", "city": "London",
            "postalCode": "N1 9GU", "country": "GB"
        },
        "paymentMethod": "card"
    })
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(pool).await.unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_order_persists_submitted_lines(pool: PgPool) {
    let s = state(pool);
    let (user_id, token) = customer(&s, "ada@example.com").await;
    let tee = product(&s, "Linen Tee", 1999, Gender::Unisex, &["M"]).await;
    let cap = product(&s, "Wool Cap", 1250, Gender::Men, &[]).await;

    let body = order_body(json!([
        { "productId": tee, "quantity": 3, "price": "19.99", "size": "M" },
        { "productId": cap, "quantity": 1, "price": "12.50" }
    ]));
    let (status, created) = send(&s, call("POST", "/api/orders", &token, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["userId"], json!(user_id));
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["total"], "72.47");

    let (status, fetched) = send(&s, call("GET", &format!("/api/orders/{}", created["id"].as_str().unwrap()), &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    let items = fetched["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let tee_line = items.iter().find(|i| i["productId"] == json!(tee)).unwrap();
    assert_eq!(tee_line["quantity"], 3);
    assert_eq!(tee_line["price"], "19.99");
    assert_eq!(tee_line["size"], "M");
    assert_eq!(tee_line["productName"], "Linen Tee");
    assert_eq!(count(&s.db, "order_items").await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_order_with_unknown_product_rolls_back(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let tee = product(&s, "Linen Tee", 1999, Gender::Unisex, &[]).await;

    let body = order_body(json!([
        { "productId": tee, "quantity": 1, "price": "19.99" },
        { "productId": Uuid::now_v7(), "quantity": 1, "price": "5.00" }
    ]));
    let (status, body) = send(&s, call("POST", "/api/orders", &token, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid product in order");
    assert_eq!(count(&s.db, "orders").await, 0);
    assert_eq!(count(&s.db, "order_items").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_order_total_beyond_column_is_bad_request(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let tee = product(&s, "Linen Tee", 1999, Gender::Unisex, &[]).await;

    let body = order_body(json!([{ "productId": tee, "quantity": 2, "price": "79228162514264337593543950335" }]));
    let (status, _) = send(&s, call("POST", "/api/orders", &token, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = order_body(json!([{ "productId": tee, "quantity": 2, "price": "9999999999.99" }]));
    let (status, body) = send(&s, call("POST", "/api/orders", &token, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Order amount exceeds the maximum allowed");
    assert_eq!(count(&s.db, "orders").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_cart_lines_merge_on_size_and_color(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let tee = product(&s, "Linen Tee", 1000, Gender::Unisex, &["M", "L"]).await;

    for body in [
        json!({ "productId": tee, "quantity": 2, "size": "M" }),
        json!({ "productId": tee, "quantity": 3, "size": "M" }),
        json!({ "productId": tee }),
        json!({ "productId": tee }),
    ] {
        let (status, _) = send(&s, call("POST", "/api/cart/items", &token, Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, cart) = send(&s, call("GET", "/api/cart", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let sized = items.iter().find(|i| i["size"] == "M").unwrap();
    let r#unsized = items.iter().find(|i| i["size"].is_null()).unwrap();
    assert_eq!(sized["quantity"], 5);
    assert_eq!(r#unsized["quantity"], 2);
    assert_eq!(cart["itemCount"], 7);
    assert_eq!(cart["subtotal"], "70.00");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_cart_line_capped_at_order_limit(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let tee = product(&s, "Linen Tee", 1000, Gender::Unisex, &[]).await;

    let line = json!({ "productId": tee, "quantity": 1000 });
    send(&s, call("POST", "/api/cart/items", &token, Some(line.clone()))).await;
    send(&s, call("POST", "/api/cart/items", &token, Some(line.clone()))).await;
    let (status, cart) = send(&s, call("POST", "/api/cart/merge", &token, Some(json!({ "items": [line.clone(), line] })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"][0]["quantity"], 1000);

    let body = order_body(json!([{ "productId": tee, "quantity": 1000, "price": "10.00" }]));
    let (status, _) = send(&s, call("POST", "/api/orders", &token, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_wishlist_add_is_idempotent(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let tee = product(&s, "Linen Tee", 1000, Gender::Unisex, &[]).await;
    let uri = format!("/api/users/wishlist/{tee}");

    let (status, _) = send(&s, call("POST", &uri, &token, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, list) = send(&s, call("POST", &uri, &token, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&s, call("POST", &format!("/api/users/wishlist/{}", Uuid::now_v7()), &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(&s, call("DELETE", &uri, &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
    let (status, _) = send(&s, call("DELETE", &uri, &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_product_delete_refused_while_ordered(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let admin = admin_token(&s);
    let ordered = product(&s, "Linen Tee", 1000, Gender::Unisex, &[]).await;
    let spare = product(&s, "Wool Cap", 1000, Gender::Unisex, &[]).await;

    let body = order_body(json!([{ "productId": ordered, "quantity": 1, "price": "10.00" }]));
    let (status, _) = send(&s, call("POST", "/api/orders", &token, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&s, call("DELETE", &format!("/api/products/{ordered}"), &admin, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product is referenced by existing orders");

    let (status, _) = send(&s, call("DELETE", &format!("/api/products/{spare}"), &admin, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&s, call("GET", &format!("/api/products/{spare}"), &admin, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_product_listing_filters_and_counts(pool: PgPool) {
    let s = state(pool);
    let token = admin_token(&s);
    product(&s, "Linen Tee", 1500, Gender::Women, &["S", "M"]).await;
    product(&s, "Linen Trousers", 4500, Gender::Men, &["L"]).await;
    product(&s, "Kids Hoodie", 3000, Gender::Kids, &["M"]).await;

    let (status, page) = send(&s, call("GET", "/api/products?minPrice=20&sort=price_asc", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    let names: Vec<&str> = page["data"].as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Kids Hoodie", "Linen Trousers"]);

    let (_, page) = send(&s, call("GET", "/api/products?size=m&search=LINEN", &token, None)).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["name"], "Linen Tee");

    let (_, page) = send(&s, call("GET", "/api/products?gender=kids&category=", &token, None)).await;
    assert_eq!(page["total"], 1);

    let (_, page) = send(&s, call("GET", "/api/products?limit=2&page=2&sort=name", &token, None)).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);
    assert_eq!(page["data"][0]["name"], "Linen Trousers");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_partial_product_update(pool: PgPool) {
    let s = state(pool);
    let admin = admin_token(&s);
    let tee = product(&s, "Linen Tee", 1500, Gender::Women, &["S", "M"]).await;

    let (status, updated) = send(&s, call("PUT", &format!("/api/products/{tee}"), &admin, Some(json!({ "stock": 3 })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock"], 3);
    assert_eq!(updated["name"], "Linen Tee");
    assert_eq!(updated["slug"], "linen-tee");
    assert_eq!(updated["price"], "15.00");
    assert_eq!(updated["sizes"], json!(["S", "M"]));

    let body = json!({ "price": "18.00", "sizes": ["XL"] });
    let (status, updated) = send(&s, call("PUT", &format!("/api/products/{tee}"), &admin, Some(body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], "18.00");
    assert_eq!(updated["sizes"], json!(["XL"]));
    assert_eq!(updated["stock"], 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_register_login_and_cookie_session(pool: PgPool) {
    let s = state(pool);
    let register = Request::post("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "email": "Grace@Example.com", "password": "hopper1906", "name": "Grace" }).to_string()))
        .unwrap();
    let (status, body) = send(&s, register).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "grace@example.com");

    let login = |password: &str, email: &str| {
        Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "email": email, "password": password }).to_string()))
            .unwrap()
    };
    let app = routes::router(s.clone(), CorsLayer::permissive());
    let response = app.oneshot(login("hopper1906", "grace@example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    let session = cookie::Cookie::parse(set_cookie).unwrap();
    assert_eq!(session.name(), "token");
    assert_eq!(session.http_only(), Some(true));

    let me = Request::get("/api/auth/me")
        .header(header::COOKIE, format!("token={}", session.value()))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&s, me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Grace");

    let (status, body) = send(&s, login("hopper1906", "nobody@example.com")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
    let (status, _) = send(&s, login("wrong-password", "grace@example.com")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_blank_profile_name_rejected(pool: PgPool) {
    let s = state(pool);
    let (_, token) = customer(&s, "ada@example.com").await;
    let (status, body) = send(&s, call("PUT", "/api/users/profile", &token, Some(json!({ "name": "   " })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name: Name cannot be empty");
    let (_, profile) = send(&s, call("GET", "/api/users/profile", &token, None)).await;
    assert_eq!(profile["name"], "Ada");
}
