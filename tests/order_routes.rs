use chrono::{Duration, Utc};
use crm_api_server::auth::AuthState;
use crm_api_server::models::{DataResponse, Order};
use crm_api_server::routes::orders::{
    bulk_import_orders, clear_orders, create_order, delete_order, list_orders, update_order,
};
use crm_api_server::test_support::{TestDatabase, TestFixtures, TestRocketBuilder, test_auth_state};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use serde_json::json;

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(err) => {
            eprintln!("skipping integration test: could not provision test database: {err:?}");
            None
        }
    }
}

async fn orders_client(test_db: &TestDatabase) -> (Client, String) {
    let pool = test_db.pool_clone();
    let state = test_auth_state(&pool);

    let hash = state.password_service.hash_password("pw").expect("hash");
    let user_id = TestFixtures::new(&pool)
        .insert_user("seller", "Seller", "seller@example.com", "user", &hash)
        .await
        .expect("seed user");
    let session = state
        .session_store
        .issue(user_id, false, Utc::now(), Duration::hours(1))
        .await
        .expect("issue session");

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool)
        .manage_auth_state(state)
        .mount_api_routes(routes![
            list_orders,
            create_order,
            update_order,
            delete_order,
            clear_orders,
            bulk_import_orders,
        ])
        .async_client()
        .await;

    (client, session.token)
}

fn authorization(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

#[tokio::test]
async fn orders_require_a_session() {
    let Some(test_db) = provision().await else {
        return;
    };

    let (client, _token) = orders_client(&test_db).await;
    {

    let response = client.get("/api/v1/orders").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/v1/orders")
        .header(authorization("made-up-token"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    }
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn order_crud_roundtrip() {
    let Some(test_db) = provision().await else {
        return;
    };

    let (client, token) = orders_client(&test_db).await;
    {

    let response = client
        .post("/api/v1/orders")
        .header(authorization(&token))
        .json(&json!({
            "marketplace": "etsy",
            "customerName": "Dana Buyer",
            "customerEmail": "dana@example.com",
            "product": "Walnut desk organizer",
            "quantity": 2,
            "price": 34.50,
            "status": "pending"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get("/api/v1/orders")
        .header(authorization(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let listing: DataResponse<Vec<Order>> = response.into_json().await.expect("orders payload");
    assert_eq!(listing.data.len(), 1);
    let order = &listing.data[0];
    assert!(!order.id.is_empty());
    assert_eq!(order.customer_name, "Dana Buyer");
    assert_eq!(order.notes, "");

    let response = client
        .put(format!("/api/v1/orders/{}", order.id))
        .header(authorization(&token))
        .json(&json!({
            "marketplace": "etsy",
            "customerName": "Dana Buyer",
            "customerEmail": "dana@example.com",
            "product": "Walnut desk organizer",
            "quantity": 2,
            "price": 34.50,
            "status": "shipped",
            "notes": "tracking emailed"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .put("/api/v1/orders/no-such-order")
        .header(authorization(&token))
        .json(&json!({
            "marketplace": "etsy",
            "customerName": "X",
            "customerEmail": "x@example.com",
            "product": "X",
            "quantity": 1,
            "price": 1.0,
            "status": "pending"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    // Deleting twice succeeds both times.
    let response = client
        .delete(format!("/api/v1/orders/{}", order.id))
        .header(authorization(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let response = client
        .delete(format!("/api/v1/orders/{}", order.id))
        .header(authorization(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    }
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn bulk_import_is_transactional_and_listed_newest_first() {
    let Some(test_db) = provision().await else {
        return;
    };

    let (client, token) = orders_client(&test_db).await;
    {

    let response = client
        .post("/api/v1/orders/bulk")
        .header(authorization(&token))
        .json(&json!({
            "orders": [
                {
                    "id": "ord-001",
                    "marketplace": "ebay",
                    "customerName": "Al",
                    "customerEmail": "al@example.com",
                    "product": "Lamp",
                    "quantity": 1,
                    "price": 10.0,
                    "status": "pending",
                    "createdAt": "2024-01-01T00:00:00Z"
                },
                {
                    "id": "ord-002",
                    "marketplace": "amazon",
                    "customerName": "Bea",
                    "customerEmail": "bea@example.com",
                    "product": "Rug",
                    "quantity": 1,
                    "price": 55.0,
                    "status": "shipped",
                    "createdAt": "2024-02-01T00:00:00Z"
                }
            ]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().await.expect("JSON body");
    assert_eq!(body["count"], 2);

    let response = client
        .get("/api/v1/orders")
        .header(authorization(&token))
        .dispatch()
        .await;
    let listing: DataResponse<Vec<Order>> = response.into_json().await.expect("orders payload");
    assert_eq!(listing.data.len(), 2);
    assert_eq!(listing.data[0].id, "ord-002");
    assert_eq!(listing.data[1].id, "ord-001");

    // A batch with a duplicate id fails as a unit; nothing new lands.
    let response = client
        .post("/api/v1/orders/bulk")
        .header(authorization(&token))
        .json(&json!({
            "orders": [
                {
                    "id": "ord-003",
                    "marketplace": "ebay",
                    "customerName": "Cy",
                    "customerEmail": "cy@example.com",
                    "product": "Vase",
                    "quantity": 1,
                    "price": 20.0,
                    "status": "pending"
                },
                {
                    "id": "ord-001",
                    "marketplace": "ebay",
                    "customerName": "Al",
                    "customerEmail": "al@example.com",
                    "product": "Lamp",
                    "quantity": 1,
                    "price": 10.0,
                    "status": "pending"
                }
            ]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    let response = client
        .get("/api/v1/orders")
        .header(authorization(&token))
        .dispatch()
        .await;
    let listing: DataResponse<Vec<Order>> = response.into_json().await.expect("orders payload");
    assert_eq!(listing.data.len(), 2);

    let response = client
        .delete("/api/v1/orders")
        .header(authorization(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get("/api/v1/orders")
        .header(authorization(&token))
        .dispatch()
        .await;
    let listing: DataResponse<Vec<Order>> = response.into_json().await.expect("orders payload");
    assert!(listing.data.is_empty());

    }
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}
