//! Integration tests for the stock ledger backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            db_path,
            log_level: "warn".to_string(),
            ..Config::default()
        };

        let app = create_router(AppState::new(repo, &config));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn create_category(&self, name: &str, parent_id: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/categories",
                json!({ "name": name, "parentId": parent_id }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    async fn create_product(&self, name: &str, price: &str, minimum: i64, category: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "name": name,
                    "price": price,
                    "minimumStock": minimum,
                    "categoryId": category
                }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    async fn add_movement(&self, product_id: i64, quantity: i64, note: Option<&str>) {
        let (status, body) = self
            .post(
                &format!("/api/products/{}/movements", product_id),
                json!({ "quantity": quantity, "note": note }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
    }
}

fn ids(page: &Value) -> Vec<i64> {
    page["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_unknown_route_without_server() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();
    let app = create_router(AppState::new(
        Arc::new(Repository::new(pool)),
        &Config::default(),
    ));

    let resp = app
        .clone()
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .oneshot(Request::get("/api/products/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post("/api/products", json!({ "name": 1 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = fixture.get("/api/products?page=abc").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = fixture.get("/api/movements?from=yesterday").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_root_category_is_seeded() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/categories").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let categories = body["data"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["name"], "Products");
    assert!(categories[0].get("parentId").is_none());

    let (_, body) = fixture.get("/api/categories/1/path").await;
    assert_eq!(body["data"]["path"], "Products");
}

#[tokio::test]
async fn test_category_crud_and_paths() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let soda = fixture.create_category("Soda", drinks).await;

    let (status, body) = fixture.get(&format!("/api/categories/{}/path", soda)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["path"], "Drinks > Soda");

    let (_, body) = fixture
        .get(&format!("/api/categories/{}/subtree", drinks))
        .await;
    assert_eq!(body["data"], json!([drinks, soda]));

    // Rename propagates to derived paths
    let (status, body) = fixture
        .put(
            &format!("/api/categories/{}", drinks),
            json!({ "name": "Beverages", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["version"], 2);

    let (_, body) = fixture.get(&format!("/api/categories/{}/path", soda)).await;
    assert_eq!(body["data"]["path"], "Beverages > Soda");

    let (_, body) = fixture.get("/api/categories/options").await;
    let paths: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["Beverages", "Beverages > Soda", "Products"]);

    // Delete the leaf
    let (status, _) = fixture.delete(&format!("/api/categories/{}", soda)).await;
    assert_eq!(status, 200);
    let (status, body) = fixture.get(&format!("/api/categories/{}", soda)).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_category_delete_is_restricted_by_children() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    fixture.create_category("Soda", drinks).await;

    let (status, body) = fixture.delete(&format!("/api/categories/{}", drinks)).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "HAS_SUBCATEGORIES");

    let (status, body) = fixture.delete("/api/categories/1").await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_category_delete_cascades_products() {
    let fixture = TestFixture::new().await;

    let snacks = fixture.create_category("Snacks", 1).await;
    let chips = fixture.create_product("Chips", "2.00", 0, snacks).await;
    fixture.add_movement(chips, 5, None).await;

    let (status, _) = fixture.delete(&format!("/api/categories/{}", snacks)).await;
    assert_eq!(status, 200);

    let (status, _) = fixture.get(&format!("/api/products/{}", chips)).await;
    assert_eq!(status, 404);
    let (_, body) = fixture.get("/api/movements").await;
    assert_eq!(body["data"]["totalItems"], 0);
}

#[tokio::test]
async fn test_reparent_into_own_subtree_is_rejected() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let soda = fixture.create_category("Soda", drinks).await;

    let (status, body) = fixture
        .put(
            &format!("/api/categories/{}", drinks),
            json!({ "parentId": soda }),
        )
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = fixture.get(&format!("/api/categories/{}/path", soda)).await;
    assert_eq!(body["data"]["path"], "Drinks > Soda");
}

#[tokio::test]
async fn test_cola_product_view() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let soda = fixture.create_category("Soda", drinks).await;
    let cola = fixture.create_product("Cola", "1.50", 5, soda).await;

    fixture.add_movement(cola, 20, Some("delivery")).await;
    fixture.add_movement(cola, -8, None).await;
    fixture.add_movement(cola, -15, None).await;

    let (status, body) = fixture.get(&format!("/api/products/{}", cola)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["currentStock"], -3);
    assert_eq!(body["data"]["status"], "critical");
    assert_eq!(body["data"]["categoryPath"], "Drinks > Soda");

    let (_, body) = fixture
        .get("/api/products/search?term=col")
        .await;
    assert_eq!(
        body["data"][0]["displayText"],
        format!("Cola (ID: {})", cola)
    );

    let (_, body) = fixture.get("/api/products/options").await;
    assert_eq!(body["data"][0]["fullName"], "Drinks > Soda > Cola");
}

#[tokio::test]
async fn test_product_listing_filters_sort_and_pages() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let soda = fixture.create_category("Soda", drinks).await;
    let food = fixture.create_category("Food", 1).await;

    let cola = fixture.create_product("Cola", "1.50", 5, soda).await;
    let water = fixture.create_product("Water", "0.80", 0, drinks).await;
    let bread = fixture.create_product("Bread", "2.20", 3, food).await;

    fixture.add_movement(cola, -2, None).await;
    fixture.add_movement(bread, 3, None).await;
    fixture.add_movement(water, 40, None).await;

    let (_, body) = fixture
        .get(&format!("/api/products?categoryId={}", drinks))
        .await;
    assert_eq!(ids(&body), vec![cola, water]);

    let (_, body) = fixture.get("/api/products?negativeOnly=true").await;
    assert_eq!(ids(&body), vec![cola]);

    let (_, body) = fixture.get("/api/products?lowOnly=true").await;
    assert_eq!(ids(&body), vec![bread]);

    let (_, body) = fixture.get("/api/products?path=soda").await;
    assert_eq!(ids(&body), vec![cola]);

    let (_, body) = fixture.get("/api/products?sort=price&order=desc").await;
    assert_eq!(ids(&body), vec![bread, cola, water]);

    let (_, body) = fixture.get("/api/products?page=2&pageSize=2").await;
    assert_eq!(ids(&body), vec![water]);
    assert_eq!(body["data"]["totalItems"], 3);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["hasPrevious"], true);
    assert_eq!(body["data"]["hasNext"], false);

    let (status, body) = fixture.get("/api/products?page=9").await;
    assert_eq!(status, 200);
    assert!(ids(&body).is_empty());

    let (status, body) = fixture.get("/api/products?categoryId=999").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_dashboard_excludes_cancelled_sales() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let cola = fixture.create_product("Cola", "2.00", 5, drinks).await;
    let water = fixture.create_product("Water", "1.00", 0, drinks).await;

    fixture.add_movement(cola, 10, None).await;
    fixture.add_movement(cola, -3, Some("sale")).await;
    fixture.add_movement(cola, -4, Some("  Cancelled ")).await;
    fixture.add_movement(water, 50, None).await;
    fixture.add_movement(water, -5, None).await;

    let (status, body) = fixture.get("/api/dashboard").await;
    assert_eq!(status, 200);
    let data = &body["data"];

    let top: Vec<i64> = data["topSelling"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["productId"].as_i64().unwrap())
        .collect();
    assert_eq!(top, vec![water, cola]);
    assert_eq!(data["topSelling"][1]["totalSold"], 3);

    // Cola: 10 - 3 - 4 = 3, at or below its minimum of 5
    assert_eq!(data["lowStock"][0]["productId"], cola);
    assert_eq!(data["lowStock"][0]["status"], "low");

    let (_, body) = fixture.get("/api/dashboard/summary").await;
    assert_eq!(body["data"]["totalProducts"], 2);
    assert_eq!(body["data"]["totalCategories"], 2);
    assert_eq!(body["data"]["totalMovements"], 5);
    assert_eq!(body["data"]["lowStockCount"], 1);
    let sales: f64 = body["data"]["totalSalesValue"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(sales, 11.0);
}

#[tokio::test]
async fn test_movement_history() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let cola = fixture.create_product("Cola", "1.50", 0, drinks).await;
    let water = fixture.create_product("Water", "0.80", 0, drinks).await;

    fixture.add_movement(cola, 10, None).await;
    fixture.add_movement(water, 7, None).await;
    fixture.add_movement(cola, -2, Some("sale")).await;

    let (_, body) = fixture
        .get(&format!("/api/movements?productId={}", cola))
        .await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["quantity"], -2);
    assert_eq!(items[0]["kind"], "outbound");
    assert_eq!(items[1]["kind"], "inbound");
    assert_eq!(items[0]["categoryPath"], "Drinks");

    let (_, body) = fixture.get("/api/movements?productSearch=wat").await;
    assert_eq!(body["data"]["totalItems"], 1);

    let (_, body) = fixture.get("/api/movements?to=2000-01-01").await;
    assert_eq!(body["data"]["totalItems"], 0);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let cola = fixture.create_product("Cola", "1.50", 0, drinks).await;

    let (status, body) = fixture
        .post(
            &format!("/api/products/{}/movements", cola),
            json!({ "quantity": 0 }),
        )
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .post(
            &format!("/api/products/{}/movements", cola),
            json!({ "quantity": 1, "note": "x".repeat(201) }),
        )
        .await;
    assert_eq!(status, 422);

    let (status, _) = fixture
        .post(
            "/api/products",
            json!({ "name": "Bad", "price": "-1", "categoryId": drinks }),
        )
        .await;
    assert_eq!(status, 422);

    let (status, body) = fixture
        .post("/api/products/999/movements", json!({ "quantity": 1 }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_stale_version_conflict() {
    let fixture = TestFixture::new().await;

    let drinks = fixture.create_category("Drinks", 1).await;
    let cola = fixture.create_product("Cola", "1.50", 0, drinks).await;

    let (status, _) = fixture
        .put(
            &format!("/api/products/{}", cola),
            json!({ "price": "1.75", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .put(
            &format!("/api/products/{}", cola),
            json!({ "price": "1.95", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONCURRENT_MODIFICATION");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);
}
