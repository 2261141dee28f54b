//! Seeds a real PostgreSQL database and queries it through the HTTP API.
//!
//! Runs only when `TEST_DATABASE_URL` points at a disposable database.

use std::str::FromStr;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reqwest::Client;
use sqlx::postgres::PgConnectOptions;
use serde_json::Value;
use tokio::net::TcpListener;

use sales_analytics::api::routes::create_app;
use sales_analytics::config::{DatabaseConfig, SeedConfig};
use sales_analytics::seed::{ddl, SeedOrchestrator, SeedPhase, SeedPlan};
use sales_analytics::store::{AnalyticsStore, PostgresStore};

fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

async fn seeded_store(url: &str) -> PostgresStore {
    let options = PgConnectOptions::from_str(url).expect("parse TEST_DATABASE_URL");
    let store = PostgresStore::connect(options, &DatabaseConfig::default())
        .await
        .expect("connect to TEST_DATABASE_URL");
    let mut session = store.seed_session().await.expect("check out a connection");
    ddl::init_schema(&mut session).await.expect("apply schema");

    let plan = SeedPlan::new(
        SeedConfig {
            stores: 4,
            products: 20,
            items: 10,
            customers: 60,
            months: 1,
            ..SeedConfig::default()
        },
        chrono::Local::now().naive_local(),
    );
    let report = SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(5), plan)
        .run()
        .await
        .expect("seed run");
    assert_eq!(report.final_phase, SeedPhase::Done);
    assert_eq!(report.sales_skipped, 0);
    store
}

#[tokio::test]
async fn test_seed_then_query() {
    let Some(url) = test_database_url() else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let store = seeded_store(&url).await;

    let stores = store.list_stores().await.unwrap();
    assert!(!stores.is_empty());

    let channels = store.list_channels().await.unwrap();
    assert!(channels.iter().any(|c| c.channel_type == "D"));

    let tickets = store.average_ticket(30).await.unwrap();
    assert!(!tickets.is_empty());
    assert!(tickets.iter().all(|t| t.average_ticket > 0.0));

    let deliveries = store.delivery_performance(30).await.unwrap();
    assert!(deliveries.iter().all(|d| (0..24).contains(&d.hour)));

    let margins = store.low_margin_products(30, 10).await.unwrap();
    for row in &margins {
        assert!(row.total_orders >= 3);
        assert!((row.estimated_cost + row.estimated_margin - row.average_unit_price).abs() < 0.02);
    }
}

#[tokio::test]
async fn test_api_over_http() {
    let Some(url) = test_database_url() else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let store = Arc::new(seeded_store(&url).await);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_app(store, true)).await.unwrap();
    });

    let client = Client::new();
    let base_url = format!("http://{}", address);

    let health: Value = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    let response = client
        .get(format!("{}/api/products/popular?channel=ifood&days=30&limit=5", base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let products: Vec<Value> = response.json().await.unwrap();
    assert!(products.len() <= 5);

    let response = client
        .get(format!("{}/api/analytics/average-ticket?days=999", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
