//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{CorrelationId, OrderId, ProductId};
use domain::{Checkout, CheckoutState, Money, Order, OrderDraft, OrderItem, Product};
use rust_decimal_macros::dec;
use sqlx::PgPool;
use store::{
    CheckoutJournal, CheckoutJournalExt, OrderRepository, PostgresStore, ProductRepository,
    SaveOutcome, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/001_create_shop_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products, checkout_journal")
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresStore::new(pool);
    store
        .upsert_product(Product::new(1, "P1", Money::new(dec!(10.00))).with_description("First"))
        .await
        .unwrap();
    store
        .upsert_product(Product::new(2, "P2", Money::new(dec!(5.50))))
        .await
        .unwrap();
    store
}

fn order_for(email: &str, minutes_ago: i64) -> Order {
    let items = vec![
        OrderItem::new(1, "P1", 2, Money::new(dec!(10.00))),
        OrderItem::new(2, "P2", 1, Money::new(dec!(5.50))),
    ];
    Order::from_persisted(
        OrderId::new(),
        "Customer".to_string(),
        email.to_string(),
        Utc::now() - Duration::minutes(minutes_ago),
        Money::new(dec!(25.50)),
        items,
    )
}

#[tokio::test]
async fn test_product_lookup() {
    let store = get_test_store().await;

    let product = store.find_product(ProductId::new(1)).await.unwrap().unwrap();
    assert_eq!(product.name, "P1");
    assert_eq!(product.description.as_deref(), Some("First"));
    assert_eq!(product.price, Money::new(dec!(10.00)));

    assert!(store.find_product(ProductId::new(99)).await.unwrap().is_none());
    assert_eq!(store.list_products().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_save_and_load_order_with_items() {
    let store = get_test_store().await;
    let order = order_for("ada@example.com", 0);

    assert_eq!(store.save_order(&order).await.unwrap(), SaveOutcome::Inserted);

    let loaded = store.find_order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.total_amount(), Money::new(dec!(25.50)));
    assert_eq!(loaded.items(), order.items());
    assert_eq!(loaded.customer_email(), "ada@example.com");
}

#[tokio::test]
async fn test_save_same_order_twice_is_noop() {
    let store = get_test_store().await;
    let order = order_for("ada@example.com", 0);

    store.save_order(&order).await.unwrap();
    assert_eq!(
        store.save_order(&order).await.unwrap(),
        SaveOutcome::AlreadyPresent
    );
    assert_eq!(store.list_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_orders_by_email_newest_first() {
    let store = get_test_store().await;
    let old = order_for("ada@example.com", 60);
    let new = order_for("ada@example.com", 1);
    let other = order_for("bob@example.com", 10);

    for order in [&old, &other, &new] {
        store.save_order(order).await.unwrap();
    }

    let found = store.find_orders_by_email("ada@example.com").await.unwrap();
    let ids: Vec<_> = found.iter().map(Order::id).collect();
    assert_eq!(ids, vec![new.id(), old.id()]);
    assert_eq!(found[0].items().len(), 2);

    assert!(
        store
            .find_orders_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_equal_timestamps_list_later_insert_first() {
    let store = get_test_store().await;
    let first = order_for("ada@example.com", 5);
    let created_at = first.created_at();
    let second = Order::from_persisted(
        OrderId::new(),
        "Customer".to_string(),
        "ada@example.com".to_string(),
        created_at,
        Money::new(dec!(25.50)),
        first.items().to_vec(),
    );

    store.save_order(&first).await.unwrap();
    store.save_order(&second).await.unwrap();

    let by_email: Vec<_> = store
        .find_orders_by_email("ada@example.com")
        .await
        .unwrap()
        .iter()
        .map(Order::id)
        .collect();
    assert_eq!(by_email, vec![second.id(), first.id()]);

    let all: Vec<_> = store
        .list_orders()
        .await
        .unwrap()
        .iter()
        .map(Order::id)
        .collect();
    assert_eq!(all, vec![second.id(), first.id()]);
}

#[tokio::test]
async fn test_journal_roundtrip_and_recovery_query() {
    let store = get_test_store().await;
    let product = store.find_product(ProductId::new(1)).await.unwrap().unwrap();

    let mut draft = OrderDraft::new("Ada", "ada@example.com");
    draft.add_item(&product, 1).unwrap();
    let correlation_id = CorrelationId::new();

    let mut checkout = Checkout::default();
    let event = checkout.start(correlation_id, draft).unwrap();
    store.record(&mut checkout, event).await.unwrap();
    let event = checkout.authorize(Some("TX-1".to_string())).unwrap();
    store.record(&mut checkout, event).await.unwrap();

    let loaded = store.load_checkout(correlation_id).await.unwrap().unwrap();
    assert_eq!(loaded.state(), CheckoutState::Authorized);
    assert_eq!(loaded.amount(), Money::new(dec!(10.00)));

    let stuck = store.latest_of_type("PaymentAuthorized").await.unwrap();
    assert_eq!(stuck, vec![correlation_id]);

    let event = checkout.mark_persisted().unwrap();
    store.record(&mut checkout, event).await.unwrap();
    assert!(
        store
            .latest_of_type("PaymentAuthorized")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_journal_rejects_out_of_sequence_append() {
    let store = get_test_store().await;
    let product = store.find_product(ProductId::new(2)).await.unwrap().unwrap();

    let mut draft = OrderDraft::new("Ada", "ada@example.com");
    draft.add_item(&product, 1).unwrap();
    let correlation_id = CorrelationId::new();

    let mut checkout = Checkout::default();
    let event = checkout.start(correlation_id, draft).unwrap();
    store.record(&mut checkout, event).await.unwrap();

    let mut stale = checkout.clone();
    let event = checkout.authorize(None).unwrap();
    store.record(&mut checkout, event).await.unwrap();

    let event = stale.authorize(None).unwrap();
    let err = store.record(&mut stale, event).await.unwrap_err();
    assert!(matches!(err, StoreError::ConcurrencyConflict { .. }));
    assert_eq!(store.entries_for(correlation_id).await.unwrap().len(), 2);
}
