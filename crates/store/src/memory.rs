use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{CorrelationId, OrderId, ProductId};
use domain::{Order, Product};
use tokio::sync::RwLock;

use crate::{
    CheckoutJournal, JournalEntry, OrderRepository, ProductRepository, Result, SaveOutcome,
    StoreError,
};

/// In-memory implementation of every storage trait.
///
/// Used by tests and by the API when no database is configured. Cloning is
/// cheap and clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    products: Arc<RwLock<BTreeMap<ProductId, Product>>>,
    orders: Arc<RwLock<Vec<Order>>>,
    journal: Arc<RwLock<Vec<JournalEntry>>>,
    fail_on_save: Arc<AtomicBool>,
    fail_journal_on: Arc<RwLock<Option<String>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose catalog holds `products`.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut catalog = store.products.write().await;
            for product in products {
                catalog.insert(product.id, product);
            }
        }
        store
    }

    /// Makes every subsequent `save_order` fail until reset.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }

    /// Makes appends of `event_type` entries fail until reset with `None`.
    pub async fn set_fail_journal_on(&self, event_type: Option<&str>) {
        *self.fail_journal_on.write().await = event_type.map(str::to_string);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the number of journal entries across all checkouts.
    pub async fn journal_len(&self) -> usize {
        self.journal.read().await.len()
    }
}

/// Sorts newest first; among equal timestamps the later insert comes first.
fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.reverse();
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    orders
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        self.products.write().await.insert(product.id, product);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn save_order(&self, order: &Order) -> Result<SaveOutcome> {
        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "order storage rejected the write".to_string(),
            ));
        }

        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.id() == order.id()) {
            return Ok(SaveOutcome::AlreadyPresent);
        }
        orders.push(order.clone());
        Ok(SaveOutcome::Inserted)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.id() == id)
            .cloned())
    }

    async fn find_orders_by_email(&self, email: &str) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(
            orders
                .iter()
                .filter(|o| o.customer_email() == email)
                .cloned()
                .collect(),
        ))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(newest_first(self.orders.read().await.clone()))
    }
}

#[async_trait]
impl CheckoutJournal for InMemoryStore {
    async fn append_entry(&self, entry: JournalEntry) -> Result<()> {
        if self.fail_journal_on.read().await.as_deref() == Some(entry.event_type.as_str()) {
            return Err(StoreError::Unavailable(format!(
                "journal rejected {} entry",
                entry.event_type
            )));
        }

        let mut journal = self.journal.write().await;

        let current = journal
            .iter()
            .filter(|e| e.correlation_id == entry.correlation_id)
            .map(|e| e.sequence)
            .max()
            .unwrap_or(0);

        if entry.sequence != current + 1 {
            return Err(StoreError::ConcurrencyConflict {
                correlation_id: entry.correlation_id,
                expected: entry.sequence.saturating_sub(1),
                actual: current,
            });
        }

        journal.push(entry);
        Ok(())
    }

    async fn entries_for(&self, correlation_id: CorrelationId) -> Result<Vec<JournalEntry>> {
        let journal = self.journal.read().await;
        let mut entries: Vec<_> = journal
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn latest_of_type(&self, event_type: &str) -> Result<Vec<CorrelationId>> {
        let journal = self.journal.read().await;

        // Entries are appended in order, so the last one seen per checkout is its latest.
        let mut latest: Vec<(CorrelationId, &JournalEntry)> = Vec::new();
        for entry in journal.iter() {
            match latest.iter_mut().find(|(id, _)| *id == entry.correlation_id) {
                Some(slot) => slot.1 = entry,
                None => latest.push((entry.correlation_id, entry)),
            }
        }

        Ok(latest
            .into_iter()
            .filter(|(_, entry)| entry.event_type == event_type)
            .map(|(id, _)| id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::{Money, OrderItem};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order_for(email: &str, minutes_ago: i64) -> Order {
        let item = OrderItem::new(1, "P1", 1, Money::new(dec!(10.00)));
        Order::from_persisted(
            OrderId::new(),
            "Customer".to_string(),
            email.to_string(),
            Utc::now() - Duration::minutes(minutes_ago),
            item.total_price(),
            vec![item],
        )
    }

    fn entry(correlation_id: CorrelationId, sequence: u32, event_type: &str) -> JournalEntry {
        JournalEntry {
            entry_id: Uuid::new_v4(),
            correlation_id,
            sequence,
            event_type: event_type.to_string(),
            payload: serde_json::json!({}),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let store =
            InMemoryStore::with_products(vec![Product::new(1, "P1", Money::new(dec!(10.00)))])
                .await;

        assert!(store.find_product(ProductId::new(1)).await.unwrap().is_some());
        assert!(store.find_product(ProductId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_products_ordered_by_id() {
        let store = InMemoryStore::new();
        store
            .upsert_product(Product::new(3, "C", Money::from_cents(300)))
            .await
            .unwrap();
        store
            .upsert_product(Product::new(1, "A", Money::from_cents(100)))
            .await
            .unwrap();

        let ids: Vec<_> = store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.as_i64())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_orders_by_email_newest_first() {
        let store = InMemoryStore::new();
        let old = order_for("ada@example.com", 30);
        let new = order_for("ada@example.com", 1);
        let other = order_for("bob@example.com", 5);

        store.save_order(&old).await.unwrap();
        store.save_order(&other).await.unwrap();
        store.save_order(&new).await.unwrap();

        let found = store.find_orders_by_email("ada@example.com").await.unwrap();
        let ids: Vec<_> = found.iter().map(Order::id).collect();
        assert_eq!(ids, vec![new.id(), old.id()]);

        assert!(
            store
                .find_orders_by_email("nobody@example.com")
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(store.list_orders().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_equal_timestamps_list_later_insert_first() {
        let store = InMemoryStore::new();
        let first = order_for("ada@example.com", 5);
        let second = Order::from_persisted(
            OrderId::new(),
            "Customer".to_string(),
            "ada@example.com".to_string(),
            first.created_at(),
            first.total_amount(),
            first.items().to_vec(),
        );

        store.save_order(&first).await.unwrap();
        store.save_order(&second).await.unwrap();

        let ids: Vec<_> = store
            .list_orders()
            .await
            .unwrap()
            .iter()
            .map(Order::id)
            .collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }

    #[tokio::test]
    async fn test_save_is_idempotent_per_id() {
        let store = InMemoryStore::new();
        let order = order_for("ada@example.com", 0);

        assert_eq!(store.save_order(&order).await.unwrap(), SaveOutcome::Inserted);
        assert_eq!(
            store.save_order(&order).await.unwrap(),
            SaveOutcome::AlreadyPresent
        );
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_fail_on_save() {
        let store = InMemoryStore::new();
        store.set_fail_on_save(true);

        let result = store.save_order(&order_for("ada@example.com", 0)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_fail_journal_on_one_event_type() {
        let store = InMemoryStore::new();
        let id = CorrelationId::new();
        store.set_fail_journal_on(Some("B")).await;

        store.append_entry(entry(id, 1, "A")).await.unwrap();
        let err = store.append_entry(entry(id, 2, "B")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.journal_len().await, 1);

        store.set_fail_journal_on(None).await;
        store.append_entry(entry(id, 2, "B")).await.unwrap();
        assert_eq!(store.journal_len().await, 2);
    }

    #[tokio::test]
    async fn test_append_requires_next_sequence() {
        let store = InMemoryStore::new();
        let id = CorrelationId::new();

        store.append_entry(entry(id, 1, "A")).await.unwrap();
        let err = store.append_entry(entry(id, 3, "B")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict {
                expected: 2,
                actual: 1,
                ..
            }
        ));
        store.append_entry(entry(id, 2, "B")).await.unwrap();
        assert_eq!(store.journal_len().await, 2);
    }

    #[tokio::test]
    async fn test_latest_of_type_only_matches_last_entry() {
        let store = InMemoryStore::new();
        let stuck = CorrelationId::new();
        let done = CorrelationId::new();

        store.append_entry(entry(stuck, 1, "Started")).await.unwrap();
        store.append_entry(entry(done, 1, "Started")).await.unwrap();
        store.append_entry(entry(stuck, 2, "Authorized")).await.unwrap();
        store.append_entry(entry(done, 2, "Authorized")).await.unwrap();
        store.append_entry(entry(done, 3, "Persisted")).await.unwrap();

        let found = store.latest_of_type("Authorized").await.unwrap();
        assert_eq!(found, vec![stuck]);
    }
}
