use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CorrelationId, OrderId, ProductId};
use domain::{Money, Order, OrderItem, Product};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CheckoutJournal, JournalEntry, OrderRepository, ProductRepository, Result, SaveOutcome,
    StoreError,
};

/// PostgreSQL-backed implementation of every storage trait.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a default pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::new(row.try_get::<Decimal, _>("price")?),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity}")))?;

        Ok(OrderItem::new(
            ProductId::new(row.try_get("product_id")?),
            row.try_get::<String, _>("product_name")?,
            quantity,
            Money::new(row.try_get::<Decimal, _>("unit_price")?),
        ))
    }

    fn row_to_entry(row: PgRow) -> Result<JournalEntry> {
        let sequence: i32 = row.try_get("sequence")?;
        let sequence = u32::try_from(sequence)
            .map_err(|_| StoreError::Corrupt(format!("negative journal sequence {sequence}")))?;

        Ok(JournalEntry {
            entry_id: row.try_get("id")?,
            correlation_id: CorrelationId::from_uuid(row.try_get::<Uuid, _>("correlation_id")?),
            sequence,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            recorded_at: row.try_get::<DateTime<Utc>, _>("recorded_at")?,
        })
    }

    /// Loads the lines of the given orders and assembles full orders,
    /// keeping the order of `rows`.
    async fn assemble_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: Uuid = row.try_get("order_id")?;
            items
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                Ok(Order::from_persisted(
                    OrderId::from_uuid(id),
                    row.try_get("customer_name")?,
                    row.try_get("customer_email")?,
                    row.try_get::<DateTime<Utc>, _>("created_at")?,
                    Money::new(row.try_get::<Decimal, _>("total_amount")?),
                    items.remove(&id).unwrap_or_default(),
                ))
            })
            .collect()
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price
            "#,
        )
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn save_order(&self, order: &Order) -> Result<SaveOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, customer_name, customer_email, created_at, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.customer_name())
        .bind(order.customer_email())
        .bind(order.created_at())
        .bind(order.total_amount().amount())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            tracing::debug!(order_id = %order.id(), "order already stored");
            return Ok(SaveOutcome::AlreadyPresent);
        }

        for (position, item) in order.items().iter().enumerate() {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                StoreError::Corrupt(format!("quantity {} out of range", item.quantity))
            })?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_i64())
            .bind(&item.product_name)
            .bind(quantity)
            .bind(item.unit_price.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(SaveOutcome::Inserted)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, customer_email, created_at, total_amount
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(self.assemble_orders(rows).await?.into_iter().next())
    }

    async fn find_orders_by_email(&self, email: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, customer_email, created_at, total_amount
            FROM orders
            WHERE customer_email = $1
            ORDER BY created_at DESC, insert_seq DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        self.assemble_orders(rows).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, customer_email, created_at, total_amount
            FROM orders
            ORDER BY created_at DESC, insert_seq DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.assemble_orders(rows).await
    }
}

#[async_trait]
impl CheckoutJournal for PostgresStore {
    async fn append_entry(&self, entry: JournalEntry) -> Result<()> {
        let correlation_id = entry.correlation_id;
        let sequence = i32::try_from(entry.sequence).map_err(|_| {
            StoreError::Corrupt(format!("journal sequence {} out of range", entry.sequence))
        })?;

        let mut tx = self.pool.begin().await?;

        let current: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(sequence) FROM checkout_journal WHERE correlation_id = $1",
        )
        .bind(correlation_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        let current = current.unwrap_or(0);

        if sequence != current + 1 {
            return Err(StoreError::ConcurrencyConflict {
                correlation_id,
                expected: entry.sequence.saturating_sub(1),
                actual: current.max(0) as u32,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO checkout_journal (id, correlation_id, sequence, event_type, payload, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.entry_id)
        .bind(correlation_id.as_uuid())
        .bind(sequence)
        .bind(&entry.event_type)
        .bind(&entry.payload)
        .bind(entry.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A concurrent writer took the same sequence first
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_checkout_sequence")
            {
                return StoreError::ConcurrencyConflict {
                    correlation_id,
                    expected: entry.sequence.saturating_sub(1),
                    actual: entry.sequence,
                };
            }
            StoreError::Database(e)
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn entries_for(&self, correlation_id: CorrelationId) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, correlation_id, sequence, event_type, payload, recorded_at
            FROM checkout_journal
            WHERE correlation_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(correlation_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn latest_of_type(&self, event_type: &str) -> Result<Vec<CorrelationId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT latest.correlation_id
            FROM (
                SELECT DISTINCT ON (correlation_id) correlation_id, event_type, recorded_at
                FROM checkout_journal
                ORDER BY correlation_id, sequence DESC
            ) AS latest
            WHERE latest.event_type = $1
            ORDER BY latest.recorded_at ASC
            "#,
        )
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(CorrelationId::from_uuid).collect())
    }
}
