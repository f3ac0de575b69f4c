use async_trait::async_trait;
use common::{OrderId, ProductId};
use domain::{Order, Product};

use crate::{CheckoutJournal, Result};

/// Read access to the product catalog.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Looks up a product by id.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Returns the whole catalog ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Inserts or replaces a catalog entry.
    ///
    /// Used to seed the catalog; the order workflow never writes products.
    async fn upsert_product(&self, product: Product) -> Result<()>;
}

/// Outcome of [`OrderRepository::save_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The order and its lines were written.
    Inserted,
    /// An order with the same id already exists; nothing was written.
    AlreadyPresent,
}

/// Persistence of paid orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes an order and all of its lines in one atomic unit.
    ///
    /// Saving an id that is already stored is a no-op reported as
    /// [`SaveOutcome::AlreadyPresent`], which makes re-running a recovered
    /// checkout safe.
    async fn save_order(&self, order: &Order) -> Result<SaveOutcome>;

    /// Looks up an order by id.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns all orders placed with exactly this email, newest first.
    async fn find_orders_by_email(&self, email: &str) -> Result<Vec<Order>>;

    /// Returns all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;
}

/// Everything the order workflow needs from storage.
pub trait ShopStore:
    ProductRepository + OrderRepository + CheckoutJournal + Clone + 'static
{
}

impl<T> ShopStore for T where
    T: ProductRepository + OrderRepository + CheckoutJournal + Clone + 'static
{
}
