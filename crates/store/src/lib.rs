//! Storage for the online shop backend.
//!
//! Three concerns live behind traits so the order workflow never sees a
//! concrete backend:
//! - [`ProductRepository`]: the read-only product catalog
//! - [`OrderRepository`]: paid orders and their lines, written atomically
//! - [`CheckoutJournal`]: the append-only record of checkout transitions
//!
//! Each trait has an in-memory implementation ([`InMemoryStore`]) and a
//! PostgreSQL one ([`PostgresStore`]).

pub mod error;
pub mod journal;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use journal::{CheckoutJournal, CheckoutJournalExt, JournalEntry};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use repository::{OrderRepository, ProductRepository, SaveOutcome, ShopStore};
