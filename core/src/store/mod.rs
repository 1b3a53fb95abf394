//! Storage backends and the common `Backend` trait.
//!
//! Two implementations are provided:
//! - [`sqlite::SqliteStore`]: relational store, auto-assigns keys
//! - [`document::DocumentStore`]: KeyDB/Redis hashes, mirrors those keys

pub mod document;
pub mod sqlite;

use serde::Serialize;
use std::fmt;

use crate::durability::DurabilityMode;
use crate::error::Result;
use crate::records::{EntityKind, Product, StockDelta, User};

/// Which side of the comparison a backend sits on.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    #[serde(rename = "SQL")]
    Relational,
    #[serde(rename = "NoSQL")]
    Document,
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Relational => "SQL",
            BackendKind::Document => "NoSQL",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trait implemented by each store.
///
/// Every write method returns only after the store has confirmed the batch
/// is durable under the connection's configured mode; the runner times these
/// calls as-is. Read methods never mutate.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Reads back the acknowledgement mode actually in effect on this
    /// connection.
    fn durability(&mut self) -> Result<DurabilityMode>;

    /// Inserts the batch as one unit. Records without a key get one assigned
    /// and written back into the slice; records with a key keep it.
    fn insert_users(&mut self, users: &mut [User]) -> Result<()>;

    fn insert_products(&mut self, products: &mut [Product]) -> Result<()>;

    /// Up to `limit` users in key order. `limit == 0` is an empty batch.
    fn read_users(&mut self, limit: usize) -> Result<Vec<User>>;

    fn read_products(&mut self, limit: usize) -> Result<Vec<Product>>;

    /// Applies each decrement where the product exists and has enough stock.
    /// Returns how many decrements took effect.
    fn decrement_stock(&mut self, deltas: &[StockDelta]) -> Result<u64>;

    fn count(&mut self, kind: EntityKind) -> Result<u64>;

    /// Up to `limit` existing keys in key order.
    fn keys(&mut self, kind: EntityKind, limit: usize) -> Result<Vec<u64>>;

    /// Removes every record of `kind`; returns how many were removed.
    fn clear(&mut self, kind: EntityKind) -> Result<u64>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn durability(&mut self) -> Result<DurabilityMode> {
        (**self).durability()
    }

    fn insert_users(&mut self, users: &mut [User]) -> Result<()> {
        (**self).insert_users(users)
    }

    fn insert_products(&mut self, products: &mut [Product]) -> Result<()> {
        (**self).insert_products(products)
    }

    fn read_users(&mut self, limit: usize) -> Result<Vec<User>> {
        (**self).read_users(limit)
    }

    fn read_products(&mut self, limit: usize) -> Result<Vec<Product>> {
        (**self).read_products(limit)
    }

    fn decrement_stock(&mut self, deltas: &[StockDelta]) -> Result<u64> {
        (**self).decrement_stock(deltas)
    }

    fn count(&mut self, kind: EntityKind) -> Result<u64> {
        (**self).count(kind)
    }

    fn keys(&mut self, kind: EntityKind, limit: usize) -> Result<Vec<u64>> {
        (**self).keys(kind, limit)
    }

    fn clear(&mut self, kind: EntityKind) -> Result<u64> {
        (**self).clear(kind)
    }
}
