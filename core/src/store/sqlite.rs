//! Relational backend: one SQLite file, one table per entity kind.
//!
//! Keys come from `INTEGER PRIMARY KEY AUTOINCREMENT`, so they are never
//! reused after a reset and can be mirrored into the document store as-is.

use log::debug;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::durability::{self, DurabilityMode, JournalMode, Synchronous};
use crate::error::{BenchError, Result};
use crate::records::{EntityKind, PaymentMethod, Product, StockDelta, User};
use crate::store::{Backend, BackendKind};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        name           TEXT NOT NULL,
        cpf            TEXT NOT NULL,
        rg             TEXT NOT NULL,
        address        TEXT NOT NULL,
        payment_method TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS products (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        price_cents INTEGER NOT NULL,
        stock       INTEGER NOT NULL CHECK (stock >= 0)
    );";

/// How connections to the SQLite file are opened.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub path: PathBuf,
    pub synchronous: Synchronous,
    pub journal_mode: JournalMode,
}

impl SqliteOptions {
    /// WAL journal, fsync on every commit.
    pub fn durable(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synchronous: Synchronous::Full,
            journal_mode: JournalMode::Wal,
        }
    }
}

/// Hands out configured connections to one database file.
///
/// Each request takes its own [`SqliteStore`] and drops it when done; the
/// pool itself holds no open handles and is cheap to clone into router
/// state.
#[derive(Debug, Clone)]
pub struct SqlitePool {
    options: SqliteOptions,
}

impl SqlitePool {
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }

    pub fn path(&self) -> &Path {
        &self.options.path
    }

    pub fn get(&self) -> Result<SqliteStore> {
        let conn = Connection::open(&self.options.path)?;
        configure_connection(&conn, &self.options)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(SqliteStore { conn })
    }
}

/// Apply the pool's journal and sync settings to a fresh connection.
pub fn configure_connection(conn: &Connection, options: &SqliteOptions) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = {};
         PRAGMA synchronous = {};
         PRAGMA temp_store = MEMORY;",
        options.journal_mode.pragma_value(),
        options.synchronous.pragma_value(),
    ))?;
    Ok(())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn synchronous(&self) -> Result<Synchronous> {
        let raw: i64 = self
            .conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))?;
        Synchronous::from_pragma(raw).ok_or_else(|| BenchError::Configuration {
            backend: BackendKind::Relational,
            detail: format!("unrecognised synchronous level {raw}"),
        })
    }

    fn journal_mode(&self) -> Result<JournalMode> {
        let raw: String = self
            .conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))?;
        raw.parse().map_err(|detail| BenchError::Configuration {
            backend: BackendKind::Relational,
            detail,
        })
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Users => "users",
        EntityKind::Products => "products",
    }
}

fn to_sql_key(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| BenchError::invalid("id", format!("{id} does not fit in i64")))
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

struct UserRow {
    id: i64,
    name: String,
    cpf: String,
    rg: String,
    address: String,
    payment_method: String,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let method: PaymentMethod = self.payment_method.parse()?;
        Ok(User::new(self.name, self.cpf, self.rg, self.address, method)?.with_id(self.id as u64))
    }
}

struct ProductRow {
    id: i64,
    name: String,
    price_cents: u32,
    stock: u32,
}

impl ProductRow {
    fn into_product(self) -> Result<Product> {
        Ok(Product::new(self.name, self.price_cents, self.stock)?.with_id(self.id as u64))
    }
}

impl Backend for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn durability(&mut self) -> Result<DurabilityMode> {
        let synchronous = self.synchronous()?;
        let journal = self.journal_mode()?;
        let mode = durability::sqlite_mode(synchronous, journal);
        debug!(
            "SQLite durability: synchronous={:?} journal_mode={:?} -> {:?}",
            synchronous, journal, mode
        );
        Ok(mode)
    }

    fn insert_users(&mut self, users: &mut [User]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO users (id, name, cpf, rg, address, payment_method)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for user in users.iter_mut() {
                let key = user.id.map(to_sql_key).transpose()?;
                stmt.execute(params![
                    key,
                    user.name(),
                    user.cpf(),
                    user.rg(),
                    user.address(),
                    user.payment_method().as_str(),
                ])?;
                user.id = Some(tx.last_insert_rowid() as u64);
            }
        }
        // synchronous=FULL: returns once the WAL frame is fsynced.
        tx.commit()?;
        Ok(())
    }

    fn insert_products(&mut self, products: &mut [Product]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO products (id, name, price_cents, stock) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for product in products.iter_mut() {
                let key = product.id.map(to_sql_key).transpose()?;
                stmt.execute(params![
                    key,
                    product.name(),
                    product.price_cents(),
                    product.stock(),
                ])?;
                product.id = Some(tx.last_insert_rowid() as u64);
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn read_users(&mut self, limit: usize) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, cpf, rg, address, payment_method
             FROM users ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit_param(limit)], |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    cpf: row.get(2)?,
                    rg: row.get(3)?,
                    address: row.get(4)?,
                    payment_method: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    fn read_products(&mut self, limit: usize) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, price_cents, stock FROM products ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit_param(limit)], |row| {
                Ok(ProductRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    price_cents: row.get(2)?,
                    stock: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ProductRow::into_product).collect()
    }

    fn decrement_stock(&mut self, deltas: &[StockDelta]) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let mut applied = 0u64;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE products SET stock = stock - ?2 WHERE id = ?1 AND stock >= ?2",
            )?;
            for delta in deltas {
                applied += stmt.execute(params![to_sql_key(delta.key)?, delta.delta])? as u64;
            }
        }
        tx.commit()?;
        Ok(applied)
    }

    fn count(&mut self, kind: EntityKind) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table(kind)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn keys(&mut self, kind: EntityKind, limit: usize) -> Result<Vec<u64>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT id FROM {} ORDER BY id LIMIT ?1", table(kind)))?;
        let keys = stmt
            .query_map([limit_param(limit)], |row| row.get::<_, i64>(0))?
            .map(|key| key.map(|k| k as u64))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }

    fn clear(&mut self, kind: EntityKind) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute(&format!("DELETE FROM {}", table(kind)), [])?;
        tx.commit()?;
        Ok(removed as u64)
    }
}
