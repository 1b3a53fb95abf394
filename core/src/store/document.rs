//! KeyDB/Redis-backed document store.
//!
//! Every record is a hash and every entity kind keeps a sorted-set index
//! scored by key, so reads come back in the same key order as the
//! relational side.
//!
//! Key schema:
//! - `user:{id}`: user document (hash)
//! - `users:index`: sorted set of user keys
//! - `product:{id}`: product document (hash)
//! - `products:index`: sorted set of product keys
//!
//! Keys are never allocated here. The relational store assigns them and the
//! runner hands the same records on, so both sides hold identical keys.
//!
//! Durable writes need `appendonly yes` and one of: `WAITAOF` (Redis 7.2+),
//! or `appendfsync always` (KeyDB and older Redis). The choice is checked
//! once per connection, before the first write.

use log::{debug, warn};
use redis::{Connection, Value, pipe};
use std::collections::HashMap;

use crate::durability::{self, AofCapabilities, AofConfirm, DurabilityMode, WriteAck};
use crate::error::{BenchError, Result};
use crate::records::{EntityKind, PaymentMethod, Product, StockDelta, User};
use crate::store::{Backend, BackendKind};

/// Number of keys per `DEL` when clearing an entity kind.
const DELETE_BATCH_SIZE: usize = 4096;

/// Decrement `stock` by ARGV[1] only when the document exists and has enough.
const DECREMENT_STOCK_SCRIPT: &str = "local s = tonumber(redis.call('HGET', KEYS[1], 'stock')); \
     if s and s >= tonumber(ARGV[1]) then \
       redis.call('HINCRBY', KEYS[1], 'stock', -tonumber(ARGV[1])); return 1; \
     end; return 0";

/// Shared handle for opening document-store connections.
#[derive(Debug, Clone)]
pub struct DocumentPool {
    client: redis::Client,
    ack: WriteAck,
}

impl DocumentPool {
    /// Validates the URL; no connection is made until [`DocumentPool::get`].
    pub fn open(url: &str, ack: WriteAck) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self { client, ack })
    }

    pub fn ack(&self) -> WriteAck {
        self.ack
    }

    pub fn get(&self) -> Result<DocumentStore> {
        let con = self.client.get_connection()?;
        Ok(DocumentStore {
            con,
            ack: self.ack,
            caps: None,
        })
    }
}

pub struct DocumentStore {
    con: Connection,
    ack: WriteAck,
    caps: Option<AofCapabilities>,
}

fn index_key(kind: EntityKind) -> String {
    format!("{}:index", kind.as_str())
}

fn document_key(kind: EntityKind, id: u64) -> String {
    format!("{}:{}", kind.document_prefix(), id)
}

fn mirrored_key(id: Option<u64>) -> Result<u64> {
    id.ok_or_else(|| {
        BenchError::invalid(
            "id",
            "document store mirrors relational keys; insert into the relational store first",
        )
    })
}

/// `COMMAND INFO name` answers `[nil]` for commands the server lacks.
fn command_listed(reply: &[Value]) -> bool {
    matches!(reply.first(), Some(info) if *info != Value::Nil)
}

/// How many records of a batch replaced an existing document instead of
/// adding one, given the `ZADD` replies for that batch.
fn overwritten(batch: usize, indexed: &[i64]) -> usize {
    let added: i64 = indexed.iter().sum();
    batch.saturating_sub(usize::try_from(added).unwrap_or(0))
}

fn warn_if_overwritten(kind: EntityKind, batch: usize, indexed: &[i64]) {
    let replaced = overwritten(batch, indexed);
    if replaced > 0 {
        warn!(
            "{} of {} {} keys already existed in the document store and were overwritten; \
             the relational file and the document store are out of step",
            replaced, batch, kind
        );
    }
}

fn field<'a>(doc: &'a HashMap<String, String>, name: &'static str) -> Result<&'a str> {
    doc.get(name)
        .map(String::as_str)
        .ok_or_else(|| BenchError::invalid(name, "missing from stored document"))
}

fn parse_field<T: std::str::FromStr>(doc: &HashMap<String, String>, name: &'static str) -> Result<T> {
    field(doc, name)?
        .parse::<T>()
        .map_err(|_| BenchError::invalid(name, "not a number in stored document"))
}

fn user_from_document(id: u64, doc: &HashMap<String, String>) -> Result<User> {
    let method: PaymentMethod = field(doc, "payment_method")?.parse()?;
    Ok(User::new(
        field(doc, "name")?,
        field(doc, "cpf")?,
        field(doc, "rg")?,
        field(doc, "address")?,
        method,
    )?
    .with_id(id))
}

fn product_from_document(id: u64, doc: &HashMap<String, String>) -> Result<Product> {
    Ok(Product::new(
        field(doc, "name")?,
        parse_field(doc, "price_cents")?,
        parse_field(doc, "stock")?,
    )?
    .with_id(id))
}

impl DocumentStore {
    fn config_value(&mut self, name: &str) -> Result<Option<String>> {
        let mut config: HashMap<String, String> = redis::cmd("CONFIG")
            .arg("GET")
            .arg(name)
            .query(&mut self.con)?;
        Ok(config.remove(name))
    }

    fn has_command(&mut self, name: &str) -> Result<bool> {
        let reply: Vec<Value> = redis::cmd("COMMAND")
            .arg("INFO")
            .arg(name)
            .query(&mut self.con)?;
        Ok(command_listed(&reply))
    }

    fn capabilities(&mut self) -> Result<AofCapabilities> {
        if let Some(caps) = self.caps {
            return Ok(caps);
        }
        let is = |value: Option<String>, expected: &str| {
            value.is_some_and(|v| v.eq_ignore_ascii_case(expected))
        };
        let caps = AofCapabilities {
            appendonly: is(self.config_value("appendonly")?, "yes"),
            fsync_always: is(self.config_value("appendfsync")?, "always"),
            waitaof: self.has_command("WAITAOF")?,
        };
        self.caps = Some(caps);
        Ok(caps)
    }

    /// Decides how the next write will be confirmed. Runs before anything is
    /// sent, so a server that cannot confirm fsyncs is rejected unwritten.
    fn write_confirmation(&mut self) -> Result<Option<AofConfirm>> {
        if self.ack == WriteAck::Memory {
            return Ok(None);
        }
        match self.capabilities()?.confirmation() {
            Some(confirm) => Ok(Some(confirm)),
            None => Err(BenchError::Configuration {
                backend: BackendKind::Document,
                detail: "server cannot confirm AOF fsyncs; needs appendonly yes plus \
                         WAITAOF (Redis 7.2+) or appendfsync always"
                    .to_string(),
            }),
        }
    }

    /// Blocks until every write issued on this connection is fsynced to the
    /// local append-only file. Under `appendfsync always` the write's own
    /// reply already means that.
    fn confirm_durable(&mut self, confirm: Option<AofConfirm>) -> Result<()> {
        if confirm != Some(AofConfirm::WaitAof) {
            return Ok(());
        }

        let (local, _replicas): (i64, i64) = redis::cmd("WAITAOF")
            .arg(1)
            .arg(0)
            .arg(0)
            .query(&mut self.con)?;
        if local < 1 {
            return Err(BenchError::Configuration {
                backend: BackendKind::Document,
                detail: "WAITAOF confirmed no local fsync; is appendonly enabled?".to_string(),
            });
        }
        Ok(())
    }

    fn documents(&mut self, kind: EntityKind, limit: usize) -> Result<Vec<(u64, HashMap<String, String>)>> {
        let keys = self.keys(kind, limit)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipeline = pipe();
        for id in &keys {
            pipeline.cmd("HGETALL").arg(document_key(kind, *id));
        }
        let docs: Vec<HashMap<String, String>> = pipeline.query(&mut self.con)?;

        // An index entry whose hash vanished mid-read comes back empty.
        Ok(keys
            .into_iter()
            .zip(docs)
            .filter(|(_, doc)| !doc.is_empty())
            .collect())
    }
}

impl Backend for DocumentStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn durability(&mut self) -> Result<DurabilityMode> {
        let caps = self.capabilities()?;
        let mode = durability::document_mode(caps, self.ack);
        debug!(
            "Document store durability: {:?} ack={} -> {:?}",
            caps, self.ack, mode
        );
        Ok(mode)
    }

    fn insert_users(&mut self, users: &mut [User]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }
        let confirm = self.write_confirmation()?;
        let index = index_key(EntityKind::Users);
        let mut pipeline = pipe();
        pipeline.atomic();
        for user in users.iter() {
            let id = mirrored_key(user.id)?;
            pipeline
                .cmd("HSET")
                .arg(document_key(EntityKind::Users, id))
                .arg("name")
                .arg(user.name())
                .arg("cpf")
                .arg(user.cpf())
                .arg("rg")
                .arg(user.rg())
                .arg("address")
                .arg(user.address())
                .arg("payment_method")
                .arg(user.payment_method().as_str())
                .ignore()
                .cmd("ZADD")
                .arg(&index)
                .arg(id)
                .arg(id);
        }
        let indexed: Vec<i64> = pipeline.query(&mut self.con)?;
        self.confirm_durable(confirm)?;
        warn_if_overwritten(EntityKind::Users, users.len(), &indexed);
        Ok(())
    }

    fn insert_products(&mut self, products: &mut [Product]) -> Result<()> {
        if products.is_empty() {
            return Ok(());
        }
        let confirm = self.write_confirmation()?;
        let index = index_key(EntityKind::Products);
        let mut pipeline = pipe();
        pipeline.atomic();
        for product in products.iter() {
            let id = mirrored_key(product.id)?;
            pipeline
                .cmd("HSET")
                .arg(document_key(EntityKind::Products, id))
                .arg("name")
                .arg(product.name())
                .arg("price_cents")
                .arg(product.price_cents())
                .arg("stock")
                .arg(product.stock())
                .ignore()
                .cmd("ZADD")
                .arg(&index)
                .arg(id)
                .arg(id);
        }
        let indexed: Vec<i64> = pipeline.query(&mut self.con)?;
        self.confirm_durable(confirm)?;
        warn_if_overwritten(EntityKind::Products, products.len(), &indexed);
        Ok(())
    }

    fn read_users(&mut self, limit: usize) -> Result<Vec<User>> {
        self.documents(EntityKind::Users, limit)?
            .iter()
            .map(|(id, doc)| user_from_document(*id, doc))
            .collect()
    }

    fn read_products(&mut self, limit: usize) -> Result<Vec<Product>> {
        self.documents(EntityKind::Products, limit)?
            .iter()
            .map(|(id, doc)| product_from_document(*id, doc))
            .collect()
    }

    fn decrement_stock(&mut self, deltas: &[StockDelta]) -> Result<u64> {
        if deltas.is_empty() {
            return Ok(0);
        }
        let confirm = self.write_confirmation()?;
        let mut pipeline = pipe();
        pipeline.atomic();
        for delta in deltas {
            pipeline
                .cmd("EVAL")
                .arg(DECREMENT_STOCK_SCRIPT)
                .arg(1)
                .arg(document_key(EntityKind::Products, delta.key))
                .arg(delta.delta);
        }
        let applied: Vec<i64> = pipeline.query(&mut self.con)?;
        self.confirm_durable(confirm)?;
        Ok(applied.into_iter().filter(|&hit| hit == 1).count() as u64)
    }

    fn count(&mut self, kind: EntityKind) -> Result<u64> {
        let count: u64 = redis::cmd("ZCARD")
            .arg(index_key(kind))
            .query(&mut self.con)?;
        Ok(count)
    }

    fn keys(&mut self, kind: EntityKind, limit: usize) -> Result<Vec<u64>> {
        // ZRANGE 0 -1 would mean "everything".
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = i64::try_from(limit - 1).unwrap_or(i64::MAX);
        let keys: Vec<u64> = redis::cmd("ZRANGE")
            .arg(index_key(kind))
            .arg(0)
            .arg(stop)
            .query(&mut self.con)?;
        Ok(keys)
    }

    fn clear(&mut self, kind: EntityKind) -> Result<u64> {
        let confirm = self.write_confirmation()?;
        let index = index_key(kind);
        let keys: Vec<u64> = redis::cmd("ZRANGE")
            .arg(&index)
            .arg(0)
            .arg(-1)
            .query(&mut self.con)?;

        let mut pipeline = pipe();
        pipeline.atomic();
        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let doc_keys: Vec<String> = chunk.iter().map(|id| document_key(kind, *id)).collect();
            pipeline.cmd("DEL").arg(doc_keys);
        }
        pipeline.cmd("DEL").arg(&index);
        pipeline.query::<()>(&mut self.con)?;
        self.confirm_durable(confirm)?;

        Ok(keys.len() as u64)
    }
}
