//! Times one batch operation against backend A, then backend B.
//!
//! The clock brackets only the backend call, which for writes includes the
//! store's durability confirmation. Record generation, key sampling and the
//! availability checks all happen before the clock starts.

use log::{info, warn};
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::durability::require_durable;
use crate::error::{BenchError, Result};
use crate::generator::FakeDataGenerator;
use crate::records::{EntityKind, StockDelta, User};
use crate::store::{Backend, BackendKind};

/// Decimal places kept in reported elapsed times.
pub const ELAPSED_DECIMALS: i32 = 4;

/// Largest batch a single INSERT, UPDATE or inventory call accepts. Each
/// batch is built in memory and sent to the document store as one pipeline.
pub const MAX_BATCH_SIZE: usize = 50_000;

/// Rejects write batches that are empty or larger than [`MAX_BATCH_SIZE`].
pub fn check_batch(count: usize) -> Result<()> {
    if count == 0 {
        return Err(BenchError::EmptyBatch);
    }
    check_batch_limit(count)
}

/// Rejects batches larger than [`MAX_BATCH_SIZE`]. Zero passes.
pub fn check_batch_limit(count: usize) -> Result<()> {
    if count > MAX_BATCH_SIZE {
        return Err(BenchError::BatchTooLarge {
            requested: count,
            limit: MAX_BATCH_SIZE,
        });
    }
    Ok(())
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[serde(rename = "INSERT (durable LUW)")]
    Insert,
    #[serde(rename = "SELECT (read)")]
    Read,
    #[serde(rename = "UPDATE (stock decrement)")]
    Update,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT (durable LUW)",
            Operation::Read => "SELECT (read)",
            Operation::Update => "UPDATE (stock decrement)",
        }
    }
}

/// Outcome of one measured operation. Elapsed values are seconds rounded to
/// [`ELAPSED_DECIMALS`]; the raw durations are kept for aggregate reports.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub operation: Operation,
    pub count: usize,
    pub backend_a: BackendKind,
    pub elapsed_a: f64,
    pub backend_b: BackendKind,
    pub elapsed_b: f64,
    pub winner: BackendKind,
    #[serde(skip)]
    pub raw_a: Duration,
    #[serde(skip)]
    pub raw_b: Duration,
}

impl BenchmarkResult {
    /// The winner is whichever backend took strictly less time. There is no
    /// "equal" outcome: identical timings go to backend A, the one measured
    /// first.
    pub fn from_timings(
        operation: Operation,
        count: usize,
        (backend_a, raw_a): (BackendKind, Duration),
        (backend_b, raw_b): (BackendKind, Duration),
    ) -> Self {
        let winner = if raw_b < raw_a { backend_b } else { backend_a };
        Self {
            operation,
            count,
            backend_a,
            elapsed_a: round_secs(raw_a),
            backend_b,
            elapsed_b: round_secs(raw_b),
            winner,
            raw_a,
            raw_b,
        }
    }
}

pub fn round_secs(elapsed: Duration) -> f64 {
    let scale = 10f64.powi(ELAPSED_DECIMALS);
    (elapsed.as_secs_f64() * scale).round() / scale
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InventoryReport {
    pub requested: usize,
    pub created: usize,
    /// Set when the stores disagreed and both were cleared and reseeded.
    pub resynced: bool,
    pub total: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct KindReset {
    pub kind: EntityKind,
    pub removed_a: u64,
    pub removed_b: u64,
}

fn timed<T>(call: impl FnOnce() -> Result<T>) -> Result<(T, Duration)> {
    let start = Instant::now();
    let value = call()?;
    Ok((value, start.elapsed()))
}

fn check_durable(backend: &mut dyn Backend) -> Result<()> {
    let kind = backend.kind();
    let mode = backend.durability()?;
    require_durable(
        kind,
        mode,
        "writes would be acknowledged before reaching the log/journal",
    )
}

fn check_available(backend: &mut dyn Backend, kind: EntityKind, requested: usize) -> Result<()> {
    let available = backend.count(kind)?;
    if available < requested as u64 {
        return Err(BenchError::InsufficientData {
            backend: backend.kind(),
            kind,
            requested,
            available,
        });
    }
    Ok(())
}

/// A pair of connections whose durability has been verified.
pub struct Runner<A, B> {
    a: A,
    b: B,
}

impl<A: Backend, B: Backend> Runner<A, B> {
    /// Refuses to build unless both connections acknowledge writes only
    /// after they are durable.
    pub fn new(mut a: A, mut b: B) -> Result<Self> {
        check_durable(&mut a)?;
        check_durable(&mut b)?;
        Ok(Self { a, b })
    }

    pub fn backend_a(&mut self) -> &mut A {
        &mut self.a
    }

    pub fn backend_b(&mut self) -> &mut B {
        &mut self.b
    }

    pub fn into_backends(self) -> (A, B) {
        (self.a, self.b)
    }

    pub fn counts(&mut self, kind: EntityKind) -> Result<(u64, u64)> {
        Ok((self.a.count(kind)?, self.b.count(kind)?))
    }

    /// Bulk insert. Backend A assigns the keys; backend B stores the same
    /// records under the same keys.
    pub fn insert_users(&mut self, mut users: Vec<User>) -> Result<BenchmarkResult> {
        check_batch(users.len())?;

        let ((), elapsed_a) = timed(|| self.a.insert_users(&mut users))?;
        let ((), elapsed_b) = timed(|| self.b.insert_users(&mut users))?;

        let result = self.finish(Operation::Insert, users.len(), elapsed_a, elapsed_b);
        Ok(result)
    }

    /// Bulk read of up to `limit` users. Zero is a valid, empty read.
    pub fn read_users(&mut self, limit: usize) -> Result<BenchmarkResult> {
        let (rows_a, elapsed_a) = timed(|| self.a.read_users(limit))?;
        let (rows_b, elapsed_b) = timed(|| self.b.read_users(limit))?;

        if rows_a.len() != rows_b.len() {
            warn!(
                "Read returned {} rows from {} but {} from {}",
                rows_a.len(),
                self.a.kind(),
                rows_b.len(),
                self.b.kind()
            );
        }

        Ok(self.finish(Operation::Read, limit, elapsed_a, elapsed_b))
    }

    /// Bulk conditional stock decrement.
    ///
    /// Both stores must hold at least one product per requested pair; the
    /// check runs before either store is touched. Pairs whose key does not
    /// exist are no-ops inside the stores.
    pub fn update_stock(&mut self, deltas: &[StockDelta]) -> Result<BenchmarkResult> {
        check_batch(deltas.len())?;
        check_available(&mut self.a, EntityKind::Products, deltas.len())?;
        check_available(&mut self.b, EntityKind::Products, deltas.len())?;

        let (applied_a, elapsed_a) = timed(|| self.a.decrement_stock(deltas))?;
        let (applied_b, elapsed_b) = timed(|| self.b.decrement_stock(deltas))?;

        if applied_a != applied_b {
            warn!(
                "Stock decrements diverged: {} applied {}, {} applied {}",
                self.a.kind(),
                applied_a,
                self.b.kind(),
                applied_b
            );
        }

        Ok(self.finish(Operation::Update, deltas.len(), elapsed_a, elapsed_b))
    }

    /// Draws `count` random decrements over existing products and runs
    /// [`Runner::update_stock`] with them.
    pub fn update_random_stock<R: Rng>(
        &mut self,
        count: usize,
        generator: &mut FakeDataGenerator<R>,
    ) -> Result<BenchmarkResult> {
        check_batch(count)?;
        check_available(&mut self.a, EntityKind::Products, count)?;
        check_available(&mut self.b, EntityKind::Products, count)?;

        let keys = self.a.keys(EntityKind::Products, count)?;
        let deltas = generator.stock_deltas(&keys, count);
        self.update_stock(&deltas)
    }

    /// Makes sure both stores hold at least `size` products. Calling it again
    /// with the same size does nothing.
    pub fn ensure_inventory<R: Rng>(
        &mut self,
        size: usize,
        generator: &mut FakeDataGenerator<R>,
    ) -> Result<InventoryReport> {
        check_batch_limit(size)?;
        let target = size as u64;
        let (mut have_a, have_b) = self.counts(EntityKind::Products)?;

        if have_a >= target && have_b >= target {
            return Ok(InventoryReport {
                requested: size,
                created: 0,
                resynced: false,
                total: have_a.min(have_b),
            });
        }

        let resynced = have_a != have_b;
        if resynced {
            warn!(
                "Inventory out of step ({} has {}, {} has {}); reseeding both",
                self.a.kind(),
                have_a,
                self.b.kind(),
                have_b
            );
            self.a.clear(EntityKind::Products)?;
            self.b.clear(EntityKind::Products)?;
            have_a = 0;
        }

        let missing = (target - have_a) as usize;
        let mut products = generator.products(missing)?;
        self.a.insert_products(&mut products)?;
        self.b.insert_products(&mut products)?;

        info!("Inventory seeded with {} products (target {})", missing, size);
        Ok(InventoryReport {
            requested: size,
            created: missing,
            resynced,
            total: target,
        })
    }

    /// Clears the given kinds from both stores.
    pub fn reset(&mut self, kinds: &[EntityKind]) -> Result<Vec<KindReset>> {
        let mut report = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let removed_a = self.a.clear(kind)?;
            let removed_b = self.b.clear(kind)?;
            info!(
                "Reset {}: removed {} from {}, {} from {}",
                kind,
                removed_a,
                self.a.kind(),
                removed_b,
                self.b.kind()
            );
            report.push(KindReset {
                kind,
                removed_a,
                removed_b,
            });
        }
        Ok(report)
    }

    fn finish(
        &self,
        operation: Operation,
        count: usize,
        elapsed_a: Duration,
        elapsed_b: Duration,
    ) -> BenchmarkResult {
        let result = BenchmarkResult::from_timings(
            operation,
            count,
            (self.a.kind(), elapsed_a),
            (self.b.kind(), elapsed_b),
        );
        info!(
            "{} x{}: {}={:.4}s {}={:.4}s winner={}",
            operation.label(),
            count,
            result.backend_a,
            result.elapsed_a,
            result.backend_b,
            result.elapsed_b,
            result.winner
        );
        result
    }
}
