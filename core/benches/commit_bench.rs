//! Criterion benchmark harness: cost of one committed insert batch under
//! durable and relaxed SQLite sync settings.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use luw_core::durability::{JournalMode, Synchronous};
use luw_core::generator::FakeDataGenerator;
use luw_core::store::sqlite::{SqliteOptions, SqlitePool};
use luw_core::store::Backend;
use std::time::Duration;

const BATCH_SIZES: [usize; 3] = [1, 100, 1000];

fn sync_levels() -> Vec<(&'static str, Synchronous)> {
    vec![
        ("full", Synchronous::Full),
        ("normal", Synchronous::Normal),
        ("off", Synchronous::Off),
    ]
}

fn bench_commit(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut generator = FakeDataGenerator::seeded(0xC0FFEE);

    for (label, synchronous) in sync_levels() {
        let pool = SqlitePool::new(SqliteOptions {
            path: dir.path().join(format!("{label}.db")),
            synchronous,
            journal_mode: JournalMode::Wal,
        });
        let mut store = pool.get().expect("Failed to open store");

        let mut group = c.benchmark_group(format!("commit/{label}"));
        group.measurement_time(Duration::from_secs(10));
        group.sample_size(30);

        for size in BATCH_SIZES {
            let batch = generator.users(size).expect("Failed to generate users");
            group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
                b.iter(|| {
                    let mut users = batch.clone();
                    store.insert_users(&mut users).expect("insert failed");
                });
            });
        }

        group.finish();
    }
}

criterion_group!(benches, bench_commit);
criterion_main!(benches);
