//! Integration tests: the relational store against real database files.

use luw_core::durability::{DurabilityMode, JournalMode, Synchronous};
use luw_core::generator::FakeDataGenerator;
use luw_core::records::{EntityKind, Product, StockDelta};
use luw_core::store::sqlite::{SqliteOptions, SqlitePool, SqliteStore};
use luw_core::store::Backend;
use tempfile::TempDir;

fn open_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = SqlitePool::new(SqliteOptions::durable(dir.path().join("bench.db")));
    let store = pool.get().expect("open store");
    (dir, store)
}

#[test]
fn insert_assigns_sequential_keys() {
    let (_dir, mut store) = open_store();
    let mut users = FakeDataGenerator::seeded(1).users(50).unwrap();

    store.insert_users(&mut users).unwrap();

    let keys: Vec<u64> = users.iter().map(|u| u.id.unwrap()).collect();
    assert_eq!(keys, (1..=50).collect::<Vec<_>>());
    assert_eq!(store.count(EntityKind::Users).unwrap(), 50);
}

#[test]
fn inserted_records_read_back_unchanged() {
    let (_dir, mut store) = open_store();
    let mut users = FakeDataGenerator::seeded(2).users(20).unwrap();
    store.insert_users(&mut users).unwrap();

    let read = store.read_users(100).unwrap();
    assert_eq!(read, users);
}

#[test]
fn read_limits() {
    let (_dir, mut store) = open_store();
    let mut users = FakeDataGenerator::seeded(3).users(10).unwrap();
    store.insert_users(&mut users).unwrap();

    assert!(store.read_users(0).unwrap().is_empty());
    assert_eq!(store.read_users(4).unwrap().len(), 4);
    assert_eq!(store.read_users(usize::MAX).unwrap().len(), 10);
}

#[test]
fn keys_survive_reopen_and_are_not_reused_after_clear() {
    let dir = tempfile::tempdir().unwrap();
    let pool = SqlitePool::new(SqliteOptions::durable(dir.path().join("reopen.db")));

    {
        let mut store = pool.get().unwrap();
        let mut products = FakeDataGenerator::seeded(4).products(5).unwrap();
        store.insert_products(&mut products).unwrap();
    }

    let mut store = pool.get().unwrap();
    assert_eq!(store.count(EntityKind::Products).unwrap(), 5);
    assert_eq!(store.clear(EntityKind::Products).unwrap(), 5);
    assert!(store.read_products(10).unwrap().is_empty());

    let mut more = FakeDataGenerator::seeded(5).products(2).unwrap();
    store.insert_products(&mut more).unwrap();
    assert_eq!(more[0].id, Some(6));
}

#[test]
fn decrement_is_conditional() {
    let (_dir, mut store) = open_store();
    let mut products = vec![
        Product::new("Lamp", 1999, 5).unwrap(),
        Product::new("Desk", 25000, 1).unwrap(),
    ];
    store.insert_products(&mut products).unwrap();
    let lamp = products[0].id.unwrap();
    let desk = products[1].id.unwrap();

    let applied = store
        .decrement_stock(&[
            StockDelta { key: lamp, delta: 2 },
            StockDelta { key: desk, delta: 2 },
            StockDelta { key: 404, delta: 1 },
            StockDelta { key: lamp, delta: 3 },
        ])
        .unwrap();
    assert_eq!(applied, 2);

    let stock: Vec<u32> = store
        .read_products(10)
        .unwrap()
        .iter()
        .map(Product::stock)
        .collect();
    assert_eq!(stock, vec![0, 1]);
}

#[test]
fn clear_only_touches_one_kind() {
    let (_dir, mut store) = open_store();
    let mut generator = FakeDataGenerator::seeded(6);
    store.insert_users(&mut generator.users(3).unwrap()).unwrap();
    store
        .insert_products(&mut generator.products(4).unwrap())
        .unwrap();

    assert_eq!(store.clear(EntityKind::Users).unwrap(), 3);
    assert_eq!(store.count(EntityKind::Users).unwrap(), 0);
    assert_eq!(store.count(EntityKind::Products).unwrap(), 4);
    assert_eq!(store.clear(EntityKind::Users).unwrap(), 0);
}

#[test]
fn journal_settings_decide_durability() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        (Synchronous::Full, JournalMode::Wal, DurabilityMode::Durable),
        (Synchronous::Extra, JournalMode::Delete, DurabilityMode::Durable),
        (Synchronous::Normal, JournalMode::Wal, DurabilityMode::Volatile),
        (Synchronous::Off, JournalMode::Wal, DurabilityMode::Volatile),
        (Synchronous::Full, JournalMode::Off, DurabilityMode::Volatile),
    ];

    for (i, (synchronous, journal_mode, expected)) in cases.into_iter().enumerate() {
        let options = SqliteOptions {
            path: dir.path().join(format!("case{i}.db")),
            synchronous,
            journal_mode,
        };
        let mut store = SqlitePool::new(options).get().unwrap();
        assert_eq!(
            store.durability().unwrap(),
            expected,
            "{synchronous:?}/{journal_mode:?}"
        );
    }
}
