use std::sync::Arc;
use std::time::Duration;

use freshstack::cache::{CacheConfig, FreshnessCache, KvStore, ManualClock, generate_key};
use freshstack::infra::file_store::FileStore;
use serde_json::json;
use tempfile::TempDir;
use time::macros::datetime;

fn padded(tag: &str) -> serde_json::Value {
    json!(format!("{tag}{}", "x".repeat(100)))
}

#[test]
fn entries_survive_reopening_the_store() {
    let dir = TempDir::new().expect("tempdir");

    let cache = FreshnessCache::new(
        FileStore::open(dir.path(), None).expect("open store"),
        CacheConfig::default(),
    )
    .expect("valid config");
    cache.set("ro_api_get_summary", &json!({"kits": 3}));
    drop(cache);

    let reopened = FreshnessCache::new(
        FileStore::open(dir.path(), None).expect("reopen store"),
        CacheConfig::default(),
    )
    .expect("valid config");
    let entry = reopened.get("ro_api_get_summary").expect("persisted");
    assert_eq!(entry.value, json!({"kits": 3}));
    assert!(entry.is_fresh);
    assert_eq!(reopened.keys(), vec!["ro_api_get_summary"]);
}

#[test]
fn quota_pressure_sweeps_stale_entries_and_retries() {
    let dir = TempDir::new().expect("tempdir");
    let clock = ManualClock::new(datetime!(2025-03-01 9:00 UTC));
    let cache = FreshnessCache::with_clock(
        FileStore::open(dir.path(), Some(300)).expect("open store"),
        CacheConfig::default(),
        Arc::new(clock.clone()),
    )
    .expect("valid config");

    clock.rewind(Duration::from_secs(25 * 60 * 60));
    cache.set("old", &padded("old"));
    clock.advance(Duration::from_secs(25 * 60 * 60));
    assert!(cache.get("old").expect("written").is_stale);

    cache.set("a", &padded("a"));
    cache.set("b", &padded("b"));

    assert!(cache.get("old").is_none(), "stale entry swept to make room");
    assert_eq!(cache.get("a").expect("kept").value, padded("a"));
    assert_eq!(cache.get("b").expect("written after sweep").value, padded("b"));
}

#[test]
fn clear_leaves_foreign_keys_on_disk() {
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(FileStore::open(dir.path(), None).expect("open store"));
    store.set_item("theme", "dark").expect("foreign write");

    let cache = FreshnessCache::new(Arc::clone(&store), CacheConfig::default())
        .expect("valid config");
    cache.set("one", &json!(1));
    cache.set("two", &json!(2));
    cache.clear();

    assert!(cache.keys().is_empty());
    assert_eq!(store.keys().expect("list keys"), vec!["theme"]);
    assert_eq!(
        store.get_item("theme").expect("read"),
        Some("dark".to_string())
    );
}

#[test]
fn long_cache_keys_round_trip_through_the_file_store() {
    let dir = TempDir::new().expect("tempdir");
    let cache = FreshnessCache::new(
        FileStore::open(dir.path(), None).expect("open store"),
        CacheConfig::default(),
    )
    .expect("valid config");
    let key = generate_key(
        "orders",
        [
            ("customer", "northwind-wholesale-distribution-cooperative-east"),
            ("start", "2025-06-01"),
            ("end", "2025-06-30"),
            ("status", "open,pending,partially-shipped,back-ordered"),
            ("strain", "blue-dream-and-other-long-product-line-names-here"),
        ],
    );
    assert!(key.len() >= 200, "key is {} bytes", key.len());

    cache.set(&key, &json!({"orders": 12}));

    let entry = cache.get(&key).expect("long key cached");
    assert_eq!(entry.value, json!({"orders": 12}));
    assert_eq!(cache.keys(), vec![key]);
}
