//! Unit tests for the tarball cache

use super::*;
use std::sync::atomic::AtomicUsize;

fn key(version: &str) -> CacheKey {
    CacheKey::new("@jsr/scope__pkg", version)
}

fn tarball(contents: &[u8]) -> Tarball {
    Tarball::from_bytes(contents.to_vec())
}

fn cache_with(ttl: Duration, capacity: usize) -> TarballCache {
    TarballCache::new(ttl, NonZeroUsize::new(capacity).unwrap())
}

#[test]
fn test_cache_key_display() {
    assert_eq!(key("1.2.3").to_string(), "tarball/@jsr/scope__pkg/1.2.3");
}

#[test]
fn test_get_absent_key() {
    let cache = TarballCache::default();
    assert!(cache.get(&key("1.0.0")).is_none());
}

#[test]
fn test_put_and_get() {
    let cache = TarballCache::default();
    cache.put(key("1.0.0"), tarball(b"one"));

    assert_eq!(cache.get(&key("1.0.0")), Some(tarball(b"one")));
    assert!(cache.get(&key("2.0.0")).is_none());
}

#[test]
fn test_put_overwrites() {
    let cache = TarballCache::default();
    cache.put(key("1.0.0"), tarball(b"one"));
    cache.put(key("1.0.0"), tarball(b"two"));

    assert_eq!(cache.get(&key("1.0.0")), Some(tarball(b"two")));
    assert_eq!(cache.stats().entries, 1);
}

#[test]
fn test_capacity_evicts_least_recently_used() {
    let cache = cache_with(DEFAULT_TTL, 2);
    cache.put(key("1.0.0"), tarball(b"one"));
    cache.put(key("2.0.0"), tarball(b"two"));

    // Touch 1.0.0 so 2.0.0 becomes the eviction candidate
    assert!(cache.get(&key("1.0.0")).is_some());
    cache.put(key("3.0.0"), tarball(b"three"));

    assert!(cache.get(&key("1.0.0")).is_some());
    assert!(cache.get(&key("2.0.0")).is_none());
    assert!(cache.get(&key("3.0.0")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let cache = cache_with(Duration::from_secs(60), 8);
    cache.put(key("1.0.0"), tarball(b"one"));

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.get(&key("1.0.0")).is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get(&key("1.0.0")).is_none());
    assert_eq!(cache.stats().entries, 0);
}

#[tokio::test]
async fn test_try_get_builds_on_miss_then_hits() {
    let cache = TarballCache::default();
    let builds = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let counter = builds.clone();
        let result = cache
            .try_get(key("1.0.0"), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(tarball(b"built"))
            })
            .await
            .unwrap();
        assert_eq!(result, tarball(b"built"));
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_try_get_rebuilds_after_expiry() {
    let cache = cache_with(Duration::from_secs(3600), 8);
    let builds = Arc::new(AtomicUsize::new(0));

    let build = |builds: Arc<AtomicUsize>| {
        move || async move {
            let n = builds.fetch_add(1, Ordering::SeqCst);
            Ok(tarball(format!("build-{}", n).as_bytes()))
        }
    };

    let first = cache.try_get(key("1.0.0"), build(builds.clone())).await.unwrap();
    tokio::time::advance(Duration::from_secs(3601)).await;
    let second = cache.try_get(key("1.0.0"), build(builds.clone())).await.unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_ne!(first, second);
    assert_eq!(cache.get(&key("1.0.0")), Some(second));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_build() {
    let cache = TarballCache::default();
    let builds = Arc::new(AtomicUsize::new(0));

    let slow_build = |builds: Arc<AtomicUsize>| {
        move || async move {
            builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(tarball(b"shared"))
        }
    };

    let (first, second) = tokio::join!(
        cache.try_get(key("1.0.0"), slow_build(builds.clone())),
        cache.try_get(key("1.0.0"), slow_build(builds.clone())),
    );

    assert_eq!(first.unwrap(), tarball(b"shared"));
    assert_eq!(second.unwrap(), tarball(b"shared"));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().in_flight, 0);
    assert_eq!(cache.stats().entries, 1);
}

#[tokio::test]
async fn test_failed_build_is_not_cached() {
    let cache = TarballCache::default();

    let result = cache
        .try_get(key("1.0.0"), || async {
            Err(RelayError::ManifestNotFound {
                package: "@scope/pkg".to_string(),
            })
        })
        .await;

    assert!(matches!(result, Err(RelayError::ManifestNotFound { .. })));
    assert!(cache.get(&key("1.0.0")).is_none());
    assert_eq!(cache.stats().in_flight, 0);

    let result = cache
        .try_get(key("1.0.0"), || async { Ok(tarball(b"recovered")) })
        .await;
    assert_eq!(result.unwrap(), tarball(b"recovered"));
}

#[tokio::test(start_paused = true)]
async fn test_joined_failure_reaches_every_caller() {
    let cache = TarballCache::default();

    let failing = || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Err(RelayError::ManifestNotFound {
            package: "@scope/pkg".to_string(),
        })
    };

    let (first, second) = tokio::join!(
        cache.try_get(key("1.0.0"), failing),
        cache.try_get(key("1.0.0"), failing),
    );

    for result in [first, second] {
        let error = result.unwrap_err();
        assert!(matches!(error.root(), RelayError::ManifestNotFound { .. }));
    }
    assert_eq!(cache.stats().builds, 1);
    assert_eq!(cache.stats().entries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired() {
    let cache = cache_with(Duration::from_secs(10), 8);
    cache.put(key("1.0.0"), tarball(b"one"));
    tokio::time::advance(Duration::from_secs(5)).await;
    cache.put(key("2.0.0"), tarball(b"two"));
    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.stats().entries, 1);
    assert!(cache.get(&key("2.0.0")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_build_completes_after_caller_is_dropped() {
    let cache = TarballCache::default();
    let completed = Arc::new(AtomicUsize::new(0));

    let counter = completed.clone();
    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        cache.try_get(key("1.0.0"), move || async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(tarball(b"finished"))
        }),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(cache.stats().in_flight, 1);

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().in_flight, 0);
    assert_eq!(cache.get(&key("1.0.0")), Some(tarball(b"finished")));
}

#[tokio::test]
async fn test_panicking_build_is_retired() {
    let cache = TarballCache::default();

    let result = cache
        .try_get(key("1.0.0"), || async {
            let outcome: CacheResult<Tarball> = Ok(tarball(b"never stored"));
            if outcome.is_ok() {
                panic!("build exploded");
            }
            outcome
        })
        .await;
    assert!(matches!(result, Err(RelayError::BuildIncomplete { .. })));
    assert_eq!(cache.stats().in_flight, 0);

    let result = cache
        .try_get(key("1.0.0"), || async { Ok(tarball(b"retried")) })
        .await;
    assert_eq!(result.unwrap(), tarball(b"retried"));
}
