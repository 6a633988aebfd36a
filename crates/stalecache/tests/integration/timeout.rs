use std::time::{Duration, Instant};

use serde_json::{Value, json};
use stalecache::CallOptions;

use crate::{Generator, SlowBackend, delay, setup_slow_cache};

const BACKEND_DELAY: Duration = Duration::from_millis(150);

#[tokio::test]
async fn test_read_times_out() {
    let (cache, _backend) = setup_slow_cache(BACKEND_DELAY, Duration::from_millis(50));

    let start = Instant::now();
    let err = cache.get::<Value>("key").await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "operation timed out");
    assert!(start.elapsed() < Duration::from_millis(120));
}

#[tokio::test]
async fn test_read_within_timeout() {
    let (cache, _backend) = setup_slow_cache(BACKEND_DELAY, Duration::from_millis(250));

    let value = cache.get::<String>("key").await.unwrap();
    assert_eq!(value, SlowBackend::GET_RESULT);
}

#[tokio::test]
async fn test_no_timeout() {
    let (cache, backend) = setup_slow_cache(BACKEND_DELAY, Duration::ZERO);

    let value = cache.get::<String>("key").await.unwrap();
    assert_eq!(value, SlowBackend::GET_RESULT);

    cache.set("key", "value", &CallOptions::new()).await.unwrap();
    assert_eq!(backend.writes(), 1);
}

#[tokio::test]
async fn test_timed_out_write_completes() {
    let (cache, backend) = setup_slow_cache(BACKEND_DELAY, Duration::from_millis(50));

    let err = cache
        .set("key", "value", &CallOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(backend.writes(), 0);

    // the write was abandoned, not cancelled
    delay(200).await;
    assert_eq!(backend.writes(), 1);
}

#[tokio::test]
async fn test_per_call_write_timeout() {
    let (cache, _backend) = setup_slow_cache(BACKEND_DELAY, Duration::from_millis(50));

    let options = CallOptions::new().timeout(Duration::from_millis(250));
    cache.set("key", "value", &options).await.unwrap();
}

#[tokio::test]
async fn test_get_or_else_with_slow_backend() {
    let (cache, backend) = setup_slow_cache(BACKEND_DELAY, Duration::from_millis(50));
    let generator = Generator::new();

    let value: Value = cache
        .get_or_else(
            "key",
            generator.value(Duration::ZERO, "my-value"),
            &CallOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(value, json!("my-value"));
    assert_eq!(generator.calls(), 1);

    delay(200).await;
    assert_eq!(backend.writes(), 1);
}

#[tokio::test]
async fn test_generators_are_not_timed_out() {
    let (cache, _backend) = setup_slow_cache(BACKEND_DELAY, Duration::from_millis(50));
    let generator = Generator::new();

    let value: Value = cache
        .get_or_else(
            "key",
            generator.value(Duration::from_millis(150), "slow value"),
            &CallOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(value, json!("slow value"));
}
