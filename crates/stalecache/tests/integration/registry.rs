use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use stalecache::config::Config;
use stalecache::{CacheRegistry, CallOptions};

use crate::Generator;

fn registry(yaml: &str) -> CacheRegistry {
    stalecache_test::setup();
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    CacheRegistry::from_config(&config)
}

#[tokio::test]
async fn test_caches_are_shared_by_name() {
    let registry = registry(
        r#"
        backend:
          type: memory
        "#,
    );

    registry
        .cache("users")
        .set("1", "Ferris", &CallOptions::new())
        .await
        .unwrap();

    assert_eq!(
        registry.cache("users").get::<String>("1").await.unwrap(),
        "Ferris"
    );
    // every cache gets its own backend
    assert_eq!(
        registry.cache("teams").get::<Value>("1").await.unwrap(),
        Value::Null
    );
}

#[tokio::test]
async fn test_refreshes_are_shared_by_name() {
    let registry = registry(
        r#"
        backend:
          type: memory
        "#,
    );
    let generator = Generator::new();

    let first = registry.cache("slow");
    let second = registry.cache("slow");
    assert!(Arc::ptr_eq(&first, &second));

    let options = CallOptions::new();
    let (a, b) = tokio::join!(
        first.get_or_else::<Value, _, _>(
            "key",
            generator.value(Duration::from_millis(50), "a"),
            &options,
        ),
        second.get_or_else::<Value, _, _>(
            "key",
            generator.value(Duration::from_millis(50), "b"),
            &options,
        ),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_named_defaults() {
    let registry = registry(
        r#"
        defaults:
          fresh_for: 50ms
        backend:
          type: memory
        caches:
          sticky:
            defaults:
              fresh_for: 0s
        "#,
    );

    let cache = registry.cache("sticky");
    cache.set("key", "value", &CallOptions::new()).await.unwrap();
    let envelope = cache.get_wrapped("key").await.unwrap().unwrap();
    assert_eq!(envelope.fresh_until, None);

    let cache = registry.default_cache();
    cache.set("key", "value", &CallOptions::new()).await.unwrap();
    let envelope = cache.get_wrapped("key").await.unwrap().unwrap();
    assert!(envelope.fresh_until.is_some());
}

#[tokio::test]
async fn test_dropped_caches_start_over() {
    let registry = registry(
        r#"
        backend:
          type: memory
        "#,
    );

    registry
        .cache("users")
        .set("1", &json!({"name": "Ferris"}), &CallOptions::new())
        .await
        .unwrap();
    assert_eq!(registry.known_caches(), vec!["users"]);

    let dropped = registry.drop_cache("users").unwrap();
    assert!(registry.known_caches().is_empty());

    // a dropped cache keeps working for its holders
    assert_eq!(
        dropped.get::<Value>("1").await.unwrap(),
        json!({"name": "Ferris"})
    );
    assert_eq!(
        registry.cache("users").get::<Value>("1").await.unwrap(),
        Value::Null
    );

    registry.drop_all();
    assert!(registry.known_caches().is_empty());
}
