use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stalecache::{CacheError, CallOptions};

use crate::{delay, setup_memory_cache};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    roles: Vec<String>,
    manager: Option<Box<User>>,
}

#[tokio::test]
async fn test_set_get() {
    let cache = setup_memory_cache(|_| {});

    cache.set("key", "value", &CallOptions::new()).await.unwrap();
    assert_eq!(cache.get::<String>("key").await.unwrap(), "value");

    cache.set("key", &42, &CallOptions::new()).await.unwrap();
    assert_eq!(cache.get::<u64>("key").await.unwrap(), 42);
}

#[tokio::test]
async fn test_structured_values() {
    let cache = setup_memory_cache(|_| {});
    let user = User {
        id: 2,
        name: "Ferris".into(),
        roles: vec!["admin".into(), "crab".into()],
        manager: Some(Box::new(User {
            id: 1,
            name: "Graydon".into(),
            roles: vec![],
            manager: None,
        })),
    };

    cache.set("user:2", &user, &CallOptions::new()).await.unwrap();
    assert_eq!(cache.get::<User>("user:2").await.unwrap(), user);

    // the payload is kept as plain JSON inside the envelope
    let envelope = cache.get_wrapped("user:2").await.unwrap().unwrap();
    assert_eq!(envelope.value["manager"]["name"], json!("Graydon"));
    assert_eq!(envelope.fresh_until, None);
}

#[tokio::test]
async fn test_unset() {
    let cache = setup_memory_cache(|_| {});

    cache.set("key", "value", &CallOptions::new()).await.unwrap();
    cache.unset("key").await.unwrap();
    assert_eq!(cache.get::<Value>("key").await.unwrap(), Value::Null);

    // unsetting a missing key is fine
    cache.unset("missing").await.unwrap();
}

#[tokio::test]
async fn test_missing_as_option() {
    let cache = setup_memory_cache(|_| {});

    assert_eq!(cache.get::<Option<u32>>("key").await.unwrap(), None);
    let err = cache.get::<u32>("key").await.unwrap_err();
    assert!(matches!(err, CacheError::Malformed(_)));
}

#[tokio::test]
async fn test_honors_expire() {
    let cache = setup_memory_cache(|_| {});

    let options = CallOptions::new().expire(Duration::from_millis(100));
    cache.set("expiring", "value", &options).await.unwrap();
    cache.set("forever", "value", &CallOptions::new()).await.unwrap();
    assert_eq!(cache.get::<String>("expiring").await.unwrap(), "value");

    delay(200).await;

    assert_eq!(cache.get::<Option<String>>("expiring").await.unwrap(), None);
    assert_eq!(cache.get::<String>("forever").await.unwrap(), "value");
}

#[tokio::test]
async fn test_stale_values_are_kept() {
    let cache = setup_memory_cache(|defaults| defaults.fresh_for = Duration::from_millis(50));

    cache.set("key", "value", &CallOptions::new()).await.unwrap();
    delay(100).await;

    // staleness alone never removes a value
    let envelope = cache.get_wrapped("key").await.unwrap().unwrap();
    assert!(envelope.is_stale(chrono::Utc::now()));
    assert_eq!(cache.get::<String>("key").await.unwrap(), "value");
}
