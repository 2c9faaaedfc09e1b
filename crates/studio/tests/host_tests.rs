//! Integration tests for the composition root.

mod common;

use std::sync::Arc;
use std::time::Duration;

use easel_backend::api::GenerationBackend;
use easel_backend::reconnect::ReconnectConfig;
use easel_studio::config::StudioConfig;
use easel_studio::host::StudioHost;

use common::MockBackend;

fn test_host() -> Arc<StudioHost> {
    let config = StudioConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        results_capacity: 20,
        poll_interval: Duration::from_secs(60),
        reconnect: ReconnectConfig {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            multiplier: 2.0,
        },
    };
    let mock = Arc::new(MockBackend::default());
    StudioHost::with_backend(config, mock as Arc<dyn GenerationBackend>)
}

#[tokio::test]
async fn acquire_shares_one_controller() {
    let host = test_host();

    let first = host.acquire().await;
    let second = host.acquire().await;
    assert_eq!(host.consumers().await, 2);
    assert!(Arc::ptr_eq(first.controller(), second.controller()));

    first.release().await;
    assert_eq!(host.consumers().await, 1);
    second.release().await;
    assert_eq!(host.consumers().await, 0);
}

#[tokio::test]
async fn last_release_discards_the_controller() {
    let host = test_host();

    let handle = host.acquire().await;
    let original = Arc::clone(handle.controller());
    handle.release().await;

    // A fresh acquire after full release constructs a new controller.
    let handle = host.acquire().await;
    assert!(!Arc::ptr_eq(&original, handle.controller()));
    handle.release().await;
}

#[tokio::test]
async fn dropping_a_handle_releases_asynchronously() {
    let host = test_host();

    let handle = host.acquire().await;
    drop(handle);

    // The drop-path release runs as a spawned task.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.consumers().await, 0);
}
