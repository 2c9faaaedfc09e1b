//! Headless consumer: attach to a backend, print notifications and
//! connection transitions until interrupted.
//!
//! Configuration comes from the environment (see
//! [`StudioConfig::from_env`]); `RUST_LOG` controls tracing output.

use anyhow::Result;

use easel_studio::config::StudioConfig;
use easel_studio::host::StudioHost;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = StudioHost::new(StudioConfig::from_env());
    let handle = host.acquire().await;
    handle.controller().initialize().await;

    let mut notifications = handle.subscribe_notifications();
    let mut connection = handle.watch_connection();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = connection.borrow().clone();
                println!(
                    "[connection] {} (attempts: {}, downtime: {}ms)",
                    snapshot.event, snapshot.attempts, snapshot.downtime_ms,
                );
            }
            notification = notifications.recv() => {
                if let Ok(notification) = notification {
                    println!("[notification] {}", notification.message());
                }
            }
        }
    }

    handle.release().await;
    Ok(())
}
