mod common;
use common::*;

use std::sync::Arc;
use std::time::Duration;
use tristar_bridge::config::Config;
use tristar_bridge::prelude::*;

#[tokio::test]
async fn runs_until_shutdown_and_writes_datalog() -> Result<()> {
    common_setup();

    let dir = tempfile::TempDir::new()?;
    let datalog = dir.path().join("tristar.jsonl");
    let yaml = format!(
        "tristar:\n  address: 127.0.0.1\n  poll_interval: 2\n  read_timeout: 1\ndatalog_file: {}\n",
        datalog.display()
    );
    let config = ConfigWrapper::from_config(Config::from_yaml(&yaml)?);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let source = Arc::new(MockSource::new(Factory::charging_block()));
    let app = tokio::spawn(tristar_bridge::app_with_source(shutdown_rx, config, source));

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let written = std::fs::read_to_string(&datalog)
                .map(|contents| contents.lines().count() > 0)
                .unwrap_or(false);
            if written {
                break;
            }
        }
    })
    .await?;

    shutdown_tx.send(())?;
    let stats = app.await??;
    assert!(stats.polls >= 1);
    assert_eq!(stats.fetch_failures, 0);
    assert_eq!(stats.decode_failures, 0);

    let contents = std::fs::read_to_string(&datalog)?;
    let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap_or_default())?;
    assert_eq!(first["record"]["charge_state"], 5);
    assert_eq!(first["raw_data"]["50"], "0x0005");

    Ok(())
}

#[tokio::test]
async fn poll_in_flight_at_shutdown_still_reaches_sinks() -> Result<()> {
    common_setup();

    let dir = tempfile::TempDir::new()?;
    let datalog = dir.path().join("tristar.jsonl");
    let yaml = format!(
        "tristar:\n  address: 127.0.0.1\n  poll_interval: 60\n  read_timeout: 5\ndatalog_file: {}\n",
        datalog.display()
    );
    let config = ConfigWrapper::from_config(Config::from_yaml(&yaml)?);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let source = Arc::new(SlowSource::new(Factory::charging_block(), Duration::from_millis(500)));
    let app = tokio::spawn(tristar_bridge::app_with_source(shutdown_rx, config, source));

    // the first poll starts immediately and is still fetching when shutdown arrives
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(())?;
    let stats = app.await??;

    assert_eq!(stats.polls, 1);
    assert_eq!(stats.readings_published, 1);

    let contents = std::fs::read_to_string(&datalog)?;
    assert_eq!(contents.lines().count(), 1);

    Ok(())
}
