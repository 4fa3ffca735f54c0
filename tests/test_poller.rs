mod common;
use common::*;

use std::sync::Arc;
use std::time::Duration;
use tristar_bridge::poller::{PollStats, Poller};
use tristar_bridge::prelude::*;
use tristar_bridge::tristar::FieldValue;

#[tokio::test]
async fn publishes_reading_to_every_sink() {
    common_setup();

    let channels = Channels::new();
    let mut to_database = channels.to_database.subscribe();
    let mut to_influx = channels.to_influx.subscribe();
    let mut to_datalog = channels.to_datalog.subscribe();

    let mut raw = Factory::raw_block();
    raw[24] = 16384;
    let poller = Poller::new(Arc::new(MockSource::new(raw.clone())), channels.clone());

    let reading = poller.poll_once().await.expect("reading");
    assert_eq!(reading.unit_id, 1);
    assert_eq!(reading.raw, raw);
    assert_eq!(reading.record.get("battery_voltage"), Some(FieldValue::Float(6.0)));

    assert_eq!(
        to_database.recv().await.unwrap(),
        database::ChannelData::Reading(Box::new(reading.clone()))
    );
    assert_eq!(
        to_influx.recv().await.unwrap(),
        influx::ChannelData::Reading(Box::new(reading.clone()))
    );
    assert_eq!(
        to_datalog.recv().await.unwrap(),
        datalog_writer::ChannelData::Reading(Box::new(reading))
    );
}

#[tokio::test]
async fn failures_skip_the_poll_only() {
    common_setup();

    let channels = Channels::new();
    let mut to_database = channels.to_database.subscribe();

    let mut bad_state = Factory::raw_block();
    bad_state[50] = 42;
    let source = MockSource::with_responses(
        Factory::charging_block(),
        vec![
            Err(anyhow!("connection refused")),
            Ok(vec![12, 0, 5, 0]),
            Ok(bad_state),
        ],
    );
    let poller = Poller::new(Arc::new(source), channels.clone());

    assert!(poller.poll_once().await.is_none());
    assert!(poller.poll_once().await.is_none());
    assert!(poller.poll_once().await.is_none());
    let reading = poller.poll_once().await.expect("fourth poll succeeds");

    assert_eq!(
        poller.stats(),
        PollStats {
            polls: 4,
            fetch_failures: 1,
            decode_failures: 2,
            readings_published: 1,
        }
    );

    // only the good reading reached the sink
    assert_eq!(
        to_database.recv().await.unwrap(),
        database::ChannelData::Reading(Box::new(reading))
    );
    assert!(to_database.try_recv().is_err());
}

#[tokio::test]
async fn polls_on_trigger_until_shutdown() {
    common_setup();

    let channels = Channels::new();
    let mut to_datalog = channels.to_datalog.subscribe();
    let poller = Poller::new(Arc::new(MockSource::new(Factory::charging_block())), channels.clone());

    let handle = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.start().await })
    };

    // the poller may not have subscribed yet, so keep triggering until a reading shows up
    let message = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let _ = channels.to_poller.send(scheduler::ChannelData::Poll);
            if let Ok(Ok(message)) = tokio::time::timeout(Duration::from_millis(20), to_datalog.recv()).await {
                return message;
            }
        }
    })
    .await
    .expect("reading within timeout");

    match message {
        datalog_writer::ChannelData::Reading(reading) => {
            assert_eq!(reading.record.get("charge_state"), Some(FieldValue::Integer(5)));
        }
        other => panic!("unexpected {:?}", other),
    }

    poller.stop();
    handle.await.unwrap().unwrap();
    assert!(poller.stats().readings_published >= 1);
}
