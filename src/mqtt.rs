use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rumqttc::{Client, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;

use crate::config::IngestArgs;
use crate::reading::{Reading, RecordKind};
use crate::store::ReadingStore;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Decode one device payload. A missing timestamp means "received at `now`".
pub fn decode_payload(payload: &[u8], now: DateTime<Utc>) -> Result<Reading> {
    let mut value: serde_json::Value =
        serde_json::from_slice(payload).context("Payload is not valid JSON")?;
    if let Some(obj) = value.as_object_mut() {
        let missing = obj.get("timestamp").map_or(true, |t| t.is_null());
        if missing {
            obj.insert("timestamp".to_string(), serde_json::json!(now));
        }
    }
    serde_json::from_value(value).context("Payload is not a reading")
}

/// Subscribe to the reading topic and append every decoded reading to the
/// raw store. Runs until the process is stopped.
pub fn ingest(args: &IngestArgs, store: &ReadingStore) -> Result<()> {
    let mut opts = MqttOptions::new(&args.mqtt_client_id, &args.mqtt_host, args.mqtt_port);
    opts.set_keep_alive(Duration::from_secs(60));

    let (client, mut connection) = Client::new(opts, 10);

    // rumqttc reconnects on the next poll after an error
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                match decode_payload(&publish.payload, Utc::now()) {
                    Ok(reading) => {
                        if let Err(e) = store.append(RecordKind::Raw, &reading) {
                            error!("Failed to store reading from {}: {:#}", publish.topic, e);
                        } else {
                            info!("Stored reading for {} at {}", reading.user_id, reading.timestamp);
                        }
                    }
                    Err(e) => warn!("Dropping payload on {}: {:#}", publish.topic, e),
                }
            }
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                // subscriptions do not survive a clean-session reconnect
                client
                    .try_subscribe(&args.mqtt_topic, QoS::AtLeastOnce)
                    .context("Failed to queue MQTT subscribe")?;
                info!(
                    "Subscribed to {} on {}:{}",
                    args.mqtt_topic, args.mqtt_host, args.mqtt_port
                );
            }
            Ok(_) => continue,
            Err(e) => {
                error!("MQTT connection error: {}", e);
                std::thread::sleep(RECONNECT_DELAY);
            }
        }
    }

    Ok(())
}
