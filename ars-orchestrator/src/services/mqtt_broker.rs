//! MQTT broker connection
//!
//! One rumqttc client serves both directions: the orchestrator publishes on
//! it, and the event-loop task forwards every message received on the raw
//! topic into the inbound queue consumed by the event listener.

use super::broker::{Broker, BrokerError};
use ars_common::config::BrokerConfig;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event as MqttEvent, EventLoop, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const REQUEST_CHANNEL_CAPACITY: usize = 64;
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

pub struct MqttBroker {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttBroker {
    /// Create the client and spawn the task driving its event loop
    ///
    /// Connection happens in the background; the raw topic is (re)subscribed
    /// on every ConnAck so reconnects keep receiving events. The task ends
    /// when the receiving side of `inbound` is dropped.
    pub fn connect(config: &BrokerConfig, inbound: mpsc::Sender<Vec<u8>>) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
        options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        info!(
            host = %config.host,
            port = config.port,
            raw_topic = %config.raw_topic,
            "Connecting to MQTT broker"
        );

        let handle = tokio::spawn(drive_event_loop(
            event_loop,
            client.clone(),
            config.raw_topic.clone(),
            connected.clone(),
            inbound,
        ));

        (Self { client, connected }, handle)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::Unreachable(
                "not connected to MQTT broker".to_string(),
            ));
        }

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| BrokerError::Unreachable(e.to_string()))
    }
}

async fn drive_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    raw_topic: String,
    connected: Arc<AtomicBool>,
    inbound: mpsc::Sender<Vec<u8>>,
) {
    let mut reconnect_delay = Duration::from_secs(1);

    loop {
        match event_loop.poll().await {
            Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::SeqCst);
                reconnect_delay = Duration::from_secs(1);
                info!("Connected to MQTT broker");

                // try_subscribe: the request queue is drained by this very loop
                if let Err(e) = client.try_subscribe(raw_topic.as_str(), QoS::AtLeastOnce) {
                    error!(topic = %raw_topic, error = %e, "Failed to subscribe to raw topic");
                }
            }
            Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                if publish.topic != raw_topic {
                    debug!(topic = %publish.topic, "Ignoring message on unexpected topic");
                    continue;
                }
                debug!(bytes = publish.payload.len(), "Raw event received");
                if inbound.send(publish.payload.to_vec()).await.is_err() {
                    info!("Inbound queue closed, stopping MQTT event loop");
                    return;
                }
            }
            Ok(MqttEvent::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                warn!("Broker closed the connection");
            }
            Ok(_) => {}
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                warn!(
                    error = %e,
                    retry_in_ms = reconnect_delay.as_millis() as u64,
                    "MQTT connection error"
                );
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
            }
        }
    }
}
