use std::time::Duration;

use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, Incoming, MqttOptions, Outgoing, QoS,
};
use thiserror::Error;
use tracing::{debug, info};

use netatmo2mqtt_common::MqttConfig;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode payload for {topic}: {source}")]
    Payload {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to publish to {topic}: {source}")]
    Client {
        topic: String,
        #[source]
        source: ClientError,
    },

    #[error("mqtt connection to {broker} failed: {source}")]
    Connection {
        broker: String,
        #[source]
        source: ConnectionError,
    },
}

/// Sink for one encoded reading on one topic.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Publishes over a fresh broker connection per message.
pub struct MqttPublisher {
    config: MqttConfig,
}

impl MqttPublisher {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(5));

        if let Some(user) = &self.config.username {
            let pass = self.config.password.clone().unwrap_or_default();
            options.set_credentials(user.clone(), pass);
        }
        options
    }

    fn broker(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

impl Publisher for MqttPublisher {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);

        client
            .publish(topic, QoS::AtMostOnce, self.config.retain, payload)
            .await
            .map_err(|source| PublishError::Client {
                topic: topic.to_string(),
                source,
            })?;
        client
            .disconnect()
            .await
            .map_err(|source| PublishError::Client {
                topic: topic.to_string(),
                source,
            })?;

        // Drive the connection until the queued publish and disconnect are written.
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    debug!(broker = %self.broker(), "mqtt connected");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                Ok(_) => {}
                Err(source) => {
                    return Err(PublishError::Connection {
                        broker: self.broker(),
                        source,
                    })
                }
            }
        }
    }
}

/// Logs what would be published without touching the broker.
pub struct DryRunPublisher;

impl Publisher for DryRunPublisher {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        info!(
            topic,
            payload = %String::from_utf8_lossy(&payload),
            "dry run, not publishing"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

    /// Bytes a fake broker saw on one connection, split at its CONNACK.
    struct Session {
        connect: Vec<u8>,
        after_connack: Vec<u8>,
    }

    /// Accepts `connections` clients one after another, acknowledges each
    /// CONNECT and records everything until the client hangs up.
    async fn fake_broker(connections: usize) -> (u16, JoinHandle<Vec<Session>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let mut sessions = Vec::new();
            for _ in 0..connections {
                let (mut socket, _) = listener.accept().await.unwrap();

                let mut connect = vec![0u8; 512];
                let read = socket.read(&mut connect).await.unwrap();
                connect.truncate(read);
                socket.write_all(&CONNACK_ACCEPTED).await.unwrap();

                let mut after_connack = Vec::new();
                socket.read_to_end(&mut after_connack).await.unwrap();
                sessions.push(Session {
                    connect,
                    after_connack,
                });
            }
            sessions
        });

        (port, handle)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    #[tokio::test]
    async fn test_each_publish_uses_its_own_connection() {
        let (port, broker) = fake_broker(2).await;
        let mut publisher = MqttPublisher::new(MqttConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..MqttConfig::default()
        });

        publisher
            .publish("home/living-room", br#"{"roomId":"R1"}"#.to_vec())
            .await
            .unwrap();
        publisher
            .publish("home/kitchen", br#"{"roomId":"R2"}"#.to_vec())
            .await
            .unwrap();

        let sessions = broker.await.unwrap();
        assert_eq!(sessions.len(), 2);

        for (session, topic) in sessions.iter().zip(["home/living-room", "home/kitchen"]) {
            assert!(contains(&session.connect, b"netatmo2mqtt"));
            // PUBLISH, QoS 0, retain clear
            assert_eq!(session.after_connack.first(), Some(&0x30));
            assert!(contains(&session.after_connack, topic.as_bytes()));
            // DISCONNECT closes the session
            assert!(session.after_connack.ends_with(&[0xE0, 0x00]));
        }
        assert!(contains(&sessions[0].after_connack, br#"{"roomId":"R1"}"#));
        assert!(contains(&sessions[1].after_connack, br#"{"roomId":"R2"}"#));
    }

    #[tokio::test]
    async fn test_retain_flag_and_client_id_reach_the_broker() {
        let (port, broker) = fake_broker(1).await;
        let mut publisher = MqttPublisher::new(MqttConfig {
            host: "127.0.0.1".to_string(),
            port,
            client_id: "attic-bridge".to_string(),
            retain: true,
            ..MqttConfig::default()
        });

        publisher
            .publish("netatmo2mqtt/attic", b"{}".to_vec())
            .await
            .unwrap();

        let sessions = broker.await.unwrap();
        assert!(contains(&sessions[0].connect, b"attic-bridge"));
        assert_eq!(sessions[0].after_connack.first(), Some(&0x31));
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_a_connection_error() {
        // Grab a free port and release it so nothing listens there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut publisher = MqttPublisher::new(MqttConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..MqttConfig::default()
        });

        let err = publisher
            .publish("netatmo2mqtt/kitchen", b"{}".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Connection { .. }));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }

    #[tokio::test]
    async fn test_dry_run_accepts_everything() {
        let mut publisher = DryRunPublisher;
        publisher
            .publish("netatmo2mqtt/office", br#"{"roomId":"R1"}"#.to_vec())
            .await
            .unwrap();
    }
}
