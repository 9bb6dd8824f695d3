use async_trait::async_trait;
use futures_util::future::join_all;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, instrument};

use crate::config::TransportConfig;
use crate::error::{BatchFailure, TransportError};
use crate::message::Message;

use super::{BatchSender, BrokerClient, Connector};

/// Opens Kafka clients backed by librdkafka
#[derive(Debug, Default, Clone, Copy)]
pub struct KafkaConnector;

#[async_trait]
impl Connector for KafkaConnector {
    type Client = KafkaClient;

    #[instrument(skip(self, config))]
    async fn connect(
        &self,
        brokers: &[String],
        config: &TransportConfig,
    ) -> Result<KafkaClient, TransportError> {
        let bootstrap = brokers.join(",");
        let producer: FutureProducer = client_config(&bootstrap, config)
            .create()
            .map_err(TransportError::Client)?;

        // librdkafka connects lazily, fetching metadata forces the handshake
        // and authentication to happen now
        let metadata = producer.clone();
        let timeout = config.connect_timeout;
        blocking::unblock(move || metadata.client().fetch_metadata(None, timeout).map(|_| ()))
            .await
            .map_err(|source| TransportError::Unreachable {
                brokers: bootstrap,
                source,
            })?;

        Ok(KafkaClient { producer })
    }
}

/// One Kafka client. Senders share its connections and buffers.
#[derive(Clone)]
pub struct KafkaClient {
    producer: FutureProducer,
}

impl BrokerClient for KafkaClient {
    type Sender = KafkaSender;

    fn sender(&self) -> Result<KafkaSender, TransportError> {
        Ok(KafkaSender {
            producer: self.producer.clone(),
        })
    }
}

pub struct KafkaSender {
    producer: FutureProducer,
}

#[async_trait]
impl BatchSender for KafkaSender {
    async fn send_batch(&self, batch: &[Message]) -> Result<(), BatchFailure> {
        let mut failed = 0;
        let mut cause = None;

        let mut deliveries = Vec::with_capacity(batch.len());
        for message in batch {
            let record: FutureRecord<'_, (), [u8]> =
                FutureRecord::to(&message.topic).payload(message.value.as_ref());
            match self.producer.send_result(record) {
                Ok(delivery) => deliveries.push(delivery),
                Err((err, _)) => {
                    failed += 1;
                    cause = Some(err.to_string());
                }
            }
        }

        for report in join_all(deliveries).await {
            match report {
                Ok(Ok(_)) => {}
                Ok(Err((err, _))) => {
                    failed += 1;
                    cause = Some(err.to_string());
                }
                Err(_) => {
                    failed += 1;
                    cause = Some("delivery report dropped".to_string());
                }
            }
        }

        if failed == 0 {
            Ok(())
        } else {
            debug!(failed, "batch rejected");
            Err(BatchFailure::new(failed, cause.unwrap_or_default()))
        }
    }
}

fn client_config(bootstrap: &str, config: &TransportConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", bootstrap)
        .set("compression.type", config.compression.as_str())
        .set("acks", config.acks.as_str())
        .set("batch.num.messages", config.flush_max_messages.to_string())
        .set(
            "message.timeout.ms",
            config.delivery_timeout.as_millis().to_string(),
        )
        .set(
            "security.protocol",
            security_protocol(config.tls, config.sasl.is_some()),
        );

    if let Some(sasl) = &config.sasl {
        client_config
            .set("sasl.mechanism", "PLAIN")
            .set("sasl.username", &sasl.username)
            .set("sasl.password", &sasl.password);
    }

    client_config
}

fn security_protocol(tls: bool, sasl: bool) -> &'static str {
    match (tls, sasl) {
        (false, false) => "plaintext",
        (true, false) => "ssl",
        (false, true) => "sasl_plaintext",
        (true, true) => "sasl_ssl",
    }
}
