// src/rabbitmq/amqp_client.rs

use async_trait::async_trait;
use lapin::options::{
    ExchangeDeclareOptions, ExchangeDeleteOptions, QueueBindOptions, QueueDeclareOptions,
    QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use tracing::debug;

use super::errors::{RabbitMQError, Result};
use super::topology::{ExchangeSpec, QueueSpec};

const REPLY_SUCCESS: u16 = 200;

/// Opens a connection plus one channel on it
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    type Channel: BrokerChannel;

    async fn open(&self, amqp_uri: &str) -> Result<Self::Channel>;
}

/// The subset of channel operations the connector issues
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn declare_exchange(&self, exchange: &ExchangeSpec) -> Result<()>;

    async fn declare_queue(&self, queue: &QueueSpec) -> Result<()>;

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<()>;

    async fn delete_queue(&self, queue: &str) -> Result<()>;

    async fn delete_exchange(&self, exchange: &str) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct LapinTransport {
    properties: ConnectionProperties,
}

impl LapinTransport {
    pub fn new(properties: ConnectionProperties) -> Self {
        Self { properties }
    }
}

#[async_trait]
impl BrokerTransport for LapinTransport {
    type Channel = LapinChannel;

    async fn open(&self, amqp_uri: &str) -> Result<Self::Channel> {
        let connection = Connection::connect(amqp_uri, self.properties.clone())
            .await
            .map_err(|e| RabbitMQError::ConnectionError(format!("Failed to connect: {}", e)))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| RabbitMQError::ChannelError(format!("Failed to create channel: {}", e)))?;

        debug!(channel_id = channel.id(), "Opened AMQP channel");

        Ok(LapinChannel {
            connection,
            channel,
        })
    }
}

/// A lapin channel together with the connection that owns it
pub struct LapinChannel {
    connection: Connection,
    channel: Channel,
}

impl LapinChannel {
    pub fn inner(&self) -> &Channel {
        &self.channel
    }
}

#[async_trait]
impl BrokerChannel for LapinChannel {
    async fn declare_exchange(&self, exchange: &ExchangeSpec) -> Result<()> {
        self.channel
            .exchange_declare(
                &exchange.name,
                exchange.kind.clone(),
                ExchangeDeclareOptions {
                    durable: exchange.durable,
                    auto_delete: exchange.auto_delete,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| RabbitMQError::DeclareError {
                kind: "exchange",
                name: exchange.name.clone(),
                reason: e.to_string(),
            })
    }

    async fn declare_queue(&self, queue: &QueueSpec) -> Result<()> {
        let declared = self
            .channel
            .queue_declare(
                &queue.name,
                QueueDeclareOptions {
                    durable: queue.durable,
                    auto_delete: queue.auto_delete,
                    ..QueueDeclareOptions::default()
                },
                queue.arguments(),
            )
            .await
            .map_err(|e| RabbitMQError::DeclareError {
                kind: "queue",
                name: queue.name.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            queue = %queue.name,
            messages = declared.message_count(),
            consumers = declared.consumer_count(),
            "Queue declared"
        );
        Ok(())
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<()> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| RabbitMQError::BindError {
                queue: queue.to_string(),
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        let purged = self
            .channel
            .queue_delete(queue, QueueDeleteOptions::default())
            .await
            .map_err(|e| RabbitMQError::DeleteError {
                kind: "queue",
                name: queue.to_string(),
                reason: e.to_string(),
            })?;

        debug!(queue, purged, "Queue deleted");
        Ok(())
    }

    async fn delete_exchange(&self, exchange: &str) -> Result<()> {
        self.channel
            .exchange_delete(exchange, ExchangeDeleteOptions::default())
            .await
            .map_err(|e| RabbitMQError::DeleteError {
                kind: "exchange",
                name: exchange.to_string(),
                reason: e.to_string(),
            })
    }

    async fn close(&self) -> Result<()> {
        self.channel
            .close(REPLY_SUCCESS, "Closing channel")
            .await
            .map_err(|e| RabbitMQError::ChannelError(e.to_string()))?;

        self.connection
            .close(REPLY_SUCCESS, "Closing connection")
            .await
            .map_err(|e| RabbitMQError::ConnectionError(e.to_string()))
    }
}
