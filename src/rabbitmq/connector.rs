// src/rabbitmq/connector.rs

use tracing::{debug, error, info};
use uuid::Uuid;

use lapin::ConnectionProperties;

use super::amqp_client::{BrokerChannel, BrokerTransport, LapinTransport};
use super::errors::{RabbitMQError, Result};
use super::topology::{normalize_event_name, ServerTopology};

const CONNECTION_NAME: &str = "evolution-amqp";

/// Connection settings for the connector
#[derive(Debug, Clone)]
pub struct AmqpSettings {
    /// Broker connection string
    pub uri: String,

    /// Public URL of this server; only used to name its queue
    pub server_url: String,
}

/// Owns the broker channel and keeps the server's exchange/queue declared.
///
/// The connector starts uninitialized. [`AmqpConnector::initialize`] opens the
/// connection and declares the topology; everything else needs that to have
/// succeeded first.
pub struct AmqpConnector<T: BrokerTransport = LapinTransport> {
    id: String,
    transport: T,
    uri: String,
    topology: ServerTopology,
    channel: Option<T::Channel>,
}

impl AmqpConnector<LapinTransport> {
    pub fn from_settings(settings: AmqpSettings) -> Result<Self> {
        let properties =
            ConnectionProperties::default().with_connection_name(CONNECTION_NAME.into());
        Self::new(LapinTransport::new(properties), settings)
    }
}

impl<T: BrokerTransport> AmqpConnector<T> {
    /// Fails with `InvalidServerUrl` if no queue name can be derived
    pub fn new(transport: T, settings: AmqpSettings) -> Result<Self> {
        let topology = ServerTopology::for_server_url(&settings.server_url)?;
        let id = format!("connector-{}", &Uuid::new_v4().simple().to_string()[..8]);

        debug!(connector_id = %id, queue = %topology.queue_name(), "Creating AMQP connector");

        Ok(Self {
            id,
            transport,
            uri: settings.uri,
            topology,
            channel: None,
        })
    }

    /// Open a fresh connection and declare the topology on it.
    ///
    /// A previously opened handle is closed first. If any declaration fails the
    /// new connection is closed again and the connector stays uninitialized.
    pub async fn initialize(&mut self) -> Result<()> {
        if let Some(previous) = self.channel.take() {
            debug!(connector_id = %self.id, "Closing previous AMQP connection");
            self.close_quietly(previous).await;
        }

        info!(connector_id = %self.id, "Connecting to RabbitMQ");
        let channel = self.transport.open(&self.uri).await?;

        if let Err(e) = self.declare_topology(&channel).await {
            self.close_quietly(channel).await;
            return Err(e);
        }

        self.channel = Some(channel);
        Ok(())
    }

    /// The open channel, or `None` before `initialize` succeeded
    pub fn channel(&self) -> Option<&T::Channel> {
        self.channel.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.channel.is_some()
    }

    pub fn topology(&self) -> &ServerTopology {
        &self.topology
    }

    /// Redeclare the server's exchange, queue and binding once per event.
    ///
    /// Every event maps onto the same single queue; the normalized event name
    /// is only logged.
    pub async fn init_queues<S: AsRef<str>>(&self, instance_name: &str, events: &[S]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let channel = self.require_channel()?;

        for event in events {
            let event_name = normalize_event_name(event.as_ref());
            debug!(
                connector_id = %self.id,
                instance = instance_name,
                event = %event_name,
                "Declaring server queue for event"
            );

            channel.declare_exchange(&self.topology.exchange).await?;
            info!(connector_id = %self.id, "queue name: {}", self.topology.queue_name());
            self.declare_server_queue(channel).await?;
        }

        Ok(())
    }

    /// Delete the server's queue and the shared exchange
    pub async fn remove_queues<S: AsRef<str>>(&self, instance_name: &str, events: &[S]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let channel = self.require_channel()?;
        let exchange = &self.topology.exchange;

        channel.declare_exchange(exchange).await?;
        channel.delete_queue(self.topology.queue_name()).await?;
        channel.delete_exchange(&exchange.name).await?;

        info!(
            connector_id = %self.id,
            instance = instance_name,
            queue = %self.topology.queue_name(),
            exchange = %exchange.name,
            "Removed AMQP queue and exchange"
        );
        Ok(())
    }

    /// Close the channel and its connection, if open
    pub async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            info!(connector_id = %self.id, "Closing AMQP connection");
            channel.close().await?;
        }
        Ok(())
    }

    async fn declare_topology(&self, channel: &T::Channel) -> Result<()> {
        channel.declare_exchange(&self.topology.exchange).await?;
        info!(connector_id = %self.id, "AMQP initialized");

        self.declare_server_queue(channel).await?;
        info!(connector_id = %self.id, "queue name: {}", self.topology.queue_name());
        Ok(())
    }

    async fn close_quietly(&self, channel: T::Channel) {
        if let Err(e) = channel.close().await {
            error!(connector_id = %self.id, "Failed to close AMQP connection: {}", e);
        }
    }

    fn require_channel(&self) -> Result<&T::Channel> {
        self.channel.as_ref().ok_or(RabbitMQError::NotInitialized)
    }

    async fn declare_server_queue(&self, channel: &T::Channel) -> Result<()> {
        let topology = &self.topology;

        channel.declare_queue(&topology.queue).await?;
        channel
            .bind_queue(
                topology.queue_name(),
                &topology.exchange.name,
                &topology.binding_key,
            )
            .await
    }
}
