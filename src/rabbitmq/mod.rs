// src/rabbitmq/mod.rs
// Broker connector for the per-server evolution queue

pub mod errors;
pub mod topology;
pub mod amqp_client;
pub mod connector;

// Re-export specific items to simplify imports elsewhere
pub use amqp_client::{BrokerChannel, BrokerTransport, LapinChannel, LapinTransport};
pub use connector::{AmqpConnector, AmqpSettings};
pub use errors::{RabbitMQError, Result};
pub use topology::{ServerTopology, EXCHANGE_NAME, QUEUE_PREFIX};
