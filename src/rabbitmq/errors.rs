// src/rabbitmq/errors.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RabbitMQError {
    #[error("RabbitMQ connection error: {0}")]
    ConnectionError(String),

    #[error("RabbitMQ channel error: {0}")]
    ChannelError(String),

    #[error("Failed to declare {kind} '{name}': {reason}")]
    DeclareError {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Failed to bind queue '{queue}' to '{exchange}' with key '{routing_key}': {reason}")]
    BindError {
        queue: String,
        exchange: String,
        routing_key: String,
        reason: String,
    },

    #[error("Failed to delete {kind} '{name}': {reason}")]
    DeleteError {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("AMQP channel has not been initialized")]
    NotInitialized,

    #[error("Cannot derive a queue name from server URL '{0}'")]
    InvalidServerUrl(String),
}

// Custom Result type for RabbitMQ operations
pub type Result<T> = std::result::Result<T, RabbitMQError>;
