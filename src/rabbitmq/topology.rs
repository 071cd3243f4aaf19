// src/rabbitmq/topology.rs
//! The fixed exchange/queue layout every server instance declares.

use lapin::types::{AMQPValue, FieldTable};
use lapin::ExchangeKind;

use super::errors::{RabbitMQError, Result};

pub const EXCHANGE_NAME: &str = "evolution_exchange";

/// Prefix of the per-server receive queue. Spelling matches the queues
/// already present on deployed brokers.
pub const QUEUE_PREFIX: &str = "recieve_";

const QUEUE_TYPE_ARGUMENT: &str = "x-queue-type";

/// Exchange declaration parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeSpec {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
    pub auto_delete: bool,
}

impl ExchangeSpec {
    /// The durable direct exchange shared by all instances
    pub fn evolution() -> Self {
        Self {
            name: EXCHANGE_NAME.to_string(),
            kind: ExchangeKind::Direct,
            durable: true,
            auto_delete: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueType {
    Quorum,
}

impl QueueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Quorum => "quorum",
        }
    }
}

/// Queue declaration parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub queue_type: QueueType,
}

impl QueueSpec {
    /// Declaration arguments as sent to the broker
    pub fn arguments(&self) -> FieldTable {
        let mut args = FieldTable::default();
        args.insert(
            QUEUE_TYPE_ARGUMENT.into(),
            AMQPValue::LongString(self.queue_type.as_str().into()),
        );
        args
    }
}

/// Queue and binding derived from the server URL
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTopology {
    pub exchange: ExchangeSpec,
    pub queue: QueueSpec,
    pub binding_key: String,
}

impl ServerTopology {
    pub fn for_server_url(server_url: &str) -> Result<Self> {
        let binding_key = binding_key_for(server_url)?;

        Ok(Self {
            exchange: ExchangeSpec::evolution(),
            queue: QueueSpec {
                name: format!("{}{}", QUEUE_PREFIX, binding_key),
                durable: true,
                auto_delete: false,
                queue_type: QueueType::Quorum,
            },
            binding_key,
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.queue.name
    }
}

/// Derive the routing key for a server URL.
///
/// HTTPS URLs yield the first label of the hostname
/// (`https://api.example.com` -> `api`); anything else has its first `:`
/// replaced with `_` (`0.0.0.0:8080` -> `0.0.0.0_8080`).
pub fn binding_key_for(server_url: &str) -> Result<String> {
    if server_url.contains("https") {
        let host = server_url
            .split("https://")
            .nth(1)
            .ok_or_else(|| RabbitMQError::InvalidServerUrl(server_url.to_string()))?;

        // split always yields at least one item
        Ok(host.split('.').next().unwrap_or_default().to_string())
    } else {
        Ok(server_url.replacen(':', "_", 1))
    }
}

/// `MESSAGES_UPSERT` -> `messages.upsert`
pub fn normalize_event_name(event: &str) -> String {
    event.replace('_', ".").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_url_uses_first_host_label() {
        let topology = ServerTopology::for_server_url("https://host.example.com").unwrap();
        assert_eq!(topology.binding_key, "host");
        assert_eq!(topology.queue_name(), "recieve_host");
    }

    #[test]
    fn test_https_url_with_path_and_port() {
        assert_eq!(
            binding_key_for("https://api.evolution.dev:443/manager").unwrap(),
            "api"
        );
    }

    #[test]
    fn test_plain_address_replaces_first_colon() {
        let topology = ServerTopology::for_server_url("0.0.0.0:8080").unwrap();
        assert_eq!(topology.binding_key, "0.0.0.0_8080");
        assert_eq!(topology.queue_name(), "recieve_0.0.0.0_8080");
    }

    #[test]
    fn test_http_url_only_replaces_scheme_colon() {
        assert_eq!(
            binding_key_for("http://localhost:8080").unwrap(),
            "http_//localhost:8080"
        );
    }

    #[test]
    fn test_https_without_scheme_separator_is_rejected() {
        let err = binding_key_for("https-gateway").unwrap_err();
        assert!(matches!(err, RabbitMQError::InvalidServerUrl(url) if url == "https-gateway"));
    }

    #[test]
    fn test_exchange_is_durable_direct() {
        let exchange = ExchangeSpec::evolution();
        assert_eq!(exchange.name, "evolution_exchange");
        assert_eq!(exchange.kind, ExchangeKind::Direct);
        assert!(exchange.durable);
        assert!(!exchange.auto_delete);
    }

    #[test]
    fn test_queue_requests_quorum_type() {
        let topology = ServerTopology::for_server_url("0.0.0.0:8080").unwrap();
        assert!(topology.queue.durable);
        assert!(!topology.queue.auto_delete);

        let args = topology.queue.arguments();
        let queue_type = args
            .inner()
            .iter()
            .find(|(key, _)| key.as_str() == "x-queue-type")
            .map(|(_, value)| value.clone());
        assert_eq!(queue_type, Some(AMQPValue::LongString("quorum".into())));
    }

    #[test]
    fn test_event_names_are_dotted_and_lowercase() {
        assert_eq!(normalize_event_name("MESSAGES_UPSERT"), "messages.upsert");
        assert_eq!(normalize_event_name("QRCODE_UPDATED"), "qrcode.updated");
        assert_eq!(normalize_event_name("send.message"), "send.message");
    }
}
