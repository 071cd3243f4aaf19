use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use std::env;

use crate::config::{self, AppConfig};

pub const RABBITMQ_ENABLED: &str = "RABBITMQ_ENABLED";
pub const RABBITMQ_URI: &str = "RABBITMQ_URI";
pub const RABBITMQ_EVENTS: &str = "RABBITMQ_EVENTS";
pub const SERVER_URL: &str = "SERVER_URL";
pub const SERVER_NAME: &str = "SERVER_NAME";

/// Config file (if any) overridden by the environment and `.env`
pub fn load() -> Result<AppConfig> {
    dotenv().ok();

    let mut config = config::load_config()?;
    apply_overrides(&mut config, |key| env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Overwrite config values with whatever `lookup` finds
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(RABBITMQ_ENABLED) {
        config.rabbitmq.enabled =
            parse_bool(&val).with_context(|| format!("Invalid value for {}", RABBITMQ_ENABLED))?;
    }
    if let Some(val) = lookup(RABBITMQ_URI) {
        config.rabbitmq.uri = val;
    }
    if let Some(val) = lookup(RABBITMQ_EVENTS) {
        config.rabbitmq.events = parse_list(&val);
    }
    if let Some(val) = lookup(SERVER_URL) {
        config.server.url = val;
    }
    if let Some(val) = lookup(SERVER_NAME) {
        config.server.name = val;
    }
    Ok(())
}

fn parse_bool(val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{}'", other)),
    }
}

fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = AppConfig::default();
        config.rabbitmq.uri = "amqp://from-file".to_string();
        config.server.url = "file.example.com".to_string();

        apply_overrides(
            &mut config,
            lookup_from(&[
                ("RABBITMQ_ENABLED", "true"),
                ("RABBITMQ_URI", "amqp://from-env"),
                ("SERVER_URL", "https://api.example.com"),
            ]),
        )
        .unwrap();

        assert!(config.rabbitmq.enabled);
        assert_eq!(config.rabbitmq.uri, "amqp://from-env");
        assert_eq!(config.server.url, "https://api.example.com");
        assert_eq!(config.server.name, "evolution");
    }

    #[test]
    fn test_missing_variables_leave_config_untouched() {
        let mut config = AppConfig::default();
        config.rabbitmq.uri = "amqp://from-file".to_string();

        apply_overrides(&mut config, lookup_from(&[])).unwrap();

        assert!(!config.rabbitmq.enabled);
        assert_eq!(config.rabbitmq.uri, "amqp://from-file");
    }

    #[test]
    fn test_events_are_split_on_commas() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[("RABBITMQ_EVENTS", "MESSAGES_UPSERT, QRCODE_UPDATED,,")]),
        )
        .unwrap();

        assert_eq!(config.rabbitmq.events, vec!["MESSAGES_UPSERT", "QRCODE_UPDATED"]);
    }

    #[test]
    fn test_invalid_boolean_is_rejected() {
        let mut config = AppConfig::default();
        let err = apply_overrides(&mut config, lookup_from(&[("RABBITMQ_ENABLED", "maybe")]))
            .unwrap_err();

        assert!(err.to_string().contains("RABBITMQ_ENABLED"));
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("").unwrap());
    }
}
