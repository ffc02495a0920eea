//! Command execution

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use yggctl_client::{aio::Session, Endpoint, SessionOptions, OPERATIONS};
use yggctl_protocol::Arguments;
use yggctl_utils::{Config, Result, YggctlError};

use crate::cli::Cli;

/// Run the command described by `cli` and print its result
pub async fn execute(cli: Cli, config: &Config) -> Result<()> {
    if cli.list {
        for operation in OPERATIONS {
            println!("{}", operation);
        }
        return Ok(());
    }

    let operation = cli
        .operation
        .ok_or_else(|| YggctlError::config("No operation given"))?;
    let arguments = parse_arguments(&cli.arguments)?;

    let endpoint = Endpoint::parse(&config.resolve_endpoint(cli.endpoint.as_deref())?)?;
    let mut options = SessionOptions::from_config(config);
    if let Some(secs) = cli.timeout {
        options = options.with_timeout(parse_timeout(secs)?);
    }

    debug!(%endpoint, operation = %operation, "Invoking admin operation");

    let mut session = Session::with_options(endpoint, options);
    let result = session.call(&operation, arguments).await;
    session.close().await;

    println!("{}", render(&result?, cli.compact)?);
    Ok(())
}

/// Turn `key=value` words into call arguments
///
/// Values that parse as JSON keep their type (`port=3` sends a number,
/// `target=null` sends null); anything else is sent as a string.
fn parse_arguments(words: &[String]) -> Result<Arguments> {
    let mut arguments = Arguments::new();
    for word in words {
        let (key, raw) = word
            .split_once('=')
            .ok_or_else(|| YggctlError::config(format!("Expected key=value, got '{}'", word)))?;
        if key.is_empty() {
            return Err(YggctlError::config(format!("Missing key in '{}'", word)));
        }

        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));
        arguments
            .insert(key, &value)
            .map_err(|e| YggctlError::encoding(key, e.to_string()))?;
    }
    Ok(arguments)
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(YggctlError::config(format!(
            "Timeout must be a positive number of seconds, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| YggctlError::config(format!("Invalid timeout {}: {}", secs, e)))
}

fn render(payload: &Value, compact: bool) -> Result<String> {
    let rendered = if compact {
        serde_json::to_string(payload)
    } else {
        serde_json::to_string_pretty(payload)
    };
    rendered.map_err(|e| YggctlError::internal(format!("Failed to render payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_arguments_typed_values() {
        let arguments = parse_arguments(&words(&[
            "port=3",
            "uri=tcp://10.0.0.1:12345",
            "target=null",
            "coords=[1 3]",
        ]))
        .unwrap();

        assert_eq!(arguments.get("port"), Some(&json!(3)));
        assert_eq!(arguments.get("uri"), Some(&json!("tcp://10.0.0.1:12345")));
        assert_eq!(arguments.get("target"), Some(&Value::Null));
        assert_eq!(arguments.get("coords"), Some(&json!("[1 3]")));
    }

    #[test]
    fn test_parse_arguments_keeps_order() {
        let arguments = parse_arguments(&words(&["subnet=300::/64", "box_pub_key=9a8b"])).unwrap();
        let keys: Vec<&String> = arguments.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["subnet", "box_pub_key"]);
    }

    #[test]
    fn test_parse_arguments_value_may_contain_equals() {
        let arguments = parse_arguments(&words(&["uri=tcp://h:1?key=abc"])).unwrap();
        assert_eq!(arguments.get("uri"), Some(&json!("tcp://h:1?key=abc")));
    }

    #[test]
    fn test_parse_arguments_rejects_malformed_words() {
        for word in ["novalue", "=3"] {
            assert!(matches!(
                parse_arguments(&words(&[word])),
                Err(YggctlError::Config(_))
            ));
        }
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(1.5).unwrap(), Duration::from_millis(1500));
        assert!(parse_timeout(0.0).is_err());
        assert!(parse_timeout(-1.0).is_err());
        assert!(parse_timeout(f64::NAN).is_err());
    }

    #[test]
    fn test_render_modes() {
        let payload = json!({"self": {"coords": "[]"}});
        assert_eq!(render(&payload, true).unwrap(), r#"{"self":{"coords":"[]"}}"#);
        assert!(render(&payload, false).unwrap().contains('\n'));
    }
}
