//! Post-processing of keyed payloads
//!
//! Most `get*` replies carry one object keyed by address, port or subnet,
//! e.g. `{"peers": {"200:1::1": {"port": 1, "uptime": 12.6}}}`. These helpers
//! flatten such a section into records and decode the fields whose raw form
//! is awkward to read.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use yggctl_utils::{Result, YggctlError};

/// One entry of a keyed section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// The key the entry was listed under
    pub key: String,
    /// Raw fields, with the key inserted under the requested field name
    pub fields: Map<String, Value>,
    /// `uptime` seconds, rounded to whole seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<Duration>,
    /// `last_seen` seconds-ago, as a point in time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// `proto://endpoint` when both fields are present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
}

impl Record {
    /// Numeric field as u64, accepting integral floats
    pub fn counter(&self, field: &str) -> u64 {
        self.fields.get(field).and_then(as_counter).unwrap_or(0)
    }
}

/// Byte totals across switch peers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Traffic {
    pub sent: u64,
    pub received: u64,
}

/// Flatten `payload[section]` into records sorted by key
pub fn keyed_records(payload: &Value, section: &str, key_field: &str) -> Result<Vec<Record>> {
    keyed_records_at(payload, section, key_field, Utc::now())
}

fn keyed_records_at(
    payload: &Value,
    section: &str,
    key_field: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Record>> {
    let entries = payload
        .get(section)
        .ok_or_else(|| YggctlError::protocol(format!("Missing '{}' section in response", section)))?
        .as_object()
        .ok_or_else(|| YggctlError::protocol(format!("Section '{}' is not an object", section)))?;

    let mut records: Vec<Record> = entries
        .iter()
        .map(|(key, entry)| build_record(key, entry, key_field, now))
        .collect();
    records.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(records)
}

fn build_record(key: &str, entry: &Value, key_field: &str, now: DateTime<Utc>) -> Record {
    let mut fields = match entry {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    };
    fields.insert(key_field.to_string(), Value::String(key.to_string()));

    let uptime = fields
        .get("uptime")
        .and_then(Value::as_f64)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs(secs.round() as u64));

    let last_seen = fields
        .get("last_seen")
        .and_then(Value::as_f64)
        .and_then(|secs| seen_at(now, secs));

    let full_address = match (fields.get("proto"), fields.get("endpoint")) {
        (Some(Value::String(proto)), Some(Value::String(endpoint))) => {
            Some(format!("{}://{}", proto, endpoint))
        }
        _ => None,
    };

    Record {
        key: key.to_string(),
        fields,
        uptime,
        last_seen,
        full_address,
    }
}

/// `now` minus `secs_ago`; `None` when the value is unusable or out of range
fn seen_at(now: DateTime<Utc>, secs_ago: f64) -> Option<DateTime<Utc>> {
    if !secs_ago.is_finite() || secs_ago < 0.0 {
        return None;
    }
    let millis = secs_ago * 1000.0;
    if millis > i64::MAX as f64 {
        return None;
    }
    let ago = chrono::Duration::try_milliseconds(millis as i64)?;
    now.checked_sub_signed(ago)
}

fn as_counter(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
}

/// Sum `bytes_sent` and `bytes_recvd` over switch peer records
pub fn transit_traffic(records: &[Record]) -> Traffic {
    records.iter().fold(Traffic::default(), |total, record| Traffic {
        sent: total.sent.saturating_add(record.counter("bytes_sent")),
        received: total.received.saturating_add(record.counter("bytes_recvd")),
    })
}

const UNITS: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Render a byte count with binary units, e.g. `1.5KiB`
pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, UNITS[unit])
}
