//! Wire shapes for the hypervisor control protocol: line-delimited JSON requests,
//! replies and unsolicited events. Payloads are kept as `serde_json::Value` and
//! matched structurally rather than through a typed schema, per the hypervisor's own
//! forward-compatibility contract -- the command vocabulary is external to this crate.
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct HvCommand {
    pub execute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl HvCommand {
    pub fn new(execute: impl Into<String>) -> Self {
        Self {
            execute: execute.into(),
            arguments: None,
        }
    }

    pub fn with_arguments(execute: impl Into<String>, arguments: Value) -> Self {
        Self {
            execute: execute.into(),
            arguments: Some(arguments),
        }
    }
}

/// A decoded line from the main channel: either a reply to the most recently issued
/// command, or an unsolicited event.
#[derive(Debug, Clone)]
pub enum HvLine {
    Reply(HvReply),
    Event(HvEvent),
}

#[derive(Debug, Clone)]
pub enum HvReply {
    Return(Value),
    Error(Value),
}

#[derive(Debug, Clone)]
pub struct HvEvent {
    pub name: String,
    pub data: Value,
    pub timestamp: Value,
}

impl HvEvent {
    /// Reassembles the event as a JSON subtree so it can be checked against a
    /// [`matches_pattern`] pattern built with [`event_name_pattern`] or
    /// [`migration_status_pattern`].
    pub fn as_value(&self) -> Value {
        serde_json::json!({ "event": self.name, "data": self.data })
    }
}

/// Parses one newline-delimited JSON line into a reply or an event.
pub fn parse_line(line: &str) -> Result<HvLine, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;

    if let Some(event) = value.get("event").and_then(Value::as_str) {
        return Ok(HvLine::Event(HvEvent {
            name: event.to_owned(),
            data: value.get("data").cloned().unwrap_or(Value::Null),
            timestamp: value.get("timestamp").cloned().unwrap_or(Value::Null),
        }));
    }

    if let Some(error) = value.get("error") {
        return Ok(HvLine::Reply(HvReply::Error(error.clone())));
    }

    Ok(HvLine::Reply(HvReply::Return(
        value.get("return").cloned().unwrap_or(Value::Null),
    )))
}

/// Structural subtree match used by [`crate::HypervisorChannel::wait_event`]: every
/// member of `pattern` must be present in `value` with an equal value. Extra members on
/// `value` are ignored, keeping the match forward-compatible with new hypervisor event
/// fields.
pub fn matches_pattern(value: &Value, pattern: &Value) -> bool {
    match (value, pattern) {
        (Value::Object(value_map), Value::Object(pattern_map)) => {
            pattern_map.iter().all(|(key, expected)| {
                value_map
                    .get(key)
                    .is_some_and(|actual| matches_pattern(actual, expected))
            })
        }
        _ => value == pattern,
    }
}

/// Convenience pattern for matching an event by name only, e.g. `event_name("RESUME")`.
pub fn event_name_pattern(name: &str) -> Value {
    serde_json::json!({ "event": name })
}

/// Convenience pattern for matching a `MIGRATION` event at a given `data.status`.
pub fn migration_status_pattern(status: &str) -> Value {
    serde_json::json!({ "event": "MIGRATION", "data": { "status": status } })
}
