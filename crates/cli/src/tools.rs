//! Builtin tools offered with `--tools`.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use session::{StaticRegistry, ToolOutput};
use wcore::{InputSchema, Tool};

#[derive(Deserialize, Default)]
struct TimeParams {
    /// Return a UNIX timestamp instead
    #[serde(default)]
    timestamp: bool,
}

fn time_tool() -> Tool {
    Tool::new(
        "local--time",
        "Gets the current UTC time in ISO 8601 format.",
        InputSchema::default().property(
            "timestamp",
            json!({ "type": "boolean", "description": "Return a UNIX timestamp instead" }),
            false,
        ),
    )
}

fn time(args: Value) -> ToolOutput {
    let params: TimeParams = serde_json::from_value(args).unwrap_or_default();
    let now = Utc::now();
    if params.timestamp {
        ToolOutput::ok(now.timestamp().to_string())
    } else {
        ToolOutput::ok(now.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }
}

/// A registry holding the builtin tools.
pub fn builtin() -> StaticRegistry {
    let registry = StaticRegistry::new();
    registry.register(time_tool(), |args| async move { time(args) });
    registry
}
