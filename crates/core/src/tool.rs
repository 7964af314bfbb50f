//! Tool abstractions

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The separator between the client and the tool in a namespaced name.
pub const NAMESPACE_SEPARATOR: &str = "--";

/// A provider-neutral tool descriptor
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Tool {
    /// The namespaced name of the tool (`<client>--<tool>`)
    pub name: CompactString,

    /// The description of the tool
    #[serde(default)]
    pub description: String,

    /// The input schema of the tool
    #[serde(rename = "inputSchema", alias = "input_schema", default)]
    pub input_schema: InputSchema,
}

impl Tool {
    /// Create a new tool
    pub fn new(
        name: impl Into<CompactString>,
        description: impl Into<String>,
        input_schema: InputSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// The JSON schema of a tool's input
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InputSchema {
    /// The schema type, always `object` for tool inputs
    #[serde(rename = "type", default = "object")]
    pub kind: CompactString,

    /// The properties of the input object
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// The names of required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Add a property to the schema
    pub fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            kind: object(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

fn object() -> CompactString {
    CompactString::const_new("object")
}

/// A tool call issued by the model, sealed and ready to dispatch
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ToolCall {
    /// The ID of the tool call
    pub id: CompactString,

    /// The stream index of the tool call
    #[serde(default, skip_serializing)]
    pub index: u32,

    /// The namespaced name of the tool
    pub name: CompactString,

    /// The raw argument text as streamed by the model
    pub arguments: String,
}

impl ToolCall {
    /// Split the namespaced name into `(client, tool)`.
    ///
    /// Names without a separator have an empty client.
    pub fn split_name(&self) -> (&str, &str) {
        match self.name.split_once(NAMESPACE_SEPARATOR) {
            Some((client, tool)) => (client, tool),
            None => ("", self.name.as_str()),
        }
    }

    /// Parse the arguments as a JSON document.
    ///
    /// Blank arguments parse as an empty object.
    pub fn parse_arguments(&self) -> serde_json::Result<Value> {
        let trimmed = self.arguments.trim();
        if trimmed.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(trimmed)
    }
}
