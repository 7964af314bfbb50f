//! Caller-supplied provider credentials

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A credential field a provider may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Base URL of the API
    Base,
    /// API key or client id
    Key,
    /// Client secret
    Secret,
    /// Deployment or endpoint id
    Deployment,
    /// Model override
    Model,
}

/// Credentials for one provider.
///
/// Storage and encryption live outside the engine; this is the plain value
/// handed to a session.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Credentials {
    /// Base URL override
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base: String,

    /// API key (or OAuth2 client id)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    /// OAuth2 client secret
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,

    /// Deployment id substituted into the URL path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deployment: String,

    /// Model override when the conversation sets none
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,

    /// Model-name remapping table applied before the request is built
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub model_mapping: BTreeMap<String, String>,
}

impl Credentials {
    /// Create credentials holding only an API key
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// The value of a credential field
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Base => &self.base,
            Field::Key => &self.key,
            Field::Secret => &self.secret,
            Field::Deployment => &self.deployment,
            Field::Model => &self.model,
        }
    }

    /// Apply the remapping table to a model name
    pub fn map_model<'a>(&'a self, model: &'a str) -> &'a str {
        self.model_mapping
            .get(model)
            .map(String::as_str)
            .filter(|mapped| !mapped.trim().is_empty())
            .unwrap_or(model)
    }
}
