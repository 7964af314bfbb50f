//! Transport-neutral HTTP request descriptor.
//!
//! Builders produce an [`HttpRequest`]; only a [`crate::Transport`] turns it
//! into bytes on the wire. Header constructors mirror the three credential
//! placements vendors use: bearer, custom header and query parameter.

use reqwest::{
    Method,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use url::Url;
use wcore::{Auth, Error, Result};

/// A fully prepared HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The request method.
    pub method: Method,
    /// The absolute URL, query included.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// A JSON `POST` request.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }

    /// A `GET` request expecting an event stream.
    pub fn get(url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        Self {
            method: Method::GET,
            url: url.into(),
            headers,
            body: None,
        }
    }

    /// Add `Authorization: Bearer <key>`.
    pub fn bearer(self, key: &str) -> Result<Self> {
        self.header(header::AUTHORIZATION.as_str(), &format!("Bearer {key}"))
    }

    /// Add a custom header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| Error::Config(format!("invalid header name {name}: {e}")))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| Error::Config(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Append a query parameter to the URL.
    pub fn query(mut self, name: &str, value: &str) -> Result<Self> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid url {}: {e}", self.url)))?;
        url.query_pairs_mut().append_pair(name, value);
        self.url = url.into();
        Ok(self)
    }

    /// Place `key` where `auth` says it goes.
    ///
    /// OAuth2 tokens are resolved by the adapter before this point and
    /// arrive here as the key.
    pub fn authorize(self, auth: Auth, key: &str) -> Result<Self> {
        match auth {
            Auth::None => Ok(self),
            Auth::Bearer => self.bearer(key),
            Auth::Header(name) => self.header(name, key),
            Auth::Query(name) => self.query(name, key),
            Auth::OAuth2 { .. } => self.query("access_token", key),
        }
    }

    /// The header value as text, if present and printable.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_placements() {
        let req = HttpRequest::post("https://api.example.com/v1/chat", json!({}))
            .authorize(Auth::Bearer, "sk-1")
            .unwrap();
        assert_eq!(req.header_value("authorization"), Some("Bearer sk-1"));

        let req = HttpRequest::post("https://api.example.com/v1/chat", json!({}))
            .authorize(Auth::Header("api-key"), "az-1")
            .unwrap();
        assert_eq!(req.header_value("api-key"), Some("az-1"));

        let req = HttpRequest::post("https://api.example.com/v1/chat?alt=1", json!({}))
            .authorize(Auth::Query("key"), "g 1")
            .unwrap();
        assert_eq!(req.url, "https://api.example.com/v1/chat?alt=1&key=g+1");
    }

    #[test]
    fn bad_header_is_config_error() {
        let err = HttpRequest::post("https://api.example.com", json!({}))
            .bearer("line\nbreak")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
