//! Baidu ERNIE.
//!
//! Requests carry a short-lived `access_token` obtained from the OAuth2
//! client-credential endpoint with the API key and secret. Tokens are
//! cached per key in the shared [`crate::TokenCache`] and refreshed before
//! the chat request once expired.

use crate::{AccessToken, HttpRequest, Link, Transport, Turn, transport};
use serde::Deserialize;
use serde_json::{Value, json};
use wcore::{Auth, Error, Result};

pub use {request::Request, stream::MarkedLines};

mod request;
mod stream;

/// Adapter for Baidu ERNIE chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baidu;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    error: Option<String>,
    error_description: Option<String>,
}

impl Baidu {
    /// Build the request body.
    pub fn payload(&self, turn: &Turn<'_>) -> Result<Value> {
        Ok(serde_json::to_value(Request::new(turn))?)
    }

    /// Wrap the body, attaching a valid access token.
    pub async fn request<T: Transport>(
        &self,
        turn: &Turn<'_>,
        payload: Value,
        link: Link<'_, T>,
    ) -> Result<HttpRequest> {
        let Auth::OAuth2 { token_path } = turn.profile.auth else {
            return turn.post(payload);
        };

        let key = format!("{}:{}", turn.profile.name, turn.credentials.key.trim());
        let token = link
            .tokens
            .get_or_refresh(&key, || refresh(turn, token_path, link))
            .await?;
        HttpRequest::post(turn.url(), payload).query("access_token", &token)
    }
}

/// Exchange the client credentials for a fresh token.
async fn refresh<T: Transport>(
    turn: &Turn<'_>,
    token_path: &str,
    link: Link<'_, T>,
) -> Result<AccessToken> {
    let url = format!("{}{token_path}", turn.profile.base_url(turn.credentials));
    let request = HttpRequest::post(url, json!({}))
        .query("grant_type", "client_credentials")?
        .query("client_id", turn.credentials.key.trim())?
        .query("client_secret", turn.credentials.secret.trim())?;

    let issued_at = link.tokens.now();
    let response = transport::send(link.transport, request, link.cancel).await?;
    let status = response.status;
    let success = response.is_success();
    let text = transport::read_text(response, link.cancel).await?;

    let parsed = serde_json::from_str::<TokenResponse>(&text).ok();
    match parsed {
        Some(TokenResponse {
            access_token: Some(value),
            expires_in,
            ..
        }) if success => Ok(AccessToken {
            value,
            issued_at,
            expires_in,
        }),
        parsed => {
            let message = parsed
                .and_then(|p| p.error_description.or(p.error))
                .unwrap_or(text);
            tracing::warn!("token refresh failed: {message}");
            Err(Error::Auth {
                status: (!success).then_some(status),
                message: format!("token refresh failed: {message}"),
            })
        }
    }
}
