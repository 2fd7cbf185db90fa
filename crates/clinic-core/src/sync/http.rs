//! HTTP client for the shared remote store.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::remote::{RemoteError, RemoteResult, RemoteStore};
use super::wire::{PullRequest, PushBatch, PushResponse, RemoteChanges, WalletBalanceResponse};
use crate::config::SyncConfig;
use crate::util::normalize_text_option;

const PUSH_PATH: &str = "/v1/sync/push";
const PULL_PATH: &str = "/v1/sync/pull";
const RESTORE_PATH: &str = "/v1/sync/restore";
const WALLET_BALANCE_PATH: &str = "/v1/wallet/balance";

/// [`RemoteStore`] over the clinic REST API with bearer authentication
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpRemoteStore {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let token = normalize_text_option(Some(token.into())).ok_or_else(|| {
            RemoteError::InvalidConfiguration("API token must not be empty".to_string())
        })?;
        Ok(Self {
            base_url,
            token,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Build a client from a configured [`SyncConfig`]
    pub fn from_config(config: &SyncConfig) -> RemoteResult<Self> {
        let (Some(base_url), Some(token)) = (&config.base_url, &config.token) else {
            return Err(RemoteError::InvalidConfiguration(
                "sync requires an API URL and token".to_string(),
            ));
        };
        Self::new(base_url.clone(), token.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_api_error(status, &body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    RemoteError::Unauthorized(message)
                }
                _ => RemoteError::Api(message),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| RemoteError::InvalidPayload(error.to_string()))
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn push(&self, batch: &PushBatch) -> RemoteResult<PushResponse> {
        self.send(self.client.post(self.url(PUSH_PATH)).json(batch)).await
    }

    async fn pull(&self, request: &PullRequest) -> RemoteResult<RemoteChanges> {
        self.send(self.client.post(self.url(PULL_PATH)).json(request)).await
    }

    async fn restore(&self) -> RemoteResult<RemoteChanges> {
        self.send(self.client.get(self.url(RESTORE_PATH))).await
    }

    async fn wallet_balance(&self) -> RemoteResult<WalletBalanceResponse> {
        self.send(self.client.get(self.url(WALLET_BALANCE_PATH))).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", crate::util::compact_text(trimmed), status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("API URL must not be empty".to_string())
    })?;
    if crate::util::is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "API URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.clinic.example".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.clinic.example/ ".to_string()).unwrap(),
            "https://api.clinic.example"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let remote = HttpRemoteStore::new(
            "https://api.clinic.example",
            "secret-token",
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{remote:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn empty_token_is_rejected() {
        let error =
            HttpRemoteStore::new("https://api.clinic.example", "  ", Duration::from_secs(5))
                .unwrap_err();
        assert!(matches!(error, RemoteError::InvalidConfiguration(_)));
    }

    #[test]
    fn api_errors_prefer_message_field() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, r#"{"message": " upstream down "}"#),
            "upstream down (502)"
        );
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "HTTP 500"
        );
        assert_eq!(
            parse_api_error(StatusCode::NOT_FOUND, "no such route"),
            "no such route (404)"
        );
    }

    #[test]
    fn endpoints_are_joined_to_base_url() {
        let remote = HttpRemoteStore::new(
            "http://localhost:8787/",
            "token",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(remote.url(PULL_PATH), "http://localhost:8787/v1/sync/pull");
    }
}
