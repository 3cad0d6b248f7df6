mod response;
pub mod users;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use url::Url;

use crate::models::*;
use response::error_detail;

// ─── Error types ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum DropletError {
    #[error("Session expired. Please log in again.")]
    SessionExpired,
    #[error("Permission denied: {message}")]
    Forbidden { message: String },
    #[error("Not found: {message}")]
    NotFound { message: String },
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DropletError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

// ─── Client ─────────────────────────────────────────────────────────────────

/// Upper bound on any single request, so a silent server surfaces as a
/// network error the user can retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DropletClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl DropletClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid server URL: {base_url}"))?;

        let client = Client::builder()
            .user_agent(concat!("droplet-console/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        let full = format!("/api{}", path);
        self.base_url
            .join(&full)
            .with_context(|| format!("Bad API path: {path}"))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, DropletError> {
        let url = self.api_url(path).map_err(DropletError::Other)?;
        tracing::debug!("{method} {url}");
        let builder = self.client.request(method, url);
        Ok(match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, DropletError> {
        let resp = builder.send().await?;
        Self::check_status(resp).await
    }

    async fn check_status(resp: Response) -> Result<Response, DropletError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = error_detail(status, &body);
        tracing::warn!(status = status.as_u16(), %message, "api request failed");
        Err(match status {
            StatusCode::UNAUTHORIZED => DropletError::SessionExpired,
            StatusCode::FORBIDDEN => DropletError::Forbidden { message },
            StatusCode::NOT_FOUND => DropletError::NotFound { message },
            s => DropletError::Api {
                status: s.as_u16(),
                message,
            },
        })
    }

    /// The server encodes empty collections as `null`.
    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, DropletError> {
        let resp = self.send(self.request(Method::GET, path)?).await?;
        let items: Option<Vec<T>> = resp.json().await?;
        Ok(items.unwrap_or_default())
    }

    // ── Drops ───────────────────────────────────────────────────────────

    pub async fn list_my_drops(&self) -> Result<Vec<DropRecord>, DropletError> {
        self.get_list("/drops/mine").await
    }

    pub async fn list_all_drops(&self) -> Result<Vec<DropRecord>, DropletError> {
        self.get_list("/drops").await
    }

    pub async fn get_drop(&self, drop_id: &str) -> Result<DropRecord, DropletError> {
        let resp = self
            .send(self.request(Method::GET, &format!("/drops/{drop_id}"))?)
            .await?;
        Ok(resp.json().await?)
    }

    pub async fn create_drop(&self, payload: &DropPayload) -> Result<(), DropletError> {
        self.send(self.request(Method::POST, "/drops")?.json(payload))
            .await?;
        tracing::info!(title = %payload.title, targets = payload.targets.len(), "drop created");
        Ok(())
    }

    pub async fn update_drop(
        &self,
        drop_id: &str,
        payload: &DropPayload,
    ) -> Result<(), DropletError> {
        self.send(
            self.request(Method::PUT, &format!("/drops/{drop_id}"))?
                .json(payload),
        )
        .await?;
        tracing::info!(%drop_id, targets = payload.targets.len(), "drop updated");
        Ok(())
    }

    pub async fn delete_drop(&self, drop_id: &str) -> Result<(), DropletError> {
        self.send(self.request(Method::DELETE, &format!("/drops/{drop_id}"))?)
            .await?;
        tracing::info!(%drop_id, "drop deleted");
        Ok(())
    }

    // ── Target lookups ──────────────────────────────────────────────────

    /// Raw lookup items for a category. Items are heterogeneous, so the
    /// caller projects labels per category.
    pub async fn lookup_targets(
        &self,
        category: TargetCategory,
    ) -> Result<Vec<serde_json::Value>, DropletError> {
        let Some(path) = category.lookup_path() else {
            return Ok(Vec::new());
        };
        self.get_list(path).await
    }

    // ── Auth ────────────────────────────────────────────────────────────

    /// Credential failures come back as 401 here, which must not be read as
    /// an expired session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, DropletError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .request(Method::POST, "/login")?
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(DropletError::Api {
                status: status.as_u16(),
                message: error_detail(status, &text),
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn revoke_token(&self, refresh_token: &str) -> Result<(), DropletError> {
        let builder = self
            .request(Method::POST, "/token/revoke")?
            .bearer_auth(refresh_token);
        self.send(builder).await?;
        Ok(())
    }
}

/// A server that accepts connections and never answers.
#[cfg(test)]
pub(crate) async fn silent_server_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}
