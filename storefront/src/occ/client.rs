//! HTTP plumbing shared by the OCC adapters

use super::endpoints::OccEndpoints;
use crate::config::OccConfig;
use crate::error::OccError;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

/// Request body sent with an OCC call
pub(crate) enum Body<'a> {
    None,
    Form(&'a [(&'a str, String)]),
    Json(&'a Value),
}

/// OCC REST client
///
/// Requests carry the bearer token set with [`OccClient::set_token`]; without
/// one they go out anonymously.
pub struct OccClient {
    http: Client,
    endpoints: RwLock<OccEndpoints>,
    token: RwLock<Option<String>>,
}

impl OccClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns [`OccError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &OccConfig) -> Result<Self, OccError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OccError::Transport {
                url: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            endpoints: RwLock::new(OccEndpoints::new(config)),
            token: RwLock::new(None),
        })
    }

    /// Send `access_token` with every following request; `None` to stop
    pub async fn set_token(&self, access_token: Option<String>) {
        *self.token.write().await = access_token;
    }

    /// Address following requests to another site
    pub async fn set_site(&self, site: &str) {
        self.endpoints.write().await.set_site(site);
    }

    /// Build the URL of the path `segments` below the current site
    pub(crate) async fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, OccError> {
        self.endpoints.read().await.url(segments, query)
    }

    /// Send a request and decode the JSON answer
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Body<'_>,
    ) -> Result<T, OccError> {
        let response = self.send(method, url, body).await?;
        let url = response.url().to_string();
        response
            .json::<T>()
            .await
            .map_err(|e| OccError::Decode {
                url,
                message: e.to_string(),
            })
    }

    /// Send a request whose answer body is ignored
    pub(crate) async fn execute(&self, method: Method, url: Url, body: Body<'_>) -> Result<(), OccError> {
        self.send(method, url, body).await.map(|_| ())
    }

    async fn send(&self, method: Method, url: Url, body: Body<'_>) -> Result<Response, OccError> {
        tracing::debug!(%method, %url, "OCC request");

        let request = self.authorize(self.http.request(method, url.clone())).await;
        let request = match body {
            Body::None => request,
            Body::Form(fields) => request.form(fields),
            Body::Json(value) => request.json(value),
        };

        let response = request.send().await.map_err(|e| OccError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        tracing::debug!(status = status.as_u16(), %url, "OCC error response");

        Err(OccError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            url: url.to_string(),
            body,
        })
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
