//! Reserve Backend REST Client
//!
//! HTTP client for the Proof of Reserve backend. Carries the bearer token of
//! the injected [`SessionContext`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::dto::*;
use super::ReserveBackend;
use crate::error::{DashboardError, DashboardResult};
use crate::session::SessionContext;

/// REST client for the reserve backend
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionContext) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// `POST /login`; on success the token is installed in this client's session
    pub async fn login(&mut self, username: &str, password: &str) -> DashboardResult<String> {
        let body = LoginRequest { username, password };
        let response: LoginResponse = self
            .send(self.client.post(self.url("/login")).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()))?;

        self.session.set_token(response.token.clone());
        tracing::info!(%username, "Logged in");
        Ok(response.token)
    }

    /// Explicit teardown of the session context
    pub fn logout(&mut self) {
        self.session.clear();
        tracing::info!("Logged out");
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and map non-success statuses onto dashboard errors
    async fn send(&self, request: RequestBuilder) -> DashboardResult<Response> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = self
            .authorize(request)
            .header("x-request-id", request_id.as_str())
            .build()?;

        let method = request.method().clone();
        let path = request.url().path().to_string();
        tracing::debug!(request_id = %request_id, %method, %path, "Backend request");

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::error!(request_id = %request_id, %method, %path, error = %e, "Backend unreachable");
            DashboardError::Network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        tracing::warn!(request_id = %request_id, %method, %path, status = status.as_u16(), "Backend error");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DashboardError::Unauthenticated),
            StatusCode::NOT_FOUND => Err(DashboardError::NotFound(path)),
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(DashboardError::Http {
                    status: status.as_u16(),
                    message: text,
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DashboardResult<T> {
        self.send(self.client.get(self.url(path)))
            .await?
            .json()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()))
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> DashboardResult<T> {
        self.send(self.client.post(self.url(path)).json(body))
            .await?
            .json()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ReserveBackend for ApiClient {
    async fn exchanges(&self) -> DashboardResult<Vec<Exchange>> {
        self.get_json("/exchanges").await
    }

    async fn create_exchange(&self, name: &str) -> DashboardResult<Exchange> {
        self.post_json("/exchanges", &CreateExchangeRequest { name })
            .await
    }

    async fn lists(&self) -> DashboardResult<Vec<WalletList>> {
        let envelope: ListsEnvelope = self.get_json("/lists").await?;
        Ok(envelope.into_lists())
    }

    async fn create_list(&self, name: &str, exchange_id: &RecordId) -> DashboardResult<WalletList> {
        self.post_json("/lists", &CreateListRequest { name, exchange_id })
            .await
    }

    async fn list_detail(&self, id: &RecordId) -> DashboardResult<ListDetail> {
        let path = format!("/lists/{}", urlencoding::encode(id.as_str()));
        self.get_json(&path).await
    }

    async fn import(&self, request: &ImportRequest) -> DashboardResult<ImportResponse> {
        self.post_json("/import", request).await
    }

    async fn create_reserve(&self, request: &ReserveRequest) -> DashboardResult<ReserveResponse> {
        let response = self
            .send(self.client.post(self.url("/reserves")).json(request))
            .await?;

        // The body is informational; an empty or unexpected one still means success
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(ReserveResponse::default());
        }
        match serde_json::from_str(&text) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::debug!(error = %e, "Unrecognised /reserves response body");
                Ok(ReserveResponse::default())
            }
        }
    }

    async fn snapshots(&self) -> DashboardResult<Vec<Snapshot>> {
        let envelope: SnapshotsEnvelope = self.get_json("/snapshots").await?;
        Ok(envelope.into_snapshots())
    }

    async fn snapshot(&self, id: &RecordId) -> DashboardResult<Snapshot> {
        let path = format!("/snapshots/{}", urlencoding::encode(id.as_str()));
        self.get_json(&path).await
    }

    async fn chains(&self) -> DashboardResult<Vec<String>> {
        let entries: Vec<ChainEntry> = self.get_json("/chains").await?;
        Ok(entries
            .into_iter()
            .filter_map(ChainEntry::into_enabled_id)
            .collect())
    }
}
