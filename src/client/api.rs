//! Unary HTTP client for proxies and operators.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::admin::{ConfigUpdateResponse, StatusResponse};
use crate::client::error::{ClientError, ClientResult};
use crate::client::stream::ConfigStream;
use crate::control::{BroadcastReport, ConfigSnapshot, ProxyIdentity, RegistrationResult, Route};

#[derive(Debug, Clone)]
pub struct ControlClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ControlClient {
    /// Client for the control plane at `base_url` (e.g., "http://localhost:9090").
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            api_key: None,
        })
    }

    /// Use a preconfigured `reqwest` client (proxy settings, timeouts).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Send `Authorization: Bearer <key>` on admin calls.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn register(&self, identity: &ProxyIdentity) -> ClientResult<RegistrationResult> {
        let res = self
            .http
            .post(self.endpoint("/v1/proxies/register")?)
            .json(identity)
            .send()
            .await?;
        decode(res).await
    }

    pub async fn current_config(&self) -> ClientResult<ConfigSnapshot> {
        let res = self.http.get(self.endpoint("/v1/config")?).send().await?;
        decode(res).await
    }

    /// Open a config stream for `identity`.
    pub async fn subscribe(&self, identity: &ProxyIdentity) -> ClientResult<ConfigStream> {
        ConfigStream::connect(&self.subscribe_url(identity)?).await
    }

    /// WebSocket URL of the subscribe endpoint for `identity`.
    pub fn subscribe_url(&self, identity: &ProxyIdentity) -> ClientResult<Url> {
        let mut url = self.endpoint("/v1/config/subscribe")?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ClientError::Scheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Scheme(scheme.to_string()))?;
        url.query_pairs_mut()
            .append_pair("proxyId", &identity.proxy_id)
            .append_pair("version", &identity.version)
            .append_pair("listenAddr", &identity.listen_addr);
        Ok(url)
    }

    pub async fn status(&self) -> ClientResult<StatusResponse> {
        let res = self.admin(self.http.get(self.endpoint("/admin/status")?)).send().await?;
        decode(res).await
    }

    pub async fn connected_proxies(&self) -> ClientResult<Vec<ProxyIdentity>> {
        let res = self.admin(self.http.get(self.endpoint("/admin/proxies")?)).send().await?;
        decode(res).await
    }

    /// Evict a registration-only entry. Returns false if it was not
    /// registered; a proxy with an open stream fails with status 409.
    pub async fn remove_proxy(&self, proxy_id: &str) -> ClientResult<bool> {
        let mut url = self.endpoint("/admin/proxies/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Scheme(self.base_url.scheme().to_string()))?
            .pop_if_empty()
            .push(proxy_id);
        let res = self.admin(self.http.delete(url)).send().await?;
        match res.status() {
            reqwest::StatusCode::NO_CONTENT => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(res).await),
        }
    }

    pub async fn replace_routes(&self, routes: &[Route]) -> ClientResult<ConfigUpdateResponse> {
        let res = self
            .admin(self.http.put(self.endpoint("/admin/routes")?))
            .json(routes)
            .send()
            .await?;
        decode(res).await
    }

    pub async fn append_route(&self, route: &Route) -> ClientResult<ConfigUpdateResponse> {
        let res = self
            .admin(self.http.post(self.endpoint("/admin/routes")?))
            .json(route)
            .send()
            .await?;
        decode(res).await
    }

    /// Push `snapshot` to every subscriber, or the current one if `None`.
    pub async fn broadcast(&self, snapshot: Option<&ConfigSnapshot>) -> ClientResult<BroadcastReport> {
        let mut req = self.admin(self.http.post(self.endpoint("/admin/broadcast")?));
        if let Some(snapshot) = snapshot {
            req = req.json(snapshot);
        }
        decode(req.send().await?).await
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn admin(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

async fn status_error(res: Response) -> ClientError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}

async fn decode<T: DeserializeOwned>(res: Response) -> ClientResult<T> {
    if !res.status().is_success() {
        return Err(status_error(res).await);
    }
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
