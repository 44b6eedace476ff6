//! Wire types shared by the control plane and its proxies.
//!
//! Field names are the versioned external contract. Everything that is not
//! part of the original contract is `#[serde(default)]` so older peers keep
//! decoding newer messages.

use serde::{Deserialize, Serialize};

/// Timeout applied to a route when the caller does not set one.
pub const DEFAULT_ROUTE_TIMEOUT_MS: u32 = 5000;

/// A single routing rule: requests under `path` go to `backend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Path prefix this route answers for.
    pub path: String,

    /// Backend address (e.g., "localhost:3000").
    pub backend: String,

    /// Whether the data plane must authenticate requests on this route.
    #[serde(default)]
    pub auth_required: bool,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
}

fn default_timeout_ms() -> u32 {
    DEFAULT_ROUTE_TIMEOUT_MS
}

impl Route {
    /// Create a route with no auth and the default timeout.
    pub fn new(path: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            backend: backend.into(),
            auth_required: false,
            timeout_ms: DEFAULT_ROUTE_TIMEOUT_MS,
        }
    }

    pub fn with_auth(mut self, auth_required: bool) -> Self {
        self.auth_required = auth_required;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// The route installed when nothing else is configured.
    pub fn default_route() -> Self {
        Self::new("/", "localhost:3000")
    }
}

/// A versioned, immutable copy of the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub version: i64,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl ConfigSnapshot {
    pub fn new(version: i64, routes: Vec<Route>) -> Self {
        Self { version, routes }
    }

    /// Find the route with the longest path prefix matching `path`.
    ///
    /// Ties keep the earliest route in table order.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let mut best: Option<&Route> = None;
        for route in &self.routes {
            if !path.starts_with(&route.path) {
                continue;
            }
            match best {
                Some(current) if current.path.len() >= route.path.len() => {}
                _ => best = Some(route),
            }
        }
        best
    }
}

/// Identity a proxy presents on registration and subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyIdentity {
    /// Registry key. Last write wins.
    pub proxy_id: String,

    /// Proxy build version, informational.
    #[serde(default)]
    pub version: String,

    /// Address the proxy serves traffic on, informational.
    #[serde(default)]
    pub listen_addr: String,
}

impl ProxyIdentity {
    pub fn new(
        proxy_id: impl Into<String>,
        version: impl Into<String>,
        listen_addr: impl Into<String>,
    ) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            version: version.into(),
            listen_addr: listen_addr.into(),
        }
    }
}

/// Answer to a registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_wire_names() {
        let route = Route::new("/api", "localhost:4000").with_auth(true);
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["authRequired"], true);
        assert_eq!(json["timeoutMs"], 5000);
    }

    #[test]
    fn test_decode_tolerates_missing_and_unknown_fields() {
        let json = r#"{"path":"/","backend":"b:1","weight":3}"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert!(!route.auth_required);
        assert_eq!(route.timeout_ms, DEFAULT_ROUTE_TIMEOUT_MS);

        let identity: ProxyIdentity = serde_json::from_str(r#"{"proxyId":"p1"}"#).unwrap();
        assert_eq!(identity.proxy_id, "p1");
        assert!(identity.listen_addr.is_empty());
    }

    #[test]
    fn test_resolve_longest_prefix() {
        let snapshot = ConfigSnapshot::new(
            3,
            vec![
                Route::default_route(),
                Route::new("/api", "localhost:4000"),
                Route::new("/api/admin", "localhost:5000"),
            ],
        );

        assert_eq!(snapshot.resolve("/api/admin/users").unwrap().backend, "localhost:5000");
        assert_eq!(snapshot.resolve("/api/v1").unwrap().backend, "localhost:4000");
        assert_eq!(snapshot.resolve("/static/a.css").unwrap().backend, "localhost:3000");
    }

    #[test]
    fn test_resolve_no_match() {
        let snapshot = ConfigSnapshot::new(1, vec![Route::new("/api", "b:1")]);
        assert!(snapshot.resolve("/other").is_none());
    }
}
