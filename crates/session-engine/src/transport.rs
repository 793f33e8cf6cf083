//! HTTP transports and authorization header synchronization.

use bodega_storage::SessionVault;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use url::Url;

/// An HTTP client instance with its own mutable default headers.
///
/// Transports share one underlying `reqwest::Client` (connection pool and
/// timeout), but each owns a separate header map so e.g. the upload
/// transport can carry different defaults than the JSON API transport.
pub struct Transport {
    name: String,
    client: Client,
    base_url: String,
    defaults: RwLock<HeaderMap>,
}

impl Transport {
    pub fn new(name: impl Into<String>, client: Client, base_url: &Url) -> Self {
        Self {
            name: name.into(),
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            defaults: RwLock::new(HeaderMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request with this transport's default headers applied.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let headers = self.defaults.read().unwrap().clone();
        self.client.request(method, self.url(path)).headers(headers)
    }

    /// Set a default header on this transport.
    pub fn set_default_header(&self, name: HeaderName, value: HeaderValue) {
        self.defaults.write().unwrap().insert(name, value);
    }

    /// Remove a default header from this transport.
    pub fn remove_default_header(&self, name: &HeaderName) {
        self.defaults.write().unwrap().remove(name);
    }

    /// Read a default header as a string, if present and printable.
    pub fn default_header(&self, name: &HeaderName) -> Option<String> {
        self.defaults
            .read()
            .unwrap()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// The current default Authorization header, if any.
    pub fn authorization(&self) -> Option<String> {
        self.default_header(&AUTHORIZATION)
    }
}

/// Registry of every transport in the process.
///
/// All token-pair mutations go through [`TransportSet::refresh_auth_headers`]
/// before dependent requests are issued; no other code path writes the
/// Authorization header, so the transports can never diverge.
pub struct TransportSet {
    transports: RwLock<Vec<Arc<Transport>>>,
}

impl TransportSet {
    pub fn new() -> Self {
        Self {
            transports: RwLock::new(Vec::new()),
        }
    }

    /// Register a transport for header synchronization.
    pub fn register(&self, transport: Arc<Transport>) {
        self.transports.write().unwrap().push(transport);
    }

    /// Look up a transport by name.
    pub fn get(&self, name: &str) -> Option<Arc<Transport>> {
        self.transports
            .read()
            .unwrap()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// All registered transports.
    pub fn all(&self) -> Vec<Arc<Transport>> {
        self.transports.read().unwrap().clone()
    }

    /// Synchronize every transport's Authorization header from the token
    /// store. Storage failures are treated as "no token": requests then
    /// fail authentication rather than racing ahead with a stale header.
    pub async fn refresh_auth_headers(&self, vault: &SessionVault) {
        let token = match vault.access_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read access token, clearing auth headers");
                None
            }
        };

        match token {
            Some(token) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    for transport in self.all() {
                        transport.set_default_header(AUTHORIZATION, value.clone());
                    }
                    debug!("Authorization header synchronized on all transports");
                }
                Err(e) => {
                    warn!(error = %e, "Stored access token is not header-safe, clearing");
                    for transport in self.all() {
                        transport.remove_default_header(&AUTHORIZATION);
                    }
                }
            },
            None => {
                for transport in self.all() {
                    transport.remove_default_header(&AUTHORIZATION);
                }
                debug!("Authorization header removed from all transports");
            }
        }
    }
}

impl Default for TransportSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_vault;
    use reqwest::header::ACCEPT;

    fn transport(name: &str) -> Arc<Transport> {
        let base = Url::parse("https://api.test.invalid").unwrap();
        Arc::new(Transport::new(name, Client::new(), &base))
    }

    #[test]
    fn test_default_headers_set_and_remove() {
        let t = transport("api");
        assert!(t.authorization().is_none());

        t.set_default_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(t.authorization().as_deref(), Some("Bearer abc"));

        t.remove_default_header(&AUTHORIZATION);
        assert!(t.authorization().is_none());
    }

    #[test]
    fn test_transports_have_independent_headers() {
        let a = transport("api");
        let b = transport("upload");

        a.set_default_header(ACCEPT, HeaderValue::from_static("application/json"));
        assert_eq!(a.default_header(&ACCEPT).as_deref(), Some("application/json"));
        assert!(b.default_header(&ACCEPT).is_none());
    }

    #[test]
    fn test_url_building() {
        let base = Url::parse("https://api.test.invalid/").unwrap();
        let t = Transport::new("api", Client::new(), &base);
        assert_eq!(t.url("/orders"), "https://api.test.invalid/orders");
    }

    #[test]
    fn test_registry_lookup() {
        let set = TransportSet::new();
        set.register(transport("api"));
        set.register(transport("upload"));

        assert_eq!(set.get("api").unwrap().name(), "api");
        assert_eq!(set.get("upload").unwrap().name(), "upload");
        assert!(set.get("nope").is_none());
        assert_eq!(set.all().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_auth_headers_sets_bearer_everywhere() {
        let vault = memory_vault();
        vault.set_access_token("T1").await.unwrap();

        let set = TransportSet::new();
        set.register(transport("api"));
        set.register(transport("upload"));

        set.refresh_auth_headers(&vault).await;

        for t in set.all() {
            assert_eq!(t.authorization().as_deref(), Some("Bearer T1"));
        }
    }

    #[tokio::test]
    async fn test_refresh_auth_headers_removes_when_absent() {
        let vault = memory_vault();

        let set = TransportSet::new();
        let t = transport("api");
        t.set_default_header(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        set.register(t);

        set.refresh_auth_headers(&vault).await;

        assert!(set.get("api").unwrap().authorization().is_none());
    }
}
