use std::{ops::Deref, sync::Arc, time::Duration};

use reqwest::{header::HeaderMap, Client, IntoUrl};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};

use crate::error::{OttError, OttResult};

/// Transport settings of the process-wide [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout, caps the stall of a single chunk fetch
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    /// Sent with every request
    pub headers: HeaderMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 1024,
            user_agent: concat!("ottsim/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: HeaderMap::new(),
        }
    }
}

/// Shared HTTP client with a cookie jar.
///
/// Cloning shares the connection pool and the cookies.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> OttResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = Client::builder()
            .cookie_provider(cookies_store.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(config.tcp_keepalive)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.as_str())
            .default_headers(config.headers.clone())
            .build()
            .map_err(OttError::HttpClientError)?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    /// Seeds the cookie jar, e.g. with CDN authorization cookies.
    pub fn add_cookies(&self, cookies: Vec<String>, url: impl IntoUrl) -> OttResult<()> {
        let url = url.into_url()?;
        let mut lock = self
            .cookies_store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for cookie in cookies {
            if let Err(e) = lock.parse(&cookie, &url) {
                tracing::warn!("Ignoring invalid cookie {cookie}: {e}");
            }
        }
        Ok(())
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
