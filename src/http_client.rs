//! HTTP transport for site adapters and the CAPTCHA solver
//!
//! Features:
//! - Browser fingerprint headers on every request
//! - Per-adapter proxy, fixed at construction
//! - Session cookies from the sites document, pre-loaded into the jar
//! - Optional forward proxy that is prefixed to each request URL; pages are
//!   still reported under the site URL and cookies travel as a header
//! - Brotli, Zstd, Gzip compression (auto-negotiated)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, instrument};

use crate::config::AdapterConfig;
use crate::error::{Result, ScoutError};
use crate::fingerprint::{BrowserProfile, Impersonate};

/// A fetched response with the body fully buffered.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    body: Vec<u8>,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Turn a non-2xx response into [`ScoutError::Status`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScoutError::Status {
                status: self.status,
                url: self.url,
            })
        }
    }
}

/// What adapters and the solver need from HTTP.
///
/// Non-2xx responses are returned as values, not errors; callers decide.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedPage>;

    /// POST `fields` as `application/x-www-form-urlencoded`.
    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedPage>;
}

/// Client construction knobs shared by all adapters.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub impersonate: Impersonate,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            impersonate: Impersonate::Chrome,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest-backed [`Transport`] bound to one adapter's configuration
pub struct AcceleratedClient {
    client: Client,
    profile: BrowserProfile,
    forward_proxy: Option<String>,
    /// Session cookies for the forward proxy, which the jar never matches
    cookie_header: Option<HeaderValue>,
}

impl AcceleratedClient {
    /// Client with no proxy and no session cookies.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let profile = options.impersonate.profile();
        let client = Self::builder(&profile, options).cookie_store(true).build()?;
        Ok(Self {
            client,
            profile,
            forward_proxy: None,
            cookie_header: None,
        })
    }

    /// Client for one adapter: its proxy, cookies and forward proxy.
    pub fn for_adapter(config: &AdapterConfig, options: ClientOptions) -> Result<Self> {
        let profile = options.impersonate.profile();

        let jar = Jar::default();
        for (name, value) in &config.cookies {
            jar.add_cookie_str(&format!("{name}={value}"), &config.base_domain);
        }

        let mut builder = Self::builder(&profile, options).cookie_provider(Arc::new(jar));
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(&proxy.url)?);
        }

        let forward_proxy = config.forward_proxy.as_ref().map(ToString::to_string);
        let cookie_header = match &forward_proxy {
            Some(_) if !config.cookies.is_empty() => {
                let pairs: Vec<String> = config
                    .cookies
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                Some(
                    HeaderValue::from_str(&pairs.join("; "))
                        .map_err(|e| ScoutError::Config(format!("invalid cookie value: {e}")))?,
                )
            }
            _ => None,
        };

        Ok(Self {
            client: builder.build()?,
            profile,
            forward_proxy,
            cookie_header,
        })
    }

    fn builder(profile: &BrowserProfile, options: ClientOptions) -> reqwest::ClientBuilder {
        Client::builder()
            // Let the server negotiate HTTP/2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .default_headers(profile.to_headers())
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
    }

    fn target(&self, url: &str) -> String {
        match &self.forward_proxy {
            Some(prefix) => format!("{prefix}{url}"),
            None => url.to_string(),
        }
    }

    /// Map the URL a response landed on back into the site's URL space.
    fn site_url(&self, requested: &str, landed: &str) -> String {
        match &self.forward_proxy {
            None => landed.to_string(),
            Some(prefix) => match landed.strip_prefix(prefix.as_str()) {
                Some(rest) if !rest.is_empty() => rest.to_string(),
                _ => requested.to_string(),
            },
        }
    }

    fn with_cookies(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.cookie_header {
            Some(cookies) => request.header(COOKIE, cookies.clone()),
            None => request,
        }
    }

    async fn buffer(&self, requested: &str, response: reqwest::Response) -> Result<FetchedPage> {
        let url = self.site_url(requested, response.url().as_str());
        let status = response.status().as_u16();

        info!(
            status,
            version = ?response.version(),
            content_encoding = ?response.headers().get("content-encoding"),
            "Response received"
        );

        let body = response.bytes().await?;
        Ok(FetchedPage::new(url, status, body.to_vec()))
    }

    /// Browser profile this client impersonates.
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }
}

#[async_trait]
impl Transport for AcceleratedClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<FetchedPage> {
        debug!("GET");
        let request = self.with_cookies(self.client.get(self.target(url)));
        let response = request.send().await?;
        self.buffer(url, response).await
    }

    #[instrument(skip(self, fields), fields(url = %url, fields = fields.len()))]
    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedPage> {
        debug!("POST form");
        let request = self.with_cookies(self.client.post(self.target(url)).form(fields));
        let response = request.send().await?;
        self.buffer(url, response).await
    }
}
