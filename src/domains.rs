//! Domain registry refresh.
//!
//! Mirror sites hop between domains. A refresh pulls plain-text domain lists,
//! picks each site's line, follows redirects to the live domain and writes it
//! into the [`SitesDocument`]. Null session cookies are filled from defaults
//! on the way. Adapters only read the result at construction time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{DomainSettings, DomainSource, SiteEntry, SitesDocument};
use crate::error::{Result, ScoutError};
use crate::http_client::Transport;

/// What a refresh changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// `(site, new url)`
    pub updated: Vec<(String, String)>,
    /// Sites whose cookies got defaults filled in
    pub cookies_filled: Vec<String>,
    /// `(site, reason)`
    pub skipped: Vec<(String, String)>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.cookies_filled.is_empty()
    }
}

pub struct DomainRefresher {
    transport: Arc<dyn Transport>,
}

impl DomainRefresher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Refresh every configured source into `document`.
    ///
    /// Every list is downloaded before anything is touched; an unreachable or
    /// empty list aborts the refresh with `document` unchanged. Per-site
    /// failures after that are recorded in the report and skipped.
    #[instrument(skip_all, fields(sources = settings.sources.len()))]
    pub async fn refresh(
        &self,
        settings: &DomainSettings,
        document: &mut SitesDocument,
    ) -> Result<RefreshReport> {
        let lists = self.fetch_lists(&settings.sources).await?;
        let mut report = RefreshReport::default();

        for source in &settings.sources {
            if document.entry(&source.site).is_none() {
                debug!(site = %source.site, "Not in sites document");
                report
                    .skipped
                    .push((source.site.clone(), "not in sites document".into()));
                continue;
            }

            let domains = lists
                .get(source.list_url.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let Some(domain) = domains.get(source.line) else {
                warn!(site = %source.site, line = source.line, "Line out of range in domain list");
                report
                    .skipped
                    .push((source.site.clone(), format!("no line {} in list", source.line)));
                continue;
            };
            if domain.is_empty() {
                warn!(site = %source.site, line = source.line, "Blank line in domain list");
                report
                    .skipped
                    .push((source.site.clone(), format!("line {} is blank", source.line)));
                continue;
            }

            let live = match self.follow(domain, source.force_www).await {
                Ok(live) => live,
                Err(e) => {
                    warn!(site = %source.site, %domain, "Redirect check failed: {}", e);
                    report.skipped.push((source.site.clone(), e.to_string()));
                    continue;
                }
            };

            if let Some(entry) = document.entry_mut(&source.site) {
                info!(site = %source.site, url = %live, "Domain updated");
                entry.url = live.clone();
                report.updated.push((source.site.clone(), live));

                if fill_cookies(entry, &settings.cookie_defaults) {
                    info!(site = %source.site, "Null cookies filled with defaults");
                    report.cookies_filled.push(source.site.clone());
                }
            }
        }

        Ok(report)
    }

    async fn fetch_lists(&self, sources: &[DomainSource]) -> Result<HashMap<String, Vec<String>>> {
        let mut lists = HashMap::new();
        for source in sources {
            if lists.contains_key(&source.list_url) {
                continue;
            }
            let page = self
                .transport
                .get(&source.list_url)
                .await?
                .error_for_status()?;
            let domains = parse_domain_list(&page.text());
            if domains.is_empty() {
                return Err(ScoutError::Config(format!(
                    "domain list {} is empty",
                    source.list_url
                )));
            }
            debug!(list = %source.list_url, count = domains.len(), "Domain list fetched");
            lists.insert(source.list_url.clone(), domains);
        }
        Ok(lists)
    }

    /// Where `domain` ends up after redirects, reduced to `https://host`.
    async fn follow(&self, domain: &str, force_www: bool) -> Result<String> {
        let landed = self.transport.get(&probe_url(domain)).await?;
        canonical_domain(&landed.url, force_www)
    }
}

/// One domain per line, each trimmed. Interior blank lines stay so that line
/// numbers keep pointing at the same site.
pub fn parse_domain_list(text: &str) -> Vec<String> {
    text.trim().lines().map(str::trim).map(str::to_string).collect()
}

/// URL to probe for a list entry. Bare hosts go out over plain http and let
/// the site redirect.
pub fn probe_url(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("http://{domain}")
    }
}

/// `https://<host>[:port]` of `url`, path and query dropped.
pub fn canonical_domain(url: &str, force_www: bool) -> Result<String> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ScoutError::Config(format!("no host in {url}")))?;

    let mut netloc = if force_www && !host.starts_with("www.") {
        format!("www.{host}")
    } else {
        host.to_string()
    };
    if let Some(port) = parsed.port() {
        netloc = format!("{netloc}:{port}");
    }
    Ok(format!("https://{netloc}"))
}

/// Replace null or missing cookies with configured defaults.
///
/// Only entries with a `cookies` key are touched, even if its map is empty.
/// Returns whether anything changed.
pub fn fill_cookies(entry: &mut SiteEntry, defaults: &BTreeMap<String, String>) -> bool {
    let Some(cookies) = entry.cookies.as_mut() else {
        return false;
    };
    let mut changed = false;
    for (name, value) in defaults {
        let slot = cookies.entry(name.clone()).or_insert(None);
        if slot.is_none() {
            *slot = Some(value.clone());
            changed = true;
        }
    }
    changed
}
