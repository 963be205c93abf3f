//! Site adapters for mirror aggregator sites.
//!
//! # Architecture
//!
//! - [`SiteAdapter`]: the capability set every site implements
//!   (`search`, `locate`, `extract_streams`)
//! - [`SiteKey`]: the known sites; [`build_adapters`] constructs the enabled ones
//! - Shared markup helpers: kind inference from link shape, episode label
//!   grammars, player iframe extraction
//!
//! All selection is by document order. Nothing here ranks results by any
//! secondary signal, so identical markup always yields identical output.

pub mod clicka;
pub mod eurostreaming;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::captcha::OcrSolver;
use crate::config::{AdapterConfig, Environment, Settings, SitesDocument};
use crate::error::{Result, ScoutError};
use crate::http_client::{AcceleratedClient, FetchedPage, Transport};
use crate::metadata::{ContentKind, ContentQuery, EpisodeRef};

pub use clicka::ClickaAdapter;
pub use eurostreaming::EurostreamingAdapter;

/// One entry of a site's search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    /// Absolute URL of the content page
    pub link: String,
    /// Inferred from the link's shape
    pub kind: ContentKind,
}

/// A playable embed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLink {
    pub url: String,
    /// No adapter detects quality yet, so this is always `"Unknown"` for now.
    pub quality: String,
}

impl StreamLink {
    pub const UNKNOWN_QUALITY: &'static str = "Unknown";

    pub fn unknown(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: Self::UNKNOWN_QUALITY.to_string(),
        }
    }
}

/// A fetched HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Final URL, used to resolve relative links
    pub url: String,
    pub html: String,
}

impl From<FetchedPage> for Page {
    fn from(fetched: FetchedPage) -> Self {
        let html = fetched.text();
        Self {
            url: fetched.url,
            html,
        }
    }
}

/// Site-specific markup rules behind one contract.
///
/// The pipeline drives these stages in order and never branches on which
/// site it is talking to.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Short lowercase site name (e.g., `"clicka"`).
    fn name(&self) -> &'static str;

    /// Search the site for `query`'s title.
    ///
    /// Results carry the kind inferred from their link; the caller filters.
    async fn search(&self, query: &ContentQuery) -> Result<Vec<SearchResult>>;

    /// Fetch the page to extract from: the result itself for movies, the
    /// matching episode's page for series. `Ok(None)` when no episode matches.
    async fn locate(&self, result: &SearchResult, query: &ContentQuery) -> Result<Option<Page>>;

    /// Player embeds on `page`, in document order.
    async fn extract_streams(&self, page: &Page) -> Result<Vec<StreamLink>>;
}

// ─── Known sites ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKey {
    Clicka,
    Eurostreaming,
}

impl SiteKey {
    pub const ALL: [SiteKey; 2] = [SiteKey::Clicka, SiteKey::Eurostreaming];

    pub fn name(self) -> &'static str {
        match self {
            SiteKey::Clicka => "clicka",
            SiteKey::Eurostreaming => "eurostreaming",
        }
    }

    /// Key used in the sites document and settings file.
    pub fn document_key(self) -> &'static str {
        match self {
            SiteKey::Clicka => "Clicka",
            SiteKey::Eurostreaming => "Eurostreaming",
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SiteKey {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        SiteKey::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ScoutError::Config(format!("unknown site: {s}")))
    }
}

/// Construct one site's adapter from configuration.
///
/// Proxy choice happens here, once per adapter.
pub fn build_adapter(
    key: SiteKey,
    settings: &Settings,
    sites: &SitesDocument,
    env: &Environment,
) -> Result<Arc<dyn SiteAdapter>> {
    let flags = settings.site_flags(key.document_key());
    let config = AdapterConfig::build(
        key.document_key(),
        flags,
        sites,
        env,
        &mut rand::thread_rng(),
    )?;
    let transport: Arc<dyn Transport> = Arc::new(AcceleratedClient::for_adapter(
        &config,
        settings.client_options(),
    )?);

    debug!(
        site = key.name(),
        domain = config.base(),
        proxied = config.proxy.is_some(),
        "Adapter configured"
    );

    Ok(match key {
        SiteKey::Clicka => {
            let solver = OcrSolver::new(Arc::clone(&transport), settings.tesseract_path.clone());
            Arc::new(ClickaAdapter::new(config, transport, Arc::new(solver)))
        }
        SiteKey::Eurostreaming => Arc::new(EurostreamingAdapter::new(config, transport)),
    })
}

/// Construct every enabled site. Sites that fail to configure are skipped with a warning.
pub fn build_adapters(
    settings: &Settings,
    sites: &SitesDocument,
    env: &Environment,
) -> Vec<Arc<dyn SiteAdapter>> {
    SiteKey::ALL
        .into_iter()
        .filter(|key| settings.site_flags(key.document_key()).enabled)
        .filter_map(|key| match build_adapter(key, settings, sites, env) {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                warn!("Skipping site {}: {}", key, e);
                None
            }
        })
        .collect()
}

// ─── Shared markup helpers ───────────────────────────────────────────────────

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| ScoutError::selector(css))
}

/// GET `url` and require a 2xx response.
pub(crate) async fn fetch_page(transport: &dyn Transport, url: &str) -> Result<Page> {
    Ok(transport.get(url).await?.error_for_status()?.into())
}

/// Series pages live under `serie-tv` or carry `stagione` (season) in the slug.
pub fn infer_kind(link: &str) -> ContentKind {
    let link = link.to_lowercase();
    if link.contains("serie-tv") || link.contains("stagione") {
        ContentKind::Series
    } else {
        ContentKind::Movie
    }
}

/// Search terms with whitespace runs joined by `+` and everything else escaped.
pub fn search_terms(title: &str) -> String {
    title
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// `//host/path` becomes `https://host/path`; anything else is returned as-is.
pub fn normalize_player_url(src: &str) -> String {
    let src = src.trim();
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_string(),
    }
}

/// Resolve `href` against the page it appeared on.
pub(crate) fn absolute_link(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(page_url) {
        Ok(base) => base.join(href).ok().map(String::from),
        Err(_) => Some(href.to_string()),
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse search results: each `item_css` match contributes the first
/// `link_css` anchor inside it.
pub(crate) fn parse_search_results(
    page: &Page,
    item_css: &str,
    link_css: &str,
) -> Result<Vec<SearchResult>> {
    let document = Html::parse_document(&page.html);
    let item_selector = selector(item_css)?;
    let link_selector = selector(link_css)?;

    let results = document
        .select(&item_selector)
        .filter_map(|item| item.select(&link_selector).next())
        .filter_map(|anchor| {
            let link = absolute_link(&page.url, anchor.value().attr("href")?)?;
            Some(SearchResult {
                title: element_text(&anchor),
                kind: infer_kind(&link),
                link,
            })
        })
        .collect();

    Ok(results)
}

/// Player iframes under `scope_css`, protocol-relative sources rewritten to https.
pub(crate) fn extract_players(page: &Page, scope_css: &str) -> Result<Vec<StreamLink>> {
    let document = Html::parse_document(&page.html);
    let iframe_selector = selector(&format!("{scope_css} iframe"))?;

    Ok(document
        .select(&iframe_selector)
        .filter_map(|iframe| iframe.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .map(|src| StreamLink::unknown(normalize_player_url(src)))
        .collect())
}

// ─── Episode localization ────────────────────────────────────────────────────

/// Accepted ways of writing an episode label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelGrammar {
    /// `S03E07`, case-insensitive; padding optional
    SeasonEpisode,
    /// `3×7`
    Cross,
}

impl LabelGrammar {
    /// Regex matching this grammar's label for `ep` anywhere in a text.
    pub fn pattern(self, ep: EpisodeRef) -> Result<Regex> {
        let EpisodeRef { season, episode } = ep;
        let pattern = match self {
            // The `s` itself bounds the season digits, so titles may run into it
            LabelGrammar::SeasonEpisode => format!(r"(?i)s0*{season}\s*e0*{episode}(?:\D|$)"),
            LabelGrammar::Cross => format!(r"(?:^|\D)0*{season}\s*×\s*0*{episode}(?:\D|$)"),
        };
        Regex::new(&pattern).map_err(|e| ScoutError::parse(e.to_string()))
    }

    pub fn matches(self, ep: EpisodeRef, label: &str) -> Result<bool> {
        Ok(self.pattern(ep)?.is_match(label))
    }
}

/// Where a site lists episodes and how it labels them.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeListing {
    /// Listing entries whose text carries the label
    pub entries: &'static str,
    /// Anchor inside an entry; `None` when the entry is itself the anchor
    pub link: Option<&'static str>,
    /// Tried in order; the first grammar with any match wins
    pub grammars: &'static [LabelGrammar],
}

impl EpisodeListing {
    /// URL of the first entry matching `ep`.
    pub fn find(&self, page: &Page, ep: EpisodeRef) -> Result<Option<String>> {
        let document = Html::parse_document(&page.html);
        let entry_selector = selector(self.entries)?;
        let link_selector = self.link.map(selector).transpose()?;

        for grammar in self.grammars {
            let pattern = grammar.pattern(ep)?;
            for entry in document.select(&entry_selector) {
                if !pattern.is_match(&element_text(&entry)) {
                    continue;
                }
                let anchor = match &link_selector {
                    Some(link_selector) => entry.select(link_selector).next(),
                    None => Some(entry),
                };
                if let Some(url) = anchor
                    .and_then(|a| a.value().attr("href"))
                    .and_then(|href| absolute_link(&page.url, href))
                {
                    debug!(?grammar, %url, "Episode matched");
                    return Ok(Some(url));
                }
            }
        }

        Ok(None)
    }
}

/// The locate stage shared by listing-based sites.
pub(crate) async fn locate_with_listing(
    transport: &dyn Transport,
    listing: &EpisodeListing,
    result: &SearchResult,
    query: &ContentQuery,
) -> Result<Option<Page>> {
    let content_page = fetch_page(transport, &result.link).await?;

    let Some(ep) = query.episode_ref() else {
        return Ok(Some(content_page));
    };

    match listing.find(&content_page, ep)? {
        Some(episode_url) => Ok(Some(fetch_page(transport, &episode_url).await?)),
        None => {
            debug!(link = %result.link, query = %query, "No listing entry matches episode");
            Ok(None)
        }
    }
}
