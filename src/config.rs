//! Configuration: settings file, process environment, and the sites document.
//!
//! - `Settings` is read from `~/.config/mirrorscout/config.toml` (optional).
//! - `Environment` carries proxy credentials and API keys from env vars.
//! - `SitesDocument` is the JSON file the domain refresh writes and adapters
//!   read once at construction.
//!
//! [`AdapterConfig`] is the only thing adapters see. It is built once per
//! adapter and never mutated afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScoutError};
use crate::fingerprint::Impersonate;
use crate::http_client::ClientOptions;

/// Per-site feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteFlags {
    pub enabled: bool,
    /// Route requests through a proxy picked from `PROXY_CREDENTIALS`.
    pub proxy: bool,
    /// Prefix request URLs with `FORWARD_PROXY`.
    pub forward_proxy: bool,
}

impl Default for SiteFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            proxy: false,
            forward_proxy: false,
        }
    }
}

/// One line-indexed entry in a remote domain list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DomainSource {
    /// Key in the sites document (e.g. `"Clicka"`).
    pub site: String,
    /// Plain-text list, one domain per line.
    pub list_url: String,
    /// Zero-based line to take from the list.
    #[serde(default)]
    pub line: usize,
    /// Force a `www.` host prefix on the final domain.
    #[serde(default)]
    pub force_www: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DomainSettings {
    pub sources: Vec<DomainSource>,
    /// Values written into cookies that are `null` in the sites document.
    pub cookie_defaults: BTreeMap<String, String>,
}

/// Top-level settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub browser: Impersonate,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub tesseract_path: PathBuf,
    pub tmdb_language: String,
    pub sites_file: Option<PathBuf>,
    pub sites: BTreeMap<String, SiteFlags>,
    pub domains: DomainSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser: Impersonate::Chrome,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            tesseract_path: PathBuf::from("tesseract"),
            tmdb_language: "it-IT".to_string(),
            sites_file: None,
            sites: BTreeMap::new(),
            domains: DomainSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir().join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Flags for a site, matched case-insensitively. Unlisted sites get defaults.
    pub fn site_flags(&self, site: &str) -> SiteFlags {
        self.sites
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(site))
            .map(|(_, flags)| *flags)
            .unwrap_or_default()
    }

    pub fn sites_path(&self) -> PathBuf {
        self.sites_file
            .clone()
            .unwrap_or_else(|| config_dir().join("sites.json"))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            impersonate: self.browser,
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mirrorscout")
}

/// Values taken from the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Candidate proxy URLs. An empty entry stands for "direct connection".
    pub proxy_credentials: Vec<String>,
    pub forward_proxy: Option<String>,
    pub tmdb_api_key: Option<String>,
}

impl Environment {
    /// Read `PROXY_CREDENTIALS` (JSON array), `FORWARD_PROXY` and `TMDB_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let proxy_credentials = match var("PROXY_CREDENTIALS") {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                ScoutError::Config(format!("PROXY_CREDENTIALS must be a JSON string array: {e}"))
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            proxy_credentials,
            forward_proxy: var("FORWARD_PROXY"),
            tmdb_api_key: var("TMDB_API_KEY"),
        })
    }
}

/// A site's persisted domain and session cookies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub url: String,
    /// `None` when the entry has no `cookies` key at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, Option<String>>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Top-level key the site table was read from, and is written back under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SitesKey {
    #[default]
    Sites,
    /// `Siti`, still read by older tools sharing the file
    Legacy,
}

impl SitesKey {
    const LEGACY: &'static str = "Siti";

    fn as_str(self) -> &'static str {
        match self {
            Self::Sites => "sites",
            Self::Legacy => Self::LEGACY,
        }
    }
}

/// JSON document keyed by site name, maintained by the domain refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitesDocument {
    #[serde(default, alias = "Siti")]
    pub sites: BTreeMap<String, SiteEntry>,
    #[serde(skip)]
    pub key: SitesKey,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SitesDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::Config(format!("cannot read sites document {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let legacy = value.get("sites").is_none() && value.get(SitesKey::LEGACY).is_some();
        let mut doc: Self = serde_json::from_value(value)?;
        if legacy {
            doc.key = SitesKey::Legacy;
        }
        Ok(doc)
    }

    /// JSON form, with the site table under the key it was read from.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let (SitesKey::Legacy, Some(map)) = (self.key, value.as_object_mut()) {
            if let Some(sites) = map.remove(SitesKey::Sites.as_str()) {
                map.insert(self.key.as_str().to_string(), sites);
            }
        }
        Ok(value)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.to_json_value()?)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Look up a site, matched case-insensitively.
    pub fn entry(&self, site: &str) -> Option<&SiteEntry> {
        self.sites
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(site))
            .map(|(_, entry)| entry)
    }

    pub fn entry_mut(&mut self, site: &str) -> Option<&mut SiteEntry> {
        self.sites
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(site))
            .map(|(_, entry)| entry)
    }
}

/// Proxy chosen for one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
}

impl ProxyConfig {
    /// Pick one candidate at random. Empty entries mean no proxy.
    pub fn choose<R: Rng + ?Sized>(candidates: &[String], rng: &mut R) -> Option<Self> {
        candidates
            .choose(rng)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| Self { url: c.to_string() })
    }
}

/// Everything an adapter needs from configuration, fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub base_domain: Url,
    pub proxy: Option<ProxyConfig>,
    pub forward_proxy: Option<Url>,
    /// Non-null session cookies for `base_domain`
    pub cookies: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// Config with just a base domain.
    pub fn new(base_domain: &str) -> Result<Self> {
        Ok(Self {
            base_domain: parse_domain(base_domain)?,
            proxy: None,
            forward_proxy: None,
            cookies: BTreeMap::new(),
        })
    }

    /// Resolve a site's config from the sites document and environment.
    ///
    /// The proxy choice happens here, once; requests never re-pick it.
    pub fn build<R: Rng + ?Sized>(
        site: &str,
        flags: SiteFlags,
        sites: &SitesDocument,
        env: &Environment,
        rng: &mut R,
    ) -> Result<Self> {
        let entry = sites
            .entry(site)
            .ok_or_else(|| ScoutError::Config(format!("no entry for site {site} in sites document")))?;

        let proxy = if flags.proxy {
            ProxyConfig::choose(&env.proxy_credentials, rng)
        } else {
            None
        };

        let forward_proxy = match (&env.forward_proxy, flags.forward_proxy) {
            (Some(fp), true) => Some(Url::parse(fp)?),
            _ => None,
        };

        let cookies = entry
            .cookies
            .iter()
            .flatten()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
            .collect();

        Ok(Self {
            base_domain: parse_domain(&entry.url)?,
            proxy,
            forward_proxy,
            cookies,
        })
    }

    /// Base domain without a trailing slash, ready for path concatenation.
    pub fn base(&self) -> &str {
        self.base_domain.as_str().trim_end_matches('/')
    }
}

fn parse_domain(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("https://{raw}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sites() -> SitesDocument {
        SitesDocument::from_json_str(
            r#"{
                "Siti": {
                    "Clicka": {
                        "url": "https://clicka.example",
                        "cookies": { "session": "abc", "device": null }
                    }
                },
                "version": 3
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parse_empty_settings() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.tmdb_language, "it-IT");
        assert_eq!(settings.site_flags("clicka"), SiteFlags::default());
    }

    #[test]
    fn parse_site_flags_and_sources() {
        let settings = Settings::from_toml_str(
            r#"
browser = "firefox"
tesseract_path = "/usr/bin/tesseract"

[sites.Clicka]
proxy = true

[sites.Eurostreaming]
enabled = false

[[domains.sources]]
site = "Clicka"
list_url = "https://paste.example/raw/abc"
line = 5
"#,
        )
        .unwrap();

        assert_eq!(settings.browser, Impersonate::Firefox);
        assert!(settings.site_flags("clicka").proxy);
        assert!(settings.site_flags("clicka").enabled);
        assert!(!settings.site_flags("eurostreaming").enabled);
        assert_eq!(settings.domains.sources[0].line, 5);
        assert!(!settings.domains.sources[0].force_www);
    }

    #[test]
    fn sites_document_accepts_legacy_key_and_keeps_extra() {
        let doc = sites();
        let entry = doc.entry("clicka").unwrap();
        assert_eq!(entry.url, "https://clicka.example");
        let cookies = entry.cookies.as_ref().unwrap();
        assert_eq!(cookies.get("device"), Some(&None));
        assert_eq!(doc.extra.get("version"), Some(&serde_json::json!(3)));
        assert_eq!(doc.key, SitesKey::Legacy);

        let json = doc.to_json_value().unwrap();
        assert!(json.get("Siti").is_some());
        assert!(json.get("sites").is_none());
        assert_eq!(json["version"], 3);
    }

    #[test]
    fn sites_document_writes_back_under_key_it_was_read_from() {
        let dir = std::env::temp_dir().join(format!("mirrorscout-sites-{}", std::process::id()));
        let legacy_path = dir.join("legacy.json");
        sites().save(&legacy_path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&legacy_path).unwrap()).unwrap();
        assert_eq!(written["Siti"]["Clicka"]["url"], "https://clicka.example");
        assert!(written.get("sites").is_none());
        assert_eq!(SitesDocument::load(&legacy_path).unwrap(), sites());

        let current = SitesDocument::from_json_str(r#"{"sites": {"A": {"url": "https://a.test"}}}"#)
            .unwrap();
        assert_eq!(current.key, SitesKey::Sites);
        let json = current.to_json_value().unwrap();
        assert_eq!(json["sites"]["A"]["url"], "https://a.test");
        assert!(json.get("Siti").is_none());
    }

    #[test]
    fn empty_cookie_map_is_kept_apart_from_missing() {
        let doc = SitesDocument::from_json_str(
            r#"{"sites": {"A": {"url": "https://a.test", "cookies": {}}, "B": {"url": "https://b.test"}}}"#,
        )
        .unwrap();
        assert_eq!(doc.entry("a").unwrap().cookies, Some(BTreeMap::new()));
        assert_eq!(doc.entry("b").unwrap().cookies, None);

        let json = doc.to_json_value().unwrap();
        assert_eq!(json["sites"]["A"]["cookies"], serde_json::json!({}));
        assert!(json["sites"]["B"].get("cookies").is_none());
    }

    #[test]
    fn adapter_config_skips_null_cookies_and_disabled_proxy() {
        let env = Environment {
            proxy_credentials: vec!["http://user:pw@proxy:8080".into()],
            forward_proxy: Some("https://fp.example/?u=".into()),
            tmdb_api_key: None,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let config =
            AdapterConfig::build("Clicka", SiteFlags::default(), &sites(), &env, &mut rng).unwrap();

        assert_eq!(config.base(), "https://clicka.example");
        assert_eq!(config.cookies.len(), 1);
        assert_eq!(config.cookies["session"], "abc");
        assert!(config.proxy.is_none());
        assert!(config.forward_proxy.is_none());
    }

    #[test]
    fn adapter_config_picks_proxy_when_enabled() {
        let env = Environment {
            proxy_credentials: vec!["socks5://p1:1080".into()],
            forward_proxy: Some("https://fp.example/".into()),
            tmdb_api_key: None,
        };
        let flags = SiteFlags {
            enabled: true,
            proxy: true,
            forward_proxy: true,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let config = AdapterConfig::build("Clicka", flags, &sites(), &env, &mut rng).unwrap();

        assert_eq!(config.proxy.unwrap().url, "socks5://p1:1080");
        assert_eq!(config.forward_proxy.unwrap().as_str(), "https://fp.example/");
    }

    #[test]
    fn empty_proxy_candidate_means_direct() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(ProxyConfig::choose(&[String::new()], &mut rng), None);
        assert_eq!(ProxyConfig::choose(&[], &mut rng), None);
    }

    #[test]
    fn missing_site_is_config_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let err = AdapterConfig::build(
            "Nowhere",
            SiteFlags::default(),
            &sites(),
            &Environment::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, ScoutError::Config(_)));
    }

    #[test]
    fn bare_host_gets_https() {
        let config = AdapterConfig::new("eurostreaming.example").unwrap();
        assert_eq!(config.base(), "https://eurostreaming.example");
    }
}
