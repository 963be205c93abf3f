//! `mirrorscout` - resolve movies and TV episodes to embedded player URLs
//!
//! # Features
//!
//! - **Site adapters**: search, episode lookup and player extraction for
//!   mirror aggregator sites behind one [`SiteAdapter`] contract
//! - **CAPTCHA OCR**: Otsu-thresholded images fed to `tesseract`
//! - **Browser impersonation**: Chrome/Firefox/Safari header profiles,
//!   per-site proxies and session cookies
//! - **Domain refresh**: follow mirrors as they hop domains
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mirrorscout::config::{Environment, Settings, SitesDocument};
//! use mirrorscout::{build_adapters, race, TmdbMetadata};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let env = Environment::from_env()?;
//!     let sites = SitesDocument::load(&settings.sites_path())?;
//!
//!     let metadata = TmdbMetadata::new(env.tmdb_api_key.clone().unwrap_or_default(), "it-IT")?;
//!     let adapters = build_adapters(&settings, &sites, &env);
//!
//!     if let Some(link) = race(&metadata, &adapters, "tt0133093").await.best() {
//!         println!("{}", link.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod captcha;
pub mod config;
pub mod domains;
pub mod error;
pub mod fingerprint;
pub mod form;
pub mod http_client;
pub mod metadata;
pub mod pipeline;
pub mod site;

pub use captcha::{CaptchaChallenge, CaptchaOutcome, CaptchaSolver, OcrSolver};
pub use config::{AdapterConfig, Environment, ProxyConfig, Settings, SitesDocument};
pub use domains::{DomainRefresher, RefreshReport};
pub use error::{Result, ScoutError};
pub use fingerprint::{chrome_profile, firefox_profile, random_profile, safari_profile, BrowserProfile, Impersonate};
pub use form::Form;
pub use http_client::{AcceleratedClient, ClientOptions, FetchedPage, Transport};
pub use metadata::{ContentId, ContentKind, ContentQuery, FixedMetadata, MetadataProvider, TmdbMetadata};
pub use pipeline::{race, race_query, Pipeline, Resolution, Stage};
pub use site::{build_adapter, build_adapters, SearchResult, SiteAdapter, SiteKey, StreamLink};

/// Version of mirrorscout
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
