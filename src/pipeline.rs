//! Resolution pipeline.
//!
//! Drives one [`SiteAdapter`] through search, selection, locate and extract.
//! Every stage is a hard gate: the first one that comes up empty (or fails)
//! ends the run with [`Resolution::NotFound`] naming that stage. Errors are
//! logged here and never reach the caller.

use std::fmt;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::metadata::{ContentQuery, MetadataProvider};
use crate::site::{normalize_player_url, SiteAdapter, StreamLink};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Metadata,
    Search,
    Select,
    Locate,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Metadata => "metadata",
            Stage::Search => "search",
            Stage::Select => "select",
            Stage::Locate => "locate",
            Stage::Extract => "extract",
        })
    }
}

/// Outcome of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `links` is never empty and keeps the adapter's document order.
    Found {
        site: &'static str,
        links: Vec<StreamLink>,
    },
    /// Nothing found; the stage that came up empty.
    NotFound(Stage),
}

impl Resolution {
    /// First link, the one a caller without its own preference should use.
    pub fn best(&self) -> Option<&StreamLink> {
        match self {
            Resolution::Found { links, .. } => links.first(),
            Resolution::NotFound(_) => None,
        }
    }

    pub fn links(&self) -> &[StreamLink] {
        match self {
            Resolution::Found { links, .. } => links,
            Resolution::NotFound(_) => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    /// Site that produced the links.
    pub fn site(&self) -> Option<&'static str> {
        match self {
            Resolution::Found { site, .. } => Some(site),
            Resolution::NotFound(_) => None,
        }
    }
}

/// Metadata provider plus one adapter.
pub struct Pipeline {
    metadata: Arc<dyn MetadataProvider>,
    adapter: Arc<dyn SiteAdapter>,
}

impl Pipeline {
    pub fn new(metadata: Arc<dyn MetadataProvider>, adapter: Arc<dyn SiteAdapter>) -> Self {
        Self { metadata, adapter }
    }

    /// Resolve a content id to stream links.
    pub async fn resolve(&self, id: &str) -> Resolution {
        match fetch_query(&*self.metadata, id).await {
            Some(query) => self.resolve_query(&query).await,
            None => Resolution::NotFound(Stage::Metadata),
        }
    }

    /// Run the adapter stages for an already-known query.
    pub async fn resolve_query(&self, query: &ContentQuery) -> Resolution {
        run_adapter(&*self.adapter, query).await
    }
}

/// Fetch metadata once, then run every adapter concurrently.
///
/// Returns the first `Found` in completion order; the remaining runs are
/// dropped. When every adapter comes up empty, the furthest stage any of them
/// reached is reported.
#[instrument(skip(metadata, adapters), fields(adapters = adapters.len()))]
pub async fn race(
    metadata: &dyn MetadataProvider,
    adapters: &[Arc<dyn SiteAdapter>],
    id: &str,
) -> Resolution {
    let Some(query) = fetch_query(metadata, id).await else {
        return Resolution::NotFound(Stage::Metadata);
    };
    race_query(adapters, &query).await
}

/// [`race`] for an already-known query.
pub async fn race_query(adapters: &[Arc<dyn SiteAdapter>], query: &ContentQuery) -> Resolution {
    let mut runs: FuturesUnordered<_> = adapters
        .iter()
        .map(|adapter| run_adapter(&**adapter, query))
        .collect();

    let mut furthest = Stage::Search;
    while let Some(resolution) = runs.next().await {
        match resolution {
            Resolution::NotFound(stage) => furthest = furthest.max(stage),
            found => return found,
        }
    }
    Resolution::NotFound(furthest)
}

async fn fetch_query(metadata: &dyn MetadataProvider, id: &str) -> Option<ContentQuery> {
    match metadata.content_info(id).await {
        Ok(Some(query)) => {
            debug!(provider = metadata.name(), id, %query, "Metadata resolved");
            Some(query)
        }
        Ok(None) => {
            info!(provider = metadata.name(), id, "No metadata for id");
            None
        }
        Err(e) => {
            warn!(provider = metadata.name(), id, stage = %Stage::Metadata, "Metadata lookup failed: {}", e);
            None
        }
    }
}

#[instrument(skip(adapter, query), fields(site = adapter.name(), query = %query))]
async fn run_adapter(adapter: &dyn SiteAdapter, query: &ContentQuery) -> Resolution {
    let site = adapter.name();
    let not_found = |stage: Stage| {
        debug!(site, %stage, "Not found");
        Resolution::NotFound(stage)
    };

    let results = match adapter.search(query).await {
        Ok(results) => results,
        Err(e) => {
            warn!(site, stage = %Stage::Search, "Search failed: {}", e);
            return not_found(Stage::Search);
        }
    };
    if results.is_empty() {
        return not_found(Stage::Search);
    }

    let total = results.len();
    let Some(best) = results.into_iter().find(|r| r.kind == query.kind()) else {
        debug!(site, total, kind = %query.kind(), "No result of the query's kind");
        return not_found(Stage::Select);
    };
    debug!(site, title = %best.title, link = %best.link, "Selected result");

    let page = match adapter.locate(&best, query).await {
        Ok(Some(page)) => page,
        Ok(None) => return not_found(Stage::Locate),
        Err(e) => {
            warn!(site, stage = %Stage::Locate, "Locate failed: {}", e);
            return not_found(Stage::Locate);
        }
    };

    let links: Vec<StreamLink> = match adapter.extract_streams(&page).await {
        Ok(links) => links
            .into_iter()
            .map(|link| StreamLink {
                url: normalize_player_url(&link.url),
                quality: link.quality,
            })
            .filter(|link| !link.url.is_empty())
            .collect(),
        Err(e) => {
            warn!(site, stage = %Stage::Extract, "Extract failed: {}", e);
            return not_found(Stage::Extract);
        }
    };
    if links.is_empty() {
        return not_found(Stage::Extract);
    }

    info!(site, count = links.len(), best = %links[0].url, "Resolved");
    Resolution::Found { site, links }
}
