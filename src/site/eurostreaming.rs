//! Eurostreaming adapter (WordPress-themed mirror).
//!
//! One search endpoint for both kinds; the result link's shape tells them
//! apart. Episode anchors are scattered through the post body, labelled
//! either `S01E02` or `1×2`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{
    extract_players, fetch_page, locate_with_listing, parse_search_results, search_terms,
    EpisodeListing, LabelGrammar, Page, SearchResult, SiteAdapter, StreamLink,
};
use crate::config::AdapterConfig;
use crate::error::Result;
use crate::http_client::Transport;
use crate::metadata::ContentQuery;

const SEARCH_ITEMS: &str = ".entry-title";
const SEARCH_LINK: &str = "a";
const PLAYER_SCOPE: &str = ".entry-content";

const EPISODES: EpisodeListing = EpisodeListing {
    entries: "a",
    link: None,
    grammars: &[LabelGrammar::SeasonEpisode, LabelGrammar::Cross],
};

pub struct EurostreamingAdapter {
    config: AdapterConfig,
    transport: Arc<dyn Transport>,
}

impl EurostreamingAdapter {
    pub fn new(config: AdapterConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn search_url(&self, query: &ContentQuery) -> String {
        format!("{}/?s={}", self.config.base(), search_terms(query.title()))
    }
}

#[async_trait]
impl SiteAdapter for EurostreamingAdapter {
    fn name(&self) -> &'static str {
        "eurostreaming"
    }

    #[instrument(skip(self, query), fields(site = "eurostreaming", query = %query))]
    async fn search(&self, query: &ContentQuery) -> Result<Vec<SearchResult>> {
        let page = fetch_page(&*self.transport, &self.search_url(query)).await?;
        let results = parse_search_results(&page, SEARCH_ITEMS, SEARCH_LINK)?;
        debug!(count = results.len(), "Search results parsed");
        Ok(results)
    }

    #[instrument(skip(self, result), fields(site = "eurostreaming", link = %result.link))]
    async fn locate(&self, result: &SearchResult, query: &ContentQuery) -> Result<Option<Page>> {
        locate_with_listing(&*self.transport, &EPISODES, result, query).await
    }

    async fn extract_streams(&self, page: &Page) -> Result<Vec<StreamLink>> {
        extract_players(page, PLAYER_SCOPE)
    }
}
