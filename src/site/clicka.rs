//! Clicka adapter (DooPlay-themed mirror).
//!
//! Search is split by section (`/film/` and `/serie-tv/`) and may be gated by
//! an image CAPTCHA. Episodes are listed under `.episodios`, players live in
//! `.dooplay_player`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{
    extract_players, fetch_page, locate_with_listing, parse_search_results, search_terms,
    EpisodeListing, LabelGrammar, Page, SearchResult, SiteAdapter, StreamLink,
};
use crate::captcha::{CaptchaChallenge, CaptchaOutcome, CaptchaSolver};
use crate::config::AdapterConfig;
use crate::error::Result;
use crate::http_client::Transport;
use crate::metadata::{ContentKind, ContentQuery};

const SEARCH_ITEMS: &str = ".result-item";
const SEARCH_LINK: &str = ".title a";
const CAPTCHA_MARKER: &str = r#"img[src*="captcha"]"#;
const CAPTCHA_FIELD: &str = "captcha";
const PLAYER_SCOPE: &str = ".dooplay_player";

const EPISODES: EpisodeListing = EpisodeListing {
    entries: ".episodios li",
    link: Some("a"),
    grammars: &[LabelGrammar::SeasonEpisode],
};

pub struct ClickaAdapter {
    config: AdapterConfig,
    transport: Arc<dyn Transport>,
    solver: Arc<dyn CaptchaSolver>,
}

impl ClickaAdapter {
    pub fn new(
        config: AdapterConfig,
        transport: Arc<dyn Transport>,
        solver: Arc<dyn CaptchaSolver>,
    ) -> Self {
        Self {
            config,
            transport,
            solver,
        }
    }

    pub fn search_url(&self, query: &ContentQuery) -> String {
        let section = match query.kind() {
            ContentKind::Movie => "film",
            ContentKind::Series => "serie-tv",
        };
        format!(
            "{}/{section}/?s={}",
            self.config.base(),
            search_terms(query.title())
        )
    }

    /// Answer the challenge and return the page to parse results from.
    ///
    /// Any failure along the way hands back `original` unchanged.
    async fn pass_challenge(&self, challenge: CaptchaChallenge, original: Page) -> Page {
        let answer = match self.solver.solve(&challenge.image_url).await {
            CaptchaOutcome::Solved(answer) => answer,
            CaptchaOutcome::Unsolved => {
                warn!(site = "clicka", "Captcha unsolved, parsing the unsubmitted page");
                return original;
            }
        };

        let fields = challenge.submission(CAPTCHA_FIELD, &answer);
        let submitted = self
            .transport
            .post_form(&challenge.form_action, &fields)
            .await
            .and_then(crate::http_client::FetchedPage::error_for_status);

        match submitted {
            Ok(response) => {
                debug!(action = %challenge.form_action, "Captcha answer submitted");
                response.into()
            }
            Err(e) => {
                warn!(site = "clicka", "Captcha submission failed: {}", e);
                original
            }
        }
    }
}

#[async_trait]
impl SiteAdapter for ClickaAdapter {
    fn name(&self) -> &'static str {
        "clicka"
    }

    #[instrument(skip(self, query), fields(site = "clicka", query = %query))]
    async fn search(&self, query: &ContentQuery) -> Result<Vec<SearchResult>> {
        let search_url = self.search_url(query);
        let mut page = fetch_page(&*self.transport, &search_url).await?;

        if let Some(challenge) = CaptchaChallenge::detect(&page, CAPTCHA_MARKER)? {
            debug!(image = %challenge.image_url, "Captcha challenge detected");
            page = self.pass_challenge(challenge, page).await;
        }

        let results = parse_search_results(&page, SEARCH_ITEMS, SEARCH_LINK)?;
        debug!(count = results.len(), "Search results parsed");
        Ok(results)
    }

    #[instrument(skip(self, result), fields(site = "clicka", link = %result.link))]
    async fn locate(&self, result: &SearchResult, query: &ContentQuery) -> Result<Option<Page>> {
        locate_with_listing(&*self.transport, &EPISODES, result, query).await
    }

    async fn extract_streams(&self, page: &Page) -> Result<Vec<StreamLink>> {
        extract_players(page, PLAYER_SCOPE)
    }
}
