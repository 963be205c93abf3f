//! TMDB v3 metadata provider
//!
//! IMDb ids go through `/find`, TMDB ids through `/movie/{id}` or `/tv/{id}`.
//! The credential may be a v3 API key (sent as `api_key`) or a v4 read
//! access token (a JWT, sent as a bearer header).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ContentId, ContentKind, ContentQuery, IdSource, MetadataProvider};
use crate::error::{Result, ScoutError};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

pub struct TmdbMetadata {
    client: Client,
    credential: String,
    language: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TmdbItem {
    #[serde(alias = "name")]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbFindResult {
    #[serde(default)]
    movie_results: Vec<TmdbItem>,
    #[serde(default)]
    tv_results: Vec<TmdbItem>,
}

impl TmdbMetadata {
    pub fn new(credential: impl Into<String>, language: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mirrorscout/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            credential: credential.into(),
            language: language.into(),
            base_url: TMDB_API_BASE.to_string(),
        })
    }

    /// v4 tokens are JWTs; v3 keys are hex strings.
    fn is_access_token(&self) -> bool {
        self.credential.starts_with("eyJ")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a TMDB endpoint. `Ok(None)` on 404.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let mut request = self
            .client
            .get(self.endpoint(path))
            .header("Accept", "application/json")
            .query(&[("language", self.language.as_str())])
            .query(extra);

        request = if self.is_access_token() {
            request.bearer_auth(&self.credential)
        } else {
            request.query(&[("api_key", self.credential.as_str())])
        };

        let resp = request.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ScoutError::Metadata(format!(
                "TMDB {path} returned {}",
                resp.status()
            )));
        }
        Ok(Some(resp.json().await?))
    }

    async fn title_for(&self, id: &ContentId) -> Result<Option<String>> {
        let title = match &id.source {
            IdSource::Imdb(imdb) => {
                let found: Option<TmdbFindResult> = self
                    .get_json(&format!("/find/{imdb}"), &[("external_source", "imdb_id")])
                    .await?;
                found.and_then(|f| {
                    let results = match id.kind() {
                        ContentKind::Movie => f.movie_results,
                        ContentKind::Series => f.tv_results,
                    };
                    results.into_iter().next().and_then(|item| item.title)
                })
            }
            IdSource::Tmdb(tmdb) => {
                let path = match id.kind() {
                    ContentKind::Movie => format!("/movie/{tmdb}"),
                    ContentKind::Series => format!("/tv/{tmdb}"),
                };
                let item: Option<TmdbItem> = self.get_json(&path, &[]).await?;
                item.and_then(|item| item.title)
            }
        };
        Ok(title.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl MetadataProvider for TmdbMetadata {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    #[instrument(skip(self))]
    async fn content_info(&self, id: &str) -> Result<Option<ContentQuery>> {
        let content_id = ContentId::parse(id)?;
        let Some(title) = self.title_for(&content_id).await? else {
            debug!("No TMDB entry");
            return Ok(None);
        };

        Ok(Some(match content_id.episode {
            Some(ep) => ContentQuery::episode(title, ep.season, ep.episode),
            None => ContentQuery::movie(title),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_kind_detection() {
        let key = TmdbMetadata::new("0123456789abcdef", "it-IT").unwrap();
        assert!(!key.is_access_token());

        let token = TmdbMetadata::new("eyJhbGciOiJIUzI1NiJ9.x.y", "it-IT").unwrap();
        assert!(token.is_access_token());
    }

    #[test]
    fn find_result_uses_name_for_tv() {
        let found: TmdbFindResult = serde_json::from_str(
            r#"{"movie_results": [], "tv_results": [{"id": 1396, "name": "Breaking Bad"}]}"#,
        )
        .unwrap();
        assert!(found.movie_results.is_empty());
        assert_eq!(found.tv_results[0].title.as_deref(), Some("Breaking Bad"));
    }

    #[test]
    fn movie_item_uses_title() {
        let item: TmdbItem =
            serde_json::from_str(r#"{"id": 603, "title": "Matrix", "overview": "..."}"#).unwrap();
        assert_eq!(item.title.as_deref(), Some("Matrix"));
    }

    #[tokio::test]
    async fn invalid_id_fails_before_network() {
        let provider = TmdbMetadata::new("key", "it-IT").unwrap();
        let err = provider.content_info("not-an-id").await.unwrap_err();
        assert!(matches!(err, ScoutError::InvalidId(_)));
    }
}
