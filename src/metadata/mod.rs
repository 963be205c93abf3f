//! Content identifiers and metadata lookup.
//!
//! A content id names a movie (`tt0133093`, `tmdb:603`) or one episode of a
//! series (`tt0903747:3:7`, `tmdb:1396:3:7`). A [`MetadataProvider`] turns it
//! into the [`ContentQuery`] that adapters search with.

pub mod tmdb;

use std::fmt;

use async_trait::async_trait;

use crate::error::{Result, ScoutError};

pub use tmdb::TmdbMetadata;

/// Movie or series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Movie,
    Series,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Movie => f.write_str("movie"),
            ContentKind::Series => f.write_str("series"),
        }
    }
}

/// Season and episode number of one episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
}

/// What to look for on a site.
///
/// Season and episode are present exactly when the kind is [`ContentKind::Series`];
/// the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    title: String,
    episode: Option<EpisodeRef>,
}

impl ContentQuery {
    pub fn movie(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            episode: None,
        }
    }

    pub fn episode(title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            title: title.into(),
            episode: Some(EpisodeRef { season, episode }),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> ContentKind {
        if self.episode.is_some() {
            ContentKind::Series
        } else {
            ContentKind::Movie
        }
    }

    pub fn episode_ref(&self) -> Option<EpisodeRef> {
        self.episode
    }
}

impl fmt::Display for ContentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.episode {
            Some(EpisodeRef { season, episode }) => {
                write!(f, "{} S{season:02}E{episode:02}", self.title)
            }
            None => f.write_str(&self.title),
        }
    }
}

/// External catalog an id points into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// IMDb id, `tt` prefix included
    Imdb(String),
    Tmdb(u64),
}

/// Parsed content identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentId {
    pub source: IdSource,
    pub episode: Option<EpisodeRef>,
}

impl ContentId {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || ScoutError::InvalidId(raw.to_string());
        let raw = raw.trim();

        let (source, rest) = if let Some(rest) = raw.strip_prefix("tmdb:") {
            let (id, rest) = rest.split_once(':').map_or((rest, None), |(a, b)| (a, Some(b)));
            let id = id.parse::<u64>().map_err(|_| invalid())?;
            (IdSource::Tmdb(id), rest)
        } else if raw.starts_with("tt") {
            let (id, rest) = raw.split_once(':').map_or((raw, None), |(a, b)| (a, Some(b)));
            if id.len() <= 2 || !id[2..].bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            (IdSource::Imdb(id.to_string()), rest)
        } else {
            return Err(invalid());
        };

        let episode = match rest {
            None => None,
            Some(rest) => {
                let (season, episode) = rest.split_once(':').ok_or_else(invalid)?;
                Some(EpisodeRef {
                    season: season.parse().map_err(|_| invalid())?,
                    episode: episode.parse().map_err(|_| invalid())?,
                })
            }
        };

        Ok(Self { source, episode })
    }

    pub fn is_movie(&self) -> bool {
        self.episode.is_none()
    }

    pub fn kind(&self) -> ContentKind {
        if self.is_movie() {
            ContentKind::Movie
        } else {
            ContentKind::Series
        }
    }
}

/// Source of titles for content ids.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Look up title (and episode coordinates) for `id`.
    ///
    /// `Ok(None)` means the catalog has no such content.
    async fn content_info(&self, id: &str) -> Result<Option<ContentQuery>>;

    /// Whether `id` names a movie rather than an episode.
    async fn is_movie(&self, id: &str) -> Result<bool> {
        Ok(ContentId::parse(id)?.is_movie())
    }
}

/// Answers every id with the same query.
#[derive(Debug, Clone)]
pub struct FixedMetadata {
    query: ContentQuery,
}

impl FixedMetadata {
    pub fn new(query: ContentQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl MetadataProvider for FixedMetadata {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn content_info(&self, _id: &str) -> Result<Option<ContentQuery>> {
        Ok(Some(self.query.clone()))
    }

    async fn is_movie(&self, _id: &str) -> Result<bool> {
        Ok(self.query.kind() == ContentKind::Movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_imdb_movie() {
        let id = ContentId::parse("tt0133093").unwrap();
        assert_eq!(id.source, IdSource::Imdb("tt0133093".into()));
        assert!(id.is_movie());
    }

    #[test]
    fn parse_imdb_episode() {
        let id = ContentId::parse("tt0903747:3:7").unwrap();
        assert_eq!(id.episode, Some(EpisodeRef { season: 3, episode: 7 }));
        assert_eq!(id.kind(), ContentKind::Series);
    }

    #[test]
    fn parse_tmdb_ids() {
        let movie = ContentId::parse("tmdb:603").unwrap();
        assert_eq!(movie.source, IdSource::Tmdb(603));
        assert!(movie.is_movie());

        let episode = ContentId::parse("tmdb:1396:1:2").unwrap();
        assert_eq!(episode.source, IdSource::Tmdb(1396));
        assert_eq!(episode.episode, Some(EpisodeRef { season: 1, episode: 2 }));
    }

    #[test]
    fn reject_malformed_ids() {
        for raw in ["", "tt", "ttabc", "tmdb:", "tmdb:x", "tt123:1", "tt123:a:b", "imdb:1"] {
            assert!(
                matches!(ContentId::parse(raw), Err(ScoutError::InvalidId(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn query_kind_follows_episode() {
        let movie = ContentQuery::movie("Example Movie");
        assert_eq!(movie.kind(), ContentKind::Movie);
        assert_eq!(movie.episode_ref(), None);

        let episode = ContentQuery::episode("Example Show", 1, 2);
        assert_eq!(episode.kind(), ContentKind::Series);
        assert_eq!(
            episode.episode_ref(),
            Some(EpisodeRef {
                season: 1,
                episode: 2
            })
        );
        assert_eq!(episode.to_string(), "Example Show S01E02");
    }

    #[tokio::test]
    async fn fixed_metadata_answers_any_id() {
        let provider = FixedMetadata::new(ContentQuery::episode("Show", 2, 3));
        let query = provider.content_info("whatever").await.unwrap().unwrap();
        assert_eq!(query.title(), "Show");
        assert!(!provider.is_movie("whatever").await.unwrap());
    }
}
