//! Genius API client: song search, song details, page fetching.

use super::{ContextSource, SongDetails};
use crate::matching::{CandidateKind, MatchCandidate};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.genius.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GeniusClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeniusClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn authorized(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    meta: Meta,
    response: Option<SearchBody>,
}

#[derive(Deserialize)]
struct Meta {
    status: u16,
}

#[derive(Deserialize)]
struct SearchBody {
    hits: Vec<SearchHitRaw>,
}

#[derive(Deserialize)]
struct SearchHitRaw {
    #[serde(rename = "type")]
    hit_type: Option<String>,
    result: Option<HitResult>,
}

#[derive(Deserialize)]
struct HitResult {
    id: Option<i64>,
    title: Option<String>,
    primary_artist: Option<ArtistRaw>,
}

#[derive(Deserialize)]
struct ArtistRaw {
    name: Option<String>,
}

#[derive(Deserialize)]
struct SongResponse {
    response: Option<SongBody>,
}

#[derive(Deserialize)]
struct SongBody {
    song: Option<SongRaw>,
}

#[derive(Deserialize)]
struct SongRaw {
    title: Option<String>,
    album: Option<AlbumRaw>,
    primary_artist: Option<ArtistRaw>,
    description: Option<DescriptionRaw>,
    release_date: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct AlbumRaw {
    name: Option<String>,
}

#[derive(Deserialize)]
struct DescriptionRaw {
    plain: Option<String>,
}

#[async_trait]
impl ContextSource for GeniusClient {
    async fn search(&self, title: &str, artist: &str) -> Result<Vec<MatchCandidate>> {
        let query = urlencoding::encode(&format!("{} {}", title, artist)).into_owned();
        let url = format!("{}/search?q={}", self.base_url, query);

        let response = self.authorized(&url).send().await?;
        if !response.status().is_success() {
            bail!("Genius search failed with status {}", response.status());
        }

        let body: SearchResponse = response.json().await?;
        if body.meta.status != 200 {
            bail!("Genius search failed with API status {}", body.meta.status);
        }

        let hits = body.response.map(|r| r.hits).unwrap_or_default();
        let candidates = hits
            .into_iter()
            .filter_map(|hit| {
                // Hits without a complete (id, title, artist) triple can't be
                // scored and are dropped here, not scored as zero matches.
                let hit_type = hit.hit_type?;
                let result = hit.result?;
                let id = result.id?;
                let title = result.title?;
                let artist = result.primary_artist?.name?;
                let kind = if hit_type == "song" {
                    CandidateKind::Song
                } else {
                    CandidateKind::Other
                };
                Some(MatchCandidate {
                    id: id.to_string(),
                    title,
                    artist,
                    kind,
                })
            })
            .collect();

        Ok(candidates)
    }

    async fn fetch_details(&self, candidate_id: &str) -> Result<SongDetails> {
        let url = format!(
            "{}/songs/{}?text_format=plain",
            self.base_url, candidate_id
        );

        let response = self.authorized(&url).send().await?;
        if !response.status().is_success() {
            bail!(
                "Genius song fetch for {} failed with status {}",
                candidate_id,
                response.status()
            );
        }

        let body: SongResponse = response.json().await?;
        let song = body
            .response
            .and_then(|r| r.song)
            .with_context(|| format!("Genius song {} has no body", candidate_id))?;

        Ok(SongDetails {
            title: song
                .title
                .with_context(|| format!("Genius song {} has no title", candidate_id))?,
            artist: song
                .primary_artist
                .and_then(|a| a.name)
                .with_context(|| format!("Genius song {} has no artist", candidate_id))?,
            album: song.album.and_then(|a| a.name),
            description: song
                .description
                .and_then(|d| d.plain)
                .unwrap_or_default(),
            release_date: song.release_date,
            page_url: song
                .url
                .with_context(|| format!("Genius song {} has no page URL", candidate_id))?,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            bail!("Fetching {} failed with status {}", url, response.status());
        }
        Ok(response.text().await?)
    }
}
