//! SearxNG metasearch client used as the tempo-hint source.

use super::{SearchHit, TempoHintSource};
use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SearxClient {
    client: Client,
    base_url: String,
    engines: String,
}

impl SearxClient {
    pub fn new(base_url: impl Into<String>, engines: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            engines: engines.into(),
        })
    }
}

#[derive(Deserialize)]
struct SearxResponse {
    results: Option<Vec<SearxResult>>,
}

#[derive(Deserialize)]
struct SearxResult {
    title: Option<String>,
    content: Option<String>,
}

#[async_trait]
impl TempoHintSource for SearxClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/search?q={}&format=json&engines={}",
            self.base_url,
            urlencoding::encode(query),
            self.engines
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Searx query failed with status {}", response.status());
        }

        let body: SearxResponse = response.json().await?;
        let hits = body
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|result| {
                let snippet = result.content?;
                Some(SearchHit {
                    snippet,
                    content: result.title.unwrap_or_default(),
                })
            })
            .collect();

        Ok(hits)
    }
}
