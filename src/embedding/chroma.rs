//! Chroma HTTP client.
//!
//! Talks to a Chroma server whose collection is configured with a
//! server-side embedding function, so this client only ships documents and
//! queries as text. The collection is resolved lazily on first use and the
//! UUID is cached for the life of the client.

use super::VectorIndex;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ChromaClient {
    client: Client,
    base_url: String,
    collection_name: String,
    collection_id: Mutex<Option<String>>,
}

impl ChromaClient {
    pub fn new(base_url: impl Into<String>, collection_name: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            collection_name: collection_name.into(),
            collection_id: Mutex::new(None),
        })
    }

    async fn collection_id(&self) -> Result<String> {
        let mut cached = self.collection_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let url = format!("{}/api/v1/collections", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "name": self.collection_name,
                "get_or_create": true,
            }))
            .send()
            .await
            .context("Failed to reach Chroma")?;

        if !response.status().is_success() {
            bail!(
                "Chroma collection lookup failed with status {}",
                response.status()
            );
        }

        #[derive(Deserialize)]
        struct Collection {
            id: String,
        }
        let collection: Collection = response.json().await?;
        *cached = Some(collection.id.clone());
        Ok(collection.id)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    distances: Option<Vec<Vec<f32>>>,
}

#[async_trait]
impl VectorIndex for ChromaClient {
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()> {
        let collection_id = self.collection_id().await?;
        let url = format!(
            "{}/api/v1/collections/{}/upsert",
            self.base_url, collection_id
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "ids": [id],
                "documents": [text],
                "metadatas": [metadata],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            bail!(
                "Chroma upsert for {} failed with status {}",
                id,
                response.status()
            );
        }
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let collection_id = self.collection_id().await?;
        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, collection_id
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "query_texts": [query],
                "n_results": k,
                "include": ["distances"],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Chroma query failed with status {}", response.status());
        }

        let body: QueryResponse = response.json().await?;
        let ids = body.ids.into_iter().next().unwrap_or_default();
        let distances = body
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        // Chroma returns distances (smaller is closer); surface them as
        // negated scores so larger means more similar.
        let results = ids
            .into_iter()
            .zip(distances.into_iter().chain(std::iter::repeat(0.0)))
            .map(|(id, distance)| (id, -distance))
            .collect();
        Ok(results)
    }
}
