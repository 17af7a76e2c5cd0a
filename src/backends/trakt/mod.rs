use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use super::traits::WatchHistoryService;
use crate::config::WatchHistoryConfig;
use crate::models::{ProviderIds, ScrobbleKind, ScrobbleRequest};

const TRAKT_API_VERSION: &str = "2";

/// Trakt "sync history" client used to mark finished items as watched.
#[derive(Clone)]
pub struct TraktClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    access_token: String,
}

impl std::fmt::Debug for TraktClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraktClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TraktClient {
    pub fn new(base_url: &str, client_id: &str, access_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Returns `None` when the watch-history section is disabled or incomplete.
    pub fn from_config(config: &WatchHistoryConfig) -> Result<Option<Self>> {
        let token = match config.access_token.as_deref() {
            Some(token) if config.enabled && !token.is_empty() && !config.client_id.is_empty() => {
                token
            }
            _ => return Ok(None),
        };
        info!("Watch history enabled via {}", config.base_url);
        Self::new(&config.base_url, &config.client_id, token).map(Some)
    }

    fn history_body(request: &ScrobbleRequest) -> Value {
        let ids = ids_json(&request.provider_ids);
        let watched_at = request.watched_at.to_rfc3339();

        match request.kind {
            ScrobbleKind::Episode { season, episode } => json!({
                "shows": [{
                    "title": request.title,
                    "ids": ids,
                    "seasons": [{
                        "number": season,
                        "episodes": [{ "number": episode, "watched_at": watched_at }]
                    }]
                }]
            }),
            ScrobbleKind::Movie => json!({
                "movies": [{
                    "title": request.title,
                    "ids": ids,
                    "watched_at": watched_at
                }]
            }),
        }
    }
}

fn ids_json(ids: &ProviderIds) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(imdb) = &ids.imdb {
        map.insert("imdb".into(), json!(imdb));
    }
    // Trakt expects numeric tmdb/tvdb ids
    if let Some(tmdb) = ids.tmdb.as_deref().and_then(|v| v.parse::<u64>().ok()) {
        map.insert("tmdb".into(), json!(tmdb));
    }
    if let Some(tvdb) = ids.tvdb.as_deref().and_then(|v| v.parse::<u64>().ok()) {
        map.insert("tvdb".into(), json!(tvdb));
    }
    Value::Object(map)
}

#[async_trait]
impl WatchHistoryService for TraktClient {
    async fn mark_watched(&self, request: &ScrobbleRequest) -> Result<()> {
        if request.provider_ids.is_empty() {
            return Err(anyhow!("No provider ids for {}", request.title));
        }

        let url = format!("{}/sync/history", self.base_url);
        debug!("Marking {} as watched", request.title);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("trakt-api-version", TRAKT_API_VERSION)
            .header("trakt-api-key", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&Self::history_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to add {} to watch history: {}",
                request.title,
                response.status()
            ));
        }

        info!("Added {} to watch history", request.title);
        Ok(())
    }
}
