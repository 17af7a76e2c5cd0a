mod api;


pub use api::JellyfinApi;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::traits::{MediaServer, PlaybackInfoRequest, StreamEndpoint};
use crate::config::ServerConfig;
use crate::models::{
    EpisodeSummary, ItemDetails, MediaItemId, MediaSourceId, PlaybackInfo, ProgressReport,
    SeriesId,
};

/// Jellyfin media server as seen by the playback engine.
#[derive(Debug, Clone)]
pub struct JellyfinBackend {
    api: JellyfinApi,
}

impl JellyfinBackend {
    pub fn new(api: JellyfinApi) -> Self {
        Self { api }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        info!("Connecting Jellyfin backend at {}", config.url);
        let api = JellyfinApi::new(
            &config.url,
            &config.access_token,
            &config.user_id,
            &config.device_id,
            &config.device_name,
        )?;
        Ok(Self::new(api))
    }
}

#[async_trait]
impl MediaServer for JellyfinBackend {
    async fn get_item(&self, item_id: &MediaItemId) -> Result<ItemDetails> {
        self.api.get_item(item_id).await
    }

    async fn get_playback_info(
        &self,
        item_id: &MediaItemId,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfo> {
        self.api.get_playback_info(item_id, request).await
    }

    async fn get_episodes(&self, series_id: &SeriesId) -> Result<Vec<EpisodeSummary>> {
        self.api.get_episodes(series_id).await
    }

    async fn fetch_subtitle(
        &self,
        item_id: &MediaItemId,
        media_source_id: &MediaSourceId,
        stream_index: u32,
    ) -> Result<String> {
        self.api
            .fetch_subtitle(item_id, media_source_id, stream_index)
            .await
    }

    async fn report_playback_start(&self, report: &ProgressReport) -> Result<()> {
        self.api.report_playback_start(report).await
    }

    async fn report_playback_progress(&self, report: &ProgressReport) -> Result<()> {
        self.api.report_playback_progress(report).await
    }

    async fn report_playback_stopped(&self, report: &ProgressReport) -> Result<()> {
        self.api.report_playback_stopped(report).await
    }

    fn stream_endpoint(&self) -> StreamEndpoint {
        StreamEndpoint {
            base_url: self.api.base_url().to_string(),
            access_token: self.api.access_token().to_string(),
            device_id: self.api.device_id().to_string(),
        }
    }
}
