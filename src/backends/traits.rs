use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    EpisodeSummary, ItemDetails, MediaItemId, MediaSourceId, PlaybackInfo, ProgressReport,
    ScrobbleRequest, SeriesId, Ticks,
};

/// Parameters needed to build a stream URL without a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub base_url: String,
    pub access_token: String,
    pub device_id: String,
}

/// Options forwarded with the playback-info request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInfoRequest {
    pub start_position: Ticks,
    pub max_streaming_bitrate: u64,
    pub audio_stream_index: Option<u32>,
}

#[async_trait]
pub trait MediaServer: Send + Sync + std::fmt::Debug {
    /// Item-detail fetch: title, resume position, played flag, provider ids.
    async fn get_item(&self, item_id: &MediaItemId) -> Result<ItemDetails>;

    /// Playback-info fetch: media sources and the server-issued session id.
    async fn get_playback_info(
        &self,
        item_id: &MediaItemId,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfo>;

    /// All episodes of a series, in any order.
    async fn get_episodes(&self, series_id: &SeriesId) -> Result<Vec<EpisodeSummary>>;

    /// Subtitle stream as raw timed text.
    async fn fetch_subtitle(
        &self,
        item_id: &MediaItemId,
        media_source_id: &MediaSourceId,
        stream_index: u32,
    ) -> Result<String>;

    async fn report_playback_start(&self, report: &ProgressReport) -> Result<()>;

    async fn report_playback_progress(&self, report: &ProgressReport) -> Result<()>;

    async fn report_playback_stopped(&self, report: &ProgressReport) -> Result<()>;

    fn stream_endpoint(&self) -> StreamEndpoint;
}

/// Watch-history service ("scrobble" target).
#[async_trait]
pub trait WatchHistoryService: Send + Sync + std::fmt::Debug {
    async fn mark_watched(&self, request: &ScrobbleRequest) -> Result<()>;
}
