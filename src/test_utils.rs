#![cfg(test)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::backends::traits::{
    MediaServer, PlaybackInfoRequest, StreamEndpoint, WatchHistoryService,
};
use crate::models::{
    EpisodeSummary, ItemDetails, ItemKind, MediaItemId, MediaSource, MediaSourceId, MediaStream,
    PlaySessionId, PlaybackInfo, ProgressReport, ProviderIds, ScrobbleRequest, SeriesId,
    StreamType, Ticks,
};
use crate::player::surface::{SurfaceEvent, SurfaceEventSink, VideoSurface};
use crate::player::types::AspectMode;

/// Report calls seen by [`FakeMediaServer`], tagged with their position.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportCall {
    Start(Ticks),
    Progress(Ticks),
    Stop(Ticks),
}

#[derive(Debug, Default)]
struct FakeServerState {
    items: HashMap<String, ItemDetails>,
    playback_info: HashMap<String, PlaybackInfo>,
    episodes: HashMap<String, Vec<EpisodeSummary>>,
    subtitles: HashMap<u32, String>,
    item_requests: Vec<MediaItemId>,
    playback_requests: Vec<(MediaItemId, PlaybackInfoRequest)>,
    subtitle_requests: Vec<u32>,
    reports: Vec<ReportCall>,
    fail_reports: bool,
}

/// In-memory media server. Unknown ids answer with a 404-style error.
#[derive(Debug, Default)]
pub struct FakeMediaServer {
    state: Mutex<FakeServerState>,
}

impl FakeMediaServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeServerState> {
        self.state.lock().unwrap()
    }

    pub fn with_item(self, item: ItemDetails) -> Self {
        self.state().items.insert(item.id.to_string(), item);
        self
    }

    pub fn with_playback_info(self, item_id: &str, info: PlaybackInfo) -> Self {
        self.state().playback_info.insert(item_id.to_string(), info);
        self
    }

    pub fn with_episodes(self, series_id: &str, episodes: Vec<EpisodeSummary>) -> Self {
        self.state().episodes.insert(series_id.to_string(), episodes);
        self
    }

    pub fn with_subtitle(self, stream_index: u32, payload: &str) -> Self {
        self.state().subtitles.insert(stream_index, payload.to_string());
        self
    }

    pub fn without_subtitle(self, stream_index: u32) -> Self {
        self.state().subtitles.remove(&stream_index);
        self
    }

    pub fn fail_reports(&self, fail: bool) {
        self.state().fail_reports = fail;
    }

    pub fn report_calls(&self) -> Vec<ReportCall> {
        self.state().reports.clone()
    }

    pub fn progress_reports(&self) -> usize {
        self.state()
            .reports
            .iter()
            .filter(|r| matches!(r, ReportCall::Progress(_)))
            .count()
    }

    pub fn item_requests(&self, item_id: &str) -> usize {
        self.state()
            .item_requests
            .iter()
            .filter(|id| id.as_str() == item_id)
            .count()
    }

    pub fn playback_requests(&self) -> Vec<(MediaItemId, PlaybackInfoRequest)> {
        self.state().playback_requests.clone()
    }

    pub fn subtitle_requests(&self) -> Vec<u32> {
        self.state().subtitle_requests.clone()
    }

    fn record_report(&self, call: ReportCall) -> Result<()> {
        let mut state = self.state();
        if state.fail_reports {
            return Err(anyhow!("Server returned 500"));
        }
        state.reports.push(call);
        Ok(())
    }
}

#[async_trait]
impl MediaServer for FakeMediaServer {
    async fn get_item(&self, item_id: &MediaItemId) -> Result<ItemDetails> {
        let mut state = self.state();
        state.item_requests.push(item_id.clone());
        state
            .items
            .get(item_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("Item {} not found", item_id))
    }

    async fn get_playback_info(
        &self,
        item_id: &MediaItemId,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfo> {
        let mut state = self.state();
        state
            .playback_requests
            .push((item_id.clone(), request.clone()));
        state
            .playback_info
            .get(item_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("No playback info for {}", item_id))
    }

    async fn get_episodes(&self, series_id: &SeriesId) -> Result<Vec<EpisodeSummary>> {
        self.state()
            .episodes
            .get(series_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("Series {} not found", series_id))
    }

    async fn fetch_subtitle(
        &self,
        _item_id: &MediaItemId,
        _media_source_id: &MediaSourceId,
        stream_index: u32,
    ) -> Result<String> {
        let mut state = self.state();
        state.subtitle_requests.push(stream_index);
        state
            .subtitles
            .get(&stream_index)
            .cloned()
            .ok_or_else(|| anyhow!("Subtitle {} not found", stream_index))
    }

    async fn report_playback_start(&self, report: &ProgressReport) -> Result<()> {
        self.record_report(ReportCall::Start(report.position))
    }

    async fn report_playback_progress(&self, report: &ProgressReport) -> Result<()> {
        self.record_report(ReportCall::Progress(report.position))
    }

    async fn report_playback_stopped(&self, report: &ProgressReport) -> Result<()> {
        self.record_report(ReportCall::Stop(report.position))
    }

    fn stream_endpoint(&self) -> StreamEndpoint {
        StreamEndpoint {
            base_url: "http://jellyfin.local:8096".to_string(),
            access_token: "token".to_string(),
            device_id: "device-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetSource(Url),
    Release,
    Play,
    Pause,
    Seek(Duration),
    PlaybackRate(f64),
    AspectMode(AspectMode),
    AttachTextTrack(Url),
    ClearTextTracks,
}

#[derive(Debug, Default)]
struct SurfaceState {
    sink: Option<SurfaceEventSink>,
    calls: Vec<SurfaceCall>,
    playing: bool,
}

/// Surface that records every call and echoes the events a media element
/// would raise: metadata and can-play after a source, play, pause and the
/// time update following a seek.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    duration: Duration,
    state: Arc<Mutex<SurfaceState>>,
}

impl RecordingSurface {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: Arc::new(Mutex::new(SurfaceState::default())),
        }
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn sources(&self) -> Vec<Url> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::SetSource(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Seek(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    pub fn emit(&self, event: SurfaceEvent) {
        if let Some(sink) = &self.state.lock().unwrap().sink {
            sink.emit(event);
        }
    }

    /// Plays out to the end of the clip.
    pub fn end(&self) {
        self.state.lock().unwrap().playing = false;
        self.emit(SurfaceEvent::Ended);
    }

    fn record(&self, call: SurfaceCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl VideoSurface for RecordingSurface {
    fn set_event_sink(&mut self, sink: SurfaceEventSink) {
        self.state.lock().unwrap().sink = Some(sink);
    }

    fn set_source(&mut self, url: &Url) {
        self.record(SurfaceCall::SetSource(url.clone()));
        self.state.lock().unwrap().playing = false;
        self.emit(SurfaceEvent::LoadedMetadata {
            duration: Some(self.duration),
        });
        self.emit(SurfaceEvent::CanPlay);
    }

    fn release(&mut self) {
        self.record(SurfaceCall::Release);
        self.state.lock().unwrap().playing = false;
    }

    fn play(&mut self) {
        self.record(SurfaceCall::Play);
        let was_playing = std::mem::replace(&mut self.state.lock().unwrap().playing, true);
        if !was_playing {
            self.emit(SurfaceEvent::Play);
        }
    }

    fn pause(&mut self) {
        self.record(SurfaceCall::Pause);
        let was_playing = std::mem::replace(&mut self.state.lock().unwrap().playing, false);
        if was_playing {
            self.emit(SurfaceEvent::Pause);
        }
    }

    fn seek(&mut self, position: Duration) {
        self.record(SurfaceCall::Seek(position));
        self.emit(SurfaceEvent::TimeUpdate { position });
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.record(SurfaceCall::PlaybackRate(rate));
    }

    fn set_aspect_mode(&mut self, mode: AspectMode) {
        self.record(SurfaceCall::AspectMode(mode));
    }

    fn attach_text_track(&mut self, url: &Url, _language: Option<&str>) {
        self.record(SurfaceCall::AttachTextTrack(url.clone()));
    }

    fn clear_text_tracks(&mut self) {
        self.record(SurfaceCall::ClearTextTracks);
    }
}

#[derive(Debug, Default)]
pub struct RecordingWatchHistory {
    requests: Mutex<Vec<ScrobbleRequest>>,
}

impl RecordingWatchHistory {
    pub fn requests(&self) -> Vec<ScrobbleRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatchHistoryService for RecordingWatchHistory {
    async fn mark_watched(&self, request: &ScrobbleRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Lets spawned fetches and report calls run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub mod fixtures {
    use super::*;

    pub const SERIES_ID: &str = "series-1";

    pub fn episode_item(id: &str, number: u32, resume_secs: u64) -> ItemDetails {
        ItemDetails {
            id: MediaItemId::new(id),
            name: format!("Episode {}", number),
            kind: ItemKind::Episode,
            overview: None,
            run_time: Ticks::from_secs(3000),
            resume_position: Ticks::from_secs(resume_secs),
            played: false,
            provider_ids: ProviderIds::default(),
            series_id: Some(SeriesId::new(SERIES_ID)),
            series_name: Some("Northern Exposure".to_string()),
            season_number: Some(1),
            episode_number: Some(number),
        }
    }

    pub fn movie_item(id: &str, resume_secs: u64) -> ItemDetails {
        ItemDetails {
            id: MediaItemId::new(id),
            name: "Heat".to_string(),
            kind: ItemKind::Movie,
            overview: None,
            run_time: Ticks::from_secs(6000),
            resume_position: Ticks::from_secs(resume_secs),
            played: false,
            provider_ids: ProviderIds {
                imdb: Some("tt0113277".to_string()),
                tmdb: Some("949".to_string()),
                tvdb: None,
            },
            series_id: None,
            series_name: None,
            season_number: None,
            episode_number: None,
        }
    }

    pub fn series_item() -> ItemDetails {
        ItemDetails {
            id: MediaItemId::new(SERIES_ID),
            name: "Northern Exposure".to_string(),
            kind: ItemKind::Other,
            overview: None,
            run_time: Ticks::ZERO,
            resume_position: Ticks::ZERO,
            played: false,
            provider_ids: ProviderIds {
                imdb: None,
                tmdb: Some("4524".to_string()),
                tvdb: Some("78814".to_string()),
            },
            series_id: None,
            series_name: None,
            season_number: None,
            episode_number: None,
        }
    }

    pub fn episode_summary(id: &str, number: u32) -> EpisodeSummary {
        EpisodeSummary {
            id: MediaItemId::new(id),
            name: format!("Episode {}", number),
            season_number: Some(1),
            episode_number: Some(number),
            overview: None,
            run_time: Ticks::from_secs(3000),
        }
    }

    fn stream(index: u32, stream_type: StreamType, language: &str, is_default: bool) -> MediaStream {
        MediaStream {
            index,
            stream_type,
            language: Some(language.to_string()),
            codec: None,
            display_title: Some(language.to_uppercase()),
            is_default,
            is_external: false,
            is_forced: false,
        }
    }

    /// One transcodable source: video 0, audio 1 (eng) and 2 (jpn),
    /// subtitles 3 (eng) and 4 (spa).
    pub fn playback_info(source_id: &str) -> PlaybackInfo {
        PlaybackInfo {
            media_sources: vec![MediaSource {
                id: MediaSourceId::new(source_id),
                container: Some("mkv".to_string()),
                bitrate: Some(8_000_000),
                supports_direct_play: false,
                supports_transcoding: true,
                streams: vec![
                    stream(0, StreamType::Video, "und", true),
                    stream(1, StreamType::Audio, "eng", true),
                    stream(2, StreamType::Audio, "jpn", false),
                    stream(3, StreamType::Subtitle, "eng", false),
                    stream(4, StreamType::Subtitle, "spa", false),
                ],
            }],
            play_session_id: Some(PlaySessionId::new("play-session-1")),
        }
    }

    pub const SRT_PAYLOAD: &str = "1\r\n00:00:01,000 --> 00:00:04,000\r\nHello\r\n";

    /// Server with episodes 3 and 4 of one series plus a movie.
    pub fn server() -> FakeMediaServer {
        FakeMediaServer::new()
            .with_item(episode_item("episode-3", 3, 45))
            .with_item(episode_item("episode-4", 4, 120))
            .with_item(movie_item("movie-1", 0))
            .with_item(series_item())
            .with_playback_info("episode-3", playback_info("source-3"))
            .with_playback_info("episode-4", playback_info("source-4"))
            .with_playback_info("movie-1", playback_info("source-m"))
            .with_episodes(
                SERIES_ID,
                vec![
                    episode_summary("episode-4", 4),
                    episode_summary("episode-3", 3),
                ],
            )
            .with_subtitle(3, SRT_PAYLOAD)
            .with_subtitle(4, "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nHola\n")
    }
}
