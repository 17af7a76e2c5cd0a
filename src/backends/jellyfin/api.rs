use anyhow::{Context, Result, anyhow};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backends::traits::PlaybackInfoRequest;
use crate::models::{
    EpisodeSummary, ItemDetails, ItemKind, MediaItemId, MediaSource, MediaSourceId, MediaStream,
    PlaySessionId, PlaybackInfo, ProgressReport, ProviderIds, SeriesId, StreamType, Ticks,
};

const JELLYFIN_CLIENT_NAME: &str = "Marquee";
const JELLYFIN_VERSION: &str = "0.1.0";

#[derive(Clone)]
pub struct JellyfinApi {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    user_id: String,
    device_id: String,
    device_name: String,
}

impl std::fmt::Debug for JellyfinApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinApi")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .finish()
    }
}

// Unreserved characters stay readable in path segments
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

impl JellyfinApi {
    pub fn new(
        base_url: &str,
        access_token: &str,
        user_id: &str,
        device_id: &str,
        device_name: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn get_auth_header(&self) -> String {
        format!(
            r#"MediaBrowser Client="{}", Device="{}", DeviceId="{}", Version="{}", Token="{}""#,
            JELLYFIN_CLIENT_NAME,
            self.device_name,
            self.device_id,
            JELLYFIN_VERSION,
            self.access_token
        )
    }

    pub async fn get_item(&self, item_id: &MediaItemId) -> Result<ItemDetails> {
        let url = format!(
            "{}/Users/{}/Items/{}",
            self.base_url,
            segment(&self.user_id),
            segment(item_id.as_str())
        );

        debug!("Fetching item details from {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Authorization", self.get_auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to get item {}: {}",
                item_id,
                response.status()
            ));
        }

        let item: JellyfinItem = response.json().await?;
        Ok(item.into_details())
    }

    pub async fn get_playback_info(
        &self,
        item_id: &MediaItemId,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfo> {
        let mut url = format!(
            "{}/Items/{}/PlaybackInfo?UserId={}&StartTimeTicks={}&IsPlayback=true&AutoOpenLiveStream=true&MaxStreamingBitrate={}",
            self.base_url,
            segment(item_id.as_str()),
            segment(&self.user_id),
            request.start_position.0,
            request.max_streaming_bitrate
        );
        if let Some(index) = request.audio_stream_index {
            url.push_str(&format!("&AudioStreamIndex={}", index));
        }

        let response = self
            .client
            .post(&url)
            .header("X-Emby-Authorization", self.get_auth_header())
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "DeviceProfile": {
                    "MaxStreamingBitrate": request.max_streaming_bitrate,
                    "DirectPlayProfiles": [
                        {
                            "Container": "mp4,m4v,webm",
                            "Type": "Video",
                            "VideoCodec": "h264,hevc,vp9,av1",
                            "AudioCodec": "aac,mp3,opus"
                        }
                    ],
                    "TranscodingProfiles": [
                        {
                            "Container": "ts",
                            "Type": "Video",
                            "AudioCodec": "aac",
                            "VideoCodec": "h264",
                            "Context": "Streaming",
                            "Protocol": "hls",
                            "MaxAudioChannels": "6"
                        }
                    ],
                    "SubtitleProfiles": [
                        { "Format": "vtt", "Method": "External" },
                        { "Format": "srt", "Method": "External" }
                    ]
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to get playback info: {}",
                response.status()
            ));
        }

        let playback_info: PlaybackInfoResponse = response.json().await?;
        Ok(playback_info.into_model())
    }

    pub async fn get_episodes(&self, series_id: &SeriesId) -> Result<Vec<EpisodeSummary>> {
        let url = format!(
            "{}/Shows/{}/Episodes?UserId={}&Fields=Overview",
            self.base_url,
            segment(series_id.as_str()),
            segment(&self.user_id)
        );

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Authorization", self.get_auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to get episodes for {}: {}",
                series_id,
                response.status()
            ));
        }

        let items: ItemsResponse = response.json().await?;
        Ok(items
            .items
            .into_iter()
            .map(|item| EpisodeSummary {
                id: MediaItemId::new(item.id),
                name: item.name,
                season_number: item.parent_index_number.map(|n| n.max(0) as u32),
                episode_number: item.index_number.map(|n| n.max(0) as u32),
                overview: item.overview,
                run_time: Ticks(item.run_time_ticks.unwrap_or(0).max(0) as u64),
            })
            .collect())
    }

    pub async fn fetch_subtitle(
        &self,
        item_id: &MediaItemId,
        media_source_id: &MediaSourceId,
        stream_index: u32,
    ) -> Result<String> {
        let url = format!(
            "{}/Videos/{}/{}/Subtitles/{}/0/Stream.vtt",
            self.base_url,
            segment(item_id.as_str()),
            segment(media_source_id.as_str()),
            stream_index
        );

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Authorization", self.get_auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch subtitle stream {}: {}",
                stream_index,
                response.status()
            ));
        }

        Ok(response.text().await?)
    }

    pub async fn report_playback_start(&self, report: &ProgressReport) -> Result<()> {
        self.post_session_report("Sessions/Playing", report).await
    }

    pub async fn report_playback_progress(&self, report: &ProgressReport) -> Result<()> {
        self.post_session_report("Sessions/Playing/Progress", report)
            .await
    }

    pub async fn report_playback_stopped(&self, report: &ProgressReport) -> Result<()> {
        self.post_session_report("Sessions/Playing/Stopped", report)
            .await
    }

    async fn post_session_report(&self, path: &str, report: &ProgressReport) -> Result<()> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("X-Emby-Authorization", self.get_auth_header())
            .json(&serde_json::json!({
                "ItemId": report.item_id.as_str(),
                "MediaSourceId": report.media_source_id.as_ref().map(|id| id.as_str()),
                "PlaySessionId": report.play_session_id.as_ref().map(|id| id.as_str()),
                "PositionTicks": report.position.0,
                "IsPaused": report.is_paused,
                "IsMuted": false,
                "AudioStreamIndex": report.audio_stream_index,
                "SubtitleStreamIndex": report.subtitle_stream_index,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Session report {} rejected: {}", path, response.status());
            return Err(anyhow!("{} failed: {}", path, response.status()));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    items: Vec<JellyfinItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JellyfinItem {
    id: String,
    name: String,
    #[serde(rename = "Type")]
    item_type: Option<String>,
    index_number: Option<i32>,
    parent_index_number: Option<i32>,
    run_time_ticks: Option<i64>,
    overview: Option<String>,
    user_data: Option<UserData>,
    series_name: Option<String>,
    series_id: Option<String>,
    #[serde(default)]
    provider_ids: HashMap<String, String>,
}

impl JellyfinItem {
    fn into_details(self) -> ItemDetails {
        let kind = match self.item_type.as_deref() {
            Some("Movie") => ItemKind::Movie,
            Some("Episode") => ItemKind::Episode,
            _ => ItemKind::Other,
        };
        let (resume_position, played) = self
            .user_data
            .as_ref()
            .map(|ud| {
                (
                    Ticks(ud.playback_position_ticks.unwrap_or(0).max(0) as u64),
                    ud.played,
                )
            })
            .unwrap_or((Ticks::ZERO, false));

        ItemDetails {
            id: MediaItemId::new(self.id),
            name: self.name,
            kind,
            overview: self.overview,
            run_time: Ticks(self.run_time_ticks.unwrap_or(0).max(0) as u64),
            resume_position,
            played,
            provider_ids: provider_ids_from(&self.provider_ids),
            series_id: self.series_id.map(SeriesId::new),
            series_name: self.series_name,
            season_number: self.parent_index_number.map(|n| n.max(0) as u32),
            episode_number: self.index_number.map(|n| n.max(0) as u32),
        }
    }
}

// Jellyfin's ProviderIds keys are case-insensitive in practice
fn provider_ids_from(raw: &HashMap<String, String>) -> ProviderIds {
    let lookup = |key: &str| {
        raw.iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
            .map(|(_, v)| v.clone())
    };
    ProviderIds {
        imdb: lookup("Imdb"),
        tmdb: lookup("Tmdb"),
        tvdb: lookup("Tvdb"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserData {
    #[serde(default)]
    played: bool,
    playback_position_ticks: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackInfoResponse {
    #[serde(default)]
    media_sources: Vec<JellyfinMediaSource>,
    play_session_id: Option<String>,
}

impl PlaybackInfoResponse {
    fn into_model(self) -> PlaybackInfo {
        PlaybackInfo {
            media_sources: self
                .media_sources
                .into_iter()
                .map(JellyfinMediaSource::into_model)
                .collect(),
            play_session_id: self.play_session_id.map(PlaySessionId::new),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JellyfinMediaSource {
    id: String,
    container: Option<String>,
    bitrate: Option<u64>,
    #[serde(default)]
    supports_direct_play: bool,
    #[serde(default)]
    supports_transcoding: bool,
    #[serde(default)]
    media_streams: Vec<JellyfinMediaStream>,
}

impl JellyfinMediaSource {
    fn into_model(self) -> MediaSource {
        MediaSource {
            id: MediaSourceId::new(self.id),
            container: self.container,
            bitrate: self.bitrate,
            supports_direct_play: self.supports_direct_play,
            supports_transcoding: self.supports_transcoding,
            streams: self
                .media_streams
                .into_iter()
                .map(|s| MediaStream {
                    index: s.index,
                    stream_type: match s.stream_type.as_str() {
                        "Video" => StreamType::Video,
                        "Audio" => StreamType::Audio,
                        "Subtitle" => StreamType::Subtitle,
                        _ => StreamType::Other,
                    },
                    language: s.language,
                    codec: s.codec,
                    display_title: s.display_title,
                    is_default: s.is_default,
                    is_external: s.is_external,
                    is_forced: s.is_forced,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JellyfinMediaStream {
    #[serde(rename = "Type")]
    stream_type: String,
    index: u32,
    language: Option<String>,
    codec: Option<String>,
    display_title: Option<String>,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    is_external: bool,
    #[serde(default)]
    is_forced: bool,
}
