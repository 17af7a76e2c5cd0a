mod identifiers;

pub use identifiers::{MediaItemId, MediaSourceId, PlaySessionId, SeriesId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend time unit: 10,000,000 ticks per second.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);
    pub const PER_SECOND: u64 = 10_000_000;

    pub fn from_secs(secs: u64) -> Self {
        Ticks(secs.saturating_mul(Self::PER_SECOND))
    }

    pub fn from_duration(duration: Duration) -> Self {
        // 1 tick = 100ns
        Ticks((duration.as_nanos() / 100).min(u64::MAX as u128) as u64)
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_nanos(self.0.saturating_mul(100))
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::PER_SECOND as f64
    }

    pub fn saturating_add(self, other: Ticks) -> Ticks {
        Ticks(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Ticks) -> Ticks {
        Ticks(self.0.saturating_sub(other.0))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Episode,
    Other,
}

/// External catalogue ids (imdb/tmdb/tvdb) attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIds {
    pub imdb: Option<String>,
    pub tmdb: Option<String>,
    pub tvdb: Option<String>,
}

impl ProviderIds {
    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.tmdb.is_none() && self.tvdb.is_none()
    }
}

/// Item metadata as returned by the media server's item-detail call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub id: MediaItemId,
    pub name: String,
    pub kind: ItemKind,
    pub overview: Option<String>,
    pub run_time: Ticks,
    pub resume_position: Ticks,
    pub played: bool,
    pub provider_ids: ProviderIds,
    pub series_id: Option<SeriesId>,
    pub series_name: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

impl ItemDetails {
    pub fn is_episode(&self) -> bool {
        self.kind == ItemKind::Episode
    }
}

/// Lightweight episode listing entry used for next-episode lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: MediaItemId,
    pub name: String,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub overview: Option<String>,
    pub run_time: Ticks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaStream {
    pub index: u32,
    pub stream_type: StreamType,
    pub language: Option<String>,
    pub codec: Option<String>,
    pub display_title: Option<String>,
    pub is_default: bool,
    pub is_external: bool,
    pub is_forced: bool,
}

/// One playable representation of an item. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub id: MediaSourceId,
    pub container: Option<String>,
    pub bitrate: Option<u64>,
    pub supports_direct_play: bool,
    pub supports_transcoding: bool,
    pub streams: Vec<MediaStream>,
}

impl MediaSource {
    pub fn streams_of(&self, stream_type: StreamType) -> impl Iterator<Item = &MediaStream> {
        self.streams
            .iter()
            .filter(move |s| s.stream_type == stream_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackInfo {
    pub media_sources: Vec<MediaSource>,
    pub play_session_id: Option<PlaySessionId>,
}

/// Mutable record of the item currently being played on this screen.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub media_id: MediaItemId,
    pub media_source_id: Option<MediaSourceId>,
    pub play_session_id: Option<PlaySessionId>,
    pub position: Ticks,
    pub duration: Ticks,
    pub is_playing: bool,
    pub is_paused: bool,
}

impl PlaybackSession {
    pub fn new(media_id: MediaItemId) -> Self {
        Self {
            media_id,
            media_source_id: None,
            play_session_id: None,
            position: Ticks::ZERO,
            duration: Ticks::ZERO,
            is_playing: false,
            is_paused: false,
        }
    }

    /// Clamps a target position into `[0, duration]`. An unknown duration
    /// leaves the upper bound open.
    pub fn clamp_position(&self, target: i128) -> Ticks {
        let lower = target.max(0) as u128;
        let clamped = if self.duration.is_zero() {
            lower
        } else {
            lower.min(self.duration.0 as u128)
        };
        Ticks(clamped.min(u64::MAX as u128) as u64)
    }

    pub fn report(&self) -> ProgressReport {
        ProgressReport {
            item_id: self.media_id.clone(),
            media_source_id: self.media_source_id.clone(),
            play_session_id: self.play_session_id.clone(),
            position: self.position,
            is_paused: self.is_paused,
            audio_stream_index: None,
            subtitle_stream_index: None,
        }
    }
}

/// Snapshot sent to the backend's start/progress/stop calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub item_id: MediaItemId,
    pub media_source_id: Option<MediaSourceId>,
    pub play_session_id: Option<PlaySessionId>,
    pub position: Ticks,
    pub is_paused: bool,
    pub audio_stream_index: Option<u32>,
    pub subtitle_stream_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScrobbleKind {
    Episode { season: u32, episode: u32 },
    Movie,
}

/// "Mark watched" request sent to the watch-history service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrobbleRequest {
    pub title: String,
    pub kind: ScrobbleKind,
    pub provider_ids: ProviderIds,
    pub watched_at: DateTime<Utc>,
}
