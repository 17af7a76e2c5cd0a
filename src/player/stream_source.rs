use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::backends::traits::StreamEndpoint;
use crate::constants::AUTO_MAX_STREAMING_BITRATE;
use crate::models::{MediaItemId, MediaSource, PlaySessionId, StreamType};
use crate::utils::SessionError;

/// Configured transport choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPreference {
    #[default]
    Auto,
    Hls,
    Static,
}

/// Transport actually used for a given URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Hls,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityOption {
    pub name: String,
    pub height: Option<u32>,
    /// `None` means "auto"
    pub max_bitrate: Option<u64>,
}

impl QualityOption {
    fn fixed(name: &str, height: u32, max_bitrate: u64) -> Self {
        Self {
            name: name.to_string(),
            height: Some(height),
            max_bitrate: Some(max_bitrate),
        }
    }

    pub fn auto() -> Self {
        Self {
            name: "Auto".to_string(),
            height: None,
            max_bitrate: None,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.max_bitrate.is_none()
    }

    pub fn bitrate_ceiling(&self) -> u64 {
        self.max_bitrate.unwrap_or(AUTO_MAX_STREAMING_BITRATE)
    }
}

/// Ordered quality choices with exactly one current entry.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityLadder {
    options: Vec<QualityOption>,
    current: usize,
}

impl Default for QualityLadder {
    fn default() -> Self {
        Self {
            options: vec![
                QualityOption::auto(),
                QualityOption::fixed("1080p - 20 Mbps", 1080, 20_000_000),
                QualityOption::fixed("1080p - 10 Mbps", 1080, 10_000_000),
                QualityOption::fixed("720p - 4 Mbps", 720, 4_000_000),
                QualityOption::fixed("480p - 1.5 Mbps", 480, 1_500_000),
                QualityOption::fixed("360p - 720 kbps", 360, 720_000),
            ],
            current: 0,
        }
    }
}

impl QualityLadder {
    /// Standard ladder starting at the option named `label` (case-insensitive
    /// prefix match), falling back to Auto.
    pub fn with_default(label: &str) -> Self {
        let mut ladder = Self::default();
        let wanted = label.trim().to_ascii_lowercase();
        if let Some(index) = ladder
            .options
            .iter()
            .position(|o| !wanted.is_empty() && o.name.to_ascii_lowercase().starts_with(&wanted))
        {
            ladder.current = index;
        }
        ladder
    }

    pub fn options(&self) -> &[QualityOption] {
        &self.options
    }

    pub fn current(&self) -> &QualityOption {
        &self.options[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn cycle(&mut self) -> &QualityOption {
        self.current = (self.current + 1) % self.options.len();
        self.current()
    }

    /// Returns `None` (leaving the current option unchanged) for an unknown index.
    pub fn select(&mut self, index: usize) -> Option<&QualityOption> {
        if index >= self.options.len() {
            return None;
        }
        self.current = index;
        Some(self.current())
    }
}

/// Everything that goes into one stream URL.
#[derive(Debug, Clone)]
pub struct StreamRequest<'a> {
    pub item_id: &'a MediaItemId,
    pub source: &'a MediaSource,
    pub play_session_id: Option<&'a PlaySessionId>,
    pub audio_stream_index: u32,
    pub quality: &'a QualityOption,
}

#[derive(Debug, Clone)]
pub struct StreamSourceResolver {
    endpoint: StreamEndpoint,
    preference: TransportPreference,
    direct_play_containers: Vec<String>,
}

impl StreamSourceResolver {
    pub fn new(
        endpoint: StreamEndpoint,
        preference: TransportPreference,
        direct_play_containers: Vec<String>,
    ) -> Self {
        Self {
            endpoint,
            preference,
            direct_play_containers: direct_play_containers
                .into_iter()
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Default audio stream, else the first audio stream, else 0.
    pub fn default_audio_index(source: &MediaSource) -> u32 {
        source
            .streams_of(StreamType::Audio)
            .find(|s| s.is_default)
            .or_else(|| source.streams_of(StreamType::Audio).next())
            .map(|s| s.index)
            .unwrap_or(0)
    }

    pub fn choose_transport(&self, source: &MediaSource, quality: &QualityOption) -> Transport {
        match self.preference {
            TransportPreference::Hls => Transport::Hls,
            TransportPreference::Static => Transport::Static,
            TransportPreference::Auto => {
                // Containers come back comma-separated, e.g. "mov,mp4,m4a"
                let container_ok = source.container.as_deref().is_some_and(|container| {
                    container.split(',').any(|c| {
                        let c = c.trim().to_ascii_lowercase();
                        self.direct_play_containers.contains(&c)
                    })
                });
                if source.supports_direct_play && container_ok && quality.is_auto() {
                    Transport::Static
                } else {
                    Transport::Hls
                }
            }
        }
    }

    pub fn resolve(&self, request: &StreamRequest<'_>) -> Result<Url, SessionError> {
        let transport = self.choose_transport(request.source, request.quality);

        let mut url = Url::parse(&self.endpoint.base_url).map_err(SessionError::network)?;
        url.path_segments_mut()
            .map_err(|_| SessionError::Network("server url cannot carry a path".into()))?
            .pop_if_empty()
            .push("Videos")
            .push(request.item_id.as_str())
            .push(match transport {
                Transport::Hls => "master.m3u8",
                Transport::Static => "stream",
            });

        {
            let mut query = url.query_pairs_mut();
            if transport == Transport::Static {
                query.append_pair("Static", "true");
            }
            query
                .append_pair("MediaSourceId", request.source.id.as_str())
                .append_pair("DeviceId", &self.endpoint.device_id)
                .append_pair("api_key", &self.endpoint.access_token)
                .append_pair("AudioStreamIndex", &request.audio_stream_index.to_string())
                .append_pair(
                    "MaxStreamingBitrate",
                    &request.quality.bitrate_ceiling().to_string(),
                );
            if let Some(play_session_id) = request.play_session_id {
                query.append_pair("PlaySessionId", play_session_id.as_str());
            }
            if transport == Transport::Hls {
                query
                    .append_pair("VideoCodec", "h264")
                    .append_pair("AudioCodec", "aac")
                    .append_pair("TranscodingMaxAudioChannels", "6")
                    .append_pair("SegmentContainer", "ts");
            }
        }

        debug!(
            "Resolved {:?} stream for {} at {}",
            transport,
            request.item_id,
            request.quality.name
        );
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaSourceId, MediaStream};
    use std::collections::HashMap;

    fn endpoint() -> StreamEndpoint {
        StreamEndpoint {
            base_url: "http://jellyfin.local:8096".into(),
            access_token: "secret".into(),
            device_id: "tv-1".into(),
        }
    }

    fn audio(index: u32, is_default: bool) -> MediaStream {
        MediaStream {
            index,
            stream_type: StreamType::Audio,
            language: None,
            codec: None,
            display_title: None,
            is_default,
            is_external: false,
            is_forced: false,
        }
    }

    fn source(container: &str, direct: bool, streams: Vec<MediaStream>) -> MediaSource {
        MediaSource {
            id: MediaSourceId::new("src-1"),
            container: Some(container.into()),
            bitrate: None,
            supports_direct_play: direct,
            supports_transcoding: true,
            streams,
        }
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_default_audio_index_rules() {
        assert_eq!(
            StreamSourceResolver::default_audio_index(&source("mkv", false, vec![audio(1, false), audio(2, true)])),
            2
        );
        assert_eq!(
            StreamSourceResolver::default_audio_index(&source("mkv", false, vec![audio(4, false), audio(5, false)])),
            4
        );
        assert_eq!(
            StreamSourceResolver::default_audio_index(&source("mkv", false, vec![])),
            0
        );
    }

    #[test]
    fn test_hls_url_carries_all_parameters() {
        let resolver = StreamSourceResolver::new(endpoint(), TransportPreference::Auto, vec!["mp4".into()]);
        let src = source("mkv", false, vec![audio(1, true)]);
        let ladder = QualityLadder::default();
        let item = MediaItemId::new("item-9");
        let session = PlaySessionId::new("ps-1");

        let url = resolver
            .resolve(&StreamRequest {
                item_id: &item,
                source: &src,
                play_session_id: Some(&session),
                audio_stream_index: 1,
                quality: ladder.current(),
            })
            .unwrap();

        assert_eq!(url.path(), "/Videos/item-9/master.m3u8");
        let q = query(&url);
        assert_eq!(q["MediaSourceId"], "src-1");
        assert_eq!(q["DeviceId"], "tv-1");
        assert_eq!(q["api_key"], "secret");
        assert_eq!(q["AudioStreamIndex"], "1");
        assert_eq!(q["MaxStreamingBitrate"], "120000000");
        assert_eq!(q["PlaySessionId"], "ps-1");
    }

    #[test]
    fn test_static_url_same_parameters() {
        let resolver = StreamSourceResolver::new(endpoint(), TransportPreference::Static, vec![]);
        let src = source("mkv", false, vec![audio(1, true)]);
        let mut ladder = QualityLadder::default();
        ladder.select(3);
        let item = MediaItemId::new("item-9");

        let url = resolver
            .resolve(&StreamRequest {
                item_id: &item,
                source: &src,
                play_session_id: None,
                audio_stream_index: 1,
                quality: ladder.current(),
            })
            .unwrap();

        assert_eq!(url.path(), "/Videos/item-9/stream");
        let q = query(&url);
        assert_eq!(q["Static"], "true");
        assert_eq!(q["MaxStreamingBitrate"], "4000000");
        assert_eq!(q["AudioStreamIndex"], "1");
        assert!(!q.contains_key("PlaySessionId"));
    }

    #[test]
    fn test_auto_transport_selection() {
        let resolver = StreamSourceResolver::new(endpoint(), TransportPreference::Auto, vec!["MP4".into()]);
        let direct = source("mov,mp4,m4a", true, vec![]);
        let mut ladder = QualityLadder::default();

        assert_eq!(resolver.choose_transport(&direct, ladder.current()), Transport::Static);
        assert_eq!(
            resolver.choose_transport(&source("mkv", true, vec![]), ladder.current()),
            Transport::Hls
        );
        ladder.cycle();
        assert_eq!(resolver.choose_transport(&direct, ladder.current()), Transport::Hls);
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let mut ep = endpoint();
        ep.base_url = "https://media.example.com/jellyfin".into();
        let resolver = StreamSourceResolver::new(ep, TransportPreference::Hls, vec![]);
        let src = source("mkv", false, vec![]);
        let item = MediaItemId::new("abc");
        let quality = QualityOption::auto();

        let url = resolver
            .resolve(&StreamRequest {
                item_id: &item,
                source: &src,
                play_session_id: None,
                audio_stream_index: 0,
                quality: &quality,
            })
            .unwrap();
        assert_eq!(url.path(), "/jellyfin/Videos/abc/master.m3u8");
    }

    #[test]
    fn test_ladder_cycle_and_select() {
        let mut ladder = QualityLadder::with_default("720p");
        assert_eq!(ladder.current().max_bitrate, Some(4_000_000));

        assert_eq!(ladder.cycle().height, Some(480));
        ladder.cycle();
        assert!(ladder.cycle().is_auto());

        assert!(ladder.select(42).is_none());
        assert!(ladder.current().is_auto());
        assert_eq!(QualityLadder::with_default("bogus").current_index(), 0);
    }
}
