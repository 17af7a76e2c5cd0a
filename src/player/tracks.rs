use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use url::Url;

use super::stream_source::StreamSourceResolver;
use super::timed_text;
use crate::models::{MediaSource, MediaStream, StreamType};
use crate::utils::SessionError;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub index: u32,
    pub language: Option<String>,
    pub label: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    pub index: u32,
    pub language: Option<String>,
    pub label: String,
    pub is_default: bool,
    pub is_external: bool,
}

fn label_for(stream: &MediaStream) -> String {
    stream
        .display_title
        .clone()
        .or_else(|| stream.language.clone())
        .unwrap_or_else(|| format!("Track {}", stream.index))
}

/// Converted subtitle written to a temporary local file. The file is removed
/// when the resource is revoked or dropped.
#[derive(Debug)]
pub struct SubtitleResource {
    stream_index: u32,
    language: Option<String>,
    url: Url,
    file: Option<NamedTempFile>,
}

impl SubtitleResource {
    fn create(stream_index: u32, language: Option<String>, vtt: &str) -> Result<Self, SessionError> {
        let mut file = tempfile::Builder::new()
            .prefix("marquee-subtitle-")
            .suffix(".vtt")
            .tempfile()
            .map_err(|e| SessionError::SubtitleFetch(e.to_string()))?;
        file.write_all(vtt.as_bytes())
            .map_err(|e| SessionError::SubtitleFetch(e.to_string()))?;
        let url = Url::from_file_path(file.path())
            .map_err(|_| SessionError::SubtitleFetch("temporary path is not absolute".into()))?;

        Ok(Self {
            stream_index,
            language,
            url,
            file: Some(file),
        })
    }

    pub fn stream_index(&self) -> u32 {
        self.stream_index
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Deletes the backing file; the url stops resolving afterwards.
    pub fn revoke(&mut self) {
        if let Some(file) = self.file.take() {
            debug!("Revoking subtitle resource for stream {}", self.stream_index);
            if let Err(e) = file.close() {
                warn!("Failed to remove subtitle file: {}", e);
            }
        }
    }
}

impl Drop for SubtitleResource {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// Track lists derived from the loaded media source plus the one applied
/// subtitle resource.
#[derive(Debug, Default)]
pub struct TrackManager {
    audio: Vec<AudioTrack>,
    subtitles: Vec<SubtitleTrack>,
    current_audio: Option<u32>,
    current_subtitle: Option<u32>,
    pending_subtitle: Option<u32>,
    applied: Option<SubtitleResource>,
}

impl TrackManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds track lists for a freshly loaded source and resets selection
    /// to the source defaults.
    pub fn load_source(&mut self, source: &MediaSource) {
        self.partition(source);
        self.current_audio = if self.audio.is_empty() {
            None
        } else {
            Some(StreamSourceResolver::default_audio_index(source))
        };
        self.current_subtitle = self.subtitles.iter().find(|t| t.is_default).map(|t| t.index);
        self.pending_subtitle = None;
    }

    /// Rebuilds track lists after a reload of the same item, keeping the
    /// selections that still exist in the new source.
    pub fn reload_source(&mut self, source: &MediaSource) {
        let audio = self.current_audio;
        let subtitle = self.current_subtitle;
        self.partition(source);

        self.current_audio = match audio {
            Some(index) if self.audio.iter().any(|t| t.index == index) => Some(index),
            _ if self.audio.is_empty() => None,
            _ => Some(StreamSourceResolver::default_audio_index(source)),
        };
        if let Some(index) = subtitle
            && !self.subtitles.iter().any(|t| t.index == index)
        {
            self.current_subtitle = None;
            self.revoke_applied();
        }
    }

    fn partition(&mut self, source: &MediaSource) {
        self.audio = source
            .streams_of(StreamType::Audio)
            .map(|s| AudioTrack {
                index: s.index,
                language: s.language.clone(),
                label: label_for(s),
                is_default: s.is_default,
            })
            .collect();
        self.subtitles = source
            .streams_of(StreamType::Subtitle)
            .map(|s| SubtitleTrack {
                index: s.index,
                language: s.language.clone(),
                label: label_for(s),
                is_default: s.is_default,
                is_external: s.is_external,
            })
            .collect();
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio
    }

    pub fn subtitle_tracks(&self) -> &[SubtitleTrack] {
        &self.subtitles
    }

    pub fn current_audio(&self) -> Option<u32> {
        self.current_audio
    }

    pub fn current_subtitle(&self) -> Option<u32> {
        self.current_subtitle
    }

    pub fn applied(&self) -> Option<&SubtitleResource> {
        self.applied.as_ref()
    }

    /// Returns true when the selection changed and the source must be reloaded.
    pub fn select_audio(&mut self, index: u32) -> bool {
        if !self.audio.iter().any(|t| t.index == index) {
            warn!("Ignoring unknown audio stream {}", index);
            return false;
        }
        if self.current_audio == Some(index) {
            return false;
        }
        self.current_audio = Some(index);
        true
    }

    /// Starts a subtitle selection. Returns the stream to fetch, or `None`
    /// when subtitles were turned off or the index is unknown.
    pub fn request_subtitle(&mut self, index: Option<u32>) -> Option<u32> {
        match index {
            None => {
                self.clear_subtitle();
                None
            }
            Some(index) if self.subtitles.iter().any(|t| t.index == index) => {
                self.pending_subtitle = Some(index);
                Some(index)
            }
            Some(index) => {
                warn!("Ignoring unknown subtitle stream {}", index);
                None
            }
        }
    }

    /// The default subtitle to fetch after a fresh load, if any.
    pub fn request_default_subtitle(&mut self) -> Option<u32> {
        let index = self.current_subtitle?;
        self.pending_subtitle = Some(index);
        Some(index)
    }

    pub fn is_pending(&self, index: u32) -> bool {
        self.pending_subtitle == Some(index)
    }

    /// Converts a fetched payload and makes it the applied resource. The
    /// previous resource is revoked first.
    pub fn apply_subtitle(&mut self, index: u32, payload: &str) -> Result<&SubtitleResource, SessionError> {
        self.pending_subtitle = None;
        self.revoke_applied();

        let language = self
            .subtitles
            .iter()
            .find(|t| t.index == index)
            .and_then(|t| t.language.clone());
        let resource = SubtitleResource::create(index, language, &timed_text::to_webvtt(payload))?;
        self.current_subtitle = Some(index);
        Ok(&*self.applied.insert(resource))
    }

    /// A failed fetch leaves subtitles off.
    pub fn subtitle_failed(&mut self, index: u32) {
        if self.pending_subtitle == Some(index) {
            self.pending_subtitle = None;
            self.current_subtitle = None;
            self.revoke_applied();
        }
    }

    pub fn clear_subtitle(&mut self) {
        self.pending_subtitle = None;
        self.current_subtitle = None;
        self.revoke_applied();
    }

    /// Releases everything; called on stop, exit and before loading another item.
    pub fn teardown(&mut self) {
        self.clear_subtitle();
        self.audio.clear();
        self.subtitles.clear();
        self.current_audio = None;
    }

    fn revoke_applied(&mut self) {
        if let Some(mut resource) = self.applied.take() {
            resource.revoke();
        }
    }
}
