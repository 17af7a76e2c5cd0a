use tokio::sync::oneshot;

use super::autoplay::AutoplayCandidate;
use super::idle::MenuKind;
use super::resume::ResumeChoice;
use super::state::SessionState;
use super::surface::SurfaceEvent;
use super::timers::TimerKind;
use super::tracks::{AudioTrack, SubtitleTrack};
use super::types::{AspectMode, PlaybackSpeed, RepeatMode};
use crate::models::{ItemDetails, MediaItemId, PlaybackInfo, Ticks};
use crate::utils::SessionError;

/// Remote-control input. Ignored while no session is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    TogglePlayPause,
    SeekForward { secs: u64 },
    SeekBackward { secs: u64 },
    ToggleTracksMenu,
    ToggleSettingsMenu,
    CycleQuality,
    SelectQuality(usize),
    CycleAspect,
    CycleSpeed,
    CycleRepeat,
    SelectAudioTrack(u32),
    /// `None` turns subtitles off
    SelectSubtitleTrack(Option<u32>),
    /// Any other key; counts as activity only
    KeyPress,
    ResumeChoice {
        generation: u64,
        choice: ResumeChoice,
    },
    AutoplayPlayNow,
    AutoplayCancel,
}

/// Everything the controller reacts to, in queue order.
#[derive(Debug)]
pub enum SessionEvent {
    Load {
        item_id: Option<MediaItemId>,
        start_from_beginning: bool,
        respond_to: Option<oneshot::Sender<Result<u64, SessionError>>>,
    },
    Stop,
    ExitToHome,
    SavePosition,
    Background,
    Foreground,
    Input(InputCommand),
    Surface(SurfaceEvent),
    TimerFired {
        kind: TimerKind,
        token: u64,
    },
    ItemLoaded {
        generation: u64,
        result: Result<ItemDetails, SessionError>,
    },
    PlaybackInfoLoaded {
        generation: u64,
        result: Result<PlaybackInfo, SessionError>,
    },
    SubtitleFetched {
        generation: u64,
        stream_index: u32,
        result: Result<String, SessionError>,
    },
    NextEpisodeResolved {
        generation: u64,
        candidate: Option<AutoplayCandidate>,
    },
}

/// Discrete notifications for the rendering adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotification {
    ResumePrompt {
        generation: u64,
        resume_at: Ticks,
    },
    AutoplayCountdown {
        candidate: AutoplayCandidate,
        remaining: u32,
    },
    AutoplayCancelled,
    ErrorMessage(String),
    NavigateBack,
    NavigateHome,
}

/// Latest view of the session, published on every handled event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub generation: u64,
    pub item: Option<ItemDetails>,
    pub position: Ticks,
    pub duration: Ticks,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
    pub current_audio: Option<u32>,
    pub current_subtitle: Option<u32>,
    pub quality: String,
    pub quality_options: Vec<String>,
    pub aspect: AspectMode,
    pub speed: PlaybackSpeed,
    pub repeat: RepeatMode,
    pub controls_visible: bool,
    pub pause_overlay_visible: bool,
    pub open_menu: Option<MenuKind>,
}
