use std::fmt;

use crate::utils::PlaybackFailure;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    ResumePrompt,
    Ready,
    Playing,
    Paused,
    Ended,
    Error(PlaybackFailure),
    Stopped,
    Exited,
}

/// Triggers accepted by the transition table.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    LoadRequested,
    PromptRequired,
    ResumeChosen,
    CanPlay,
    Play,
    Pause,
    Ended,
    Failed(PlaybackFailure),
    /// Source swap for a quality or audio change
    SwitchSource,
    Stop,
    Exit,
}

impl SessionState {
    /// Returns the next state, or `None` when `transition` is not valid here.
    pub fn apply(&self, transition: &Transition) -> Option<SessionState> {
        use SessionState as S;
        use Transition as T;

        if self.is_terminal() {
            return None;
        }

        let next = match (self, transition) {
            (_, T::Stop) => S::Stopped,
            (_, T::Exit) => S::Exited,
            (_, T::LoadRequested) => S::Loading,
            (_, T::Failed(failure)) => S::Error(*failure),
            (S::Loading, T::PromptRequired) => S::ResumePrompt,
            (S::ResumePrompt, T::ResumeChosen) => S::Loading,
            (S::Loading, T::CanPlay) => S::Ready,
            (S::Ready | S::Paused | S::Ended, T::Play) => S::Playing,
            (S::Playing, T::Pause) => S::Paused,
            (S::Playing | S::Paused, T::Ended) => S::Ended,
            (S::Ready | S::Playing | S::Paused, T::SwitchSource) => S::Loading,
            _ => return None,
        };
        Some(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Exited)
    }

    /// Seeking is only meaningful once playback has started.
    pub fn can_seek(&self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }

    /// Quality and audio changes reload the source, which needs a loaded one.
    pub fn can_switch_source(&self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Playing | SessionState::Paused
        )
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::ResumePrompt => write!(f, "resume-prompt"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Ended => write!(f, "ended"),
            SessionState::Error(failure) => write!(f, "error ({:?})", failure),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Exited => write!(f, "exited"),
        }
    }
}
