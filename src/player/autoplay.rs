use tracing::{debug, info};

use super::timers::{TimerKind, TimerRegistry};
use crate::constants::AUTOPLAY_TICK;
use crate::models::{EpisodeSummary, ItemDetails, MediaItemId};

/// Next episode offered after the current one ends.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoplayCandidate {
    pub id: MediaItemId,
    pub name: String,
    pub season_number: Option<u32>,
    pub episode_number: u32,
    pub overview: Option<String>,
}

impl From<&EpisodeSummary> for AutoplayCandidate {
    fn from(episode: &EpisodeSummary) -> Self {
        Self {
            id: episode.id.clone(),
            name: episode.name.clone(),
            season_number: episode.season_number,
            episode_number: episode.episode_number.unwrap_or_default(),
            overview: episode.overview.clone(),
        }
    }
}

/// Smallest (season, episode) strictly after `current`.
pub fn next_episode(current: &ItemDetails, episodes: &[EpisodeSummary]) -> Option<AutoplayCandidate> {
    let current_key = (current.season_number.unwrap_or(0), current.episode_number?);

    episodes
        .iter()
        .filter(|e| e.id != current.id)
        .filter_map(|e| Some(((e.season_number.unwrap_or(0), e.episode_number?), e)))
        .filter(|(key, _)| *key > current_key)
        .min_by_key(|(key, _)| *key)
        .map(|(_, e)| AutoplayCandidate::from(e))
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutoPlayState {
    Idle,
    Counting {
        candidate: AutoplayCandidate,
        remaining: u32,
    },
}

/// Result of one countdown tick.
#[derive(Debug, Clone, PartialEq)]
pub enum CountdownTick {
    Remaining(u32),
    Expired(AutoplayCandidate),
    Inactive,
}

#[derive(Debug)]
pub struct AutoplayScheduler {
    enabled: bool,
    countdown_secs: u32,
    state: AutoPlayState,
}

impl AutoplayScheduler {
    pub fn new(enabled: bool, countdown_secs: u32) -> Self {
        Self {
            enabled,
            countdown_secs,
            state: AutoPlayState::Idle,
        }
    }

    /// Only episodic content with a known series autoplays.
    pub fn engages_for(&self, item: &ItemDetails) -> bool {
        self.enabled && item.is_episode() && item.series_id.is_some()
    }

    pub fn state(&self) -> &AutoPlayState {
        &self.state
    }

    /// Starts the countdown and returns the initial number of seconds.
    pub fn begin(&mut self, candidate: AutoplayCandidate, timers: &mut TimerRegistry) -> u32 {
        info!(
            "Autoplay countdown for {} ({}s)",
            candidate.name, self.countdown_secs
        );
        self.state = AutoPlayState::Counting {
            candidate,
            remaining: self.countdown_secs,
        };
        timers.arm_interval(TimerKind::AutoplayTick, AUTOPLAY_TICK);
        self.countdown_secs
    }

    pub fn tick(&mut self, timers: &mut TimerRegistry) -> CountdownTick {
        let AutoPlayState::Counting { remaining, .. } = &mut self.state else {
            return CountdownTick::Inactive;
        };

        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return CountdownTick::Remaining(*remaining);
        }

        match self.finish(timers) {
            Some(candidate) => CountdownTick::Expired(candidate),
            None => CountdownTick::Inactive,
        }
    }

    /// Skips the rest of the countdown.
    pub fn play_now(&mut self, timers: &mut TimerRegistry) -> Option<AutoplayCandidate> {
        self.finish(timers)
    }

    /// Returns true if a countdown was running.
    pub fn cancel(&mut self, timers: &mut TimerRegistry) -> bool {
        let was_counting = self.finish(timers).is_some();
        if was_counting {
            debug!("Autoplay countdown cancelled");
        }
        was_counting
    }

    fn finish(&mut self, timers: &mut TimerRegistry) -> Option<AutoplayCandidate> {
        timers.cancel(TimerKind::AutoplayTick);
        match std::mem::replace(&mut self.state, AutoPlayState::Idle) {
            AutoPlayState::Counting { candidate, .. } => Some(candidate),
            AutoPlayState::Idle => None,
        }
    }
}
