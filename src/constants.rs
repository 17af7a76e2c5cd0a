// Playback session timing constants. Configurable delays have their defaults
// here; the rest are fixed.

use std::time::Duration;

/// Resume offers below this many seconds start from the beginning instead.
pub const RESUME_PROMPT_THRESHOLD_SECS: f64 = 30.0;

pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_CONTROLS_HIDE_DELAY_SECS: u64 = 5;
pub const DEFAULT_PAUSE_OVERLAY_DELAY_SECS: u64 = 15;
pub const DEFAULT_AUTOPLAY_COUNTDOWN_SECS: u32 = 10;
pub const DEFAULT_SEEK_STEP_SECS: u64 = 10;

/// Let the UI settle before leaving the player after natural end.
pub const RETURN_AFTER_END_DELAY: Duration = Duration::from_secs(1);
/// Keep the error message readable before leaving the player.
pub const RETURN_AFTER_ERROR_DELAY: Duration = Duration::from_secs(3);

pub const AUTOPLAY_TICK: Duration = Duration::from_secs(1);

/// Bitrate ceiling requested when quality is "Auto".
pub const AUTO_MAX_STREAMING_BITRATE: u64 = 120_000_000;
