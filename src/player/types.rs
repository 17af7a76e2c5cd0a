/// Common types for the settings cyclers

const PLAYBACK_SPEEDS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];
const NORMAL_SPEED_INDEX: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectMode {
    #[default]
    Fit, // Whole frame visible, may letterbox
    Fill,    // Cover the screen, may crop
    Stretch, // Ignore the source aspect ratio
}

impl AspectMode {
    pub fn next(self) -> Self {
        match self {
            AspectMode::Fit => AspectMode::Fill,
            AspectMode::Fill => AspectMode::Stretch,
            AspectMode::Stretch => AspectMode::Fit,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectMode::Fit => "Fit",
            AspectMode::Fill => "Fill",
            AspectMode::Stretch => "Stretch",
        }
    }
}

/// Playback rate picked from a fixed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSpeed(usize);

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(NORMAL_SPEED_INDEX)
    }
}

impl PlaybackSpeed {
    pub fn rate(&self) -> f64 {
        PLAYBACK_SPEEDS[self.0]
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % PLAYBACK_SPEEDS.len())
    }

    pub fn label(&self) -> String {
        format!("{}x", self.rate())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepeatMode::Off => "Off",
            RepeatMode::One => "Repeat one",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_cycle_wraps() {
        let mode = AspectMode::default();
        assert_eq!(mode, AspectMode::Fit);
        assert_eq!(mode.next().next().next(), AspectMode::Fit);
        assert_eq!(mode.next().label(), "Fill");
    }

    #[test]
    fn test_speed_cycle() {
        let mut speed = PlaybackSpeed::default();
        assert_eq!(speed.rate(), 1.0);

        let mut seen = vec![];
        for _ in 0..6 {
            speed = speed.next();
            seen.push(speed.rate());
        }
        assert_eq!(seen, vec![1.25, 1.5, 2.0, 0.5, 0.75, 1.0]);
        assert_eq!(PlaybackSpeed::default().next().label(), "1.25x");
    }

    #[test]
    fn test_repeat_toggle() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
    }
}
