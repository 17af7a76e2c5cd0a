use std::time::Duration;
use tracing::debug;

use super::timers::{TimerKind, TimerRegistry};
use crate::models::PlaybackSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Tracks,
    Settings,
}

/// Playing/paused flags the overlay timers gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivityStatus {
    pub playing: bool,
    pub paused: bool,
}

impl From<&PlaybackSession> for ActivityStatus {
    fn from(session: &PlaybackSession) -> Self {
        Self {
            playing: session.is_playing,
            paused: session.is_paused,
        }
    }
}

/// Controls-visibility and pause-overlay timers.
#[derive(Debug)]
pub struct IdleOverlayScheduler {
    controls_hide_delay: Duration,
    pause_overlay_delay: Duration,
    controls_visible: bool,
    pause_overlay_visible: bool,
    open_menu: Option<MenuKind>,
}

impl IdleOverlayScheduler {
    pub fn new(controls_hide_delay: Duration, pause_overlay_delay: Duration) -> Self {
        Self {
            controls_hide_delay,
            pause_overlay_delay,
            controls_visible: false,
            pause_overlay_visible: false,
            open_menu: None,
        }
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn pause_overlay_visible(&self) -> bool {
        self.pause_overlay_visible
    }

    pub fn open_menu(&self) -> Option<MenuKind> {
        self.open_menu
    }

    fn show_controls(&mut self, timers: &mut TimerRegistry) {
        self.controls_visible = true;
        timers.arm_once(TimerKind::ControlsHide, self.controls_hide_delay);
    }

    fn arm_pause_overlay(&mut self, timers: &mut TimerRegistry) {
        if self.open_menu.is_none() && !self.pause_overlay_visible {
            timers.arm_once(TimerKind::PauseOverlay, self.pause_overlay_delay);
        }
    }

    /// Any key press. Shows controls and debounces the pause overlay.
    pub fn on_activity(&mut self, timers: &mut TimerRegistry, status: ActivityStatus) {
        self.show_controls(timers);

        if status.paused {
            if self.pause_overlay_visible {
                debug!("Activity dismissed pause overlay");
                self.pause_overlay_visible = false;
            }
            self.arm_pause_overlay(timers);
        }
    }

    pub fn on_play(&mut self, timers: &mut TimerRegistry) {
        self.show_controls(timers);
        timers.cancel(TimerKind::PauseOverlay);
        self.pause_overlay_visible = false;
    }

    pub fn on_pause(&mut self, timers: &mut TimerRegistry) {
        self.controls_visible = true;
        timers.cancel(TimerKind::ControlsHide);
        self.arm_pause_overlay(timers);
    }

    /// Returns true when the controls were hidden.
    pub fn on_controls_timer(&mut self, status: ActivityStatus) -> bool {
        if status.playing && !status.paused && self.controls_visible {
            self.controls_visible = false;
            return true;
        }
        false
    }

    /// Returns true when the pause overlay was revealed.
    pub fn on_pause_overlay_timer(&mut self, status: ActivityStatus) -> bool {
        if status.paused && self.open_menu.is_none() && !self.pause_overlay_visible {
            self.pause_overlay_visible = true;
            return true;
        }
        false
    }

    /// Opens `kind`, or closes it when it is already open. Returns the menu
    /// now open.
    pub fn toggle_menu(
        &mut self,
        kind: MenuKind,
        timers: &mut TimerRegistry,
        status: ActivityStatus,
    ) -> Option<MenuKind> {
        if self.open_menu == Some(kind) {
            self.open_menu = None;
            if status.paused {
                self.arm_pause_overlay(timers);
            }
        } else {
            self.open_menu = Some(kind);
            timers.cancel(TimerKind::PauseOverlay);
            self.pause_overlay_visible = false;
        }
        self.show_controls(timers);
        self.open_menu
    }

    pub fn reset(&mut self, timers: &mut TimerRegistry) {
        timers.cancel(TimerKind::ControlsHide);
        timers.cancel(TimerKind::PauseOverlay);
        self.controls_visible = false;
        self.pause_overlay_visible = false;
        self.open_menu = None;
    }
}
