use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::timers::{TimerKind, TimerRegistry};
use crate::backends::traits::MediaServer;
use crate::models::{PlaybackSession, ProgressReport};
use crate::utils::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Start,
    Progress,
    Stop,
}

/// Start/progress/stop notifications to the media server. Every call is
/// fire-and-forget; failures are logged and never reach the session.
#[derive(Debug)]
pub struct ProgressReporter {
    server: Arc<dyn MediaServer>,
    interval: Duration,
    started: bool,
}

impl ProgressReporter {
    pub fn new(server: Arc<dyn MediaServer>, interval: Duration) -> Self {
        Self {
            server,
            interval,
            started: false,
        }
    }

    /// Arms the periodic timer. Fires are filtered by [`Self::should_report`].
    pub fn start(&self, timers: &mut TimerRegistry) {
        if !timers.is_armed(TimerKind::Progress) {
            timers.arm_interval(TimerKind::Progress, self.interval);
        }
    }

    pub fn stop(&self, timers: &mut TimerRegistry) {
        timers.cancel(TimerKind::Progress);
    }

    /// Forgets the start report so the next session reports again.
    pub fn reset(&mut self, timers: &mut TimerRegistry) {
        self.stop(timers);
        self.started = false;
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn should_report(session: &PlaybackSession) -> bool {
        session.is_playing && !session.is_paused
    }

    /// Sends the start report once per session.
    pub fn report_start(&mut self, report: ProgressReport) {
        if self.started {
            return;
        }
        self.started = true;
        self.dispatch(ReportKind::Start, report);
    }

    /// Periodic tick; skipped unless actively playing.
    pub fn tick(&self, session: &PlaybackSession, report: ProgressReport) {
        if Self::should_report(session) {
            self.dispatch(ReportKind::Progress, report);
        } else {
            debug!("Skipping progress report while not playing");
        }
    }

    /// Unconditional progress report (pause, seek, save position).
    pub fn report_progress(&self, report: ProgressReport) {
        self.dispatch(ReportKind::Progress, report);
    }

    pub fn report_stop(&mut self, timers: &mut TimerRegistry, report: ProgressReport) {
        self.stop(timers);
        self.dispatch(ReportKind::Stop, report);
    }

    fn dispatch(&self, kind: ReportKind, report: ProgressReport) {
        let server = self.server.clone();
        tokio::spawn(async move {
            let result = match kind {
                ReportKind::Start => server.report_playback_start(&report).await,
                ReportKind::Progress => server.report_playback_progress(&report).await,
                ReportKind::Stop => server.report_playback_stopped(&report).await,
            };
            if let Err(e) = result {
                let error = SessionError::BackendReport(e.to_string());
                warn!("{:?} report for {} failed: {}", kind, report.item_id, error);
            } else {
                debug!("{:?} report sent at {:?}", kind, report.position.as_duration());
            }
        });
    }
}
