use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use super::events::SessionEvent;
use super::types::AspectMode;

/// Events raised by the video surface, delivered in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    LoadedMetadata { duration: Option<Duration> },
    CanPlay,
    Play,
    Pause,
    TimeUpdate { position: Duration },
    Ended,
    /// Media element error code (1 aborted, 2 network, 3 decode, 4 unsupported)
    Error { code: u16 },
}

/// Pushes surface events into the controller's queue.
#[derive(Debug, Clone)]
pub struct SurfaceEventSink {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl SurfaceEventSink {
    pub(crate) fn new(sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { sender }
    }

    pub fn emit(&self, event: SurfaceEvent) {
        trace!("Surface event: {:?}", event);
        let _ = self.sender.send(SessionEvent::Surface(event));
    }
}

/// Rendering adapter owned exclusively by the session controller.
///
/// Calls are fire-and-forget; outcomes come back as [`SurfaceEvent`]s
/// through the sink installed with [`VideoSurface::set_event_sink`].
pub trait VideoSurface: Send {
    fn set_event_sink(&mut self, sink: SurfaceEventSink);
    fn set_source(&mut self, url: &Url);
    /// Drops the current source and stops decoding.
    fn release(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);
    fn set_playback_rate(&mut self, rate: f64);
    fn set_aspect_mode(&mut self, mode: AspectMode);
    fn attach_text_track(&mut self, url: &Url, language: Option<&str>);
    fn clear_text_tracks(&mut self);
}
