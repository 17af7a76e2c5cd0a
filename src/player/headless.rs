use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, sleep};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info};
use url::Url;

use super::surface::{SurfaceEvent, SurfaceEventSink, VideoSurface};
use super::types::AspectMode;

const METADATA_DELAY: Duration = Duration::from_millis(200);
const PLAYHEAD_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Playhead {
    source: Option<Url>,
    position: Duration,
    rate: f64,
    playing: bool,
}

/// Surface without a renderer: simulates a clip of fixed length and reports
/// its playhead through the event sink. Used by the console binary.
pub struct HeadlessSurface {
    duration: Duration,
    playhead: Arc<Mutex<Playhead>>,
    sink: Option<SurfaceEventSink>,
    loader: Option<AbortOnDropHandle<()>>,
    ticker: Option<AbortOnDropHandle<()>>,
}

impl std::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("duration", &self.duration)
            .field("playing", &self.ticker.is_some())
            .finish()
    }
}

impl HeadlessSurface {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            playhead: Arc::new(Mutex::new(Playhead {
                rate: 1.0,
                ..Default::default()
            })),
            sink: None,
            loader: None,
            ticker: None,
        }
    }

    pub fn position(&self) -> Duration {
        self.playhead().position
    }

    fn playhead(&self) -> std::sync::MutexGuard<'_, Playhead> {
        self.playhead.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: SurfaceEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    fn start_ticker(&mut self) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let playhead = self.playhead.clone();
        let duration = self.duration;

        let task = tokio::spawn(async move {
            let mut ticks = interval(PLAYHEAD_TICK);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let (position, ended) = {
                    let mut playhead = playhead.lock().unwrap_or_else(|e| e.into_inner());
                    let step = PLAYHEAD_TICK.mul_f64(playhead.rate);
                    playhead.position = (playhead.position + step).min(duration);
                    let ended = playhead.position >= duration;
                    if ended {
                        playhead.playing = false;
                    }
                    (playhead.position, ended)
                };
                sink.emit(SurfaceEvent::TimeUpdate { position });
                if ended {
                    sink.emit(SurfaceEvent::Ended);
                    break;
                }
            }
        });
        self.ticker = Some(AbortOnDropHandle::new(task));
    }
}

impl VideoSurface for HeadlessSurface {
    fn set_event_sink(&mut self, sink: SurfaceEventSink) {
        self.sink = Some(sink);
    }

    fn set_source(&mut self, url: &Url) {
        info!("Headless surface loading {}", url);
        self.ticker = None;
        {
            let mut playhead = self.playhead();
            playhead.source = Some(url.clone());
            playhead.position = Duration::ZERO;
            playhead.playing = false;
        }

        let Some(sink) = self.sink.clone() else {
            return;
        };
        let duration = self.duration;
        let task = tokio::spawn(async move {
            sleep(METADATA_DELAY).await;
            sink.emit(SurfaceEvent::LoadedMetadata {
                duration: Some(duration),
            });
            sink.emit(SurfaceEvent::CanPlay);
        });
        self.loader = Some(AbortOnDropHandle::new(task));
    }

    fn release(&mut self) {
        debug!("Headless surface released");
        self.loader = None;
        self.ticker = None;
        *self.playhead() = Playhead {
            rate: 1.0,
            ..Default::default()
        };
    }

    fn play(&mut self) {
        {
            let mut playhead = self.playhead();
            if playhead.source.is_none() || playhead.playing {
                return;
            }
            if playhead.position >= self.duration {
                playhead.position = Duration::ZERO;
            }
            playhead.playing = true;
        }
        self.emit(SurfaceEvent::Play);
        self.start_ticker();
    }

    fn pause(&mut self) {
        let was_playing = std::mem::replace(&mut self.playhead().playing, false);
        self.ticker = None;
        if was_playing {
            self.emit(SurfaceEvent::Pause);
        }
    }

    fn seek(&mut self, position: Duration) {
        let position = position.min(self.duration);
        self.playhead().position = position;
        self.emit(SurfaceEvent::TimeUpdate { position });
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.playhead().rate = rate;
    }

    fn set_aspect_mode(&mut self, mode: AspectMode) {
        debug!("Aspect mode {}", mode.label());
    }

    fn attach_text_track(&mut self, url: &Url, language: Option<&str>) {
        info!("Subtitle track {} ({})", url, language.unwrap_or("und"));
    }

    fn clear_text_tracks(&mut self) {
        debug!("Subtitle tracks cleared");
    }
}
