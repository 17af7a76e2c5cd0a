use marquee::player::{SurfaceEvent, SurfaceEventSink, VideoSurface};
use marquee::player::types::AspectMode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Default)]
struct MockSurfaceState {
    sink: Option<SurfaceEventSink>,
    sources: Vec<Url>,
    text_tracks: Vec<Url>,
    seeks: Vec<Duration>,
    playing: bool,
    released: bool,
}

/// Surface that answers immediately, the way a media element would once the
/// stream is buffered.
#[derive(Debug, Clone)]
pub struct MockSurface {
    duration: Duration,
    state: Arc<Mutex<MockSurfaceState>>,
}

impl MockSurface {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: Arc::new(Mutex::new(MockSurfaceState::default())),
        }
    }

    pub fn sources(&self) -> Vec<Url> {
        self.state.lock().unwrap().sources.clone()
    }

    pub fn text_tracks(&self) -> Vec<Url> {
        self.state.lock().unwrap().text_tracks.clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn emit(&self, event: SurfaceEvent) {
        if let Some(sink) = &self.state.lock().unwrap().sink {
            sink.emit(event);
        }
    }

    pub fn end(&self) {
        self.state.lock().unwrap().playing = false;
        self.emit(SurfaceEvent::Ended);
    }
}

impl VideoSurface for MockSurface {
    fn set_event_sink(&mut self, sink: SurfaceEventSink) {
        self.state.lock().unwrap().sink = Some(sink);
    }

    fn set_source(&mut self, url: &Url) {
        {
            let mut state = self.state.lock().unwrap();
            state.sources.push(url.clone());
            state.playing = false;
            state.released = false;
        }
        self.emit(SurfaceEvent::LoadedMetadata {
            duration: Some(self.duration),
        });
        self.emit(SurfaceEvent::CanPlay);
    }

    fn release(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.released = true;
    }

    fn play(&mut self) {
        let was_playing = std::mem::replace(&mut self.state.lock().unwrap().playing, true);
        if !was_playing {
            self.emit(SurfaceEvent::Play);
        }
    }

    fn pause(&mut self) {
        let was_playing = std::mem::replace(&mut self.state.lock().unwrap().playing, false);
        if was_playing {
            self.emit(SurfaceEvent::Pause);
        }
    }

    fn seek(&mut self, position: Duration) {
        self.state.lock().unwrap().seeks.push(position);
        self.emit(SurfaceEvent::TimeUpdate { position });
    }

    fn set_playback_rate(&mut self, _rate: f64) {}

    fn set_aspect_mode(&mut self, _mode: AspectMode) {}

    fn attach_text_track(&mut self, url: &Url, _language: Option<&str>) {
        self.state.lock().unwrap().text_tracks.push(url.clone());
    }

    fn clear_text_tracks(&mut self) {}
}
