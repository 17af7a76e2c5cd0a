use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};

use super::autoplay::{AutoPlayState, AutoplayCandidate, AutoplayScheduler, CountdownTick, next_episode};
use super::events::{InputCommand, SessionEvent, SessionNotification, SessionSnapshot};
use super::idle::{ActivityStatus, IdleOverlayScheduler, MenuKind};
use super::progress::ProgressReporter;
use super::resume::{ResumeChoice, ResumeDecision, ResumeNegotiator};
use super::state::{SessionState, Transition};
use super::stream_source::{QualityLadder, StreamRequest, StreamSourceResolver};
use super::surface::{SurfaceEvent, SurfaceEventSink, VideoSurface};
use super::timers::{TimerKind, TimerRegistry};
use super::tracks::TrackManager;
use super::types::{AspectMode, PlaybackSpeed, RepeatMode};
use crate::backends::traits::{MediaServer, PlaybackInfoRequest, WatchHistoryService};
use crate::config::{PlaybackConfig, SessionTimings};
use crate::constants::{RETURN_AFTER_END_DELAY, RETURN_AFTER_ERROR_DELAY};
use crate::models::{
    ItemDetails, MediaItemId, MediaSource, PlaybackInfo, PlaybackSession, ProgressReport,
    ScrobbleKind, ScrobbleRequest, Ticks,
};
use crate::utils::{PlaybackFailure, SessionError};

const NOTIFICATION_CAPACITY: usize = 64;

/// Owns one playback session per screen: the state machine, the video
/// surface, and every timer. All mutation happens in [`Self::handle`], one
/// queued event at a time.
pub struct PlaybackSessionController {
    server: Arc<dyn MediaServer>,
    watch_history: Option<Arc<dyn WatchHistoryService>>,
    surface: Box<dyn VideoSurface>,
    resolver: StreamSourceResolver,
    negotiator: ResumeNegotiator,

    state: SessionState,
    generation: u64,
    session: Option<PlaybackSession>,
    item: Option<ItemDetails>,
    media_source: Option<MediaSource>,
    start_from_beginning: bool,
    pending_resume: Option<Ticks>,
    pending_seek: Option<Ticks>,
    resume_on_foreground: bool,

    tracks: TrackManager,
    quality: QualityLadder,
    progress: ProgressReporter,
    idle: IdleOverlayScheduler,
    autoplay: AutoplayScheduler,
    timers: TimerRegistry,
    aspect: AspectMode,
    speed: PlaybackSpeed,
    repeat: RepeatMode,

    sender: mpsc::UnboundedSender<SessionEvent>,
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
    notifications: broadcast::Sender<SessionNotification>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl std::fmt::Debug for PlaybackSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSessionController")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("session", &self.session)
            .finish()
    }
}

impl PlaybackSessionController {
    pub fn new(
        server: Arc<dyn MediaServer>,
        watch_history: Option<Arc<dyn WatchHistoryService>>,
        mut surface: Box<dyn VideoSurface>,
        playback: &PlaybackConfig,
    ) -> (SessionHandle, PlaybackSessionController) {
        let timings = playback.session_timings();
        let (sender, receiver) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (snapshot, snapshot_rx) = watch::channel(SessionSnapshot::default());

        surface.set_event_sink(SurfaceEventSink::new(sender.clone()));

        let resolver = StreamSourceResolver::new(
            server.stream_endpoint(),
            playback.transport,
            playback.direct_play_containers.clone(),
        );
        let quality = QualityLadder::with_default(&playback.default_quality);

        let controller = PlaybackSessionController {
            progress: ProgressReporter::new(server.clone(), timings.progress_interval),
            idle: IdleOverlayScheduler::new(timings.controls_hide_delay, timings.pause_overlay_delay),
            autoplay: AutoplayScheduler::new(playback.autoplay_enabled, timings.autoplay_countdown_secs),
            timers: TimerRegistry::new(sender.clone()),
            server,
            watch_history,
            surface,
            resolver,
            negotiator: ResumeNegotiator,
            state: SessionState::Idle,
            generation: 0,
            session: None,
            item: None,
            media_source: None,
            start_from_beginning: false,
            pending_resume: None,
            pending_seek: None,
            resume_on_foreground: false,
            tracks: TrackManager::new(),
            quality,
            aspect: AspectMode::default(),
            speed: PlaybackSpeed::default(),
            repeat: RepeatMode::default(),
            sender: sender.clone(),
            receiver,
            notifications: notifications.clone(),
            snapshot,
        };
        let handle = SessionHandle {
            sender,
            notifications,
            snapshot: snapshot_rx,
            timings,
        };

        (handle, controller)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Processes queued events until the session stops or exits.
    pub async fn run(mut self) {
        debug!("Playback session loop started");

        while let Some(event) = self.receiver.recv().await {
            self.handle(event);
            if self.state.is_terminal() {
                break;
            }
        }

        debug!("Playback session loop terminated in state {}", self.state);
    }

    pub fn handle(&mut self, event: SessionEvent) {
        trace!("Handling {:?} in {}", event, self.state);

        match event {
            SessionEvent::Load {
                item_id,
                start_from_beginning,
                respond_to,
            } => {
                let result = self.load(item_id, start_from_beginning);
                if let Some(respond_to) = respond_to {
                    let _ = respond_to.send(result);
                }
            }
            SessionEvent::Stop => self.close(Transition::Stop),
            SessionEvent::ExitToHome => self.close(Transition::Exit),
            SessionEvent::SavePosition => self.save_position(),
            SessionEvent::Background => self.background(),
            SessionEvent::Foreground => self.foreground(),
            SessionEvent::Input(command) => self.handle_input(command),
            SessionEvent::Surface(event) => self.handle_surface(event),
            SessionEvent::TimerFired { kind, token } => {
                if self.timers.accept(kind, token) {
                    self.handle_timer(kind);
                }
            }
            SessionEvent::ItemLoaded { generation, result } => {
                if self.is_current(generation) {
                    self.on_item_loaded(result);
                }
            }
            SessionEvent::PlaybackInfoLoaded { generation, result } => {
                if self.is_current(generation) {
                    self.on_playback_info(result);
                }
            }
            SessionEvent::SubtitleFetched {
                generation,
                stream_index,
                result,
            } => {
                if self.is_current(generation) {
                    self.on_subtitle_fetched(stream_index, result);
                }
            }
            SessionEvent::NextEpisodeResolved {
                generation,
                candidate,
            } => {
                if self.is_current(generation) {
                    self.on_next_episode(candidate);
                }
            }
        }

        self.publish_snapshot();
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation || self.state.is_terminal() {
            debug!(
                "Ignoring completion for stale session {} (current {})",
                generation, self.generation
            );
            return false;
        }
        true
    }

    fn transition(&mut self, transition: Transition) -> bool {
        match self.state.apply(&transition) {
            Some(next) => {
                debug!("Session {} -> {} on {:?}", self.state, next, transition);
                self.state = next;
                true
            }
            None => {
                trace!("Ignoring {:?} in {}", transition, self.state);
                false
            }
        }
    }

    fn notify(&self, notification: SessionNotification) {
        let _ = self.notifications.send(notification);
    }

    fn activity_status(&self) -> ActivityStatus {
        self.session
            .as_ref()
            .map(ActivityStatus::from)
            .unwrap_or_default()
    }

    fn current_report(&self) -> Option<ProgressReport> {
        let session = self.session.as_ref()?;
        let mut report = session.report();
        report.audio_stream_index = self.tracks.current_audio();
        report.subtitle_stream_index = self.tracks.current_subtitle();
        Some(report)
    }

    // Lifecycle

    fn load(
        &mut self,
        item_id: Option<MediaItemId>,
        start_from_beginning: bool,
    ) -> Result<u64, SessionError> {
        let item_id = match item_id {
            Some(id) if !id.is_blank() => id,
            _ => {
                warn!("Load requested without a media item");
                return Err(SessionError::NoMediaSelected);
            }
        };
        if self.state.is_terminal() {
            return Err(SessionError::ControllerGone);
        }

        self.teardown_session();
        self.transition(Transition::LoadRequested);
        self.generation += 1;
        self.session = Some(PlaybackSession::new(item_id.clone()));
        self.start_from_beginning = start_from_beginning;

        info!("Loading {} (session {})", item_id, self.generation);

        let server = self.server.clone();
        let sender = self.sender.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = server
                .get_item(&item_id)
                .await
                .map_err(SessionError::network);
            let _ = sender.send(SessionEvent::ItemLoaded { generation, result });
        });

        Ok(self.generation)
    }

    /// Releases everything that belongs to the current session.
    fn teardown_session(&mut self) {
        self.autoplay.cancel(&mut self.timers);
        self.finish_reporting();
        self.timers.clear_all();
        self.idle.reset(&mut self.timers);
        self.tracks.teardown();
        if self.media_source.is_some() {
            self.surface.clear_text_tracks();
            self.surface.release();
        }
        self.session = None;
        self.item = None;
        self.media_source = None;
        self.pending_resume = None;
        self.pending_seek = None;
        self.resume_on_foreground = false;
    }

    /// Sends the stop report if a start report went out.
    fn finish_reporting(&mut self) {
        if self.progress.has_started()
            && let Some(report) = self.current_report()
        {
            self.progress.report_stop(&mut self.timers, report);
        }
        self.progress.reset(&mut self.timers);
    }

    fn close(&mut self, transition: Transition) {
        if self.state.is_terminal() {
            return;
        }
        let notification = match transition {
            Transition::Exit => SessionNotification::NavigateHome,
            _ => SessionNotification::NavigateBack,
        };

        info!("Closing playback session ({:?})", transition);
        self.teardown_session();
        self.transition(transition);
        self.notify(notification);
    }

    fn fail(&mut self, failure: PlaybackFailure, detail: &str) {
        error!("Playback failed ({:?}): {}", failure, detail);

        self.autoplay.cancel(&mut self.timers);
        self.finish_reporting();
        self.timers.clear_all();
        self.idle.reset(&mut self.timers);
        if let Some(session) = self.session.as_mut() {
            session.is_playing = false;
            session.is_paused = false;
        }
        self.pending_seek = None;

        self.transition(Transition::Failed(failure));
        self.notify(SessionNotification::ErrorMessage(
            failure.user_message().to_string(),
        ));
        self.timers
            .arm_once(TimerKind::ReturnNavigation, RETURN_AFTER_ERROR_DELAY);
    }

    // Load continuation

    fn on_item_loaded(&mut self, result: Result<ItemDetails, SessionError>) {
        let item = match result {
            Ok(item) => item,
            Err(e) => return self.fail(PlaybackFailure::from(&e), &e.to_string()),
        };

        if let Some(session) = self.session.as_mut() {
            session.duration = item.run_time;
        }
        let decision = self.negotiator.negotiate(&item, self.start_from_beginning);
        debug!("Resume decision for {}: {:?}", item.name, decision);
        self.item = Some(item);

        match decision {
            ResumeDecision::Prompt { resume_at } => {
                self.transition(Transition::PromptRequired);
                self.pending_resume = Some(resume_at);
                self.notify(SessionNotification::ResumePrompt {
                    generation: self.generation,
                    resume_at,
                });
            }
            ResumeDecision::StartAt(start) => self.fetch_playback_info(start),
        }
    }

    fn on_resume_choice(&mut self, generation: u64, choice: ResumeChoice) {
        if generation != self.generation || self.state != SessionState::ResumePrompt {
            debug!("Ignoring resume choice for session {}", generation);
            return;
        }
        let Some(resume_at) = self.pending_resume.take() else {
            return;
        };

        let start = self.negotiator.resolve(choice, resume_at);
        info!("Resume choice {:?}, starting at {:?}", choice, start.as_duration());
        self.transition(Transition::ResumeChosen);
        self.fetch_playback_info(start);
    }

    fn fetch_playback_info(&mut self, start: Ticks) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.position = start;
        self.pending_seek = (!start.is_zero()).then_some(start);

        let request = PlaybackInfoRequest {
            start_position: start,
            max_streaming_bitrate: self.quality.current().bitrate_ceiling(),
            audio_stream_index: None,
        };
        let item_id = session.media_id.clone();
        let server = self.server.clone();
        let sender = self.sender.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = server
                .get_playback_info(&item_id, &request)
                .await
                .map_err(SessionError::network);
            let _ = sender.send(SessionEvent::PlaybackInfoLoaded { generation, result });
        });
    }

    fn on_playback_info(&mut self, result: Result<PlaybackInfo, SessionError>) {
        let info = match result {
            Ok(info) => info,
            Err(e) => return self.fail(PlaybackFailure::from(&e), &e.to_string()),
        };
        let Some(source) = info.media_sources.into_iter().next() else {
            let e = SessionError::NoPlayableSource;
            return self.fail(PlaybackFailure::from(&e), &e.to_string());
        };

        if let Some(session) = self.session.as_mut() {
            session.media_source_id = Some(source.id.clone());
            session.play_session_id = info.play_session_id;
        }
        self.tracks.load_source(&source);
        self.media_source = Some(source);

        if !self.set_source() {
            return;
        }
        if let Some(index) = self.tracks.request_default_subtitle() {
            self.fetch_subtitle(index);
        }
    }

    /// Resolves the stream URL and hands it to the surface.
    fn set_source(&mut self) -> bool {
        let (Some(session), Some(source)) = (self.session.as_ref(), self.media_source.as_ref())
        else {
            return false;
        };
        let audio_stream_index = self
            .tracks
            .current_audio()
            .unwrap_or_else(|| StreamSourceResolver::default_audio_index(source));

        let resolved = self.resolver.resolve(&StreamRequest {
            item_id: &session.media_id,
            source,
            play_session_id: session.play_session_id.as_ref(),
            audio_stream_index,
            quality: self.quality.current(),
        });
        match resolved {
            Ok(url) => {
                self.surface.set_source(&url);
                true
            }
            Err(e) => {
                self.fail(PlaybackFailure::from(&e), &e.to_string());
                false
            }
        }
    }

    fn can_switch_source(&self) -> bool {
        self.session.is_some() && self.media_source.is_some() && self.state.can_switch_source()
    }

    /// Swap-and-reload at the current position, for quality and audio changes.
    fn switch_source(&mut self) {
        let Some(position) = self.session.as_ref().map(|s| s.position) else {
            return;
        };
        if self.media_source.is_none() || !self.transition(Transition::SwitchSource) {
            return;
        }

        info!("Reloading source at {:?}", position.as_duration());
        self.pending_seek = Some(position);
        if let Some(session) = self.session.as_mut() {
            session.is_playing = false;
        }
        self.surface.pause();
        if let Some(source) = self.media_source.as_ref() {
            self.tracks.reload_source(source);
        }
        self.set_source();
    }

    fn fetch_subtitle(&mut self, stream_index: u32) {
        let (Some(session), Some(source)) = (self.session.as_ref(), self.media_source.as_ref())
        else {
            return;
        };
        let item_id = session.media_id.clone();
        let source_id = source.id.clone();
        let server = self.server.clone();
        let sender = self.sender.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = server
                .fetch_subtitle(&item_id, &source_id, stream_index)
                .await
                .map_err(|e| SessionError::SubtitleFetch(e.to_string()));
            let _ = sender.send(SessionEvent::SubtitleFetched {
                generation,
                stream_index,
                result,
            });
        });
    }

    fn on_subtitle_fetched(&mut self, stream_index: u32, result: Result<String, SessionError>) {
        if !self.tracks.is_pending(stream_index) {
            debug!("Subtitle {} superseded, dropping payload", stream_index);
            return;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{}", e);
                self.tracks.subtitle_failed(stream_index);
                self.surface.clear_text_tracks();
                return;
            }
        };

        self.surface.clear_text_tracks();
        match self.tracks.apply_subtitle(stream_index, &payload) {
            Ok(resource) => {
                info!("Attaching subtitle stream {}", stream_index);
                self.surface
                    .attach_text_track(resource.url(), resource.language());
            }
            Err(e) => {
                warn!("Subtitle {} could not be applied: {}", stream_index, e);
                self.tracks.clear_subtitle();
            }
        }
    }

    // Surface events

    fn handle_surface(&mut self, event: SurfaceEvent) {
        if self.session.is_none() {
            trace!("Surface event {:?} without a session", event);
            return;
        }

        match event {
            SurfaceEvent::LoadedMetadata { duration } => {
                if let Some(duration) = duration.filter(|d| !d.is_zero())
                    && let Some(session) = self.session.as_mut()
                {
                    session.duration = Ticks::from_duration(duration);
                }
                if let Some(position) = self.pending_seek.take() {
                    debug!("Seeking to {:?} after load", position.as_duration());
                    self.surface.seek(position.as_duration());
                    if let Some(session) = self.session.as_mut() {
                        session.position = position;
                    }
                }
                if let Some(resource) = self.tracks.applied() {
                    self.surface.clear_text_tracks();
                    self.surface
                        .attach_text_track(resource.url(), resource.language());
                }
            }
            SurfaceEvent::CanPlay => {
                if self.transition(Transition::CanPlay) {
                    self.surface.set_playback_rate(self.speed.rate());
                    self.surface.set_aspect_mode(self.aspect);
                    self.surface.play();
                }
            }
            SurfaceEvent::Play => self.on_play(),
            SurfaceEvent::Pause => self.on_pause(),
            SurfaceEvent::TimeUpdate { position } => {
                // A reload reports the new source's position before the seek lands
                if self.pending_seek.is_none()
                    && let Some(session) = self.session.as_mut()
                {
                    session.position = Ticks::from_duration(position);
                }
            }
            SurfaceEvent::Ended => {
                if self.transition(Transition::Ended) {
                    self.on_ended();
                }
            }
            SurfaceEvent::Error { code } => {
                let failure = PlaybackFailure::from_media_error_code(code);
                self.fail(failure, &format!("media error code {}", code));
            }
        }
    }

    fn on_play(&mut self) {
        if !self.transition(Transition::Play) {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.is_playing = true;
            session.is_paused = false;
        }
        if let Some(report) = self.current_report() {
            self.progress.report_start(report);
        }
        self.progress.start(&mut self.timers);
        self.idle.on_play(&mut self.timers);
    }

    fn on_pause(&mut self) {
        if !self.transition(Transition::Pause) {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.is_paused = true;
        }
        if let Some(report) = self.current_report() {
            self.progress.report_progress(report);
        }
        self.idle.on_pause(&mut self.timers);
    }

    fn on_ended(&mut self) {
        info!("Playback ended");
        if let Some(session) = self.session.as_mut() {
            session.is_playing = false;
            session.is_paused = false;
            if !session.duration.is_zero() {
                session.position = session.duration;
            }
        }
        self.finish_reporting();
        self.idle.reset(&mut self.timers);
        self.scrobble();

        if self.repeat == RepeatMode::One {
            debug!("Repeating current item");
            if let Some(session) = self.session.as_mut() {
                session.position = Ticks::ZERO;
            }
            self.surface.seek(Ticks::ZERO.as_duration());
            self.surface.play();
            return;
        }

        match self.item.clone() {
            Some(item) if self.autoplay.engages_for(&item) => self.lookup_next_episode(item),
            _ => self
                .timers
                .arm_once(TimerKind::ReturnNavigation, RETURN_AFTER_END_DELAY),
        }
    }

    fn lookup_next_episode(&mut self, item: ItemDetails) {
        let Some(series_id) = item.series_id.clone() else {
            return;
        };
        let server = self.server.clone();
        let sender = self.sender.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let candidate = match server.get_episodes(&series_id).await {
                Ok(episodes) => next_episode(&item, &episodes),
                Err(e) => {
                    warn!("Next episode lookup failed: {}", e);
                    None
                }
            };
            let _ = sender.send(SessionEvent::NextEpisodeResolved {
                generation,
                candidate,
            });
        });
    }

    fn on_next_episode(&mut self, candidate: Option<AutoplayCandidate>) {
        if self.state != SessionState::Ended {
            return;
        }
        match candidate {
            Some(candidate) => {
                let remaining = self.autoplay.begin(candidate.clone(), &mut self.timers);
                self.notify(SessionNotification::AutoplayCountdown {
                    candidate,
                    remaining,
                });
            }
            None => {
                debug!("No next episode, returning");
                self.timers
                    .arm_once(TimerKind::ReturnNavigation, RETURN_AFTER_END_DELAY);
            }
        }
    }

    fn start_autoplay(&mut self, candidate: AutoplayCandidate) {
        info!("Autoplaying {}", candidate.name);
        if let Err(e) = self.load(Some(candidate.id), true) {
            warn!("Autoplay load failed: {}", e);
        }
    }

    /// Opportunistic watch-history sync for naturally finished episodes.
    fn scrobble(&self) {
        let (Some(history), Some(item)) = (self.watch_history.clone(), self.item.clone()) else {
            return;
        };
        let (true, Some(season), Some(episode)) =
            (item.is_episode(), item.season_number, item.episode_number)
        else {
            return;
        };

        let server = self.server.clone();
        tokio::spawn(async move {
            let provider_ids = match &item.series_id {
                Some(series_id) => match server.get_item(&MediaItemId::new(series_id.as_str())).await {
                    Ok(series) => series.provider_ids,
                    Err(e) => {
                        warn!("Skipping watch history, series lookup failed: {}", e);
                        return;
                    }
                },
                None => item.provider_ids.clone(),
            };

            let request = ScrobbleRequest {
                title: item.series_name.clone().unwrap_or_else(|| item.name.clone()),
                kind: ScrobbleKind::Episode { season, episode },
                provider_ids,
                watched_at: Utc::now(),
            };
            if let Err(e) = history.mark_watched(&request).await {
                warn!("Watch history update failed: {}", e);
            }
        });
    }

    // Input

    fn handle_input(&mut self, command: InputCommand) {
        if self.session.is_none() || self.state.is_terminal() {
            debug!("Ignoring {:?} without a loaded session", command);
            return;
        }

        let status = self.activity_status();
        self.idle.on_activity(&mut self.timers, status);

        match command {
            InputCommand::TogglePlayPause => match self.state {
                SessionState::Playing => self.surface.pause(),
                SessionState::Paused | SessionState::Ready => self.surface.play(),
                _ => trace!("Play/pause ignored in {}", self.state),
            },
            InputCommand::SeekForward { secs } => self.seek_by(i128::from(secs)),
            InputCommand::SeekBackward { secs } => self.seek_by(-i128::from(secs)),
            InputCommand::ToggleTracksMenu => self.toggle_menu(MenuKind::Tracks),
            InputCommand::ToggleSettingsMenu => self.toggle_menu(MenuKind::Settings),
            InputCommand::CycleQuality
            | InputCommand::SelectQuality(_)
            | InputCommand::SelectAudioTrack(_)
                if !self.can_switch_source() =>
            {
                debug!("Ignoring {:?} in {}", command, self.state);
            }
            InputCommand::CycleQuality => {
                let name = self.quality.cycle().name.clone();
                info!("Quality -> {}", name);
                self.switch_source();
            }
            InputCommand::SelectQuality(index) => {
                if index == self.quality.current_index() {
                    return;
                }
                if self.quality.select(index).is_some() {
                    self.switch_source();
                }
            }
            InputCommand::CycleAspect => {
                self.aspect = self.aspect.next();
                self.surface.set_aspect_mode(self.aspect);
            }
            InputCommand::CycleSpeed => {
                self.speed = self.speed.next();
                self.surface.set_playback_rate(self.speed.rate());
            }
            InputCommand::CycleRepeat => {
                self.repeat = self.repeat.next();
                debug!("Repeat -> {}", self.repeat.label());
            }
            InputCommand::SelectAudioTrack(index) => {
                if self.tracks.select_audio(index) {
                    info!("Audio stream -> {}", index);
                    self.switch_source();
                }
            }
            InputCommand::SelectSubtitleTrack(index) => {
                match self.tracks.request_subtitle(index) {
                    Some(stream_index) => self.fetch_subtitle(stream_index),
                    None if index.is_none() => {
                        info!("Subtitles off");
                        self.surface.clear_text_tracks();
                    }
                    None => {}
                }
            }
            InputCommand::KeyPress => {}
            InputCommand::ResumeChoice { generation, choice } => {
                self.on_resume_choice(generation, choice)
            }
            InputCommand::AutoplayPlayNow => {
                if let Some(candidate) = self.autoplay.play_now(&mut self.timers) {
                    self.start_autoplay(candidate);
                }
            }
            InputCommand::AutoplayCancel => {
                if self.autoplay.cancel(&mut self.timers) {
                    self.notify(SessionNotification::AutoplayCancelled);
                    self.close(Transition::Stop);
                }
            }
        }
    }

    fn seek_by(&mut self, delta_secs: i128) {
        if !self.state.can_seek() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let target = i128::from(session.position.0) + delta_secs * i128::from(Ticks::PER_SECOND);
        let position = session.clamp_position(target);
        session.position = position;
        debug!("Seeking to {:?}", position.as_duration());
        self.surface.seek(position.as_duration());
    }

    fn toggle_menu(&mut self, kind: MenuKind) {
        let status = self.activity_status();
        let open = self.idle.toggle_menu(kind, &mut self.timers, status);
        debug!("Open menu: {:?}", open);
    }

    // Timers

    fn handle_timer(&mut self, kind: TimerKind) {
        trace!("{:?} timer fired", kind);
        let status = self.activity_status();

        match kind {
            TimerKind::Progress => {
                if let (Some(session), Some(report)) = (self.session.as_ref(), self.current_report()) {
                    self.progress.tick(session, report);
                }
            }
            TimerKind::ControlsHide => {
                if self.idle.on_controls_timer(status) {
                    trace!("Controls hidden");
                }
            }
            TimerKind::PauseOverlay => {
                if self.idle.on_pause_overlay_timer(status) {
                    debug!("Pause overlay shown");
                }
            }
            TimerKind::AutoplayTick => match self.autoplay.tick(&mut self.timers) {
                CountdownTick::Remaining(remaining) => {
                    if let AutoPlayState::Counting { candidate, .. } = self.autoplay.state() {
                        self.notify(SessionNotification::AutoplayCountdown {
                            candidate: candidate.clone(),
                            remaining,
                        });
                    }
                }
                CountdownTick::Expired(candidate) => self.start_autoplay(candidate),
                CountdownTick::Inactive => {}
            },
            TimerKind::ReturnNavigation => self.close(Transition::Stop),
        }
    }

    // Host hooks

    fn save_position(&mut self) {
        if !matches!(
            self.state,
            SessionState::Ready | SessionState::Playing | SessionState::Paused
        ) {
            return;
        }
        if let Some(report) = self.current_report() {
            debug!("Saving position {:?}", report.position.as_duration());
            self.progress.report_progress(report);
        }
    }

    fn background(&mut self) {
        self.save_position();
        self.resume_on_foreground = self.state.is_playing();
        if self.resume_on_foreground {
            info!("Pausing for background");
            self.surface.pause();
        }
    }

    fn foreground(&mut self) {
        if std::mem::take(&mut self.resume_on_foreground) && self.state.is_paused() {
            info!("Resuming after background");
            self.surface.play();
        }
    }

    fn publish_snapshot(&self) {
        let session = self.session.as_ref();
        self.snapshot.send_replace(SessionSnapshot {
            state: self.state.clone(),
            generation: self.generation,
            item: self.item.clone(),
            position: session.map(|s| s.position).unwrap_or_default(),
            duration: session.map(|s| s.duration).unwrap_or_default(),
            audio_tracks: self.tracks.audio_tracks().to_vec(),
            subtitle_tracks: self.tracks.subtitle_tracks().to_vec(),
            current_audio: self.tracks.current_audio(),
            current_subtitle: self.tracks.current_subtitle(),
            quality: self.quality.current().name.clone(),
            quality_options: self
                .quality
                .options()
                .iter()
                .map(|o| o.name.clone())
                .collect(),
            aspect: self.aspect,
            speed: self.speed,
            repeat: self.repeat,
            controls_visible: self.idle.controls_visible(),
            pause_overlay_visible: self.idle.pause_overlay_visible(),
            open_menu: self.idle.open_menu(),
        });
    }
}

/// Handle to send commands to the session controller
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionEvent>,
    notifications: broadcast::Sender<SessionNotification>,
    snapshot: watch::Receiver<SessionSnapshot>,
    timings: SessionTimings,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("sender", &"<UnboundedSender>")
            .finish()
    }
}

impl SessionHandle {
    fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.sender
            .send(event)
            .map_err(|_| SessionError::ControllerGone)
    }

    /// Starts loading `item_id` and returns the new session generation.
    pub async fn load(&self, item_id: Option<MediaItemId>) -> Result<u64, SessionError> {
        self.load_with(item_id, false).await
    }

    /// Loads without offering to resume.
    pub async fn load_from_beginning(&self, item_id: MediaItemId) -> Result<u64, SessionError> {
        self.load_with(Some(item_id), true).await
    }

    async fn load_with(
        &self,
        item_id: Option<MediaItemId>,
        start_from_beginning: bool,
    ) -> Result<u64, SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionEvent::Load {
            item_id,
            start_from_beginning,
            respond_to: Some(respond_to),
        })?;
        response.await.map_err(|_| SessionError::ControllerGone)?
    }

    pub fn input(&self, command: InputCommand) -> Result<(), SessionError> {
        self.send(SessionEvent::Input(command))
    }

    pub fn toggle_play_pause(&self) -> Result<(), SessionError> {
        self.input(InputCommand::TogglePlayPause)
    }

    /// Seeks forward by the configured step.
    pub fn seek_forward(&self) -> Result<(), SessionError> {
        self.input(InputCommand::SeekForward {
            secs: self.timings.seek_step.as_secs(),
        })
    }

    pub fn seek_backward(&self) -> Result<(), SessionError> {
        self.input(InputCommand::SeekBackward {
            secs: self.timings.seek_step.as_secs(),
        })
    }

    pub fn toggle_tracks_menu(&self) -> Result<(), SessionError> {
        self.input(InputCommand::ToggleTracksMenu)
    }

    pub fn toggle_settings_menu(&self) -> Result<(), SessionError> {
        self.input(InputCommand::ToggleSettingsMenu)
    }

    pub fn cycle_quality(&self) -> Result<(), SessionError> {
        self.input(InputCommand::CycleQuality)
    }

    pub fn cycle_aspect(&self) -> Result<(), SessionError> {
        self.input(InputCommand::CycleAspect)
    }

    pub fn cycle_speed(&self) -> Result<(), SessionError> {
        self.input(InputCommand::CycleSpeed)
    }

    pub fn cycle_repeat(&self) -> Result<(), SessionError> {
        self.input(InputCommand::CycleRepeat)
    }

    pub fn select_audio_track(&self, index: u32) -> Result<(), SessionError> {
        self.input(InputCommand::SelectAudioTrack(index))
    }

    pub fn select_subtitle_track(&self, index: Option<u32>) -> Result<(), SessionError> {
        self.input(InputCommand::SelectSubtitleTrack(index))
    }

    pub fn choose_resume(&self, generation: u64, choice: ResumeChoice) -> Result<(), SessionError> {
        self.input(InputCommand::ResumeChoice { generation, choice })
    }

    pub fn autoplay_play_now(&self) -> Result<(), SessionError> {
        self.input(InputCommand::AutoplayPlayNow)
    }

    pub fn autoplay_cancel(&self) -> Result<(), SessionError> {
        self.input(InputCommand::AutoplayCancel)
    }

    pub fn stop(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Stop)
    }

    pub fn exit_to_home(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::ExitToHome)
    }

    pub fn save_position(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::SavePosition)
    }

    pub fn background(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Background)
    }

    pub fn foreground(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Foreground)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
        self.notifications.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }
}
