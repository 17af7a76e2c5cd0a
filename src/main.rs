use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marquee::backends::{JellyfinBackend, MediaServer, TraktClient, WatchHistoryService};
use marquee::config::Config;
use marquee::models::MediaItemId;
use marquee::player::{
    HeadlessSurface, InputCommand, PlaybackSessionController, ResumeChoice, SessionHandle,
    SessionNotification,
};

const USAGE: &str = "\
commands:
  p            play/pause          f / b       seek forward / back
  a <index>    audio track         s <index|off>  subtitle track
  quality [n]  next / pick quality  qualities   list qualities
  aspect / speed / repeat
  tracks       tracks menu         settings    settings menu
  resume       resume at saved     restart     start over
  next         play next now       cancel      cancel autoplay
  bg / fg      background / foreground
  q            stop                home        exit to home";

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marquee=debug")),
        )
        .init();

    info!("Starting Marquee");

    let item_id = std::env::args()
        .nth(1)
        .map(MediaItemId::new)
        .context("usage: marquee <item-id>")?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(item_id))
}

async fn run(item_id: MediaItemId) -> Result<()> {
    let config = Config::load()?;

    let server: Arc<dyn MediaServer> = Arc::new(JellyfinBackend::from_config(&config.server)?);
    let watch_history: Option<Arc<dyn WatchHistoryService>> =
        match TraktClient::from_config(&config.watch_history)? {
            Some(client) => Some(Arc::new(client)),
            None => None,
        };

    // The headless surface needs a clip length; use the item's runtime
    let item = server.get_item(&item_id).await?;
    info!("Playing {} ({:?})", item.name, item.run_time.as_duration());
    let duration = Some(item.run_time.as_duration())
        .filter(|d| !d.is_zero())
        .unwrap_or(Duration::from_secs(60));

    let surface = Box::new(HeadlessSurface::new(duration));
    let (handle, controller) =
        PlaybackSessionController::new(server, watch_history, surface, &config.playback);
    let mut session = tokio::spawn(controller.run());

    spawn_notification_printer(&handle);
    handle.load(Some(item_id)).await?;

    println!("{}", USAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Err(e) = dispatch(&handle, line.trim()) {
                    warn!("{}", e);
                    break;
                }
            }
            _ = &mut session => {
                info!("Playback session finished");
                return Ok(());
            }
        }
    }

    let _ = handle.stop();
    let _ = session.await;
    Ok(())
}

fn dispatch(handle: &SessionHandle, line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let argument = parts.next();

    let generation = handle.snapshot().generation;
    match command {
        "" => {}
        "p" => handle.toggle_play_pause()?,
        "f" => handle.seek_forward()?,
        "b" => handle.seek_backward()?,
        "a" => match argument.and_then(|a| a.parse().ok()) {
            Some(index) => handle.select_audio_track(index)?,
            None => println!("usage: a <index>"),
        },
        "s" => match argument {
            Some("off") => handle.select_subtitle_track(None)?,
            Some(index) => match index.parse() {
                Ok(index) => handle.select_subtitle_track(Some(index))?,
                Err(_) => println!("usage: s <index|off>"),
            },
            None => println!("usage: s <index|off>"),
        },
        "quality" => match argument.and_then(|a| a.parse().ok()) {
            Some(index) => handle.input(InputCommand::SelectQuality(index))?,
            None => handle.cycle_quality()?,
        },
        "aspect" => handle.cycle_aspect()?,
        "speed" => handle.cycle_speed()?,
        "repeat" => handle.cycle_repeat()?,
        "tracks" => handle.toggle_tracks_menu()?,
        "settings" => handle.toggle_settings_menu()?,
        "resume" => handle.choose_resume(generation, ResumeChoice::Resume)?,
        "restart" => handle.choose_resume(generation, ResumeChoice::StartOver)?,
        "next" => handle.autoplay_play_now()?,
        "cancel" => handle.autoplay_cancel()?,
        "bg" => handle.background()?,
        "fg" => handle.foreground()?,
        "q" => handle.stop()?,
        "home" => handle.exit_to_home()?,
        "status" => print_status(handle),
        "qualities" => {
            let snapshot = handle.snapshot();
            for (index, name) in snapshot.quality_options.iter().enumerate() {
                let marker = if *name == snapshot.quality { "*" } else { " " };
                println!("{} {} {}", marker, index, name);
            }
        }
        _ => {
            handle.input(InputCommand::KeyPress)?;
            println!("{}", USAGE);
        }
    }
    Ok(())
}

fn print_status(handle: &SessionHandle) {
    let snapshot = handle.snapshot();
    println!(
        "{} {:.0}s/{:.0}s quality={} aspect={} speed={} repeat={} audio={:?} subtitle={:?}",
        snapshot.state,
        snapshot.position.as_secs_f64(),
        snapshot.duration.as_secs_f64(),
        snapshot.quality,
        snapshot.aspect.label(),
        snapshot.speed.label(),
        snapshot.repeat.label(),
        snapshot.current_audio,
        snapshot.current_subtitle,
    );
}

fn spawn_notification_printer(handle: &SessionHandle) {
    let mut notifications = handle.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification {
                SessionNotification::ResumePrompt { resume_at, .. } => println!(
                    "Resume from {:.0}s? (resume / restart)",
                    resume_at.as_secs_f64()
                ),
                SessionNotification::AutoplayCountdown {
                    candidate,
                    remaining,
                } => println!("Up next: {} in {}s (next / cancel)", candidate.name, remaining),
                SessionNotification::AutoplayCancelled => println!("Autoplay cancelled"),
                SessionNotification::ErrorMessage(message) => println!("Error: {}", message),
                SessionNotification::NavigateBack => println!("Leaving player"),
                SessionNotification::NavigateHome => println!("Returning home"),
            }
        }
    });
}
