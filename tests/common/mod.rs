#![allow(dead_code)]

pub mod mocks;

use marquee::backends::{JellyfinBackend, MediaServer};
use marquee::backends::jellyfin::JellyfinApi;
use marquee::config::PlaybackConfig;
use marquee::player::{
    PlaybackSessionController, SessionHandle, SessionNotification, SessionSnapshot,
};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use mocks::MockSurface;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct TestSession {
    pub handle: SessionHandle,
    pub surface: MockSurface,
    pub notifications: broadcast::Receiver<SessionNotification>,
    pub task: JoinHandle<()>,
}

/// Runs a session against the mock Jellyfin server.
pub fn start_session(server: &ServerGuard, config: PlaybackConfig) -> TestSession {
    let api = JellyfinApi::new(&server.url(), "test_token", "user-1", "device-1", "Test TV")
        .expect("client");
    let backend: Arc<dyn MediaServer> = Arc::new(JellyfinBackend::new(api));
    let surface = MockSurface::new(Duration::from_secs(3000));

    let (handle, controller) =
        PlaybackSessionController::new(backend, None, Box::new(surface.clone()), &config);
    let notifications = handle.subscribe();
    let task = tokio::spawn(controller.run());

    TestSession {
        handle,
        surface,
        notifications,
        task,
    }
}

pub async fn wait_for_snapshot(
    handle: &SessionHandle,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.watch();
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("controller gone")
        .clone()
}

pub async fn next_notification(
    notifications: &mut broadcast::Receiver<SessionNotification>,
) -> SessionNotification {
    tokio::time::timeout(WAIT, notifications.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("notification channel closed")
}

pub fn item_json(id: &str, item_type: &str, resume_ticks: u64) -> serde_json::Value {
    json!({
        "Id": id,
        "Name": format!("Item {}", id),
        "Type": item_type,
        "RunTimeTicks": 30_000_000_000u64,
        "UserData": { "PlaybackPositionTicks": resume_ticks, "Played": false }
    })
}

pub fn playback_info_json(source_id: &str) -> serde_json::Value {
    json!({
        "MediaSources": [
            {
                "Id": source_id,
                "Container": "mkv",
                "SupportsDirectPlay": false,
                "SupportsTranscoding": true,
                "MediaStreams": [
                    { "Type": "Video", "Index": 0, "IsDefault": true },
                    { "Type": "Audio", "Index": 1, "Language": "eng", "IsDefault": true },
                    { "Type": "Subtitle", "Index": 2, "Language": "eng", "IsDefault": true }
                ]
            }
        ],
        "PlaySessionId": "play-session-1"
    })
}

pub async fn mock_item(server: &mut ServerGuard, id: &str, body: serde_json::Value) -> Mock {
    server
        .mock("GET", format!("/Users/user-1/Items/{}", id).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

pub async fn mock_playback_info(
    server: &mut ServerGuard,
    id: &str,
    start_ticks: u64,
    source_id: &str,
) -> Mock {
    server
        .mock("POST", format!("/Items/{}/PlaybackInfo", id).as_str())
        .match_query(Matcher::UrlEncoded(
            "StartTimeTicks".into(),
            start_ticks.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playback_info_json(source_id).to_string())
        .expect(1)
        .create_async()
        .await
}

pub async fn mock_report(server: &mut ServerGuard, path: &str) -> Mock {
    server
        .mock("POST", path)
        .with_status(204)
        .create_async()
        .await
}
