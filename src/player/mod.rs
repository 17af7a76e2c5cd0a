pub mod autoplay;
pub mod controller;
pub mod events;
pub mod headless;
pub mod idle;
pub mod progress;
pub mod resume;
pub mod state;
pub mod stream_source;
pub mod surface;
pub mod timed_text;
pub mod timers;
pub mod tracks;
pub mod types;

pub use controller::{PlaybackSessionController, SessionHandle};
pub use events::{InputCommand, SessionNotification, SessionSnapshot};
pub use headless::HeadlessSurface;
pub use resume::ResumeChoice;
pub use state::SessionState;
pub use surface::{SurfaceEvent, SurfaceEventSink, VideoSurface};
