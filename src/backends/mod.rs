pub mod jellyfin;
pub mod traits;
pub mod trakt;

// Re-export commonly used types
pub use jellyfin::JellyfinBackend;
pub use traits::{MediaServer, PlaybackInfoRequest, StreamEndpoint, WatchHistoryService};
pub use trakt::TraktClient;
