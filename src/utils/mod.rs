pub mod errors;

pub use errors::{PlaybackFailure, SessionError};
