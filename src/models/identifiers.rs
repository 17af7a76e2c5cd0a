use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! impl_id_type {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Blank or whitespace-only ids never reach the backend.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_id_type!(MediaItemId);
impl_id_type!(MediaSourceId);
impl_id_type!(PlaySessionId);
impl_id_type!(SeriesId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_ids() {
        assert!(MediaItemId::new("").is_blank());
        assert!(MediaItemId::new("   ").is_blank());
        assert!(!MediaItemId::new("abc").is_blank());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = MediaSourceId::new("source-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"source-1\"");

        let back: MediaSourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_display_and_conversions() {
        let id = PlaySessionId::from("play-42");
        assert_eq!(id.to_string(), "play-42");
        assert_eq!(id.as_ref(), "play-42");
        assert_eq!(SeriesId::from("s".to_string()).as_str(), "s");
    }
}
