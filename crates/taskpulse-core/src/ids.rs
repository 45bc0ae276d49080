//! Branded identifier newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::IdParseError;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh, time-ordered identifier.
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            /// Wrap an existing raw value without validation.
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the raw string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(
    /// Opaque per-request token carried in every metric row.
    RequestId,
    "req"
);
branded_id!(
    /// Opaque session token handed to the client (cookie value).
    SessionToken,
    "sess"
);

/// Per-session participant label of the form `P<n>`, `n >= 1`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ParticipantId(u64);

impl ParticipantId {
    /// Build from a counter value. Returns `None` for zero.
    pub fn from_sequence(n: u64) -> Option<Self> {
        (n > 0).then_some(Self(n))
    }

    /// Wrap a counter value that is known to be non-zero.
    pub(crate) const fn minted(n: u64) -> Self {
        Self(n)
    }

    /// The numeric part of the label.
    pub fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('P')
            .ok_or_else(|| IdParseError::new("participant", s))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdParseError::new("participant", s));
        }
        digits
            .parse::<u64>()
            .ok()
            .and_then(Self::from_sequence)
            .ok_or_else(|| IdParseError::new("participant", s))
    }
}

impl Serialize for ParticipantId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_has_prefix() {
        let id = RequestId::new();
        assert!(id.as_str().starts_with("req_"), "got: {id}");
    }

    #[test]
    fn session_token_has_prefix() {
        let token = SessionToken::new();
        assert!(token.as_str().starts_with("sess_"), "got: {token}");
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(SessionToken::new(), SessionToken::new());
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn from_raw_preserves_value() {
        let token = SessionToken::from_raw("custom-token");
        assert_eq!(token.as_str(), "custom-token");
    }

    #[test]
    fn participant_display() {
        let p = ParticipantId::from_sequence(7).unwrap();
        assert_eq!(p.to_string(), "P7");
        assert_eq!(p.sequence(), 7);
    }

    #[test]
    fn participant_zero_rejected() {
        assert!(ParticipantId::from_sequence(0).is_none());
        assert!("P0".parse::<ParticipantId>().is_err());
    }

    #[test]
    fn participant_parse() {
        let p: ParticipantId = "P42".parse().unwrap();
        assert_eq!(p.sequence(), 42);
    }

    #[test]
    fn participant_parse_rejects_garbage() {
        for raw in ["", "P", "p1", "Q1", "P-1", "P+1", "P1x", "1"] {
            assert!(raw.parse::<ParticipantId>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn participant_serde_is_label() {
        let p = ParticipantId::from_sequence(3).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"P3\"");
        let back: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn participant_orders_by_sequence() {
        let a = ParticipantId::from_sequence(2).unwrap();
        let b = ParticipantId::from_sequence(10).unwrap();
        assert!(a < b);
    }
}
