//! Session token → participant identity registry.
//!
//! The request layer hands over whatever token the client presented (usually a
//! cookie value). Known tokens resolve to the identity they were created with;
//! missing or unknown tokens get a fresh token and the next participant number.
//! Identities are never re-minted for a live session.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use taskpulse_core::{IdentityCounter, ParticipantId, SessionToken};
use tracing::{debug, info};

/// Outcome of resolving a request's session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSession {
    /// Token the client should present from now on.
    pub token: SessionToken,
    /// Identity bound to the token.
    pub participant: ParticipantId,
    /// Whether the session was created by this call.
    pub created: bool,
}

#[derive(Debug)]
struct SessionEntry {
    participant: ParticipantId,
    last_seen: Instant,
}

/// Concurrent registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionToken, SessionEntry>,
    counter: IdentityCounter,
}

impl SessionRegistry {
    /// Create an empty registry whose first participant will be `P1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the identity for `existing`, or mint a new session if the token is
    /// absent or unknown.
    pub fn resolve_or_create(&self, existing: Option<&SessionToken>) -> ResolvedSession {
        if let Some(token) = existing {
            if let Some(mut entry) = self.sessions.get_mut(token) {
                entry.last_seen = Instant::now();
                return ResolvedSession {
                    token: token.clone(),
                    participant: entry.participant,
                    created: false,
                };
            }
            debug!("unknown session token, minting a new session");
        }

        let token = SessionToken::new();
        let participant = self.counter.next_participant();
        let _previous = self.sessions.insert(
            token.clone(),
            SessionEntry {
                participant,
                last_seen: Instant::now(),
            },
        );
        info!(participant = %participant, "session created");

        ResolvedSession {
            token,
            participant,
            created: true,
        }
    }

    /// Identity for a token without touching its last-seen time.
    pub fn participant(&self, token: &SessionToken) -> Option<ParticipantId> {
        self.sessions.get(token).map(|e| e.participant)
    }

    /// Forget a single session. Its identity is not reissued.
    pub fn remove(&self, token: &SessionToken) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop sessions not seen for longer than `max_idle`. Returns how many were removed.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() <= max_idle);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!(removed, "expired idle sessions");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Total identities minted since startup.
    pub fn minted(&self) -> u64 {
        self.counter.issued()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn first_sessions_are_p1_then_p2() {
        let registry = SessionRegistry::new();
        let first = registry.resolve_or_create(None);
        let second = registry.resolve_or_create(None);

        assert!(first.created);
        assert!(second.created);
        assert_eq!(first.participant.to_string(), "P1");
        assert_eq!(second.participant.to_string(), "P2");
        assert_ne!(first.token, second.token);

        let again = registry.resolve_or_create(Some(&first.token));
        assert!(!again.created);
        assert_eq!(again.participant.to_string(), "P1");
        assert_eq!(again.token, first.token);
        assert_eq!(registry.minted(), 2);
    }

    #[test]
    fn unknown_token_gets_fresh_session() {
        let registry = SessionRegistry::new();
        let forged = SessionToken::from_raw("sess_forged");
        let resolved = registry.resolve_or_create(Some(&forged));
        assert!(resolved.created);
        assert_ne!(resolved.token, forged);
        assert_eq!(resolved.participant.to_string(), "P1");
        assert!(registry.participant(&forged).is_none());
    }

    #[test]
    fn removed_session_identity_is_not_reused() {
        let registry = SessionRegistry::new();
        let first = registry.resolve_or_create(None);
        assert!(registry.remove(&first.token));
        assert!(!registry.remove(&first.token));

        let next = registry.resolve_or_create(Some(&first.token));
        assert_eq!(next.participant.to_string(), "P2");
    }

    #[test]
    fn prune_idle_drops_stale_sessions() {
        let registry = SessionRegistry::new();
        let stale = registry.resolve_or_create(None);
        thread::sleep(Duration::from_millis(30));
        let fresh = registry.resolve_or_create(None);

        let removed = registry.prune_idle(Duration::from_millis(20));
        assert_eq!(removed, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.participant(&stale.token).is_none());
        assert_eq!(registry.participant(&fresh.token), Some(fresh.participant));
    }

    #[test]
    fn resolve_refreshes_last_seen() {
        let registry = SessionRegistry::new();
        let session = registry.resolve_or_create(None);
        thread::sleep(Duration::from_millis(30));
        let _ = registry.resolve_or_create(Some(&session.token));
        assert_eq!(registry.prune_idle(Duration::from_millis(20)), 0);
    }

    #[test]
    fn concurrent_new_sessions_get_distinct_identities() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| registry.resolve_or_create(None).participant)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for p in handle.join().unwrap() {
                assert!(seen.insert(p), "duplicate identity {p}");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(registry.len(), 800);
    }

    #[test]
    fn concurrent_resolves_of_same_token_never_remint() {
        let registry = Arc::new(SessionRegistry::new());
        let session = registry.resolve_or_create(None);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let token = session.token.clone();
                thread::spawn(move || registry.resolve_or_create(Some(&token)))
            })
            .collect();

        for handle in handles {
            let resolved = handle.join().unwrap();
            assert!(!resolved.created);
            assert_eq!(resolved.participant, session.participant);
        }
        assert_eq!(registry.minted(), 1);
    }
}
