// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory Pi-hole session cache.
//!
//! One [`SessionCache`] is shared by every concurrent reconcile talking to the
//! same Pi-hole. Readers take the read lock to fetch a still-valid session id;
//! a refresh stores the new session under the write lock before any request
//! uses it. Two reconciles racing on an expired session may both authenticate;
//! the last stored session wins and both ids stay usable on the Pi-hole side.

use crate::constants::{MAX_SESSION_VALIDITY_SECS, SESSION_VALIDITY_PERCENT};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// An authenticated Pi-hole session.
#[derive(Debug, Clone)]
pub struct Session {
    sid: String,
    valid_until: Instant,
}

impl Session {
    /// Create a session issued at `issued_at` with the server-advertised `validity`.
    ///
    /// Only [`SESSION_VALIDITY_PERCENT`] of the advertised validity is used,
    /// leaving headroom for clock drift and in-flight request latency. The
    /// usable lifetime is capped at [`MAX_SESSION_VALIDITY_SECS`], so an
    /// oversized validity from the server cannot overflow.
    #[must_use]
    pub fn new(sid: String, validity: Duration, issued_at: Instant) -> Self {
        let cap = Duration::from_secs(MAX_SESSION_VALIDITY_SECS);
        let usable = validity
            .checked_mul(SESSION_VALIDITY_PERCENT)
            .map_or(cap, |scaled| (scaled / 100).min(cap));

        Self {
            sid,
            // Unrepresentable deadline: treat the session as already expired
            valid_until: issued_at.checked_add(usable).unwrap_or(issued_at),
        }
    }

    /// Session id sent in the session header.
    #[must_use]
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Instant after which the session is treated as expired.
    #[must_use]
    pub fn valid_until(&self) -> Instant {
        self.valid_until
    }

    /// Whether the session can still be used at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.sid.is_empty() && now < self.valid_until
    }
}

/// Shared, lock-guarded holder of the current session.
#[derive(Debug, Default)]
pub struct SessionCache {
    current: RwLock<Option<Session>>,
}

impl SessionCache {
    /// Session id of the cached session, if one exists and has not expired.
    pub async fn valid_sid(&self) -> Option<String> {
        let now = Instant::now();
        self.current
            .read()
            .await
            .as_ref()
            .filter(|session| session.is_valid_at(now))
            .map(|session| session.sid.clone())
    }

    /// Replace the cached session and return its id.
    pub async fn store(&self, session: Session) -> String {
        let sid = session.sid.clone();
        *self.current.write().await = Some(session);
        sid
    }

    /// Drop the cached session so the next operation authenticates again.
    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
