// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pi-hole API error types.
//!
//! Every failure the Pi-hole client can produce is a [`PiholeError`]. The
//! reconcilers never inspect error strings; they ask [`PiholeError::is_retryable`]
//! whether requeueing can fix the problem and use [`PiholeError::reason`] as a
//! stable label for logs and metrics.

use thiserror::Error;

/// Errors returned by the Pi-hole session client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PiholeError {
    /// Pi-hole answered with a status outside the operation's success set.
    #[error("pihole api error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by Pi-hole
        status: u16,
        /// Response body, or a short description when the body was empty
        message: String,
    },

    /// The configured password was rejected by the auth endpoint.
    ///
    /// This is terminal: retrying with the same credential cannot succeed.
    #[error("pihole rejected the configured password (status {status})")]
    AuthenticationRejected {
        /// HTTP status code returned by the auth endpoint
        status: u16,
    },

    /// The request did not complete within the client timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Request URL
        url: String,
    },

    /// Pi-hole could not be reached (DNS, connect, TLS, reset...).
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// Request URL
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// A success response carried a body that could not be decoded.
    #[error("failed to decode pihole response from {url}: {reason}")]
    Decode {
        /// Request URL
        url: String,
        /// Decoder error
        reason: String,
    },

    /// The configured base URL cannot be used to build endpoint URLs.
    #[error("invalid pihole url: {reason}")]
    InvalidUrl {
        /// Why the URL was rejected
        reason: String,
    },
}

impl PiholeError {
    /// Build a [`PiholeError`] from a `reqwest` transport failure.
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// HTTP status carried by the error, if Pi-hole answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::AuthenticationRejected { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if requeueing the reconcile may fix this error.
    ///
    /// Statuses that reject the shape of the request (400, 405, 413, 414, 422)
    /// and a rejected password are permanent. Everything else, including
    /// 401/403/404 on data operations, 5xx, timeouts and connection failures,
    /// is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => !is_request_rejection(*status),
            Self::AuthenticationRejected { .. } | Self::InvalidUrl { .. } => false,
            Self::Timeout { .. } | Self::Transport { .. } | Self::Decode { .. } => true,
        }
    }

    /// Stable reason label for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Api { status, .. } => match *status {
                s if is_request_rejection(s) => "PiholeBadRequest",
                401 | 403 => "PiholeUnauthorized",
                404 => "PiholeNotFound",
                500..=599 => "PiholeServerError",
                _ => "PiholeUnexpectedStatus",
            },
            Self::AuthenticationRejected { .. } => "PiholeAuthenticationRejected",
            Self::Timeout { .. } => "PiholeTimeout",
            Self::Transport { .. } => "PiholeUnreachable",
            Self::Decode { .. } => "PiholeInvalidResponse",
            Self::InvalidUrl { .. } => "PiholeInvalidUrl",
        }
    }
}

/// Statuses meaning "Pi-hole will never accept this request as sent".
fn is_request_rejection(status: u16) -> bool {
    matches!(status, 400 | 405 | 413 | 414 | 422)
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
