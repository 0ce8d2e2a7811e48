// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pi-hole local DNS management via the Pi-hole v6 HTTP API.
//!
//! This module provides the [`DnsStore`] trait the reconcilers program against
//! and [`PiholeClient`], its HTTP implementation. The client:
//!
//! - Authenticates with the configured password and caches the session
//! - Re-authenticates once, transparently, when Pi-hole rejects a cached session
//! - Lists, creates and deletes `"address domain"` hosts entries
//! - Classifies failures into retryable and permanent [`PiholeError`]s
//!
//! The client never retries on its own beyond the single re-authentication;
//! requeue decisions belong to the reconcilers.
//!
//! # Example
//!
//! ```rust,ignore
//! use pihole_operator::pihole::{DnsRecord, DnsStore, PiholeClient, PiholeClientConfig};
//!
//! let client = PiholeClient::new(PiholeClientConfig::new("http://pihole.lan", "secret"))?;
//! client.create_record(&DnsRecord::new("app.local", "192.168.1.100")).await?;
//! ```

pub mod session;
pub mod types;

pub use session::{Session, SessionCache};
pub use types::DnsRecord;

use crate::constants::{
    DEFAULT_PIHOLE_API_PATH, DEFAULT_PIHOLE_PASSWORD_FIELD, DEFAULT_PIHOLE_SESSION_HEADER,
    DEFAULT_PIHOLE_TIMEOUT_SECS, PIHOLE_AUTH_PATH, PIHOLE_HOSTS_PATH,
};
use crate::dns_errors::PiholeError;
use async_trait::async_trait;
use reqwest::header::HeaderName;
use reqwest::{Method, Response, StatusCode};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use types::{AuthResponse, HostsResponse};
use url::Url;

/// Operations the reconcilers need from a DNS store.
///
/// Implemented by [`PiholeClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait DnsStore: Send + Sync {
    /// Return every local DNS record. Malformed entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the list request fails.
    async fn list_records(&self) -> Result<Vec<DnsRecord>, PiholeError>;

    /// Create a record.
    ///
    /// Does not replace an existing binding for the same domain; callers that
    /// need to change the address use [`DnsStore::create_or_replace`].
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the create request fails.
    async fn create_record(&self, record: &DnsRecord) -> Result<(), PiholeError>;

    /// Delete the record for `domain`. Deleting a missing domain succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication, the lookup or the delete request fails.
    async fn delete_record(&self, domain: &str) -> Result<(), PiholeError>;

    /// Whether the store is reachable and the credential works.
    async fn healthy(&self) -> bool;

    /// Bind `record.domain` to `record.ip`, given the address currently bound
    /// to the domain (if any).
    ///
    /// The store has no update verb, so a different existing binding is deleted
    /// before the new one is created. An identical binding is left alone.
    ///
    /// # Errors
    ///
    /// Returns the first failing delete or create error.
    async fn create_or_replace(
        &self,
        record: &DnsRecord,
        current_ip: Option<&str>,
    ) -> Result<(), PiholeError> {
        match current_ip {
            Some(ip) if ip == record.ip => return Ok(()),
            Some(_) => self.delete_record(&record.domain).await?,
            None => {}
        }
        self.create_record(record).await
    }
}

/// Connection settings for [`PiholeClient`].
#[derive(Debug, Clone)]
pub struct PiholeClientConfig {
    /// Pi-hole base URL, e.g. `http://pihole.lan`
    pub base_url: String,
    /// Password submitted to the auth endpoint
    pub password: String,
    /// API path prefix under the base URL
    pub api_path: String,
    /// Header carrying the session id
    pub session_header: String,
    /// JSON field name of the password in the auth payload
    pub password_field: String,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl PiholeClientConfig {
    /// Settings for a Pi-hole v6 server with default API conventions.
    pub fn new(base_url: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            password: password.into(),
            api_path: DEFAULT_PIHOLE_API_PATH.to_string(),
            session_header: DEFAULT_PIHOLE_SESSION_HEADER.to_string(),
            password_field: DEFAULT_PIHOLE_PASSWORD_FIELD.to_string(),
            timeout: Duration::from_secs(DEFAULT_PIHOLE_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for the Pi-hole v6 API with a shared session cache.
#[derive(Debug)]
pub struct PiholeClient {
    http: reqwest::Client,
    api_base: Url,
    password: String,
    password_field: String,
    session_header: HeaderName,
    session: SessionCache,
}

impl PiholeClient {
    /// Build a client from `config`. No request is sent until the first operation.
    ///
    /// # Errors
    ///
    /// Returns [`PiholeError::InvalidUrl`] if the base URL or session header is
    /// unusable, or [`PiholeError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: PiholeClientConfig) -> Result<Self, PiholeError> {
        let api_base = build_api_base(&config.base_url, &config.api_path)?;

        let session_header =
            HeaderName::from_bytes(config.session_header.as_bytes()).map_err(|e| {
                PiholeError::InvalidUrl {
                    reason: format!("invalid session header {:?}: {e}", config.session_header),
                }
            })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PiholeError::from_reqwest(api_base.as_str(), &e))?;

        Ok(Self {
            http,
            api_base,
            password: config.password,
            password_field: config.password_field,
            session_header,
            session: SessionCache::default(),
        })
    }

    /// URL of an endpoint below the API path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    /// URL of a single hosts entry. The entry is percent-encoded as one path segment.
    fn hosts_entry_url(&self, entry: &str) -> Url {
        let mut url = self.endpoint(PIHOLE_HOSTS_PATH);
        if let Ok(mut path) = url.path_segments_mut() {
            path.push(entry);
        }
        url
    }

    /// Exchange the password for a new session and cache it.
    async fn authenticate(&self) -> Result<String, PiholeError> {
        let url = self.endpoint(PIHOLE_AUTH_PATH);
        debug!(url = %url, "Authenticating with Pi-hole");

        let mut payload = Map::new();
        payload.insert(
            self.password_field.clone(),
            Value::String(self.password.clone()),
        );

        let response = self
            .http
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| PiholeError::from_reqwest(url.as_str(), &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.clear().await;
            warn!(url = %url, "Pi-hole rejected the configured password");
            return Err(PiholeError::AuthenticationRejected {
                status: status.as_u16(),
            });
        }
        if status != StatusCode::OK {
            return Err(api_error(response).await);
        }

        let auth: AuthResponse = response.json().await.map_err(|e| PiholeError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let session = Session::new(
            auth.session.sid,
            Duration::from_secs(auth.session.validity),
            Instant::now(),
        );
        debug!(validity_secs = auth.session.validity, "Pi-hole session established");
        Ok(self.session.store(session).await)
    }

    /// Cached session id, authenticating first if there is none or it expired.
    ///
    /// The flag is `true` when the id came from the cache.
    async fn ensure_session(&self) -> Result<(String, bool), PiholeError> {
        if let Some(sid) = self.session.valid_sid().await {
            return Ok((sid, true));
        }
        Ok((self.authenticate().await?, false))
    }

    /// Send a request carrying the session header.
    ///
    /// If Pi-hole answers 401 to a cached session, authenticate once and
    /// resend. A 401 to a session issued during this call, or a second 401,
    /// is returned to the caller as-is.
    async fn send_with_session(&self, method: Method, url: &Url) -> Result<Response, PiholeError> {
        let (sid, cached) = self.ensure_session().await?;
        let response = self.send(method.clone(), url, &sid).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !cached {
            return Ok(response);
        }

        debug!(method = %method, url = %url, "Pi-hole session rejected, re-authenticating");
        let sid = self.authenticate().await?;
        self.send(method, url, &sid).await
    }

    async fn send(&self, method: Method, url: &Url, sid: &str) -> Result<Response, PiholeError> {
        debug!(method = %method, url = %url, "HTTP API request to Pi-hole");
        self.http
            .request(method, url.clone())
            .header(self.session_header.clone(), sid)
            .send()
            .await
            .map_err(|e| PiholeError::from_reqwest(url.as_str(), &e))
    }
}

#[async_trait]
impl DnsStore for PiholeClient {
    async fn list_records(&self) -> Result<Vec<DnsRecord>, PiholeError> {
        let url = self.endpoint(PIHOLE_HOSTS_PATH);
        let response = self.send_with_session(Method::GET, &url).await?;
        if response.status() != StatusCode::OK {
            return Err(api_error(response).await);
        }

        let body: HostsResponse = response.json().await.map_err(|e| PiholeError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(body
            .config
            .dns
            .hosts
            .iter()
            .filter_map(|entry| DnsRecord::from_entry(entry))
            .collect())
    }

    async fn create_record(&self, record: &DnsRecord) -> Result<(), PiholeError> {
        let url = self.hosts_entry_url(&record.to_entry());
        let response = self.send_with_session(Method::PUT, &url).await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(api_error(response).await),
        }
    }

    async fn delete_record(&self, domain: &str) -> Result<(), PiholeError> {
        // The delete endpoint is keyed by the full "address domain" entry
        let records = self.list_records().await?;
        let Some(existing) = records.into_iter().find(|r| r.domain == domain) else {
            debug!(domain = %domain, "No Pi-hole record to delete");
            return Ok(());
        };

        let url = self.hosts_entry_url(&existing.to_entry());
        let response = self.send_with_session(Method::DELETE, &url).await?;
        match response.status() {
            // 404: the entry changed or vanished between list and delete
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(api_error(response).await),
        }
    }

    async fn healthy(&self) -> bool {
        match self.list_records().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Pi-hole health check failed");
                false
            }
        }
    }
}

/// Join the base URL and API path into the URL all endpoints hang off.
fn build_api_base(base_url: &str, api_path: &str) -> Result<Url, PiholeError> {
    let mut url = Url::parse(base_url).map_err(|e| PiholeError::InvalidUrl {
        reason: format!("{base_url}: {e}"),
    })?;

    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| PiholeError::InvalidUrl {
                reason: format!("{base_url} cannot be used as a base URL"),
            })?;
        path.pop_if_empty();
        path.extend(api_path.split('/').filter(|segment| !segment.is_empty()));
    }

    Ok(url)
}

/// Turn a non-success response into [`PiholeError::Api`].
async fn api_error(response: Response) -> PiholeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        body
    };
    PiholeError::Api {
        status: status.as_u16(),
        message,
    }
}
