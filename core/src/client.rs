//! Async client that executes `OdbApi` requests over one shared connection.
//!
//! # Design
//! The connection handle is created on first use and dropped by `close()`;
//! the next call creates a fresh one. The slot sits behind a mutex so two
//! concurrent first calls cannot both create a handle. The lock is never held
//! across an await: the `reqwest::Client` is an `Arc` internally, so each call
//! clones it out and releases the lock before sending.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::header::HeaderValue;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::api::OdbApi;
use crate::error::{OdbError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Guild, JoinMessage, ServiceConfig};

/// Async, authenticated client for the ODB API.
///
/// Dropping the client closes its connection.
///
/// ```rust,no_run
/// use odb_core::OdbClient;
///
/// #[tokio::main]
/// async fn main() -> odb_core::Result<()> {
///     let client = OdbClient::new("my-token", None)?;
///     let guild = client.create_guild(1234).await?;
///     assert!(!guild.banned);
///     client.close();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct OdbClient {
    api: OdbApi,
    session: Mutex<Option<reqwest::Client>>,
    opened: AtomicUsize,
}

impl OdbClient {
    /// Fails only if `token` cannot be sent as an HTTP header value.
    pub fn new(token: impl Into<String>, api_url: Option<&str>) -> Result<Self> {
        let token = token.into();
        HeaderValue::from_str(&token).map_err(|_| OdbError::InvalidHeader {
            name: "authorization",
        })?;
        Ok(Self {
            api: OdbApi::new(token, api_url),
            session: Mutex::new(None),
            opened: AtomicUsize::new(0),
        })
    }

    /// The request builder/parser this client drives.
    pub fn api(&self) -> &OdbApi {
        &self.api
    }

    pub fn is_open(&self) -> bool {
        self.slot().is_some()
    }

    /// How many connection handles this client has created. Grows by one
    /// per first use after construction or `close()`.
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Close the underlying connection. Safe to call repeatedly, or on a
    /// client that never sent a request.
    pub fn close(&self) {
        if self.slot().take().is_some() {
            debug!(base_url = self.api.base_url(), "closed ODB connection");
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<reqwest::Client>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> Result<reqwest::Client> {
        let mut slot = self.slot();
        if let Some(session) = slot.as_ref() {
            return Ok(session.clone());
        }
        let session = reqwest::Client::builder().build()?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        debug!(base_url = self.api.base_url(), "opened ODB connection");
        *slot = Some(session.clone());
        Ok(session)
    }

    /// Execute a request built by [`OdbApi`] and return the raw response.
    ///
    /// Only transport failures are errors here; status handling belongs to
    /// the `parse_*` step.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let session = self.session()?;
        let mut builder = session.request(to_method(request.method), &request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        trace!(method = %request.method, path = %request.path, status, "ODB request");

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    // --- guilds ---

    pub async fn create_guild(&self, guild_id: u64) -> Result<Guild> {
        let request = self.api.build_create_guild(guild_id)?;
        self.api.parse_guild(self.execute(request).await?)
    }

    pub async fn get_guild(&self, guild_id: u64) -> Result<Guild> {
        let request = self.api.build_get_guild(guild_id);
        self.api.parse_guild(self.execute(request).await?)
    }

    pub async fn delete_guild(&self, guild_id: u64) -> Result<()> {
        let request = self.api.build_delete_guild(guild_id);
        self.api.parse_deleted(self.execute(request).await?)
    }

    pub async fn update_guild(&self, guild_id: u64, banned: bool) -> Result<Guild> {
        let request = self.api.build_update_guild(guild_id, banned)?;
        self.api.parse_guild(self.execute(request).await?)
    }

    // --- service configs ---

    pub async fn create_service_config(
        &self,
        guild_id: u64,
        service: &str,
        config: &Map<String, Value>,
    ) -> Result<ServiceConfig> {
        let request = self
            .api
            .build_create_service_config(guild_id, service, config)?;
        self.api.parse_service_config(self.execute(request).await?)
    }

    pub async fn get_service_config(&self, guild_id: u64, service: &str) -> Result<ServiceConfig> {
        let request = self.api.build_get_service_config(guild_id, service);
        self.api.parse_service_config(self.execute(request).await?)
    }

    pub async fn delete_service_config(&self, guild_id: u64, service: &str) -> Result<()> {
        let request = self.api.build_delete_service_config(guild_id, service);
        self.api.parse_deleted(self.execute(request).await?)
    }

    pub async fn update_service_config(
        &self,
        guild_id: u64,
        service: &str,
        config: &Map<String, Value>,
    ) -> Result<ServiceConfig> {
        let request = self
            .api
            .build_update_service_config(guild_id, service, config)?;
        self.api.parse_service_config(self.execute(request).await?)
    }

    // --- clean-leave join messages ---

    pub async fn create_join_message(
        &self,
        guild_id: u64,
        member_id: u64,
        channel_id: u64,
        message_id: u64,
    ) -> Result<JoinMessage> {
        let request =
            self.api
                .build_create_join_message(guild_id, member_id, channel_id, message_id)?;
        self.api.parse_join_message(self.execute(request).await?)
    }

    pub async fn get_join_message(&self, guild_id: u64, member_id: u64) -> Result<JoinMessage> {
        let request = self.api.build_get_join_message(guild_id, member_id);
        self.api.parse_join_message(self.execute(request).await?)
    }

    pub async fn delete_join_message(&self, guild_id: u64, member_id: u64) -> Result<()> {
        let request = self.api.build_delete_join_message(guild_id, member_id);
        self.api.parse_deleted(self.execute(request).await?)
    }
}

impl Drop for OdbClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_token_with_newline() {
        let err = OdbClient::new("bad\ntoken", None).unwrap_err();
        assert!(matches!(err, OdbError::InvalidHeader { name: "authorization" }));
    }

    #[test]
    fn starts_closed_and_close_is_idempotent() {
        let client = OdbClient::new("token", None).unwrap();
        assert!(!client.is_open());
        client.close();
        client.close();
        assert!(!client.is_open());
    }

    #[test]
    fn connection_is_created_once_and_recreated_after_close() {
        let client = OdbClient::new("token", None).unwrap();
        client.session().unwrap();
        assert!(client.is_open());
        client.session().unwrap();
        assert!(client.is_open());

        client.close();
        assert!(!client.is_open());
        client.session().unwrap();
        assert!(client.is_open());
    }

    #[test]
    fn racing_first_use_creates_one_connection() {
        let client = OdbClient::new("token", None).unwrap();
        let barrier = std::sync::Barrier::new(8);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    client.session().unwrap();
                });
            }
        });
        assert_eq!(client.connections_opened(), 1);

        client.close();
        client.session().unwrap();
        assert_eq!(client.connections_opened(), 2);
    }

    #[test]
    fn method_mapping() {
        assert_eq!(to_method(HttpMethod::Patch), Method::PATCH);
        assert_eq!(to_method(HttpMethod::Delete), Method::DELETE);
    }
}
