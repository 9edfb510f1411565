//! Async client library for the OpenDiscordBots (ODB) API.
//!
//! # Overview
//! - [`OdbClient`] manages guilds, per-service configs and clean-leave join
//!   messages over authenticated REST calls.
//! - [`OdbApi`] is the I/O-free half of the client: it builds
//!   [`HttpRequest`] values and maps [`HttpResponse`] values into records, so
//!   a host with its own HTTP stack can drive the API directly.
//! - [`StatusHeartbeater`] pings a status monitor on a fixed interval in the
//!   background.
//!
//! # Design
//! - Every failure surfaces as an [`OdbError`] naming the stage that failed:
//!   transport, HTTP status, JSON decode, JSON shape, or record validation.
//! - Records are defined independently from the mock-server crate;
//!   integration tests catch schema drift.
//! - The library logs through `tracing` and never installs a subscriber.

pub mod api;
pub mod client;
pub mod error;
pub mod heartbeat;
pub mod http;
pub mod types;

pub use api::{OdbApi, DEFAULT_API_URL};
pub use client::OdbClient;
pub use error::{OdbError, Result};
pub use heartbeat::{HeartbeatConfig, StatusHeartbeater};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{Guild, JoinMessage, ServiceConfig, Todo};
