//! Records returned by the ODB API and the payloads sent to it.
//!
//! # Design
//! Records are plain value snapshots of the remote state at call time; the
//! library never mutates or caches them. Unknown fields in a response are
//! ignored so the server can grow its schema without breaking older clients.
//! Snowflake ids are accepted as JSON integers or numeric strings and are
//! always serialized back as integers.
//! The mock-server crate defines its own copies of these shapes; integration
//! tests catch drift between the two.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// A guild (tenant) known to the service and its moderation status.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guild {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,
    #[serde(default)]
    pub banned: bool,
}

/// Per-service settings attached to a guild.
///
/// `data` has no fixed schema: its contents belong to the named service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub guild: Guild,
    pub service: String,
    pub data: Map<String, Value>,
}

/// A message tracked by the clean-leave service for one guild member.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinMessage {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub channel_id: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub message_id: u64,
}

/// A todo item. No client route returns it yet.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub user_id: u64,
    pub task: String,
    pub done: bool,
    pub namespace: String,
}

/// Request payload for registering a guild.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGuild {
    pub id: u64,
}

/// Request payload for updating a guild. `banned` is the only mutable field.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateGuild {
    pub banned: bool,
}

/// Request payload for creating or replacing a service config.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfigPayload<'a> {
    pub data: &'a Map<String, Value>,
}

/// Request payload for tracking a join message.
#[derive(Debug, Clone, Serialize)]
pub struct CreateJoinMessage {
    pub channel_id: u64,
    pub message_id: u64,
}
