//! Stateless request builder and response mapper for the ODB API.
//!
//! # Design
//! `OdbApi` holds only the token and base URL. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. Create, get and update of the same record share
//! one parser, since the server answers all three with the record itself.
//!
//! Parsing runs in fixed stages, each with its own error: status check
//! (`Http`), JSON decode (`Decode`), object check (`UnexpectedShape`), record
//! construction (`Validation`).

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{OdbError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    CreateGuild, CreateJoinMessage, Guild, JoinMessage, ServiceConfig, ServiceConfigPayload,
    UpdateGuild,
};

pub const DEFAULT_API_URL: &str = "https://canary.opendiscordbots.com/api";

/// Synchronous, stateless builder/parser for the ODB API.
#[derive(Debug, Clone)]
pub struct OdbApi {
    token: String,
    base_url: String,
}

impl OdbApi {
    /// `api_url` falls back to [`DEFAULT_API_URL`]. A trailing slash is dropped.
    pub fn new(token: impl Into<String>, api_url: Option<&str>) -> Self {
        Self {
            token: token.into(),
            base_url: api_url
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn request(&self, method: HttpMethod, route: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{route}", self.base_url),
            headers: vec![("authorization".to_string(), self.token.clone())],
            body: None,
        }
    }

    fn json_request<B: Serialize>(
        &self,
        method: HttpMethod,
        route: &str,
        body: &B,
    ) -> Result<HttpRequest> {
        let body = serde_json::to_string(body).map_err(OdbError::Serialization)?;
        let mut req = self.request(method, route);
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    // --- guilds ---

    pub fn build_create_guild(&self, guild_id: u64) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, "/guilds/", &CreateGuild { id: guild_id })
    }

    pub fn build_get_guild(&self, guild_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &guild_route(guild_id))
    }

    pub fn build_delete_guild(&self, guild_id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &guild_route(guild_id))
    }

    pub fn build_update_guild(&self, guild_id: u64, banned: bool) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Patch,
            &guild_route(guild_id),
            &UpdateGuild { banned },
        )
    }

    // --- service configs ---

    pub fn build_create_service_config(
        &self,
        guild_id: u64,
        service: &str,
        config: &Map<String, Value>,
    ) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Post,
            &config_route(guild_id, service),
            &ServiceConfigPayload { data: config },
        )
    }

    pub fn build_get_service_config(&self, guild_id: u64, service: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &config_route(guild_id, service))
    }

    pub fn build_delete_service_config(&self, guild_id: u64, service: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &config_route(guild_id, service))
    }

    pub fn build_update_service_config(
        &self,
        guild_id: u64,
        service: &str,
        config: &Map<String, Value>,
    ) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Patch,
            &config_route(guild_id, service),
            &ServiceConfigPayload { data: config },
        )
    }

    // --- clean-leave join messages ---

    pub fn build_create_join_message(
        &self,
        guild_id: u64,
        member_id: u64,
        channel_id: u64,
        message_id: u64,
    ) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Post,
            &join_message_route(guild_id, member_id),
            &CreateJoinMessage {
                channel_id,
                message_id,
            },
        )
    }

    pub fn build_get_join_message(&self, guild_id: u64, member_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &join_message_route(guild_id, member_id))
    }

    pub fn build_delete_join_message(&self, guild_id: u64, member_id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &join_message_route(guild_id, member_id))
    }

    // --- parsers ---

    /// Parse the response of `create_guild`, `get_guild` or `update_guild`.
    pub fn parse_guild(&self, response: HttpResponse) -> Result<Guild> {
        into_record("guild", decode_object(response)?)
    }

    /// Parse the response of a create, get or update of a service config.
    pub fn parse_service_config(&self, response: HttpResponse) -> Result<ServiceConfig> {
        into_record("service config", decode_object(response)?)
    }

    /// Parse the response of `create_join_message` or `get_join_message`.
    pub fn parse_join_message(&self, response: HttpResponse) -> Result<JoinMessage> {
        into_record("join message", decode_object(response)?)
    }

    /// Parse the response of any delete. An empty body is accepted; anything
    /// else must still be valid JSON.
    pub fn parse_deleted(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(());
        }
        serde_json::from_str::<Value>(&response.body)
            .map(drop)
            .map_err(OdbError::Decode)
    }
}

fn guild_route(guild_id: u64) -> String {
    format!("/guilds/{guild_id}")
}

fn config_route(guild_id: u64, service: &str) -> String {
    format!("/guilds/{guild_id}/config/{service}")
}

fn join_message_route(guild_id: u64, member_id: u64) -> String {
    format!("/services/cleanleave/guilds/{guild_id}/members/{member_id}")
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(OdbError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode_object(response: HttpResponse) -> Result<Map<String, Value>> {
    check_status(&response)?;
    match serde_json::from_str(&response.body).map_err(OdbError::Decode)? {
        Value::Object(map) => Ok(map),
        other => Err(OdbError::UnexpectedShape {
            expected: "object",
            found: json_kind(&other),
        }),
    }
}

fn into_record<T: DeserializeOwned>(record: &'static str, map: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(map))
        .map_err(|source| OdbError::Validation { record, source })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
