//! In-memory stand-in for the ODB API, used by the client's tests.
//!
//! Routes live under `/api` like the real service and require the
//! configured token in the `Authorization` header. `/status` and
//! `/status/down` are unauthenticated monitor endpoints that count hits.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Guild {
    pub id: u64,
    pub banned: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub guild: Guild,
    pub service: String,
    pub data: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinMessage {
    pub channel_id: u64,
    pub message_id: u64,
}

#[derive(Deserialize)]
pub struct CreateGuild {
    pub id: u64,
}

#[derive(Deserialize)]
pub struct UpdateGuild {
    pub banned: bool,
}

#[derive(Deserialize)]
pub struct ConfigPayload {
    pub data: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct Db {
    pub guilds: HashMap<u64, Guild>,
    pub configs: HashMap<(u64, String), Map<String, Value>>,
    pub join_messages: HashMap<(u64, u64), JoinMessage>,
}

#[derive(Debug)]
pub struct MockState {
    token: String,
    db: RwLock<Db>,
    heartbeats: AtomicU64,
}

impl MockState {
    pub fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            db: RwLock::new(Db::default()),
            heartbeats: AtomicU64::new(0),
        })
    }

    /// Number of hits on `/status` and `/status/down` so far.
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::SeqCst)
    }
}

type Shared = Arc<MockState>;
type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

pub fn app(token: &str) -> Router {
    app_with_state(MockState::new(token))
}

pub fn app_with_state(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/guilds/", post(create_guild))
        .route(
            "/api/guilds/{guild_id}",
            get(get_guild).patch(update_guild).delete(delete_guild),
        )
        .route(
            "/api/guilds/{guild_id}/config/{service}",
            get(get_config)
                .post(create_config)
                .patch(update_config)
                .delete(delete_config),
        )
        .route(
            "/api/services/cleanleave/guilds/{guild_id}/members/{member_id}",
            get(get_join_message)
                .post(create_join_message)
                .delete(delete_join_message),
        )
        .route("/status", get(status_up))
        .route("/status/down", get(status_down))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

pub async fn run_with_state(listener: TcpListener, state: Arc<MockState>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn error(status: StatusCode, detail: &str) -> (StatusCode, Json<Value>) {
    (status, Json(serde_json::json!({ "detail": detail })))
}

fn authorize(state: &MockState, headers: &HeaderMap) -> ApiResult<()> {
    match headers.get(AUTHORIZATION) {
        Some(value) if value.as_bytes() == state.token.as_bytes() => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Invalid token")),
    }
}

fn guild_or_404(db: &Db, guild_id: u64) -> ApiResult<Guild> {
    db.guilds
        .get(&guild_id)
        .cloned()
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Guild not found"))
}

// --- guilds ---

async fn create_guild(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<CreateGuild>,
) -> ApiResult<(StatusCode, Json<Guild>)> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    if db.guilds.contains_key(&input.id) {
        return Err(error(StatusCode::CONFLICT, "Guild already exists"));
    }
    let guild = Guild {
        id: input.id,
        banned: false,
    };
    db.guilds.insert(guild.id, guild.clone());
    Ok((StatusCode::CREATED, Json(guild)))
}

async fn get_guild(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(guild_id): Path<u64>,
) -> ApiResult<Json<Guild>> {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    guild_or_404(&db, guild_id).map(Json)
}

async fn update_guild(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(guild_id): Path<u64>,
    Json(input): Json<UpdateGuild>,
) -> ApiResult<Json<Guild>> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    let guild = db
        .guilds
        .get_mut(&guild_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Guild not found"))?;
    guild.banned = input.banned;
    Ok(Json(guild.clone()))
}

async fn delete_guild(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(guild_id): Path<u64>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    db.guilds
        .remove(&guild_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Guild not found"))?;
    db.configs.retain(|(id, _), _| *id != guild_id);
    db.join_messages.retain(|(id, _), _| *id != guild_id);
    Ok(StatusCode::NO_CONTENT)
}

// --- service configs ---

async fn create_config(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, service)): Path<(u64, String)>,
    Json(input): Json<ConfigPayload>,
) -> ApiResult<(StatusCode, Json<ServiceConfig>)> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    let guild = guild_or_404(&db, guild_id)?;
    let key = (guild_id, service.clone());
    if db.configs.contains_key(&key) {
        return Err(error(StatusCode::CONFLICT, "Config already exists"));
    }
    db.configs.insert(key, input.data.clone());
    Ok((
        StatusCode::CREATED,
        Json(ServiceConfig {
            guild,
            service,
            data: input.data,
        }),
    ))
}

async fn get_config(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, service)): Path<(u64, String)>,
) -> ApiResult<Json<ServiceConfig>> {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    let guild = guild_or_404(&db, guild_id)?;
    let data = db
        .configs
        .get(&(guild_id, service.clone()))
        .cloned()
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Config not found"))?;
    Ok(Json(ServiceConfig {
        guild,
        service,
        data,
    }))
}

async fn update_config(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, service)): Path<(u64, String)>,
    Json(input): Json<ConfigPayload>,
) -> ApiResult<Json<ServiceConfig>> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    let guild = guild_or_404(&db, guild_id)?;
    let data = db
        .configs
        .get_mut(&(guild_id, service.clone()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Config not found"))?;
    *data = input.data;
    Ok(Json(ServiceConfig {
        guild,
        service,
        data: data.clone(),
    }))
}

async fn delete_config(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, service)): Path<(u64, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    db.configs
        .remove(&(guild_id, service))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Config not found"))
}

// --- clean-leave join messages ---

async fn create_join_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, member_id)): Path<(u64, u64)>,
    Json(input): Json<JoinMessage>,
) -> ApiResult<(StatusCode, Json<JoinMessage>)> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    guild_or_404(&db, guild_id)?;
    db.join_messages.insert((guild_id, member_id), input.clone());
    Ok((StatusCode::CREATED, Json(input)))
}

async fn get_join_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, member_id)): Path<(u64, u64)>,
) -> ApiResult<Json<JoinMessage>> {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    db.join_messages
        .get(&(guild_id, member_id))
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Join message not found"))
}

async fn delete_join_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((guild_id, member_id)): Path<(u64, u64)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    db.join_messages
        .remove(&(guild_id, member_id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Join message not found"))
}

// --- status monitor ---

async fn status_up(State(state): State<Shared>) -> Json<Value> {
    state.heartbeats.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "ok": true }))
}

async fn status_down(State(state): State<Shared>) -> StatusCode {
    state.heartbeats.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}
