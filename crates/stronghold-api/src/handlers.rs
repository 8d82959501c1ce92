//! REST endpoint handlers for the game API.
//!
//! Query handlers take the world read guard, build their JSON view and
//! release. Command handlers take the write guard for the whole command.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/register` | Create a player and their first city |
//! | `POST` | `/api/login` | Start a session (sets `session_id`) |
//! | `GET` | `/api/logout` | End the session |
//! | `GET` | `/api/cities` | Cities owned by the session user |
//! | `GET` | `/api/city/info` | Name and position of one city |
//! | `GET` | `/api/resources` | Stocks and warehouse capacity |
//! | `GET` | `/api/troops` | Troop stacks |
//! | `GET` | `/api/building-queue` | Pending building upgrades |
//! | `GET` | `/api/recruit-queue` | Pending recruitment orders |
//! | `GET` | `/api/buildings` | All buildings with current/next effects |
//! | `GET` | `/api/building/{kind}` | One building with its level configs |
//! | `POST` | `/api/building/upgrade` | Queue a building upgrade |
//! | `GET` | `/api/recruit/list` | Recruitable troop kinds |
//! | `POST` | `/api/recruit/confirm` | Queue troop recruitment |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stronghold_core::balance::{BalanceCatalog, BalanceLookup, BuildingLevel};
use stronghold_core::commands;
use stronghold_types::{BuildingKind, CityId, TroopKind, UserId};
use stronghold_world::{City, World};
use tracing::info;

use crate::auth::{self, CurrentUser};
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query string carrying the addressed city.
#[derive(Debug, Deserialize)]
pub struct CityQuery {
    /// City identifier. Kept as text so a bad value gets a JSON error.
    pub city_id: Option<String>,
}

/// Body of `POST /api/register` and `POST /api/login`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Body of `POST /api/building/upgrade`.
#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    /// City to upgrade in.
    pub city_id: u64,
    /// Wire name of the building kind.
    pub building_type: String,
}

/// Body of `POST /api/recruit/confirm`.
#[derive(Debug, Deserialize)]
pub struct RecruitRequest {
    /// City to recruit in.
    pub city_id: u64,
    /// Wire name of the troop kind.
    pub troop_type: String,
    /// Units to train. Must be positive.
    pub quantity: i64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Outcome {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct Registered {
    success: bool,
    message: &'static str,
    user_id: UserId,
    city_id: CityId,
}

#[derive(Debug, Serialize)]
struct CitySummary {
    id: CityId,
    name: String,
    pos_x: i32,
    pos_y: i32,
}

impl From<&City> for CitySummary {
    fn from(city: &City) -> Self {
        Self {
            id: city.id,
            name: city.name.clone(),
            pos_x: city.position.x,
            pos_y: city.position.y,
        }
    }
}

#[derive(Debug, Serialize)]
struct TroopView {
    #[serde(rename = "type")]
    kind: TroopKind,
    name: String,
    quantity: u64,
}

#[derive(Debug, Serialize)]
struct UpgradeView {
    building_type: BuildingKind,
    building_name: &'static str,
    target_level: u32,
    remaining_time: f64,
}

#[derive(Debug, Serialize)]
struct RecruitView {
    troop_type: TroopKind,
    troop_name: String,
    total_quantity: u64,
    remaining_qty: u64,
    time_per_unit: f64,
    remaining_time: f64,
}

#[derive(Debug, Serialize)]
struct BuildingView {
    #[serde(rename = "type")]
    kind: BuildingKind,
    name: &'static str,
    level: u32,
    current_effect: String,
    next_effect: String,
    next_level_conf: Option<BuildingLevel>,
    is_upgrading: bool,
}

#[derive(Debug, Serialize)]
struct BuildingDetail {
    #[serde(rename = "type")]
    kind: BuildingKind,
    name: &'static str,
    level: u32,
    current_conf: Option<BuildingLevel>,
    next_conf: Option<BuildingLevel>,
    is_upgrading: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

fn parse_city_id(query: &CityQuery) -> Result<CityId, ApiError> {
    let raw = query
        .city_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing city_id".to_owned()))?;
    raw.parse::<u64>()
        .map(CityId::new)
        .map_err(|e| ApiError::BadRequest(format!("invalid city_id {raw:?}: {e}")))
}

/// Look up a city the user owns: 404 if it does not exist, 403 if it
/// belongs to someone else.
fn owned_city(world: &World, user: UserId, id: CityId) -> Result<&City, ApiError> {
    let city = world.city(id)?;
    if city.owner_id != user {
        return Err(ApiError::Forbidden(format!(
            "city {id} belongs to another player"
        )));
    }
    Ok(city)
}

fn level_conf(
    balance: &BalanceCatalog,
    kind: BuildingKind,
    level: u32,
) -> Option<BuildingLevel> {
    balance.building_level(kind, level).cloned()
}

fn warehouse_capacity(city: &City, balance: &BalanceCatalog) -> u64 {
    city.building_level(BuildingKind::Warehouse)
        .and_then(|level| balance.building_level(BuildingKind::Warehouse, level))
        .map_or(0, |conf| conf.capacity)
}

fn troop_name(balance: &BalanceCatalog, kind: TroopKind) -> String {
    balance
        .troop(kind)
        .map(|spec| spec.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(kind.as_str())
        .to_owned()
}

/// One-line description of what a building level does.
fn effect(conf: Option<&BuildingLevel>) -> String {
    let Some(conf) = conf else {
        return String::new();
    };
    if conf.production_per_hour > 0 {
        format!("{}/hour", conf.production_per_hour)
    } else if conf.capacity > 0 {
        format!("capacity {}", conf.capacity)
    } else if conf.build_speed_boost > 0 {
        format!("build speed +{}%", conf.build_speed_boost)
    } else if conf.recruit_speed_boost > 0 {
        format!("recruit speed +{}%", conf.recruit_speed_boost)
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Register a player and create their starting city.
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    let username = body.username.trim();
    if username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_owned(),
        ));
    }

    let password_hash = auth::hash_password(body.password, state.password_cost).await?;
    let registration = {
        let mut world = state.world.write().await;
        commands::register_player(&mut world, username, password_hash, &state.starting_city)?
    };

    Ok(Json(Registered {
        success: true,
        message: "registered",
        user_id: registration.user_id,
        city_id: registration.city_id,
    }))
}

/// Check credentials and start a session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(bad_json)?;

    let found = {
        let world = state.world.read().await;
        world
            .user(&body.username)
            .map(|user| (user.id, user.password_hash.clone()))
    };
    let Ok((user_id, password_hash)) = found else {
        info!(username = %body.username, "login failed: unknown user");
        return Err(ApiError::InvalidCredentials);
    };
    if !auth::verify_password(body.password, password_hash).await {
        info!(username = %body.username, "login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.sessions.create(user_id).await;
    info!(%user_id, username = %body.username, "user logged in");

    let cookie = auth::session_cookie(&token, state.sessions.ttl_secs());
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(Outcome {
            success: true,
            message: "logged in",
        }),
    ))
}

/// End the session named by the cookie, if any, and clear the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = auth::session_token(&headers) {
        if state.sessions.revoke(&token).await {
            info!("user logged out");
        }
    }
    (
        AppendHeaders([(SET_COOKIE, auth::clear_session_cookie())]),
        Json(Outcome {
            success: true,
            message: "logged out",
        }),
    )
}

// ---------------------------------------------------------------------------
// City queries
// ---------------------------------------------------------------------------

/// Cities owned by the session user, by id.
pub async fn list_cities(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<Value> {
    let world = state.world.read().await;
    let mut cities: Vec<CitySummary> = world
        .list_cities_by_owner(user)
        .into_iter()
        .map(CitySummary::from)
        .collect();
    cities.sort_by_key(|city| city.id);
    Json(json!({ "cities": cities }))
}

/// Name and position of one city.
pub async fn city_info(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    Ok(Json(json!(CitySummary::from(city))))
}

/// Resource stocks and the warehouse capacity that bounds them.
pub async fn resources(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    let stocks = &city.resources;
    Ok(Json(json!({
        "city_id": city.id,
        "wood": stocks.wood,
        "stone": stocks.stone,
        "iron": stocks.iron,
        "food": stocks.food,
        "gold": stocks.gold,
        "capacity": warehouse_capacity(city, &state.balance),
    })))
}

/// Troop stacks present in the city.
pub async fn troops(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    let mut stacks: Vec<TroopView> = city
        .troops
        .iter()
        .map(|stack| TroopView {
            kind: stack.kind,
            name: troop_name(&state.balance, stack.kind),
            quantity: stack.quantity,
        })
        .collect();
    stacks.sort_by_key(|view| view.kind);
    Ok(Json(json!({ "city_id": city.id, "troops": stacks })))
}

/// Pending building upgrades, head first.
pub async fn building_queue(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    let queue: Vec<UpgradeView> = city
        .building_upgrade_queue
        .iter()
        .map(|entry| UpgradeView {
            building_type: entry.building_type,
            building_name: entry.building_type.display_name(),
            target_level: entry.target_level,
            remaining_time: entry.remaining_time,
        })
        .collect();
    Ok(Json(json!({ "city_id": city.id, "building_queue": queue })))
}

/// Pending recruitment orders, head first.
pub async fn recruit_queue(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    let queue: Vec<RecruitView> = city
        .recruit_queue
        .iter()
        .map(|order| RecruitView {
            troop_type: order.troop_type,
            troop_name: troop_name(&state.balance, order.troop_type),
            total_quantity: order.total_quantity,
            remaining_qty: order.remaining_qty,
            time_per_unit: order.time_per_unit,
            remaining_time: order.remaining_time,
        })
        .collect();
    Ok(Json(json!({ "city_id": city.id, "recruit_queue": queue })))
}

/// Every building with its current effect and the effect of the next
/// upgrade it could still queue.
pub async fn buildings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    let balance = state.balance.as_ref();
    let views: Vec<BuildingView> = city
        .buildings
        .iter()
        .map(|building| {
            let current = balance.building_level(building.kind, building.level);
            let next = city
                .next_upgrade_level(building.kind)
                .and_then(|level| balance.building_level(building.kind, level));
            BuildingView {
                kind: building.kind,
                name: building.kind.display_name(),
                level: building.level,
                current_effect: effect(current),
                next_effect: effect(next),
                next_level_conf: next.cloned(),
                is_upgrading: city.queued_upgrades(building.kind) > 0,
            }
        })
        .collect();
    Ok(Json(json!({ "city_id": city.id, "buildings": views })))
}

/// One building with its current and next level configuration.
pub async fn building_info(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(kind): Path<String>,
    Query(query): Query<CityQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind: BuildingKind = kind
        .parse()
        .map_err(|e| ApiError::NotFound(format!("{e}")))?;
    let id = parse_city_id(&query)?;
    let world = state.world.read().await;
    let city = owned_city(&world, user, id)?;
    let building = city
        .building(kind)
        .ok_or_else(|| ApiError::NotFound(format!("city {id} has no {kind}")))?;

    let detail = BuildingDetail {
        kind,
        name: kind.display_name(),
        level: building.level,
        current_conf: level_conf(&state.balance, kind, building.level),
        next_conf: city
            .next_upgrade_level(kind)
            .and_then(|level| level_conf(&state.balance, kind, level)),
        is_upgrading: city.queued_upgrades(kind) > 0,
    };
    Ok(Json(json!({ "city_id": city.id, "building": detail })))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Pay for and queue the next level of a building.
pub async fn upgrade_building(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<UpgradeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    if body.building_type.is_empty() {
        return Err(ApiError::BadRequest("missing building_type".to_owned()));
    }
    let kind: BuildingKind = body
        .building_type
        .parse()
        .map_err(|e| ApiError::NotFound(format!("{e}")))?;

    let mut world = state.world.write().await;
    let entry = commands::upgrade_building(
        &mut world,
        user,
        CityId::new(body.city_id),
        kind,
        state.balance.as_ref(),
    )?;

    Ok(Json(json!({
        "success": true,
        "building_type": entry.building_type,
        "target_level": entry.target_level,
        "remaining_time": entry.remaining_time,
    })))
}

/// Every troop kind that can be recruited, with stats and costs.
pub async fn recruit_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Json<Value> {
    Json(json!({ "troops": state.balance.troops }))
}

/// Pay for and queue a batch of troops.
pub async fn recruit_confirm(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<RecruitRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    let troop: TroopKind = body
        .troop_type
        .parse()
        .map_err(|e| ApiError::NotFound(format!("{e}")))?;
    let quantity = u64::try_from(body.quantity).unwrap_or(0);

    let mut world = state.world.write().await;
    let order = commands::recruit_troops(
        &mut world,
        user,
        CityId::new(body.city_id),
        troop,
        quantity,
        state.balance.as_ref(),
    )?;

    Ok(Json(json!({
        "success": true,
        "troop_type": order.troop_type,
        "quantity": order.total_quantity,
        "time_per_unit": order.time_per_unit,
    })))
}
