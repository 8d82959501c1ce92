//! Integration tests for the game API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Each test builds its own world and balance
//! catalog so the numbers asserted here are independent of the shipped
//! balance file.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use stronghold_api::auth::MIN_PASSWORD_COST;
use stronghold_api::router::build_router;
use stronghold_api::state::AppState;
use stronghold_core::balance::BalanceCatalog;
use stronghold_core::commands::StartingCity;
use stronghold_core::coordinator::SharedWorld;
use stronghold_types::{BuildingKind, CityId, Position, ResourceAmounts};
use tower::ServiceExt;

const CATALOG: &str = r"
buildings:
  farm:
    initial_level: 1
    max_level: 2
    levels:
      - level: 1
        production_per_hour: 120
      - level: 2
        production_per_hour: 240
        upgrade_time_seconds: 60
        upgrade_cost: { wood: 100, stone: 50 }
  warehouse:
    initial_level: 1
    max_level: 1
    levels:
      - level: 1
        capacity: 10000
troops:
  - type: archer
    name: Archer
    ranged_attack: 12
    recruit_time_seconds: 10
    recruit_cost: { wood: 20, food: 5 }
";

fn make_test_state() -> Arc<AppState> {
    let balance = BalanceCatalog::parse(CATALOG).unwrap();
    let building_levels: BTreeMap<BuildingKind, u32> = balance.initial_levels();
    let start = StartingCity {
        name: "Home".to_owned(),
        position: Position::new(100, 100),
        resources: ResourceAmounts {
            wood: 1000,
            stone: 1000,
            iron: 1000,
            food: 1000,
            gold: 100,
        },
        building_levels,
    };
    Arc::new(AppState::new(
        SharedWorld::default(),
        Arc::new(balance),
        start,
        Duration::from_secs(3600),
        MIN_PASSWORD_COST,
    ))
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Register `name` and log in, returning the `Cookie` header value.
async fn sign_up(state: &Arc<AppState>, name: &str) -> String {
    let credentials = json!({ "username": name, "password": "secret" });
    let (status, _, _) = send(state, post("/api/register", &credentials, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = send(state, post("/api/login", &credentials, None)).await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

#[tokio::test]
async fn test_register_login_and_list_cities() {
    let state = make_test_state();
    let credentials = json!({ "username": "alice", "password": "secret" });

    let (status, _, body) = send(&state, post("/api/register", &credentials, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["city_id"], 1);
    {
        let world = state.world.read().await;
        let stored = &world.user("alice").unwrap().password_hash;
        assert!(stored.starts_with("$2b$"));
        assert!(!stored.contains("secret"));
    }

    let (status, headers, body) = send(&state, post("/api/login", &credentials, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie.split(';').next().unwrap();
    let (status, _, body) = send(&state, get("/api/cities", Some(cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let cities = body["cities"].as_array().unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0]["name"], "Home");
    assert_eq!(cities[0]["pos_x"], 100);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let state = make_test_state();
    sign_up(&state, "alice").await;

    let credentials = json!({ "username": "alice", "password": "other" });
    let (status, _, body) = send(&state, post("/api/register", &credentials, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    assert_eq!(state.world.read().await.user_count(), 1);
}

#[tokio::test]
async fn test_register_requires_credentials() {
    let state = make_test_state();
    let credentials = json!({ "username": "  ", "password": "secret" });
    let (status, _, _) = send(&state, post("/api/register", &credentials, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&state, post("/api/register", &json!({}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let state = make_test_state();
    sign_up(&state, "alice").await;

    let wrong = json!({ "username": "alice", "password": "guess" });
    let (status, headers, _) = send(&state, post("/api/login", &wrong, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(SET_COOKIE).is_none());

    let unknown = json!({ "username": "mallory", "password": "secret" });
    let (status, _, _) = send(&state, post("/api/login", &unknown, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_city_endpoints_require_session() {
    let state = make_test_state();
    sign_up(&state, "alice").await;

    for uri in [
        "/api/cities",
        "/api/resources?city_id=1",
        "/api/recruit/list",
    ] {
        let (status, _, body) = send(&state, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["status"], 401);
    }

    let (status, _, _) = send(&state, get("/api/cities", Some("session_id=forged"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_owner_is_forbidden() {
    let state = make_test_state();
    sign_up(&state, "alice").await;
    let bob = sign_up(&state, "bob").await;

    let (status, _, _) = send(&state, get("/api/resources?city_id=1", Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let upgrade = json!({ "city_id": 1, "building_type": "farm" });
    let (status, _, _) = send(&state, post("/api/building/upgrade", &upgrade, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let world = state.world.read().await;
    assert!(world.city(CityId::new(1)).unwrap().building_upgrade_queue.is_empty());
}

#[tokio::test]
async fn test_city_id_validation() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let (status, _, _) = send(&state, get("/api/resources", Some(&alice))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&state, get("/api/resources?city_id=abc", Some(&alice))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&state, get("/api/resources?city_id=99", Some(&alice))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resources_include_capacity() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let (status, _, body) = send(&state, get("/api/resources?city_id=1", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city_id"], 1);
    assert_eq!(body["wood"], 1000);
    assert_eq!(body["gold"], 100);
    assert_eq!(body["capacity"], 10000);

    let (_, _, body) = send(&state, get("/api/city/info?city_id=1", Some(&alice))).await;
    assert_eq!(body["name"], "Home");
    assert_eq!(body["pos_y"], 100);
}

#[tokio::test]
async fn test_upgrade_deducts_cost_and_queues() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let upgrade = json!({ "city_id": 1, "building_type": "farm" });
    let (status, _, body) =
        send(&state, post("/api/building/upgrade", &upgrade, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["target_level"], 2);

    let (_, _, body) = send(&state, get("/api/resources?city_id=1", Some(&alice))).await;
    assert_eq!(body["wood"], 900);
    assert_eq!(body["stone"], 950);

    let (_, _, body) = send(&state, get("/api/building-queue?city_id=1", Some(&alice))).await;
    let queue = body["building_queue"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["building_type"], "farm");
    assert_eq!(queue[0]["target_level"], 2);
    assert_eq!(queue[0]["remaining_time"], 60.0);

    let (_, _, body) = send(&state, get("/api/buildings?city_id=1", Some(&alice))).await;
    let farm = body["buildings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["type"] == "farm")
        .unwrap();
    assert_eq!(farm["is_upgrading"], true);
    assert_eq!(farm["current_effect"], "120/hour");
    // The next upgrade would be level 3, past the cap.
    assert!(farm["next_level_conf"].is_null());
    assert_eq!(farm["next_effect"], "");
    let (_, _, body) = send(&state, get("/api/building/farm?city_id=1", Some(&alice))).await;
    assert_eq!(body["building"]["level"], 1);
    assert!(body["building"]["next_conf"].is_null());

    // Level 2 is already queued and is the cap.
    let (status, _, _) =
        send(&state, post("/api/building/upgrade", &upgrade, Some(&alice))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, _, body) = send(&state, get("/api/resources?city_id=1", Some(&alice))).await;
    assert_eq!(body["wood"], 900);
}

#[tokio::test]
async fn test_upgrade_unknown_building_is_not_found() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let upgrade = json!({ "city_id": 1, "building_type": "castle" });
    let (status, _, _) = send(&state, post("/api/building/upgrade", &upgrade, Some(&alice))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&state, get("/api/building/castle?city_id=1", Some(&alice))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_building_detail() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let (status, _, body) = send(&state, get("/api/building/farm?city_id=1", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    let building = &body["building"];
    assert_eq!(building["type"], "farm");
    assert_eq!(building["level"], 1);
    assert_eq!(building["current_conf"]["production_per_hour"], 120);
    assert_eq!(building["next_conf"]["upgrade_cost"]["wood"], 100);
    assert_eq!(building["is_upgrading"], false);
}

#[tokio::test]
async fn test_recruitment_flow() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let (_, _, body) = send(&state, get("/api/recruit/list", Some(&alice))).await;
    assert_eq!(body["troops"][0]["type"], "archer");

    let order = json!({ "city_id": 1, "troop_type": "archer", "quantity": 3 });
    let (status, _, _) = send(&state, post("/api/recruit/confirm", &order, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = send(&state, get("/api/resources?city_id=1", Some(&alice))).await;
    assert_eq!(body["wood"], 940);
    assert_eq!(body["food"], 985);

    let (_, _, body) = send(&state, get("/api/recruit-queue?city_id=1", Some(&alice))).await;
    let queue = body["recruit_queue"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["troop_name"], "Archer");
    assert_eq!(queue[0]["remaining_qty"], 3);
    assert_eq!(queue[0]["time_per_unit"], 10.0);

    let (_, _, body) = send(&state, get("/api/troops?city_id=1", Some(&alice))).await;
    assert!(body["troops"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recruitment_rejections_leave_city_unchanged() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let cases = [
        (json!({ "city_id": 1, "troop_type": "archer", "quantity": 0 }), StatusCode::BAD_REQUEST),
        (json!({ "city_id": 1, "troop_type": "archer", "quantity": -4 }), StatusCode::BAD_REQUEST),
        (json!({ "city_id": 1, "troop_type": "archer", "quantity": 1000 }), StatusCode::BAD_REQUEST),
        (json!({ "city_id": 1, "troop_type": "dragon", "quantity": 1 }), StatusCode::NOT_FOUND),
        (json!({ "city_id": 1, "troop_type": "catapult", "quantity": 1 }), StatusCode::NOT_FOUND),
    ];
    for (order, expected) in cases {
        let (status, _, _) = send(&state, post("/api/recruit/confirm", &order, Some(&alice))).await;
        assert_eq!(status, expected, "{order}");
    }

    let world = state.world.read().await;
    let city = world.city(CityId::new(1)).unwrap();
    assert!(city.recruit_queue.is_empty());
    assert_eq!(city.resources.wood, 1000);
    assert_eq!(city.resources.food, 1000);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let state = make_test_state();
    let alice = sign_up(&state, "alice").await;

    let (status, headers, body) = send(&state, get("/api/logout", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let cleared = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let (status, _, _) = send(&state, get("/api/cities", Some(&alice))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
