mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn http() -> reqwest::Client {
    reqwest::Client::new()
}

fn bearer(user: &str) -> String {
    format!("Bearer {}", token(user, user))
}

async fn post(srv: &Server, path: &str, user: &str, body: Value) -> (StatusCode, Value) {
    let res = http()
        .post(srv.url(path))
        .header("Authorization", bearer(user))
        .json(&body)
        .send()
        .await
        .unwrap();
    let code = res.status();
    (code, res.json().await.unwrap_or(Value::Null))
}

async fn get(srv: &Server, path: &str, user: &str) -> (StatusCode, Value) {
    let res = http().get(srv.url(path)).header("Authorization", bearer(user)).send().await.unwrap();
    let code = res.status();
    (code, res.json().await.unwrap_or(Value::Null))
}

fn strokes(list: &[Value]) -> String {
    Value::Array(list.to_vec()).to_string()
}

#[tokio::test]
async fn requests_without_a_valid_token_are_refused() {
    let srv = spawn_server().await;
    let res = http().get(srv.url("/canvas/load/r1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = http()
        .post(srv.url("/canvas/clear/r1"))
        .header("Authorization", "Bearer not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn save_and_load_current_state() {
    let srv = spawn_server().await;
    let (code, body) = get(&srv, "/canvas/load/r1", "ann@x").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body, json!({"state_json": "[]", "room_id": "r1"}));

    let state = strokes(&[brush(1.0)]);
    let (code, _) = post(&srv, "/canvas/save", "ann@x", json!({"room_id": "r1", "state_json": state})).await;
    assert_eq!(code, StatusCode::CREATED);
    let (_, body) = get(&srv, "/canvas/load/r1", "ann@x").await;
    assert_eq!(body["state_json"], state);
    assert!(body["last_updated"].is_string());

    let (code, _) = post(&srv, "/canvas/save", "ann@x", json!({"room_id": "r1", "state_json": "{\"x\":1}"})).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn snapshots_are_listed_newest_first_and_loadable() {
    let srv = spawn_server().await;
    let (code, first) = post(&srv, "/canvas/snapshot", "ann@x", json!({"room_id": "r1", "state_json": "[]"})).await;
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(first["saved_by"], "ann@x");
    let second_state = strokes(&[brush(2.0)]);
    let (_, second) =
        post(&srv, "/canvas/snapshot", "ann@x", json!({"room_id": "r1", "state_json": second_state})).await;

    let (code, list) = get(&srv, "/canvas/snapshots/r1", "bob@x").await;
    assert_eq!(code, StatusCode::OK);
    let ids: Vec<&Value> = list.as_array().unwrap().iter().map(|s| &s["snapshot_id"]).collect();
    assert_eq!(ids, vec![&second["snapshot_id"], &first["snapshot_id"]]);

    let (code, snap) = get(&srv, &format!("/canvas/snapshot/{}", second["snapshot_id"]), "bob@x").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(snap["state_json"], second_state);
    assert_eq!(snap["room_id"], "r1");

    let (code, _) = get(&srv, "/canvas/snapshot/9999", "bob@x").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_over_rest_is_owner_only_and_resets_live_room() {
    let srv = spawn_server().await;
    let mut a = connect(srv.addr, "/ws/r1", "ann@x", "Ann").await;
    send(&mut a, brush(5.0)).await;
    recv_type(&mut a, "room_members_update").await;

    let (code, _) = post(&srv, "/canvas/clear/r1", "ann@x", Value::Null).await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    let (code, _) = post(&srv, "/canvas/clear/nowhere", OWNER, Value::Null).await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    let (code, body) = post(&srv, "/canvas/clear/r1", OWNER, Value::Null).await;
    assert_eq!(code, StatusCode::OK);
    assert!(body["snapshot_id"].is_i64());
    assert_eq!(recv_type(&mut a, "undo").await["shapes"], json!([]));
    assert!(srv.store.load_strokes("r1").await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_replays_snapshot_to_every_client() {
    let srv = spawn_server().await;
    let mut a = connect(srv.addr, "/ws/r1", "ann@x", "Ann").await;
    let mut b = connect(srv.addr, "/ws/r1", "bob@x", "Bob").await;
    recv_type(&mut b, "room_members_update").await;

    let saved = strokes(&[brush(1.0), brush(2.0)]);
    let (_, snap) = post(&srv, "/canvas/snapshot", "ann@x", json!({"room_id": "r1", "state_json": saved})).await;
    let path = format!("/canvas/restore/{}", snap["snapshot_id"]);

    let (code, _) = post(&srv, &path, "ann@x", Value::Null).await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    assert!(silent(&mut b).await, "a refused restore must not touch the room");

    let (code, _) = post(&srv, &path, OWNER, Value::Null).await;
    assert_eq!(code, StatusCode::OK);
    for c in [&mut a, &mut b] {
        let undo = recv_type(c, "undo").await;
        assert_eq!(undo["shapes"], json!([brush(1.0), brush(2.0)]));
    }
    let (_, body) = get(&srv, "/canvas/load/r1", "bob@x").await;
    assert_eq!(body["state_json"], saved);

    let (code, _) = post(&srv, "/canvas/restore/9999", OWNER, Value::Null).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}
