//! Integration tests for the fan-out hub.
//!
//! Each test boots the real router on an ephemeral port and drives it with
//! WebSocket clients and plain HTTP.

use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{net::TcpListener, net::TcpStream, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tourwatch_server::ui::{Server, ServerConfig};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE: Duration = Duration::from_millis(300);

async fn spawn_server() -> SocketAddr {
    let server = Server::in_memory(ServerConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = server.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Connect and consume the `connected` greeting
async fn connect(addr: SocketAddr) -> (Ws, Value) {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    (ws, greeting)
}

async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(ws: &mut Ws) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(SILENCE, ws.next()).await {
        panic!("unexpected frame: {}", text);
    }
}

async fn send(ws: &mut Ws, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

fn location(user: &str, lat: f64, lng: f64) -> Value {
    json!({
        "type": "location-update",
        "userId": user,
        "userName": user.to_uppercase(),
        "lat": lat,
        "lng": lng,
        "accuracy": 10.0,
    })
}

async fn get_json(addr: SocketAddr, path: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(format!("http://{}{}", addr, path)).await.unwrap();
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let addr = spawn_server().await;

    // when (操作):
    let (status, body) = get_json(addr, "/api/health").await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_greeting_carries_fresh_connection_id() {
    // テスト項目: 接続ごとに異なる connectionId が割り当てられる
    // given (前提条件):
    let addr = spawn_server().await;

    // when (操作):
    let (_a, greeting_a) = connect(addr).await;
    let (_b, greeting_b) = connect(addr).await;

    // then (期待する結果):
    assert_ne!(greeting_a["connectionId"], greeting_b["connectionId"]);
    assert_eq!(greeting_a["online"], 1);
    assert_eq!(greeting_b["online"], 2);
}

#[tokio::test]
async fn test_sos_reaches_everyone_but_sender() {
    // テスト項目: A の SOS は B と C に届き、A には折り返されない
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;
    let (mut c, _) = connect(addr).await;

    // when (操作):
    send(
        &mut a,
        json!({
            "type": "emergency-sos",
            "userId": "alice",
            "userName": "Alice",
            "lat": 31.2526,
            "lng": 75.7044,
            "message": "Help!",
        }),
    )
    .await;

    // then (期待する結果):
    for ws in [&mut b, &mut c] {
        let alert = next_json(ws).await;
        assert_eq!(alert["type"], "sos-alert");
        assert_eq!(alert["userId"], "alice");
        assert_eq!(alert["message"], "Help!");
        assert!(alert["timestamp"].as_i64().unwrap() > 0);
    }
    assert_silent(&mut a).await;

    // SOS は Registry を変更しない
    let (_, presence) = get_json(addr, "/api/presence").await;
    assert_eq!(presence["users"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_sos_with_oversized_message_is_still_relayed() {
    // テスト項目: 座標が正しい SOS は、メッセージが長すぎても既定の文言で中継される
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    // when (操作):
    send(
        &mut a,
        json!({
            "type": "emergency-sos",
            "userId": "alice",
            "userName": "A".repeat(101),
            "lat": 31.2526,
            "lng": 75.7044,
            "accuracy": -1.0,
            "message": "x".repeat(501),
        }),
    )
    .await;

    // then (期待する結果):
    let alert = next_json(&mut b).await;
    assert_eq!(alert["type"], "sos-alert");
    assert_eq!(alert["userId"], "alice");
    assert_eq!(alert["userName"], "Tourist");
    assert_eq!(alert["message"], "EMERGENCY! Someone needs help nearby!");
    assert!(alert.get("accuracy").is_none_or(|a| a.is_null()));
    assert_eq!(alert["lat"], 31.2526);
}

#[tokio::test]
async fn test_location_update_is_relayed_and_registered() {
    // テスト項目: 位置情報は他の接続へ中継され、Registry に記録される
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, greeting_a) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    // when (操作):
    send(&mut a, location("alice", 31.2526, 75.7044)).await;

    // then (期待する結果):
    let relayed = next_json(&mut b).await;
    assert_eq!(relayed["type"], "user-location");
    assert_eq!(relayed["userId"], "alice");
    assert_eq!(relayed["userName"], "ALICE");
    assert_eq!(relayed["accuracy"], 10.0);
    assert_silent(&mut a).await;

    let (_, presence) = get_json(addr, "/api/presence").await;
    assert_eq!(presence["online"], 2);
    assert_eq!(presence["located"], 1);
    let users = presence["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["connectionId"], greeting_a["connectionId"]);
    assert_eq!(users[0]["lat"], 31.2526);
}

#[tokio::test]
async fn test_disconnect_removes_presence() {
    // テスト項目: 切断した接続のレコードは Registry から消える
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;
    send(&mut a, location("alice", 31.2526, 75.7044)).await;
    next_json(&mut b).await;

    // when (操作):
    a.close(None).await.unwrap();

    // then (期待する結果): 切断処理は非同期なのでしばらく待つ
    let mut remaining = usize::MAX;
    for _ in 0..20 {
        let (_, presence) = get_json(addr, "/api/presence").await;
        remaining = presence["users"].as_array().unwrap().len();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(remaining, 0);

    // 切断は他の接続へ通知されない
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn test_disconnect_during_location_burst_leaves_no_presence() {
    // テスト項目: 位置情報を連続送信した直後に切断しても Registry にレコードが残らない
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (_b, _) = connect(addr).await;

    // when (操作):
    for i in 0..50 {
        send(&mut a, location("alice", 31.2526 + i as f64 * 0.0001, 75.7044)).await;
    }
    drop(a);

    // then (期待する結果): 切断処理が終わった後は online も users も減っている
    let mut presence = Value::Null;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        presence = get_json(addr, "/api/presence").await.1;
        if presence["online"] == 1 {
            break;
        }
    }
    assert_eq!(presence["online"], 1);
    // 切断完了後に upsert が遅れて反映されないことを確認する
    tokio::time::sleep(SILENCE).await;
    let (_, presence) = get_json(addr, "/api/presence").await;
    assert_eq!(presence["users"].as_array().unwrap().len(), 0);
    assert_eq!(presence["located"], 0);
}

#[tokio::test]
async fn test_malformed_events_are_dropped_without_closing_connection() {
    // テスト項目: 不正なイベントは破棄され、他の接続に伝わらず、接続も維持される
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    // when (操作):
    a.send(Message::text("not json")).await.unwrap();
    send(&mut a, json!({"type": "location-update", "userId": "alice"})).await;
    send(&mut a, json!({"type": "chat", "content": "hi"})).await;
    send(&mut a, location("alice", 91.0, 75.0)).await;
    send(&mut a, location("alice", 31.2526, 75.7044)).await;

    // then (期待する結果): 最初に届くのは正しい位置情報
    let relayed = next_json(&mut b).await;
    assert_eq!(relayed["type"], "user-location");
    assert_eq!(relayed["lat"], 31.2526);
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn test_identity_is_bound_by_first_event() {
    // テスト項目: 接続に結び付いたユーザー以外を名乗るイベントは破棄される
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;
    send(&mut a, location("alice", 31.2526, 75.7044)).await;
    next_json(&mut b).await;

    // when (操作):
    send(&mut a, location("mallory", 10.0, 10.0)).await;
    send(&mut a, location("alice", 31.3, 75.7)).await;

    // then (期待する結果):
    let relayed = next_json(&mut b).await;
    assert_eq!(relayed["userId"], "alice");
    assert_eq!(relayed["lat"], 31.3);
}

#[tokio::test]
async fn test_nearby_presence_query() {
    // テスト項目: nearby は半径内のレコードを距離順に返し、不正な座標は 400
    // given (前提条件):
    let addr = spawn_server().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;
    let (mut c, _) = connect(addr).await;
    send(&mut a, location("far", 31.7023, 75.7044)).await;
    send(&mut b, location("near", 31.2706, 75.7044)).await;
    // c が両方の位置情報を受け取れば Registry も更新済み
    next_json(&mut c).await;
    next_json(&mut c).await;

    // when (操作):
    let (status, body) = get_json(addr, "/api/presence/nearby?lat=31.2526&lng=75.7044").await;
    let (bad_status, _) = get_json(addr, "/api/presence/nearby?lat=100&lng=75.7044").await;
    let (wide_status, wide) =
        get_json(addr, "/api/presence/nearby?lat=31.2526&lng=75.7044&radius=100000").await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["userId"], "near");
    let distance = users[0]["distanceMeters"].as_f64().unwrap();
    assert!((distance - 2001.5).abs() < 5.0);

    assert_eq!(bad_status, reqwest::StatusCode::BAD_REQUEST);

    assert_eq!(wide_status, reqwest::StatusCode::OK);
    let ids: Vec<&str> = wide
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["userId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["near", "far"]);
}
