mod common;

use chrono::Duration;
use common::{auth_header, setup, EventSpec};
use serde_json::json;

async fn unread_summary(server: &axum_test::TestServer, token: &str) -> serde_json::Value {
    let (h, v) = auth_header(token);
    let res = server.get("/api/rooms/unread").add_header(h, v).await;
    res.assert_status_ok();
    res.json()
}

fn unread_for(summary: &serde_json::Value, room_id: &str) -> i64 {
    summary["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["roomId"] == room_id)
        .map(|r| r["unreadCount"].as_i64().unwrap())
        .expect("room missing from summary")
}

#[tokio::test]
async fn marking_read_clears_the_unread_flag() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (_, guest_token) = common::create_test_user(&pool, "guest").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;

    let room_id = common::open_event_room(&server, &org_token, &event_id).await;
    common::open_event_room(&server, &guest_token, &event_id).await;
    common::insert_room_message(&pool, &room_id, &org_id, &common::ts(Duration::minutes(-5))).await;

    let summary = unread_summary(&server, &guest_token).await;
    assert_eq!(summary["totalUnreadRooms"], 1);
    assert_eq!(unread_for(&summary, &room_id), 1);

    let (h, v) = auth_header(&guest_token);
    let res = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["advanced"], true);
    assert_eq!(body["hasUnread"], false);

    let summary = unread_summary(&server, &guest_token).await;
    assert_eq!(summary["totalUnreadRooms"], 0);
    assert_eq!(unread_for(&summary, &room_id), 0);
}

#[tokio::test]
async fn read_cursor_never_moves_backwards() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &org_token, &event_id).await;
    common::insert_room_message(&pool, &room_id, &org_id, &common::ts(Duration::minutes(-30))).await;

    let (h, v) = auth_header(&org_token);
    server
        .post(&format!("/api/rooms/{}/read", room_id))
        .add_header(h, v)
        .await
        .assert_status_ok();

    let (h, v) = auth_header(&org_token);
    let res = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .add_header(h, v)
        .json(&json!({ "upTo": common::ts(Duration::hours(-1)) }))
        .await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["advanced"], false);
    assert_eq!(body["hasUnread"], false);
}

#[tokio::test]
async fn partial_read_leaves_newer_messages_unread() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (_, guest_token) = common::create_test_user(&pool, "guest").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &org_token, &event_id).await;
    common::open_event_room(&server, &guest_token, &event_id).await;

    common::insert_room_message(&pool, &room_id, &org_id, &common::ts(Duration::minutes(-30))).await;
    common::insert_room_message(&pool, &room_id, &org_id, &common::ts(Duration::minutes(-10))).await;
    common::insert_room_message(&pool, &room_id, &org_id, &common::ts(Duration::minutes(-5))).await;

    let (h, v) = auth_header(&guest_token);
    let res = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .add_header(h, v)
        .json(&json!({ "upTo": common::ts(Duration::minutes(-20)) }))
        .await;
    assert_eq!(res.json::<serde_json::Value>()["hasUnread"], true);

    let summary = unread_summary(&server, &guest_token).await;
    assert_eq!(unread_for(&summary, &room_id), 2);
}

#[tokio::test]
async fn fetching_history_marks_the_room_read() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (_, guest_token) = common::create_test_user(&pool, "guest").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &org_token, &event_id).await;
    common::open_event_room(&server, &guest_token, &event_id).await;
    common::insert_room_message(&pool, &room_id, &org_id, &common::ts(Duration::minutes(-5))).await;

    let (h, v) = auth_header(&guest_token);
    server
        .get(&format!("/api/rooms/{}/messages", room_id))
        .add_header(h, v)
        .await
        .assert_status_ok();

    let summary = unread_summary(&server, &guest_token).await;
    assert_eq!(summary["totalUnreadRooms"], 0);
}

#[tokio::test]
async fn own_posts_do_not_count_as_unread() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (_, guest_token) = common::create_test_user(&pool, "guest").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &org_token, &event_id).await;
    common::open_event_room(&server, &guest_token, &event_id).await;

    let (h, v) = auth_header(&org_token);
    let res = server
        .post(&format!("/api/rooms/{}/messages", room_id))
        .add_header(h, v)
        .json(&json!({ "text": "welcome all" }))
        .await;
    res.assert_status(axum::http::StatusCode::CREATED);

    let summary = unread_summary(&server, &org_token).await;
    assert_eq!(unread_for(&summary, &room_id), 0);

    let summary = unread_summary(&server, &guest_token).await;
    assert_eq!(unread_for(&summary, &room_id), 1);
}

#[tokio::test]
async fn total_counts_only_event_rooms() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let event_room = common::open_event_room(&server, &org_token, &event_id).await;

    let (h, v) = auth_header(&org_token);
    let res = server
        .post("/api/rooms/topic")
        .add_header(h, v)
        .json(&json!({ "title": "Side chat" }))
        .await;
    let topic_room = res.json::<serde_json::Value>()["id"].as_str().unwrap().to_string();

    common::insert_room_message(&pool, &event_room, &bob_id, &common::ts(Duration::minutes(-2))).await;
    common::insert_room_message(&pool, &topic_room, &bob_id, &common::ts(Duration::minutes(-1))).await;

    let summary = unread_summary(&server, &org_token).await;
    assert_eq!(summary["totalUnreadRooms"], 1);
    assert_eq!(unread_for(&summary, &event_room), 1);
    assert_eq!(unread_for(&summary, &topic_room), 1);
}

#[tokio::test]
async fn unread_count_saturates_at_the_cap() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &org_token, &event_id).await;

    let at = common::ts(Duration::minutes(-1));
    for _ in 0..1005 {
        common::insert_room_message(&pool, &room_id, &bob_id, &at).await;
    }

    let summary = unread_summary(&server, &org_token).await;
    assert_eq!(
        unread_for(&summary, &room_id),
        gather_shared::constants::UNREAD_COUNT_CAP
    );
}

#[tokio::test]
async fn my_rooms_orders_by_activity_and_fills_titles() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let event_id = common::create_event(
        &pool,
        &alice_id,
        EventSpec {
            title: "Rooftop meetup",
            ..Default::default()
        },
    )
    .await;
    let event_room = common::open_event_room(&server, &alice_token, &event_id).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/rooms/topic")
        .add_header(h, v)
        .json(&json!({ "title": "Board games" }))
        .await;
    let topic_room = res.json::<serde_json::Value>()["id"].as_str().unwrap().to_string();

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/rooms/direct")
        .add_header(h, v)
        .json(&json!({ "userId": bob_id }))
        .await;
    let dm_room = res.json::<serde_json::Value>()["id"].as_str().unwrap().to_string();

    common::insert_room_message(&pool, &event_room, &bob_id, &common::ts(Duration::minutes(-30))).await;
    common::insert_room_message(&pool, &topic_room, &bob_id, &common::ts(Duration::minutes(-10))).await;

    let (h, v) = auth_header(&alice_token);
    let res = server.get("/api/rooms/mine").add_header(h, v).await;
    res.assert_status_ok();
    let rooms: Vec<serde_json::Value> = res.json();
    let ids: Vec<&str> = rooms.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![dm_room.as_str(), topic_room.as_str(), event_room.as_str()]);

    assert_eq!(rooms[0]["title"], "bob");
    assert_eq!(rooms[0]["counterpart"]["username"], "bob");
    assert_eq!(rooms[0]["hasMessages"], false);
    assert_eq!(rooms[1]["title"], "Board games");
    assert!(rooms[1].get("counterpart").is_none());
    assert_eq!(rooms[2]["title"], "Rooftop meetup");
    assert_eq!(rooms[2]["unreadCount"], 1);

    let (h, v) = auth_header(&alice_token);
    let res = server.get("/api/rooms/mine?onlyActive=true").add_header(h, v).await;
    let rooms: Vec<serde_json::Value> = res.json();
    let ids: Vec<&str> = rooms.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![topic_room.as_str(), event_room.as_str()]);
}

#[tokio::test]
async fn archived_rooms_leave_the_total_and_my_rooms() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let event_id = common::create_event(&pool, &alice_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &alice_token, &event_id).await;
    common::insert_room_message(&pool, &room_id, &bob_id, &common::ts(Duration::minutes(-1))).await;

    let (h, v) = auth_header(&alice_token);
    server
        .post(&format!("/api/rooms/{}/archive", room_id))
        .add_header(h, v)
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    // Archived rooms leave the total but stay in the per-room summary.
    let summary = unread_summary(&server, &alice_token).await;
    assert_eq!(summary["totalUnreadRooms"], 0);
    assert_eq!(unread_for(&summary, &room_id), 1);

    let (h, v) = auth_header(&alice_token);
    let res = server.get("/api/rooms/mine").add_header(h, v).await;
    assert!(res.json::<Vec<serde_json::Value>>().is_empty());
}

#[tokio::test]
async fn future_up_to_is_clamped_to_now() {
    let (server, pool) = setup().await;
    let (org_id, org_token) = common::create_test_user(&pool, "organizer").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let event_id = common::create_event(&pool, &org_id, EventSpec::default()).await;
    let room_id = common::open_event_room(&server, &org_token, &event_id).await;

    let (h, v) = auth_header(&org_token);
    let res = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .add_header(h, v)
        .json(&json!({ "upTo": common::ts(Duration::hours(1)) }))
        .await;
    res.assert_status_ok();

    common::insert_room_message(&pool, &room_id, &bob_id, &common::ts(Duration::minutes(1))).await;

    let summary = unread_summary(&server, &org_token).await;
    assert_eq!(summary["totalUnreadRooms"], 1);
    assert_eq!(unread_for(&summary, &room_id), 1);
}
