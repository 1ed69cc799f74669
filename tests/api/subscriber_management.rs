use chrono::{Duration, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{stored_subscriber, TestApp, OBJECTS_PATH};

#[tokio::test]
async fn list_returns_every_stored_subscriber() {
    let test_app = TestApp::spawn_app().await;
    test_app
        .mount_collection(vec![
            stored_subscriber("1", "first@test.com", "active", Utc::now()),
            stored_subscriber("2", "second@test.com", "unsubscribed", Utc::now()),
        ])
        .await;

    let response = test_app.get_subscribers().await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    let subscribers = body["subscribers"].as_array().unwrap();
    assert_eq!(subscribers.len(), 2);
    assert_eq!(subscribers[1]["metadata"]["status"], "unsubscribed");
}

#[tokio::test]
async fn list_of_missing_collection_is_empty() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;

    let response = test_app.get_subscribers().await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["subscribers"], serde_json::json!([]));
}

#[tokio::test]
async fn list_returns_500_when_the_store_fails() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&test_app.store_server)
        .await;

    let response = test_app.get_subscribers().await;

    assert_eq!(500, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn stats_of_empty_collection_are_zero() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;

    let response = test_app.get_stats().await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "total": 0, "active": 0, "unsubscribed": 0, "recentSignups": 0 })
    );
}

#[tokio::test]
async fn stats_count_statuses_and_recent_signups() {
    let test_app = TestApp::spawn_app().await;
    let now = Utc::now();
    test_app
        .mount_collection(vec![
            stored_subscriber("1", "a@test.com", "active", now - Duration::hours(1)),
            stored_subscriber("2", "b@test.com", "active", now - Duration::days(6)),
            stored_subscriber("3", "c@test.com", "active", now - Duration::days(40)),
            stored_subscriber("4", "d@test.com", "unsubscribed", now - Duration::days(2)),
            stored_subscriber("5", "e@test.com", "pending", now - Duration::days(9)),
        ])
        .await;

    let response = test_app.get_stats().await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "total": 5, "active": 3, "unsubscribed": 1, "recentSignups": 3 })
    );
}

#[tokio::test]
async fn unreadable_records_do_not_break_list_or_stats() {
    let test_app = TestApp::spawn_app().await;
    let mut unknown_source = stored_subscriber("2", "b@test.com", "active", Utc::now());
    unknown_source["metadata"]["source"] = serde_json::json!("landing-page");
    let mut missing_status = stored_subscriber("3", "c@test.com", "active", Utc::now());
    missing_status["metadata"]
        .as_object_mut()
        .unwrap()
        .remove("status");
    test_app
        .mount_collection(vec![
            stored_subscriber("1", "a@test.com", "active", Utc::now()),
            unknown_source,
            missing_status,
        ])
        .await;

    let list = test_app.get_subscribers().await;
    let stats = test_app.get_stats().await;

    assert_eq!(200, list.status().as_u16());
    assert_eq!(200, stats.status().as_u16());

    let list: serde_json::Value = list.json().await.unwrap();
    let subscribers = list["subscribers"].as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["id"], "1");

    let stats: serde_json::Value = stats.json().await.unwrap();
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn update_changes_the_subscriber_status() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/65f1c0ffee", OBJECTS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": stored_subscriber("65f1c0ffee", "new@test.com", "unsubscribed", Utc::now())
        })))
        .expect(1)
        .mount(&test_app.store_server)
        .await;

    let response = test_app
        .patch_subscriber("65f1c0ffee", serde_json::json!({ "status": "unsubscribed" }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["subscriber"]["metadata"]["status"], "unsubscribed");

    let received = test_app.store_server.received_requests().await.unwrap();
    let patch: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(patch, serde_json::json!({ "metadata": { "status": "unsubscribed" } }));
}

#[tokio::test]
async fn update_rejects_unknown_statuses() {
    let test_app = TestApp::spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({ "status": "confirmed" }), "unknown status"),
        (serde_json::json!({}), "missing status"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.patch_subscriber("65f1c0ffee", invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
    }
}

#[tokio::test]
async fn delete_removes_the_subscriber() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/65f1c0ffee", OBJECTS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Object deleted"
        })))
        .expect(1)
        .mount(&test_app.store_server)
        .await;

    let response = test_app.delete_subscriber("65f1c0ffee").await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
}
