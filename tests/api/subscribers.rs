use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{store_requests_with_method, stored_subscriber, TestApp, OBJECTS_PATH};

#[tokio::test]
async fn subscribe_returns_201_with_an_active_subscriber() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;
    test_app.mount_successful_insert().await;
    test_app.mount_email_server(200).await;

    let response = test_app
        .post_subscriber(serde_json::json!({ "email": "new@test.com", "source": "footer" }))
        .await;

    assert_eq!(201, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["subscriber"]["metadata"]["status"], "active");
    assert_eq!(body["subscriber"]["metadata"]["email"], "new@test.com");
    assert_eq!(body["subscriber"]["metadata"]["source"], "footer");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn subscribe_persists_a_normalized_record() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;
    test_app.mount_successful_insert().await;
    test_app.mount_email_server(200).await;

    test_app
        .post_subscriber(serde_json::json!({ "email": "  User@Example.com " }))
        .await;

    let received = test_app.store_server.received_requests().await.unwrap();
    let inserts = store_requests_with_method(&received, "POST");
    assert_eq!(inserts.len(), 1);

    let object: serde_json::Value = serde_json::from_slice(&inserts[0].body).unwrap();
    assert_eq!(object["type"], "subscribers");
    assert_eq!(object["title"], "user@example.com");
    assert_eq!(object["metadata"]["email"], "user@example.com");
    assert_eq!(object["metadata"]["source"], "website");
    assert_eq!(object["metadata"]["status"], "active");
    assert!(object["metadata"]["signup_date"].is_string());

    let slug = object["slug"].as_str().unwrap();
    assert!(slug.starts_with("subscriber-"));
    assert!(!slug.contains("user"));
}

#[tokio::test]
async fn subscribing_the_same_email_twice_returns_409() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_email_server(200).await;

    // Mocks are matched in mount order: the first lookup sees an empty bucket,
    // later ones see the record created by the first call.
    Mock::given(method("GET"))
        .and(path(OBJECTS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&test_app.store_server)
        .await;
    test_app
        .mount_collection(vec![stored_subscriber(
            "65f1c0ffee",
            "new@test.com",
            "active",
            chrono::Utc::now(),
        )])
        .await;
    test_app.mount_successful_insert().await;

    let body = serde_json::json!({ "email": "new@test.com", "source": "footer" });
    let first = test_app.post_subscriber(body.clone()).await;
    let second = test_app.post_subscriber(body).await;

    assert_eq!(201, first.status().as_u16());
    assert_eq!(409, second.status().as_u16());

    let error: serde_json::Value = second.json().await.unwrap();
    assert_eq!(
        error["error"],
        "This email address is already subscribed to our newsletter."
    );

    let received = test_app.store_server.received_requests().await.unwrap();
    assert_eq!(store_requests_with_method(&received, "POST").len(), 1);
}

#[tokio::test]
async fn duplicate_check_uses_the_normalized_email() {
    let test_app = TestApp::spawn_app().await;
    let expected_query = serde_json::json!({
        "metadata.email": "user@example.com",
        "type": "subscribers"
    })
    .to_string();

    Mock::given(method("GET"))
        .and(path(OBJECTS_PATH))
        .and(query_param("query", expected_query.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "objects": [stored_subscriber(
                "65f1c0ffee",
                "user@example.com",
                "active",
                chrono::Utc::now()
            )],
            "total": 1
        })))
        .expect(1)
        .mount(&test_app.store_server)
        .await;

    let response = test_app
        .post_subscriber(serde_json::json!({ "email": "User@Example.com" }))
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn subscribe_returns_400_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;

    // This is a common practice and it is called table-driven tests. In this case, it simulates different kind of possible request bodies
    // where API should return 400.
    let test_cases = vec![
        (serde_json::json!({}), "missing email"),
        (serde_json::json!({ "email": "" }), "empty email"),
        (serde_json::json!({ "email": "newtest.com" }), "email without @"),
        (serde_json::json!({ "email": "new@testcom" }), "email without a dot"),
        (
            serde_json::json!({ "email": "new@test.com", "source": "billboard" }),
            "unknown source",
        ),
        (
            serde_json::json!({ "email": "new@test.com", "source": "Footer" }),
            "miscased source",
        ),
        (serde_json::json!({ "email": 42 }), "email is not a string"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscriber(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string(), "No error message for {}", error_message);
    }

    let received = test_app.store_server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn subscribe_returns_400_for_malformed_json() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/subscribers", test_app.address))
        .header("Content-Type", "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn subscribe_sends_a_welcome_email_with_a_link() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;
    test_app.mount_successful_insert().await;
    test_app.mount_email_server(200).await;

    test_app
        .post_subscriber(serde_json::json!({ "email": "new@test.com", "source": "popup" }))
        .await;

    let received_requests = test_app.wait_for_emails(1).await;
    let body: serde_json::Value = serde_json::from_slice(&received_requests[0].body).unwrap();

    assert_eq!(
        body["personalizations"][0]["to"][0]["email"],
        "new@test.com"
    );

    let html = body["content"][1]["value"].as_str().unwrap();
    let links: Vec<_> = linkify::LinkFinder::new()
        .links(html)
        .filter(|link| *link.kind() == linkify::LinkKind::Url)
        .collect();

    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].as_str(),
        format!("{}/resources", test_app.config.application.base_url)
    );

    test_app.wait_for_settled_emails(1).await;
    assert_eq!(test_app.outbox_stats.delivered(), 1);
    assert_eq!(test_app.outbox_stats.failed(), 0);
    assert_eq!(test_app.outbox_stats.dropped(), 0);
}

#[tokio::test]
async fn subscribe_succeeds_even_if_the_welcome_email_fails() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;
    test_app.mount_successful_insert().await;
    test_app.mount_email_server(500).await;

    let response = test_app
        .post_subscriber(serde_json::json!({ "email": "new@test.com" }))
        .await;

    assert_eq!(201, response.status().as_u16());

    // one attempt plus the configured retries
    let expected_attempts = test_app.config.notifications.max_retries as usize + 1;
    test_app.wait_for_emails(expected_attempts).await;

    test_app.wait_for_settled_emails(1).await;
    assert_eq!(test_app.outbox_stats.failed(), 1);
    assert_eq!(test_app.outbox_stats.delivered(), 0);
}

#[tokio::test]
async fn subscribe_returns_500_without_leaking_store_errors() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_empty_collection().await;

    Mock::given(method("POST"))
        .and(path(OBJECTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "message": "internal bucket failure at shard 7"
        })))
        .mount(&test_app.store_server)
        .await;

    let response = test_app
        .post_subscriber(serde_json::json!({ "email": "new@test.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(!body["error"].as_str().unwrap().contains("shard 7"));

    let received = test_app.email_server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn subscribe_returns_500_when_store_credentials_are_missing() {
    let test_app = TestApp::spawn_app_with(|config| {
        config.content_store.write_key = None;
    })
    .await;

    let response = test_app
        .post_subscriber(serde_json::json!({ "email": "new@test.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("contact support"));
    assert!(!error.contains("write_key"));

    let received = test_app.store_server.received_requests().await.unwrap();
    assert!(received.is_empty());
}
