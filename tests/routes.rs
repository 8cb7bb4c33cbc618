mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{assert_redirect, body_string, entry, FakeBackend, TestApp};

#[tokio::test]
async fn health_check() {
    let app = TestApp::new().await;
    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test]
async fn pages_redirect_to_login_when_signed_out() {
    let app = TestApp::new().await;
    for uri in ["/", "/charts", "/export"] {
        let resp = app.get(uri).await;
        assert_redirect(&resp, "/login");
    }
    assert_eq!(app.backend.total_calls(), 0);
}

#[tokio::test]
async fn login_stores_the_user() {
    let app = TestApp::new().await;

    let resp = app.post_form("/login", "username=alice&password=secret").await;
    assert_redirect(&resp, "/");

    let stored = app.state.users.load().await.unwrap();
    assert_eq!(stored.user_id, "u1");
    assert_eq!(stored.username.as_deref(), Some("alice"));

    let resp = app.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("alice"));
    assert_eq!(app.backend.calls("list_entries"), 1);
}

#[tokio::test]
async fn bad_credentials_rerender_login() {
    let app = TestApp::new().await;

    let resp = app.post_form("/login", "username=alice&password=wrong").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Invalid username or password"));
    assert!(app.state.users.load().await.is_none());
}

#[tokio::test]
async fn register_validates_then_forwards() {
    let app = TestApp::new().await;

    let resp = app.post_form("/register", "username=ab&password=pw").await;
    let html = body_string(resp).await;
    assert!(html.contains("Username must be between 3 and 50 characters"));
    assert_eq!(app.backend.calls("register"), 0);

    let resp = app.post_form("/register", "username=taken&password=pw").await;
    let html = body_string(resp).await;
    assert!(html.contains("Username already exists"));

    let resp = app.post_form("/register", "username=carol&password=pw").await;
    let html = body_string(resp).await;
    assert!(html.contains("Account created. Please log in."));
    assert_eq!(app.backend.calls("register"), 2);
}

#[tokio::test]
async fn logout_forgets_the_user() {
    let app = TestApp::new().await;
    app.sign_in().await;

    let resp = app.post_form("/logout", "").await;
    assert_redirect(&resp, "/login");
    assert!(app.state.users.load().await.is_none());
    assert!(app.state.diary.entries().is_empty());

    let resp = app.get("/").await;
    assert_redirect(&resp, "/login");
}

#[tokio::test]
async fn invalid_submission_shows_the_message() {
    let app = TestApp::new().await;
    app.sign_in().await;

    let resp = app
        .post_form("/entries", "date=2024-03-09&content=&emotions=sad")
        .await;
    assert_redirect(&resp, "/");
    assert_eq!(app.backend.calls("create_entry"), 0);

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("Date and content are required."));
}

#[tokio::test]
async fn submitted_entry_is_created_without_icon() {
    let app = TestApp::new().await;
    app.sign_in().await;

    let resp = app
        .post_form(
            "/entries",
            "date=2024-03-09&content=Long+walk&emotions=Calm%2C+happy&icon=%F0%9F%98%8A",
        )
        .await;
    assert_redirect(&resp, "/");

    let drafts = app.backend.sent_drafts();
    assert_eq!(drafts.len(), 1);
    assert!(drafts[0].get("icon").is_none());
    assert_eq!(drafts[0]["emotions"], serde_json::json!(["calm", "happy"]));

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("Entry added!"));
}

#[tokio::test]
async fn selecting_a_day_lists_its_entries() {
    let app = TestApp::with_backend(FakeBackend::with_entries(vec![entry(
        "e1",
        "2024-03-09",
        "Rain all day",
        &["sad"],
    )]))
    .await;
    app.sign_in().await;
    app.get("/").await;

    let resp = app.post_form("/days/2024-03-09/select", "").await;
    assert_redirect(&resp, "/");

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("Rain all day"));
    assert!(html.contains("Saturday, March 9, 2024"));
    assert!(html.contains("/entries/delete?id=e1"));

    app.post_form("/days/2024-03-12/select", "").await;
    let html = body_string(app.get("/").await).await;
    assert!(html.contains("No entries found for this date."));
}

#[tokio::test]
async fn delete_asks_for_confirmation_first() {
    let app = TestApp::with_backend(FakeBackend::with_entries(vec![entry(
        "e1",
        "2024-03-09",
        "Rain",
        &[],
    )]))
    .await;
    app.sign_in().await;
    app.get("/").await;

    let resp = app.get("/entries/delete?id=e1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Delete this entry?"));
    assert_eq!(app.backend.calls("delete_entry"), 0);

    let resp = app.post_form("/entries/delete", "id=e1").await;
    assert_redirect(&resp, "/");
    assert_eq!(app.backend.calls("delete_entry"), 0);

    let resp = app.post_form("/entries/delete", "id=e1&confirm=yes").await;
    assert_redirect(&resp, "/");
    assert_eq!(app.backend.calls("delete_entry"), 1);
    assert!(app.state.diary.entries().is_empty());
}

#[tokio::test]
async fn delete_without_id_warns() {
    let app = TestApp::new().await;
    app.sign_in().await;

    let resp = app.get("/entries/delete").await;
    assert_redirect(&resp, "/");

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("No entry ID provided for deletion."));
}

#[tokio::test]
async fn editing_an_unknown_entry_is_not_found() {
    let app = TestApp::new().await;
    app.sign_in().await;

    let resp = app.post_form("/entries/missing/edit", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_prefills_the_form() {
    let app = TestApp::with_backend(FakeBackend::with_entries(vec![entry(
        "e1",
        "2024-03-09",
        "Rain",
        &["sad", "tired"],
    )]))
    .await;
    app.sign_in().await;
    app.get("/").await;

    let resp = app.post_form("/entries/e1/edit", "").await;
    assert_redirect(&resp, "/");

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("Edit Entry"));
    assert!(html.contains("sad, tired"));

    app.post_form("/entries/cancel-edit", "").await;
    let html = body_string(app.get("/").await).await;
    assert!(!html.contains("Edit Entry"));
}

#[tokio::test]
async fn export_downloads_the_entry_list() {
    let app = TestApp::with_backend(FakeBackend::with_entries(vec![entry(
        "e1",
        "2024-03-09",
        "Rain",
        &["sad"],
    )]))
    .await;
    app.sign_in().await;

    let resp = app.get("/export").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"moodiary-export-"));

    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["entries"][0]["_id"], "e1");
    assert_eq!(json["entries"][0]["content"], "Rain");
}

#[tokio::test]
async fn charts_page_switches_tabs() {
    let app = TestApp::new().await;
    app.sign_in().await;
    *app.backend.stress.lock().unwrap() = serde_json::json!({"stress_level": "low"});

    let resp = app.get("/charts?tab=stress").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Stress analysis"));
    assert!(html.contains("stress level"));
    assert_eq!(app.backend.calls("stress_analysis"), 1);

    let html = body_string(app.get("/charts?period=month").await).await;
    assert!(html.contains("Emotion Frequency - Last Month"));
}

#[tokio::test]
async fn chart_search_with_blank_query() {
    let app = TestApp::new().await;
    app.sign_in().await;

    let html = body_string(app.get("/charts/search?q=").await).await;
    assert!(html.contains("Enter a keyword to search."));
    assert_eq!(app.backend.calls("search_entries"), 0);
}

#[tokio::test]
async fn reload_picks_up_entries_made_elsewhere() {
    let app = TestApp::with_cache_ttl(FakeBackend::default(), Duration::ZERO).await;
    app.sign_in().await;
    app.get("/").await;

    app.backend
        .entries
        .lock()
        .unwrap()
        .push(entry("e9", "2024-03-09", "Restored from backup", &["calm"]));
    for _ in 0..3 {
        assert_eq!(app.get("/").await.status(), StatusCode::OK);
    }

    assert_eq!(app.backend.calls("list_entries"), 4);
    assert_eq!(app.state.diary.entries().len(), 1);
}

#[tokio::test]
async fn refresh_refetches_a_fresh_store() {
    let app = TestApp::new().await;
    app.sign_in().await;
    app.get("/").await;

    app.backend
        .entries
        .lock()
        .unwrap()
        .push(entry("e9", "2024-03-09", "From another device", &[]));
    app.get("/").await;
    assert!(app.state.diary.entries().is_empty());

    let resp = app.post_form("/refresh", "").await;
    assert_redirect(&resp, "/");
    assert_eq!(app.backend.calls("list_entries"), 2);
    assert_eq!(app.state.diary.entries()[0].content, "From another device");
}
