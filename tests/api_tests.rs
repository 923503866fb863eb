mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{ADMIN_EMAIL, MEMBER_EMAIL, TestApp, body_text};
use crm_portal::{
    models::{ActionForm, EntityForm, EventForm, PersonForm},
    repository::Repository,
};
use serde_json::{Value, json};

async fn json(app: &TestApp, path: &str, cookies: &[&str]) -> (StatusCode, Value) {
    let response = app.get(path, cookies).await;
    let status = response.status();
    let body = body_text(response).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn post_json(
    app: &TestApp,
    path: &str,
    body: Value,
    cookies: &[&str],
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    let response = app
        .send(builder.body(Body::from(body.to_string())).unwrap())
        .await;
    let status = response.status();
    let body = body_text(response).await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let response = app.get("/health", &[]).await;
    assert!(response.status().is_success());
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_requests_carry_a_request_id() {
    let app = TestApp::new().await;
    let response = app.get("/health", &[]).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_api_requires_a_session() {
    let app = TestApp::new().await;
    for path in [
        "/api/me",
        "/api/users",
        "/api/entities",
        "/api/entities/1",
        "/api/persons",
        "/api/events",
        "/api/actions",
    ] {
        let response = app.get(path, &[]).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {path}");
    }
}

#[tokio::test]
async fn test_me_reports_role() {
    let app = TestApp::new().await;

    let member = app.login_member().await;
    let (status, me) = json(&app, "/api/me", &[&member]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], MEMBER_EMAIL);
    assert_eq!(me["role"], "member");
    assert!(me.get("password_hash").is_none());

    let admin = app.login_admin().await;
    let (_, me) = json(&app, "/api/me", &[&admin]).await;
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["role"], "admin");
}

#[tokio::test]
async fn test_user_listing_is_admin_only_and_hides_hashes() {
    let app = TestApp::new().await;

    let member = app.login_member().await;
    let (status, _) = json(&app, "/api/users", &[&member]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.login_admin().await;
    let (status, users) = json(&app, "/api/users", &[&admin]).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    assert_eq!(users[0]["name"], "Admin");
    assert_eq!(users[0]["role"], "admin");
    assert_eq!(users[1]["role"], "member");
}

#[tokio::test]
async fn test_admin_creates_users_over_json() {
    let app = TestApp::new().await;
    let new_user = json!({
        "name": "Carol",
        "email": "carol@example.com",
        "password": "carol-password"
    });

    let (status, _) = post_json(&app, "/api/users", new_user.clone(), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let member = app.login_member().await;
    let (status, _) = post_json(&app, "/api/users", new_user.clone(), &[&member]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let stored = app.repo.find_user_by_email("carol@example.com").await;
    assert!(stored.unwrap().is_none());

    let admin = app.login_admin().await;
    let (status, created) = post_json(&app, "/api/users", new_user.clone(), &[&admin]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "carol@example.com");
    assert_eq!(created["role"], "member");
    assert!(created.get("password").is_none());
    assert!(created.get("password_hash").is_none());

    let stored = app
        .repo
        .find_user_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.password_hash, "carol-password");
    app.login("carol@example.com", "carol-password").await;

    let (status, _) = post_json(&app, "/api/users", new_user, &[&admin]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.repo.list_users().await.unwrap().len(), 3);

    let blank = json!({ "name": " ", "email": "dave@example.com", "password": "x" });
    let (status, _) = post_json(&app, "/api/users", blank, &[&admin]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_entity_detail_json() {
    let app = TestApp::new().await;
    let session = app.login_member().await;

    let entity = app
        .repo
        .create_entity(EntityForm {
            name: "Alpha Corp".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let person = app
        .repo
        .create_person(PersonForm {
            name: "Jane Roe".into(),
            entity_id: entity.id,
            ..Default::default()
        })
        .await
        .unwrap();
    app.repo
        .create_event(EventForm {
            title: "Kickoff".into(),
            event_type: "meeting".into(),
            entity_id: entity.id,
            person_id: Some(person.id),
            date: Some("2024-03-01".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    app.repo
        .create_action(ActionForm {
            title: "Follow up".into(),
            entity_id: entity.id,
            ..Default::default()
        })
        .await
        .unwrap();

    let (status, detail) = json(&app, &format!("/api/entities/{}", entity.id), &[&session]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["entity"]["name"], "Alpha Corp");
    assert_eq!(detail["events"][0]["title"], "Kickoff");
    assert_eq!(detail["events"][0]["type"], "meeting");
    assert_eq!(detail["events"][0]["date"], "2024-03-01");
    assert_eq!(detail["events"][0]["person_name"], "Jane Roe");
    assert_eq!(detail["events"][0]["entity_name"], "Alpha Corp");
    assert_eq!(detail["actions"][0]["title"], "Follow up");
    assert_eq!(detail["actions"][0]["due_date"], Value::Null);

    let (status, _) = json(&app, "/api/entities/9999", &[&session]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_endpoints_accept_the_html_filters() {
    let app = TestApp::new().await;
    let session = app.login_member().await;

    let alpha = app
        .repo
        .create_entity(EntityForm {
            name: "Alpha Corp".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let beta = app
        .repo
        .create_entity(EntityForm {
            name: "Beta Inc".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    for (title, entity_id) in [("A", alpha.id), ("B", beta.id)] {
        app.repo
            .create_event(EventForm {
                title: title.into(),
                entity_id,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let (_, entities) = json(&app, "/api/entities?q=beta", &[&session]).await;
    assert_eq!(entities.as_array().unwrap().len(), 1);
    assert_eq!(entities[0]["name"], "Beta Inc");

    let (_, events) = json(&app, "/api/events?q=alpha", &[&session]).await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], "A");

    let (_, events) = json(&app, &format!("/api/events?entity_id={}", beta.id), &[&session]).await;
    assert_eq!(events[0]["title"], "B");

    let (status, persons) = json(&app, "/api/persons", &[&session]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(persons.as_array().unwrap().is_empty());

    let (status, actions) = json(&app, "/api/actions?entity_id=", &[&session]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(actions.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_openapi_document_lists_the_api() {
    let app = TestApp::new().await;
    let (status, doc) = json(&app, "/api-docs/openapi.json", &[]).await;
    assert_eq!(status, StatusCode::OK);

    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/api/me",
        "/api/users",
        "/api/entities",
        "/api/entities/{id}",
        "/api/persons",
        "/api/events",
        "/api/actions",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
    assert!(doc["paths"]["/api/users"]["post"].is_object());
    assert!(doc["components"]["schemas"]["EntityDetail"].is_object());
    assert!(doc["components"]["schemas"]["NewUserRequest"].is_object());
}
