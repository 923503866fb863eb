mod common;

use axum::http::StatusCode;
use common::{TestApp, body_text, form, location};
use crm_portal::{
    models::{ActionForm, EntityForm, EventForm, ListFilter, PersonForm},
    repository::Repository,
};

// --- Test Data Helpers ---

async fn seed_entity(app: &TestApp, name: &str) -> i64 {
    app.repo
        .create_entity(EntityForm {
            name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

async fn seed_person(app: &TestApp, name: &str, entity_id: i64) -> i64 {
    app.repo
        .create_person(PersonForm {
            name: name.to_string(),
            entity_id,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

async fn seed_event(app: &TestApp, title: &str, entity_id: i64, date: Option<&str>) -> i64 {
    app.repo
        .create_event(EventForm {
            title: title.to_string(),
            entity_id,
            date: date.map(str::to_string),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

// --- Entities ---

#[tokio::test]
async fn test_create_entity_then_list_shows_submitted_values() {
    let app = TestApp::new().await;
    let session = app.login_member().await;

    let form_page = body_text(app.get("/entities/new", &[&session]).await).await;
    assert!(form_page.contains("New entity"));

    let body = form(&[
        ("name", "Alpha Corp"),
        ("description", "Widgets"),
        ("address", "1 Main St"),
        ("phone", "555-0100"),
        ("email", "info@alpha.test"),
        ("url", "https://alpha.test"),
    ]);
    let response = app.post_form("/entities/new", &body, &[&session]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/entities");

    let page = app.follow(&response, Some(&session)).await;
    assert!(page.contains("Alpha Corp"));
    assert!(page.contains("created."));
    assert!(page.contains("info@alpha.test"));
    assert!(page.contains("555-0100"));
    assert!(page.contains("https://alpha.test"));

    let stored = app.repo.list_entities(&ListFilter::default()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Alpha Corp");
    assert_eq!(stored[0].description, "Widgets");
    assert_eq!(stored[0].address, "1 Main St");
}

#[tokio::test]
async fn test_entity_list_search_is_case_insensitive() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    seed_entity(&app, "Alpha Corp").await;
    seed_entity(&app, "Beta Inc").await;

    let page = body_text(app.get("/entities?q=ALPHA", &[&session]).await).await;
    assert!(page.contains("Alpha Corp"));
    assert!(!page.contains("Beta Inc"));

    // A blank search means no filter.
    let page = body_text(app.get("/entities?q=", &[&session]).await).await;
    assert!(page.contains("Alpha Corp"));
    assert!(page.contains("Beta Inc"));
}

#[tokio::test]
async fn test_edit_entity_replaces_the_row() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let id = seed_entity(&app, "Old Name").await;

    let form_page = body_text(app.get(&format!("/entities/{id}/edit"), &[&session]).await).await;
    assert!(form_page.contains("value=\"Old Name\""));

    let response = app
        .post_form(
            &format!("/entities/{id}/edit"),
            "name=New+Name&phone=123",
            &[&session],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/entities");

    let entity = app.repo.get_entity(id).await.unwrap().unwrap();
    assert_eq!(entity.name, "New Name");
    assert_eq!(entity.phone, "123");
}

#[tokio::test]
async fn test_unknown_entity_ids_redirect_with_a_message() {
    let app = TestApp::new().await;
    let session = app.login_member().await;

    let detail = app.get("/entities/999", &[&session]).await;
    assert_eq!(detail.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&detail), "/entities");
    assert!(app.follow(&detail, Some(&session)).await.contains("Entity #999 was not found."));

    let edit = app.get("/entities/999/edit", &[&session]).await;
    assert_eq!(location(&edit), "/entities");

    let update = app
        .post_form("/entities/999/edit", "name=Nope", &[&session])
        .await;
    assert_eq!(location(&update), "/entities");

    let delete = app.post_form("/entities/999/delete", "", &[&session]).await;
    assert_eq!(location(&delete), "/entities");

    assert!(app.repo.list_entities(&ListFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_entity_detail_aggregates_events_and_actions() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let beta = seed_entity(&app, "Beta Inc").await;
    let jane = seed_person(&app, "Jane Roe", alpha).await;

    app.repo
        .create_event(EventForm {
            title: "Kickoff".into(),
            entity_id: alpha,
            person_id: Some(jane),
            date: Some("2024-03-01".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    seed_event(&app, "Beta Lunch", beta, None).await;
    app.repo
        .create_action(ActionForm {
            title: "Send proposal".into(),
            entity_id: alpha,
            ..Default::default()
        })
        .await
        .unwrap();

    let page = body_text(app.get(&format!("/entities/{alpha}"), &[&session]).await).await;
    assert!(page.contains("Alpha Corp"));
    assert!(page.contains("Kickoff"));
    assert!(page.contains("Jane Roe"));
    assert!(page.contains("2024-03-01"));
    assert!(page.contains("Send proposal"));
    assert!(!page.contains("Beta Lunch"));
}

#[tokio::test]
async fn test_delete_is_post_only() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let id = seed_entity(&app, "Keep Me").await;

    let response = app.get(&format!("/entities/{id}/delete"), &[&session]).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(app.repo.get_entity(id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_deleting_an_entity_leaves_references_dangling() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let other = seed_entity(&app, "Other Ltd").await;
    seed_person(&app, "Jane Roe", alpha).await;
    seed_event(&app, "Kickoff", alpha, Some("2024-01-01")).await;

    let response = app
        .post_form(&format!("/entities/{alpha}/delete"), "", &[&session])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.follow(&response, Some(&session)).await.contains("Entity deleted."));

    let entities = app.repo.list_entities(&ListFilter::default()).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].id, other);

    // Rows that pointed at the entity are still there with the old id.
    let persons = app.repo.list_persons(&ListFilter::for_entity(alpha)).await.unwrap();
    assert_eq!(persons.len(), 1);
    let events = app.repo.list_events(&ListFilter::for_entity(alpha)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_name, None);

    let page = body_text(app.get("/persons", &[&session]).await).await;
    assert!(page.contains("Jane Roe"));
    assert!(page.contains(&format!("#{alpha}")));
}

// --- Persons ---

#[tokio::test]
async fn test_person_crud_round_through_the_forms() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let beta = seed_entity(&app, "Beta Inc").await;

    let form_page = body_text(
        app.get(&format!("/persons/new?entity_id={alpha}"), &[&session])
            .await,
    )
    .await;
    assert!(form_page.contains(&format!("<option value=\"{alpha}\" selected>")));

    let alpha_id = alpha.to_string();
    let body = form(&[
        ("name", "Jane Roe"),
        ("email", "jane@alpha.test"),
        ("phone", "555"),
        ("position", "CTO"),
        ("entity_id", &alpha_id),
    ]);
    let response = app.post_form("/persons/new", &body, &[&session]).await;
    assert_eq!(location(&response), "/persons");

    let page = app.follow(&response, Some(&session)).await;
    assert!(page.contains("Jane Roe"));
    assert!(page.contains("CTO"));
    assert!(page.contains("jane@alpha.test"));

    let id = app.repo.list_persons(&ListFilter::default()).await.unwrap()[0].id;
    let response = app
        .post_form(
            &format!("/persons/{id}/edit"),
            &format!("name=Jane+Roe&position=CEO&entity_id={beta}"),
            &[&session],
        )
        .await;
    assert_eq!(location(&response), "/persons");
    let person = app.repo.get_person(id).await.unwrap().unwrap();
    assert_eq!(person.position, "CEO");
    assert_eq!(person.entity_id, beta);
    assert_eq!(person.email, "", "whole-row replace clears omitted fields");

    let response = app
        .post_form(&format!("/persons/{id}/delete"), "", &[&session])
        .await;
    assert_eq!(location(&response), "/persons");
    assert!(app.repo.get_person(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_person_list_filters_by_entity_and_name() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let beta = seed_entity(&app, "Beta Inc").await;
    seed_person(&app, "Ann Alpha", alpha).await;
    seed_person(&app, "Bob Alpha", alpha).await;
    seed_person(&app, "Ann Beta", beta).await;

    let page = body_text(
        app.get(&format!("/persons?entity_id={alpha}&q=ann"), &[&session])
            .await,
    )
    .await;
    assert!(page.contains("Ann Alpha"));
    assert!(!page.contains("Bob Alpha"));
    assert!(!page.contains("Ann Beta"));

    let page = body_text(app.get("/persons?entity_id=&q=", &[&session]).await).await;
    assert!(page.contains("Ann Alpha"));
    assert!(page.contains("Bob Alpha"));
    assert!(page.contains("Ann Beta"));
}

// --- Events ---

#[tokio::test]
async fn test_event_search_matches_the_related_entity_name() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let beta = seed_entity(&app, "Beta Inc").await;
    seed_event(&app, "Alpha Kickoff", alpha, Some("2024-02-01")).await;
    seed_event(&app, "Quarterly Review", beta, Some("2024-02-02")).await;

    let page = body_text(app.get("/events?q=alpha", &[&session]).await).await;
    assert!(page.contains("Alpha Kickoff"));
    assert!(!page.contains("Quarterly Review"));

    let events = app.repo.list_events(&ListFilter::search("alpha")).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_name.as_deref(), Some("Alpha Corp"));
}

#[tokio::test]
async fn test_event_form_submission_handles_optional_fields() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let jane = seed_person(&app, "Jane Roe", alpha).await;

    let body = format!(
        "title=Intro+call&description=First+contact&date=2024-05-06&type=call&entity_id={alpha}&person_id={jane}"
    );
    let response = app.post_form("/events/new", &body, &[&session]).await;
    assert_eq!(location(&response), "/events");
    let page = app.follow(&response, Some(&session)).await;
    assert!(page.contains("Intro call"));
    assert!(page.contains("2024-05-06"));
    assert!(page.contains("Jane Roe"));

    // Blank date and person select come through as nulls.
    let body = format!("title=Note&date=&type=&entity_id={alpha}&person_id=");
    app.post_form("/events/new", &body, &[&session]).await;

    let events = app.repo.list_events(&ListFilter::default()).await.unwrap();
    assert_eq!(events.len(), 2);
    // Dated events first, undated last.
    assert_eq!(events[0].event.title, "Intro call");
    assert_eq!(events[0].event.event_type, "call");
    assert_eq!(events[0].event.person_id, Some(jane));
    assert_eq!(events[1].event.title, "Note");
    assert_eq!(events[1].event.date, None);
    assert_eq!(events[1].event.person_id, None);

    let id = events[1].event.id;
    let edit_page = body_text(app.get(&format!("/events/{id}/edit"), &[&session]).await).await;
    assert!(edit_page.contains("value=\"Note\""));

    let response = app
        .post_form(
            &format!("/events/{id}/edit"),
            &format!("title=Note&date=2023-12-31&type=visit&entity_id={alpha}&person_id="),
            &[&session],
        )
        .await;
    assert_eq!(location(&response), "/events");
    let event = app.repo.get_event(id).await.unwrap().unwrap();
    assert_eq!(event.date.as_deref(), Some("2023-12-31"));
    assert_eq!(event.event_type, "visit");

    let response = app
        .post_form(&format!("/events/{id}/delete"), "", &[&session])
        .await;
    assert_eq!(location(&response), "/events");
    assert!(app.repo.get_event(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_events_are_listed_latest_first() {
    let app = TestApp::new().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    seed_event(&app, "Middle", alpha, Some("2024-06-01")).await;
    seed_event(&app, "Undated", alpha, None).await;
    seed_event(&app, "Latest", alpha, Some("2024-12-01")).await;
    seed_event(&app, "Earliest", alpha, Some("2023-01-01")).await;

    let titles: Vec<String> = app
        .repo
        .list_events(&ListFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event.title)
        .collect();
    assert_eq!(titles, ["Latest", "Middle", "Earliest", "Undated"]);
}

// --- Actions ---

#[tokio::test]
async fn test_action_crud_and_filters() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    let alpha = seed_entity(&app, "Alpha Corp").await;
    let beta = seed_entity(&app, "Beta Inc").await;

    let body = format!(
        "title=Send+proposal&description=Draft+v1&status=open&priority=high&due_date=2024-07-01&entity_id={alpha}"
    );
    let response = app.post_form("/actions/new", &body, &[&session]).await;
    assert_eq!(location(&response), "/actions");
    let page = app.follow(&response, Some(&session)).await;
    assert!(page.contains("Send proposal"));
    assert!(page.contains("2024-07-01"));
    assert!(page.contains("high"));

    let body = format!("title=Call+back&status=done&priority=low&due_date=&entity_id={beta}");
    app.post_form("/actions/new", &body, &[&session]).await;

    let page = body_text(
        app.get(&format!("/actions?entity_id={beta}"), &[&session])
            .await,
    )
    .await;
    assert!(page.contains("Call back"));
    assert!(!page.contains("Send proposal"));

    let page = body_text(app.get("/actions?q=PROPOSAL", &[&session]).await).await;
    assert!(page.contains("Send proposal"));
    assert!(!page.contains("Call back"));

    let actions = app.repo.list_actions(&ListFilter::default()).await.unwrap();
    let id = actions
        .iter()
        .find(|a| a.title == "Send proposal")
        .unwrap()
        .id;

    let edit_page = body_text(app.get(&format!("/actions/{id}/edit"), &[&session]).await).await;
    assert!(edit_page.contains("<option value=\"high\" selected>"));

    let response = app
        .post_form(
            &format!("/actions/{id}/edit"),
            &format!("title=Send+proposal&status=done&priority=high&due_date=2024-07-01&entity_id={alpha}"),
            &[&session],
        )
        .await;
    assert_eq!(location(&response), "/actions");
    assert_eq!(app.repo.get_action(id).await.unwrap().unwrap().status, "done");

    let response = app
        .post_form(&format!("/actions/{id}/delete"), "", &[&session])
        .await;
    assert_eq!(location(&response), "/actions");
    let remaining = app.repo.list_actions(&ListFilter::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Call back");
}

#[tokio::test]
async fn test_unknown_ids_on_other_resources_redirect_to_their_lists() {
    let app = TestApp::new().await;
    let session = app.login_member().await;

    for (path, list) in [
        ("/persons/42/edit", "/persons"),
        ("/events/42/edit", "/events"),
        ("/actions/42/edit", "/actions"),
    ] {
        let response = app.get(path, &[&session]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "GET {path}");
        assert_eq!(location(&response), list, "GET {path}");
    }

    for (path, list) in [
        ("/persons/42/delete", "/persons"),
        ("/events/42/delete", "/events"),
        ("/actions/42/delete", "/actions"),
    ] {
        let response = app.post_form(path, "", &[&session]).await;
        assert_eq!(location(&response), list, "POST {path}");
    }
}

#[tokio::test]
async fn test_rendered_values_are_html_escaped() {
    let app = TestApp::new().await;
    let session = app.login_member().await;
    seed_entity(&app, "<script>alert(1)</script>").await;

    let page = body_text(app.get("/entities", &[&session]).await).await;
    assert!(!page.contains("<script>alert(1)</script>"));
    assert!(page.contains("&#60;script&#62;") || page.contains("&lt;script&gt;"));
}
