//! End-to-end console flows against a mocked catalog API.

use std::sync::Arc;
use std::time::Duration;

use catalog_client::{ClientError, Console, LoginRequest};
use catalog_config::AppConfig;
use catalog_core::{Location, MemoryLocation, MemorySessionStorage, RecordingNotifier};
use httpmock::prelude::*;
use serde_json::json;

struct Harness {
    server: MockServer,
    console: Console,
    location: Arc<MemoryLocation>,
    notifier: Arc<RecordingNotifier>,
}

async fn harness() -> Harness {
    let server = MockServer::start_async().await;
    let config = AppConfig {
        api_base_url: server.base_url().parse().expect("valid URL"),
        page_size: 20,
        http_timeout: Duration::from_secs(5),
        session_file: "unused.json".into(),
        login_path: "/login".to_string(),
    };
    let location = Arc::new(MemoryLocation::new("/categories"));
    let notifier = Arc::new(RecordingNotifier::new());
    let console = Console::with_parts(
        config,
        Arc::new(MemorySessionStorage::default()),
        location.clone(),
        notifier.clone(),
    )
    .expect("console");
    Harness {
        server,
        console,
        location,
        notifier,
    }
}

async fn sign_in(harness: &Harness) {
    let login = harness.server.mock(|when, then| {
        when.method(POST)
            .path("/auth/login")
            .json_body(json!({"email": "ops@example.com", "password": "secret"}));
        then.status(200).json_body(json!({
            "data": {
                "user": {"id": 1, "email": "ops@example.com"},
                "abilities": ["category.manage"],
                "access_token": "tok-1"
            }
        }));
    });
    harness
        .console
        .auth()
        .sign_in(&LoginRequest {
            email: "ops@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("sign in");
    login.assert();
}

#[tokio::test]
async fn list_create_and_delete_keep_store_in_step() {
    let harness = harness().await;
    sign_in(&harness).await;

    let list_mock = harness.server.mock(|when, then| {
        when.method(GET)
            .path("/category")
            .header("authorization", "Bearer tok-1")
            .query_param("page", "1")
            .query_param("limit", "20")
            .query_param("sort[0][field]", "created_at")
            .query_param("sort[0][direction]", "desc");
        then.status(200).json_body(json!({
            "data": [
                {"id": 1, "name": "Books", "is_active": true, "position": 1},
                {"id": 2, "name": "Music", "is_active": false, "position": 2}
            ],
            "meta": {"current_page": 1, "per_page": 20, "total": 2, "last_page": 1, "from": 1, "to": 2}
        }));
    });

    let list = harness.console.category_list();
    list.fetch(None).await.expect("fetch");
    list_mock.assert();

    let store = harness.console.category_store();
    assert_eq!(store.read(|store| store.entities.len()), 2);
    assert_eq!(store.read(|store| store.pagination.total), 2);
    assert!(store.read(|store| store.initial && !store.loading));
    assert_eq!(harness.location.query(), "sort=created_at%2Cdesc");

    let create_mock = harness.server.mock(|when, then| {
        when.method(POST).path("/category").json_body(json!({
            "name": "Games",
            "description": "",
            "is_active": true,
            "color": "#0f0",
            "position": 3
        }));
        then.status(201).json_body(json!({
            "data": {"id": 3, "name": "Games", "is_active": true, "color": "#0f0", "position": 3}
        }));
    });

    let form = harness.console.category_form(None).expect("form");
    form.set_value(|values| {
        values.name = "Games".to_string();
        values.color = "#0f0".to_string();
        values.display_order = "3".to_string();
    });
    let created = form.save().await.expect("save");
    create_mock.assert();
    assert_eq!(created.id, "3");
    assert_eq!(store.read(|store| store.entities[0].id.clone()), "3");
    assert_eq!(store.read(|store| store.pagination.total), 3);
    assert_eq!(
        harness.notifier.last().map(|n| n.title),
        Some("Category created successfully".to_string())
    );

    let delete_mock = harness.server.mock(|when, then| {
        when.method(DELETE).path("/category/1");
        then.status(204);
    });
    list.remove("1").await.expect("remove");
    delete_mock.assert();
    assert!(store.read(|store| store.get("1").is_none()));
    assert_eq!(store.read(|store| store.pagination.total), 2);
}

#[tokio::test]
async fn server_rejection_maps_to_form_errors() {
    let harness = harness().await;
    sign_in(&harness).await;

    harness.server.mock(|when, then| {
        when.method(POST).path("/category");
        then.status(422).json_body(json!({
            "message": "The given data was invalid.",
            "errors": {"name": ["The name has already been taken."]}
        }));
    });

    let form = harness.console.category_form(None).expect("form");
    form.set_value(|values| values.name = "Books".to_string());
    let err = form.save().await.expect_err("duplicate");

    assert_eq!(err.status(), Some(422));
    assert_eq!(
        form.errors().get("name"),
        Some(&vec!["The name has already been taken.".to_string()])
    );
    assert!(!form.form().is_saving);
    let last = harness.notifier.last().expect("notification");
    assert_eq!(last.title, "Please fix validation errors");
    assert_eq!(
        last.description.as_deref(),
        Some("name: The name has already been taken.")
    );
}

#[tokio::test]
async fn expired_token_signs_out_once() {
    let harness = harness().await;
    sign_in(&harness).await;

    let list_mock = harness.server.mock(|when, then| {
        when.method(GET).path("/category");
        then.status(401).json_body(json!({"message": "Unauthenticated."}));
    });

    let list = harness.console.category_list();
    let first = list.fetch(None).await.expect_err("unauthorized");
    let second = list.fetch(None).await.expect_err("unauthorized");
    list_mock.assert_calls(2);

    assert!(matches!(first, ClientError::Api(_)));
    assert_eq!(second.status(), Some(401));
    assert!(!harness.console.session().is_authenticated());
    assert_eq!(harness.location.navigations(), vec!["/login".to_string()]);
    assert_eq!(
        harness
            .console
            .category_store()
            .read(|store| store.error.clone()),
        Some("Unauthenticated.".to_string())
    );
}
