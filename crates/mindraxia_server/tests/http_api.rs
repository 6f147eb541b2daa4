use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use mindraxia_core::model::author::AuthorRole;
use mindraxia_core::open_db_in_memory;
use mindraxia_core::repo::author_repo::SqliteAuthorRepository;
use mindraxia_core::service::author_service::AuthorService;
use mindraxia_server::config::SiteConfig;
use mindraxia_server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    admin_token: String,
    editor_token: String,
}

fn test_app() -> TestApp {
    let conn = open_db_in_memory().unwrap();
    let (admin_token, editor_token) = {
        let authors = AuthorService::new(SqliteAuthorRepository::try_new(&conn).unwrap());
        let admin = authors
            .register_author("Admin", "admin@example.org", AuthorRole::Admin)
            .unwrap();
        let editor = authors
            .register_author("Editor", "editor@example.org", AuthorRole::Editor)
            .unwrap();
        (admin.token, editor.token)
    };
    TestApp {
        router: router(AppState::new(conn, SiteConfig::default())),
        admin_token,
        editor_token,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

async fn create_post(
    app: &TestApp,
    token: &str,
    title: &str,
    content: &str,
    status: &str,
) -> Value {
    let (code, body) = send(
        app,
        Method::POST,
        "/api/posts",
        Some(token),
        Some(json!({ "title": title, "content": content, "status": status })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_reports_version() {
    let app = test_app();
    let (status, body) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn writes_require_a_valid_bearer_token() {
    let app = test_app();
    let draft = json!({ "title": "Anonymous" });

    let (status, body) = send(&app, Method::POST, "/api/posts", None, Some(draft.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/posts",
        Some("mdx_bogus"),
        Some(draft),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&app, "/api/authors/me", Some(&app.editor_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "editor");
}

#[tokio::test]
async fn post_lifecycle_respects_visibility_and_ownership() {
    let app = test_app();
    let post = create_post(&app, &app.editor_token, "Draft Notes", "Body.", "draft").await;
    let id = post["uuid"].as_str().unwrap().to_string();
    assert_eq!(post["slug"], "draft-notes");

    let (status, body) = get(&app, &format!("/api/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let uri = format!("/api/posts/{id}");
    let (status, _) = get(&app, &uri, Some(&app.editor_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = get(&app, "/api/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"].as_array().unwrap().len(), 0);
    assert_eq!(list["limit"], 20);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/posts/{id}"),
        Some(&app.editor_token),
        Some(json!({ "title": "Draft Notes", "content": "Final.", "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "published");

    let (_, list) = get(&app, "/api/posts", None).await;
    assert_eq!(list["items"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/posts/{id}"),
        Some(&app.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn editors_get_forbidden_on_admin_resources() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/categories",
        Some(&app.editor_token),
        Some(json!({ "name": "Mathematics" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, category) = send(
        &app,
        Method::POST,
        "/api/categories",
        Some(&app.admin_token),
        Some(json!({ "name": "Mathematics" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["slug"], "mathematics");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/categories",
        Some(&app.admin_token),
        Some(json!({ "name": "Mathematics" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn malformed_input_is_a_json_bad_request() {
    let app = test_app();

    let (status, body) = get(&app, "/api/posts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(&app.editor_token),
        Some(json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = get(&app, "/api/posts?status=archived", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_items_are_reordered_over_http() {
    let app = test_app();
    let first = create_post(&app, &app.admin_token, "First", "a", "published").await;
    let second = create_post(&app, &app.admin_token, "Second", "b", "published").await;

    let (status, route) = send(
        &app,
        Method::POST,
        "/api/routes",
        Some(&app.admin_token),
        Some(json!({ "title": "Intro Path" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let route_id = route["uuid"].as_str().unwrap().to_string();

    for post in [&first, &second] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/routes/{route_id}/items"),
            Some(&app.admin_token),
            Some(json!({ "post_uuid": post["uuid"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, items) = get(&app, &format!("/api/routes/{route_id}/items"), None).await;
    let second_item = items[1]["uuid"].as_str().unwrap().to_string();
    let (status, reordered) = send(
        &app,
        Method::PUT,
        &format!("/api/routes/{route_id}/items/{second_item}/position"),
        Some(&app.admin_token),
        Some(json!({ "position": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reordered[0]["post"]["title"], "Second");
    assert_eq!(reordered[1]["position"], 1);

    let (status, by_slug) = get(&app, "/api/routes/intro-path", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug["item_count"], 2);

    let first_id = first["uuid"].as_str().unwrap();
    let uri = format!("/api/routes/{route_id}/neighbors/{first_id}");
    let (status, neighbors) = get(&app, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(neighbors["previous"]["title"], "Second");
    assert!(neighbors["next"].is_null());
}

#[tokio::test]
async fn rendered_html_and_search_are_public_for_published_posts() {
    let app = test_app();
    let post = create_post(
        &app,
        &app.editor_token,
        "Euler Identity",
        "$$ e^{i\\pi} + 1 = 0 $$ {#eq:euler}\n\nBy {{eq:euler}} we are done.",
        "published",
    )
    .await;
    let id = post["uuid"].as_str().unwrap();

    let (status, rendered) = get(&app, &format!("/api/posts/{id}/html"), None).await;
    assert_eq!(status, StatusCode::OK);
    let html = rendered["html"].as_str().unwrap();
    assert!(html.contains("id=\"eq-euler\""));
    assert!(html.contains("href=\"#eq-euler\">(1)</a>"));

    let (status, anchors) = get(&app, &format!("/api/posts/{id}/anchors"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anchors[0]["anchor_id"], "euler");

    let (status, results) = get(&app, "/api/search?q=euler", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["items"][0]["slug"], "euler-identity");

    let (status, page) = get(&app, "/posts/euler-identity", None).await;
    assert_eq!(status, StatusCode::OK);
    let page = page.as_str().unwrap();
    assert!(page.contains("<h1>Euler Identity</h1>"));
    assert!(page.contains("katex"));

    let (status, _) = get(&app, "/posts/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_requires_authentication() {
    let app = test_app();
    let body = json!({ "content": "See {{thm:nowhere}}." });

    let (status, _) = send(&app, Method::POST, "/api/preview", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, rendered) = send(
        &app,
        Method::POST,
        "/api/preview",
        Some(&app.editor_token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rendered["diagnostics"][0]["code"], "unresolved_reference");
}
