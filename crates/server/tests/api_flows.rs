//! End-to-end request flows through the full router.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn health_reports_database_ready() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database_ready"], true);
}

#[tokio::test]
async fn protected_routes_require_a_known_token() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/workspaces", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .call(Method::GET, "/api/workspaces", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_paths_are_not_found_even_without_a_token() {
    let app = TestApp::new().await;
    let (status, _) = app.call(Method::GET, "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_members_are_forbidden() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let stranger = app.user("stranger@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let board = app.board(&owner, ws_id, &["Todo"]).await;
    let board_id = board["publicId"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/workspaces/{ws_id}"),
            Some(&stranger.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/boards/{board_id}"),
            Some(&stranger.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/lists",
            Some(&stranger.token),
            Some(json!({ "boardPublicId": board_id, "name": "Sneaky" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_and_missing_ids() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;

    let (status, _) = app
        .call(Method::GET, "/api/boards/short", Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::GET, "/api/boards/abcdefghijkl", Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn board_create_and_delete() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();

    let board = app.board(&owner, ws_id, &["Todo", "Doing", "Done"]).await;
    let board_id = board["publicId"].as_str().unwrap().to_string();
    assert_eq!(board["slug"], "roadmap");
    assert_eq!(board["lists"].as_array().unwrap().len(), 3);
    assert_eq!(board["lists"][1]["name"], "Doing");
    assert_eq!(board["labels"].as_array().unwrap().len(), 2);

    // A second board with the same name gets a suffixed slug.
    let second = app.board(&owner, ws_id, &[]).await;
    assert_ne!(second["slug"], "roadmap");
    assert!(second["slug"].as_str().unwrap().starts_with("roadmap-"));

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/workspaces/{ws_id}/boards"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/boards/{board_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/boards/{board_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn board_slug_update_and_availability() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let first = app.board(&owner, ws_id, &[]).await;
    let second = app.board(&owner, ws_id, &[]).await;
    let second_id = second["publicId"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/boards/{second_id}/check-slug-availability?boardSlug=roadmap"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isReserved"], true);
    assert_eq!(first["slug"], "roadmap");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/boards/{second_id}"),
            Some(&owner.token),
            Some(json!({ "slug": "roadmap" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/boards/{second_id}"),
            Some(&owner.token),
            Some(json!({ "slug": "q3-plan" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "q3-plan");
}

#[tokio::test]
async fn list_lifecycle_keeps_indices_dense() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let board = app.board(&owner, ws_id, &["A", "B"]).await;
    let board_id = board["publicId"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/lists",
            Some(&owner.token),
            Some(json!({ "boardPublicId": board_id, "name": "C" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["index"], 2);
    let list_c = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/lists/{list_c}"),
            Some(&owner.token),
            Some(json!({ "index": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["index"], 0);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/lists/{list_c}"),
            Some(&owner.token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to update list");

    let first_list = board["lists"][0]["publicId"].as_str().unwrap();
    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/lists/{first_list}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = app
        .call(
            Method::GET,
            &format!("/api/boards/{board_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    let lists = detail["data"]["lists"].as_array().unwrap();
    let names: Vec<_> = lists.iter().map(|l| l["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["C", "B"]);
    let indices: Vec<_> = lists.iter().map(|l| l["index"].as_i64().unwrap()).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test]
async fn card_create_move_and_comment() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let board = app.board(&owner, ws_id, &["Todo", "Done"]).await;
    let todo = board["lists"][0]["publicId"].as_str().unwrap();
    let done = board["lists"][1]["publicId"].as_str().unwrap();
    let bug = board["labels"][0]["publicId"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/cards",
            Some(&owner.token),
            Some(json!({
                "listPublicId": todo,
                "title": "Fix login",
                "labelPublicIds": [bug],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let card_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/cards/{card_id}"),
            Some(&owner.token),
            Some(json!({ "title": "Fix login flow", "listPublicId": done })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], "Fix login flow");
    assert_eq!(body["data"]["index"], 0);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/cards/{card_id}/comments"),
            Some(&owner.token),
            Some(json!({ "comment": "on it" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/cards/comments/{comment_id}"),
            Some(&owner.token),
            Some(json!({ "comment": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["comment"], "done");

    // Toggling the label it was created with removes it.
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/cards/{card_id}/labels/{bug}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], false);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/cards/{card_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let detail = &body["data"];
    assert_eq!(detail["listPublicId"], done);
    assert!(detail["labels"].as_array().unwrap().is_empty());
    assert_eq!(detail["comments"].as_array().unwrap().len(), 1);
    assert!(!detail["activities"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cards_cannot_move_to_another_board() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let first = app.board(&owner, ws_id, &["Todo"]).await;
    let second = app.board(&owner, ws_id, &["Elsewhere"]).await;

    let (_, body) = app
        .call(
            Method::POST,
            "/api/cards",
            Some(&owner.token),
            Some(json!({ "listPublicId": first["lists"][0]["publicId"], "title": "Stay" })),
        )
        .await;
    let card_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/cards/{card_id}"),
            Some(&owner.token),
            Some(json!({ "listPublicId": second["lists"][0]["publicId"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checklist_items_toggle() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let board = app.board(&owner, ws_id, &["Todo"]).await;

    let (_, body) = app
        .call(
            Method::POST,
            "/api/cards",
            Some(&owner.token),
            Some(json!({ "listPublicId": board["lists"][0]["publicId"], "title": "Ship" })),
        )
        .await;
    let card_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/cards/{card_id}/checklists"),
            Some(&owner.token),
            Some(json!({ "name": "Release" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let checklist_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/checklists/{checklist_id}/items"),
            Some(&owner.token),
            Some(json!({ "title": "Tag version" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let item_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/checklists/items/{item_id}"),
            Some(&owner.token),
            Some(json!({ "completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/checklists/{checklist_id}/items"),
            Some(&owner.token),
            Some(json!({ "title": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/checklists/{checklist_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/checklists/items/{item_id}"),
            Some(&owner.token),
            Some(json!({ "completed": false })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn members_are_managed_by_admins() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let teammate = app.user("teammate@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{ws_id}/members"),
            Some(&owner.token),
            Some(json!({ "email": "Teammate@Example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{ws_id}/members"),
            Some(&owner.token),
            Some(json!({ "email": "teammate@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{ws_id}/members"),
            Some(&owner.token),
            Some(json!({ "email": "newcomer@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "invited");

    // A plain member can read but not manage.
    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/workspaces/{ws_id}/members"),
            Some(&teammate.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{ws_id}/members"),
            Some(&teammate.token),
            Some(json!({ "email": "other@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn public_board_by_slug() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();
    let ws_slug = workspace["slug"].as_str().unwrap();
    let board = app.board(&owner, ws_id, &["Todo"]).await;
    let board_id = board["publicId"].as_str().unwrap();
    let uri = format!("/api/public/workspaces/{ws_slug}/boards/roadmap");

    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/boards/{board_id}"),
            Some(&owner.token),
            Some(json!({ "visibility": "public" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["publicId"], board_id);
    assert_eq!(body["data"]["lists"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn page_visibility_rules() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let stranger = app.user("stranger@example.com").await;
    let workspace = app.workspace(&owner, "Acme").await;
    let ws_id = workspace["publicId"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{ws_id}/pages"),
            Some(&owner.token),
            Some(json!({ "title": "Handbook" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let page_id = body["data"]["publicId"].as_str().unwrap().to_string();
    let page_uri = format!("/api/pages/{page_id}");

    let (status, _) = app.call(Method::GET, &page_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .call(Method::GET, &page_uri, Some(&stranger.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .call(Method::GET, &page_uri, Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Handbook");

    let (status, body) = app
        .call(
            Method::PUT,
            &page_uri,
            Some(&owner.token),
            Some(json!({ "visibility": "public", "slug": "Team-Handbook" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["slug"], "team-handbook");

    let (status, _) = app.call(Method::GET, &page_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call(Method::GET, "/api/pages/slug/team-handbook", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["publicId"], page_id.as_str());

    // Editing still needs membership.
    let (status, _) = app
        .call(
            Method::PUT,
            &page_uri,
            Some(&stranger.token),
            Some(json!({ "title": "Mine now" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::DELETE, &page_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn page_labels_stay_in_their_workspace() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let home = app.workspace(&owner, "Home").await;
    let away = app.workspace(&owner, "Away").await;
    let home_id = home["publicId"].as_str().unwrap();
    let away_id = away["publicId"].as_str().unwrap();

    let (_, body) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{home_id}/pages"),
            Some(&owner.token),
            Some(json!({ "title": "Notes" })),
        )
        .await;
    let page_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{away_id}/page-labels"),
            Some(&owner.token),
            Some(json!({ "name": "Foreign", "colourCode": "#ff0000" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let foreign = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{home_id}/page-labels"),
            Some(&owner.token),
            Some(json!({ "name": "Local" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let local = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/pages/{page_id}/labels/{foreign}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/pages/{page_id}/labels/{foreign}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/pages/{page_id}/labels/{local}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/pages/{page_id}/tags"),
            Some(&owner.token),
            Some(json!({ "name": "draft" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let tag_id = body["data"]["publicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/pages/tags/{tag_id}"),
            Some(&owner.token),
            Some(json!({ "name": "final" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "final");

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/workspaces/{home_id}/pages"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["data"][0];
    assert_eq!(summary["labels"][0]["name"], "Local");
    assert_eq!(summary["tags"][0]["name"], "final");
}
