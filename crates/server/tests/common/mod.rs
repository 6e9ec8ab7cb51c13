//! Shared harness: a fresh deployment on a temp database, driven through the
//! full router with `oneshot`.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use db::models::user::User;
use deployment::Deployment;
use serde_json::Value;
use server::{DeploymentImpl, middleware::auth::hash_token, routes};
use services::services::config::Config;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub deployment: DeploymentImpl,
    _dir: TempDir,
}

pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            database_path: Some(dir.path().join("kan.sqlite")),
            ..Default::default()
        };
        let deployment = DeploymentImpl::from_config(config).await.unwrap();
        Self {
            deployment,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        routes::app(&self.deployment)
    }

    pub async fn user(&self, email: &str) -> TestUser {
        let token = format!("token-{email}");
        let user = User::create(
            &self.deployment.db().pool,
            Some("Tester"),
            email,
            &hash_token(&token),
        )
        .await
        .unwrap();
        TestUser { user, token }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Sends a request and returns the status with the decoded JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Creates a workspace owned by `owner` and returns its JSON.
    pub async fn workspace(&self, owner: &TestUser, name: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/workspaces",
                Some(&owner.token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }

    /// Creates a board with the given lists in the workspace and returns its
    /// detail JSON.
    pub async fn board(&self, owner: &TestUser, workspace_id: &str, lists: &[&str]) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/workspaces/{workspace_id}/boards"),
                Some(&owner.token),
                Some(serde_json::json!({
                    "name": "Roadmap",
                    "lists": lists,
                    "labels": ["Bug", "Feature"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let board_id = body["data"]["publicId"].as_str().unwrap().to_string();

        let (status, detail) = self
            .call(
                Method::GET,
                &format!("/api/boards/{board_id}"),
                Some(&owner.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{detail}");
        detail["data"].clone()
    }
}
