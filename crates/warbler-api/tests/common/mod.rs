#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::Cookie;
use http_body_util::BodyExt;
use tower::ServiceExt;

use warbler_api::auth::{AppState, AppStateInner, signup};
use warbler_api::middleware::{CURR_USER_KEY, issue_token};
use warbler_api::routes;
use warbler_db::Database;
use warbler_db::models::UserRow;

pub const SECRET: &str = "test-secret";

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// Drives the router in-process, keeping cookies between requests the way a
/// browser would.
pub struct TestClient {
    pub state: AppState,
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            secret_key: SECRET.to_string(),
        });
        Self {
            app: routes::router(state.clone()),
            state,
            cookies: HashMap::new(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn create_user(&self, username: &str, email: &str, password: &str) -> UserRow {
        let new_user = signup(username, email, password, None).unwrap();
        self.db().insert_user(&new_user).unwrap()
    }

    /// Put `user` in the session without going through the login form.
    pub fn log_in_as(&mut self, user: &UserRow) {
        let token = issue_token(SECRET, user).unwrap();
        self.cookies.insert(CURR_USER_KEY.to_string(), token);
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn post(&mut self, uri: &str, form: &str) -> TestResponse {
        let req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(req).await
    }

    /// A POST carrying no body and no content type.
    pub async fn post_empty(&mut self, uri: &str) -> TestResponse {
        let req = Request::post(uri).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn get_following_redirects(&mut self, uri: &str) -> TestResponse {
        let resp = self.get(uri).await;
        self.follow_redirects(resp).await
    }

    pub async fn post_following_redirects(&mut self, uri: &str, form: &str) -> TestResponse {
        let resp = self.post(uri, form).await;
        self.follow_redirects(resp).await
    }

    async fn follow_redirects(&mut self, mut resp: TestResponse) -> TestResponse {
        for _ in 0..5 {
            match (resp.status, resp.location.clone()) {
                (StatusCode::FOUND | StatusCode::SEE_OTHER, Some(location)) => {
                    resp = self.get(&location).await;
                }
                _ => break,
            }
        }
        resp
    }

    async fn send(&mut self, mut req: Request<Body>) -> TestResponse {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            req.headers_mut()
                .insert(header::COOKIE, cookie_header.parse().unwrap());
        }

        let resp = self.app.clone().oneshot(req).await.unwrap();

        for value in resp.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}
