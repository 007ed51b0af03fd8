mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::TestClient;
use warbler_api::middleware::CURR_USER_KEY;

#[tokio::test]
async fn signup_logs_in_and_redirects_home() {
    let mut client = TestClient::new();

    let resp = client
        .post(
            "/signup",
            "username=newuser&email=new%40test.com&password=password&image_url=",
        )
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location.as_deref(), Some("/"));

    let user = client.db().get_user_by_username("newuser").unwrap().unwrap();
    assert!(user.password.starts_with("$argon2"));

    let resp = client.get("/").await;
    assert!(resp.body.contains("@newuser"));
}

#[tokio::test]
async fn signup_duplicate_username() {
    let mut client = TestClient::new();
    client.create_user("testuser1", "test1@test.com", "password");

    let resp = client
        .post(
            "/signup",
            "username=testuser1&email=other%40test.com&password=password",
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Username already taken"));
}

#[tokio::test]
async fn signup_invalid_form() {
    let mut client = TestClient::new();

    let resp = client
        .post("/signup", "username=&email=bogus&password=123")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Invalid email address."));
    assert!(client.db().list_users(None).unwrap().is_empty());
}

#[tokio::test]
async fn login_and_logout() {
    let mut client = TestClient::new();
    client.create_user("testuser1", "test1@test.com", "password");

    let resp = client
        .post_following_redirects("/login", "username=testuser1&password=password")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Hello, testuser1!"));

    let resp = client.get_following_redirects("/logout").await;
    assert!(resp.body.contains("You have successfully logged out."));

    let resp = client.get_following_redirects("/messages/new").await;
    assert!(resp.body.contains("Access unauthorized"));
}

#[tokio::test]
async fn login_wrong_password() {
    let mut client = TestClient::new();
    client.create_user("testuser1", "test1@test.com", "password");

    let resp = client
        .post("/login", "username=testuser1&password=wrongpassword")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Invalid credentials."));
}

#[tokio::test]
async fn login_unknown_user() {
    let mut client = TestClient::new();

    let resp = client
        .post("/login", "username=nobody&password=password")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Invalid credentials."));
}

#[tokio::test]
async fn forged_session_is_anonymous() {
    let client = TestClient::new();
    let user = client.create_user("testuser1", "test1@test.com", "password");

    let token = warbler_api::middleware::issue_token("some-other-secret", &user).unwrap();
    let req = axum::http::Request::post("/messages/new")
        .header("cookie", format!("{}={}", CURR_USER_KEY, token))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from("text=Hello"))
        .unwrap();

    let resp = warbler_api::routes::router(client.state.clone())
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(client.db().count_messages().unwrap(), 0);
}

#[tokio::test]
async fn anonymous_home_page() {
    let mut client = TestClient::new();
    let resp = client.get("/").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("New to Warbler?"));
}
