mod common;

use axum::http::StatusCode;

use common::TestClient;
use warbler_db::models::UserRow;

fn setup() -> (TestClient, UserRow, UserRow) {
    let client = TestClient::new();
    let user1 = client.create_user("testuser1", "test1@test.com", "password");
    let user2 = client.create_user("testuser2", "test2@test.com", "password");
    (client, user1, user2)
}

#[tokio::test]
async fn list_users() {
    let (mut client, _, _) = setup();

    let resp = client.get("/users").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("testuser1"));
    assert!(resp.body.contains("testuser2"));
}

#[tokio::test]
async fn search_users() {
    let (mut client, _, _) = setup();
    client.create_user("alice", "alice@test.com", "password");

    let resp = client.get("/users?q=ali").await;
    assert!(resp.body.contains("alice"));
    assert!(!resp.body.contains("testuser1"));

    let resp = client.get("/users?q=nobody").await;
    assert!(resp.body.contains("Sorry, no users found"));
}

#[tokio::test]
async fn view_user_profile() {
    let (mut client, user1, _) = setup();
    client.db().insert_message(user1.id, "profile warble").unwrap();

    let resp = client.get(&format!("/users/{}", user1.id)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("testuser1"));
    assert!(resp.body.contains("profile warble"));
}

#[tokio::test]
async fn view_missing_user_is_404() {
    let (mut client, _, _) = setup();
    let resp = client.get("/users/999").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_user() {
    let (mut client, user1, user2) = setup();
    client.log_in_as(&user1);

    let resp = client
        .post_following_redirects(&format!("/users/follow/{}", user2.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Unfollow"));

    assert!(client.db().is_following(user1.id, user2.id).unwrap());
    assert!(client.db().is_followed_by(user2.id, user1.id).unwrap());
}

#[tokio::test]
async fn unfollow_user() {
    let (mut client, user1, user2) = setup();
    client.db().follow(user1.id, user2.id).unwrap();
    client.log_in_as(&user1);

    let resp = client
        .post_following_redirects(&format!("/users/stop-following/{}", user2.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.body.contains("Unfollow"));
    assert!(!resp.body.contains("@testuser2"));
    assert!(!client.db().is_following(user1.id, user2.id).unwrap());
}

#[tokio::test]
async fn cannot_follow_self() {
    let (mut client, user1, _) = setup();
    client.log_in_as(&user1);

    let resp = client
        .post_following_redirects(&format!("/users/follow/{}", user1.id), "")
        .await;
    assert!(resp.body.contains("Access unauthorized"));
    assert!(!client.db().is_following(user1.id, user1.id).unwrap());
}

#[tokio::test]
async fn follow_missing_user_is_404() {
    let (mut client, user1, _) = setup();
    client.log_in_as(&user1);

    let resp = client.post("/users/follow/999", "").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unauthorized_follow() {
    let (mut client, user1, user2) = setup();

    let resp = client
        .post_following_redirects(&format!("/users/follow/{}", user2.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Access unauthorized"));
    assert!(!client.db().is_following(user1.id, user2.id).unwrap());
}

#[tokio::test]
async fn unauthorized_unfollow() {
    let (mut client, user1, user2) = setup();
    client.db().follow(user1.id, user2.id).unwrap();

    let resp = client
        .post_following_redirects(&format!("/users/stop-following/{}", user2.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Access unauthorized"));
    assert!(client.db().is_following(user1.id, user2.id).unwrap());
}

#[tokio::test]
async fn view_followers_logged_in() {
    let (mut client, user1, user2) = setup();
    client.db().follow(user1.id, user2.id).unwrap();
    client.log_in_as(&user1);

    let resp = client.get(&format!("/users/{}/followers", user2.id)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Followers"));
    assert!(resp.body.contains("testuser1"));

    let resp = client.get(&format!("/users/{}/following", user2.id)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Following"));
}

#[tokio::test]
async fn view_followers_logged_out() {
    let (mut client, _, user2) = setup();

    let resp = client
        .get_following_redirects(&format!("/users/{}/followers", user2.id))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Access unauthorized"));

    let resp = client
        .get_following_redirects(&format!("/users/{}/following", user2.id))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Access unauthorized"));
}

#[tokio::test]
async fn flash_is_shown_once() {
    let (mut client, _, user2) = setup();

    let resp = client
        .get_following_redirects(&format!("/users/{}/followers", user2.id))
        .await;
    assert!(resp.body.contains("Access unauthorized"));

    let resp = client.get("/").await;
    assert!(!resp.body.contains("Access unauthorized"));
}

#[tokio::test]
async fn edit_profile() {
    let (mut client, user1, _) = setup();
    client.log_in_as(&user1);

    let resp = client
        .post(
            "/users/profile",
            "username=renamed&email=renamed%40test.com&password=password&bio=hi+there&location=Lisbon",
        )
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);

    let user = client.db().get_user_by_id(user1.id).unwrap().unwrap();
    assert_eq!(user.username, "renamed");
    assert_eq!(user.bio.as_deref(), Some("hi there"));
    assert_eq!(user.location.as_deref(), Some("Lisbon"));

    let resp = client.get(&format!("/users/{}", user1.id)).await;
    assert!(resp.body.contains("<p class=\"location\">Lisbon</p>"));
}

#[tokio::test]
async fn unauthorized_edit_profile_without_form_body() {
    let (mut client, user1, _) = setup();

    let resp = client.post_empty("/users/profile").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location.as_deref(), Some("/"));

    let user = client.db().get_user_by_id(user1.id).unwrap().unwrap();
    assert_eq!(user.username, "testuser1");
}

#[tokio::test]
async fn edit_profile_wrong_password() {
    let (mut client, user1, _) = setup();
    client.log_in_as(&user1);

    let resp = client
        .post_following_redirects(
            "/users/profile",
            "username=renamed&email=renamed%40test.com&password=wrongpassword",
        )
        .await;
    assert!(resp.body.contains("Wrong password, please try again."));

    let user = client.db().get_user_by_id(user1.id).unwrap().unwrap();
    assert_eq!(user.username, "testuser1");
}

#[tokio::test]
async fn edit_profile_taken_username() {
    let (mut client, user1, _) = setup();
    client.log_in_as(&user1);

    let resp = client
        .post(
            "/users/profile",
            "username=testuser2&email=test1%40test.com&password=password",
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Username or email already taken"));
}

#[tokio::test]
async fn delete_account() {
    let (mut client, user1, user2) = setup();
    let msg = client.db().insert_message(user1.id, "bye").unwrap();
    client.db().follow(user2.id, user1.id).unwrap();
    client.log_in_as(&user1);

    let resp = client.post("/users/delete", "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location.as_deref(), Some("/signup"));

    assert_eq!(client.db().get_user_by_id(user1.id).unwrap(), None);
    assert_eq!(client.db().get_message(msg.id).unwrap(), None);
    assert!(client.db().following(user2.id).unwrap().is_empty());

    // The session cookie was cleared along with the account.
    let resp = client.get_following_redirects("/messages/new").await;
    assert!(resp.body.contains("Access unauthorized"));
}
