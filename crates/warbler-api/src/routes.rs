use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::messages;
use crate::middleware::load_identity;
use crate::users;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(messages::home))
        .route("/signup", get(auth::signup_form).post(auth::signup_submit))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", get(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/profile", get(users::edit_profile_form).post(users::edit_profile))
        .route("/users/delete", post(users::delete_user))
        .route("/users/{user_id}", get(users::show_user))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(users::show_likes))
        .route("/users/follow/{follow_id}", post(users::follow))
        .route("/users/stop-following/{follow_id}", post(users::stop_following))
        .route("/users/add_like/{message_id}", post(messages::toggle_like))
        .route(
            "/messages/new",
            get(messages::new_message_form).post(messages::create_message),
        )
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .layer(middleware::from_fn_with_state(state.clone(), load_identity))
        .with_state(state)
}
