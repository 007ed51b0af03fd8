use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    Extension, Form,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use rand_core::OsRng;
use tracing::{error, info, warn};

use warbler_db::Database;
use warbler_db::models::{NewUser, UserRow};
use warbler_types::forms::{FormErrors, LoginForm, UserAddForm};

use crate::error::AppError;
use crate::flash;
use crate::middleware::{Identity, log_in, log_out};
use crate::pages::{self, redirect};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub secret_key: String,
}

/// Run blocking work (SQLite, password hashing) off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.to_string())
        })?
}

/// Unwrap a submitted form body. A missing or malformed body becomes an
/// empty form so it is re-rendered with field errors.
pub(crate) fn form_body<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!("Rejected form body: {}", rejection);
            T::default()
        }
    }
}

/// Build a new user with an Argon2id-hashed password. Nothing is written
/// until the result is passed to [`Database::insert_user`], which is where
/// duplicate usernames or emails are rejected.
pub fn signup(
    username: &str,
    email: &str,
    password: &str,
    image_url: Option<&str>,
) -> Result<NewUser, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    Ok(NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
        image_url: image_url.filter(|url| !url.is_empty()).map(str::to_string),
    })
}

/// Find the user with `username` and check `password` against the stored
/// hash. An unknown username and a wrong password both give `Ok(None)`.
pub fn authenticate(
    db: &Database,
    username: &str,
    password: &str,
) -> warbler_db::Result<Option<UserRow>> {
    let Some(user) = db.get_user_by_username(username)? else {
        return Ok(None);
    };

    let parsed_hash = match PasswordHash::new(&user.password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Unreadable password hash for user {}: {}", user.id, e);
            return Ok(None);
        }
    };

    let verified = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(verified.then_some(user))
}

// -- Handlers --

pub async fn signup_form(Extension(identity): Extension<Identity>, jar: CookieJar) -> Response {
    pages::render(
        jar,
        identity.user(),
        pages::signup_form(&UserAddForm::default(), &FormErrors::new()),
    )
}

pub async fn signup_submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
    form: Result<Form<UserAddForm>, FormRejection>,
) -> Result<Response, AppError> {
    let form = form_body(form);
    let data = match form.clean() {
        Ok(data) => data,
        Err(errors) => {
            return Ok(pages::render(jar, identity.user(), pages::signup_form(&form, &errors)));
        }
    };

    let user = blocking(&state, move |s| {
        let new_user = signup(&data.username, &data.email, &data.password, data.image_url.as_deref())?;
        match s.db.insert_user(&new_user) {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_integrity() => Ok(None),
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    let Some(user) = user else {
        let mut errors = FormErrors::new();
        errors.add("username", "Username already taken");
        return Ok(pages::render(jar, identity.user(), pages::signup_form(&form, &errors)));
    };

    info!("New user signed up: {}", user);
    let jar = log_in(jar, &state.secret_key, &user)?;
    Ok((jar, redirect("/")).into_response())
}

pub async fn login_form(Extension(identity): Extension<Identity>, jar: CookieJar) -> Response {
    pages::render(
        jar,
        identity.user(),
        pages::login_form(&LoginForm::default(), &FormErrors::new()),
    )
}

pub async fn login_submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let form = form_body(form);
    let (username, password) = match form.clean() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return Ok(pages::render(jar, identity.user(), pages::login_form(&form, &errors)));
        }
    };

    let user = blocking(&state, move |s| Ok(authenticate(&s.db, &username, &password)?)).await?;

    let Some(user) = user else {
        let mut errors = FormErrors::new();
        errors.add("form", "Invalid credentials.");
        return Ok(pages::render(jar, identity.user(), pages::login_form(&form, &errors)));
    };

    info!("User {} logged in", user.id);
    let jar = log_in(jar, &state.secret_key, &user)?;
    let jar = flash::push(jar, "success", format!("Hello, {}!", user.username));
    Ok((jar, redirect("/")).into_response())
}

pub async fn logout(jar: CookieJar) -> Response {
    let jar = flash::push(log_out(jar), "success", "You have successfully logged out.");
    (jar, redirect("/login")).into_response()
}
