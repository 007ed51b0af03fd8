use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use warbler_db::models::UserRow;

use crate::auth::{AppState, blocking};
use crate::flash;
use crate::pages::redirect;

/// Session cookie holding the signed current-user token.
pub const CURR_USER_KEY: &str = "curr_user";

const SESSION_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

/// The user behind the current request, resolved once per request by
/// [`load_identity`]. Anonymous when the session is missing, invalid, or
/// names a user that no longer exists.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    user: Option<UserRow>,
}

impl Identity {
    pub fn user(&self) -> Option<&UserRow> {
        self.user.as_ref()
    }
}

pub fn issue_token(secret: &str, user: &UserRow) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Store `user` as the session identity.
pub fn log_in(jar: CookieJar, secret: &str, user: &UserRow) -> anyhow::Result<CookieJar> {
    let token = issue_token(secret, user)?;
    Ok(jar.add(
        Cookie::build((CURR_USER_KEY, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    ))
}

pub fn log_out(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(CURR_USER_KEY).path("/"))
}

/// Outcome for every request that fails the session gate: flash and
/// bounce to the home page, changing nothing.
pub fn unauthorized(jar: CookieJar) -> Response {
    let jar = flash::push(jar, "danger", "Access unauthorized.");
    (jar, redirect("/")).into_response()
}

/// Resolve the session cookie into an [`Identity`] request extension.
pub async fn load_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = jar
        .get(CURR_USER_KEY)
        .and_then(|cookie| match decode_token(&state.secret_key, cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!("Rejected session token: {}", e);
                None
            }
        });

    let user = match claims {
        Some(claims) => {
            match blocking(&state, move |s| Ok(s.db.get_user_by_id(claims.sub)?)).await {
                Ok(user) => user,
                Err(e) => return e.into_response(),
            }
        }
        None => None,
    };

    req.extensions_mut().insert(Identity { user });
    next.run(req).await
}
