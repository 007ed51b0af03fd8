use std::collections::HashSet;

use axum::{
    Extension, Form,
    extract::{Path, State, rejection::FormRejection},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_types::forms::{FormErrors, MessageForm};

use crate::auth::{AppState, AppStateInner, blocking, form_body};
use crate::error::AppError;
use crate::middleware::{Identity, unauthorized};
use crate::pages::{self, redirect};

/// Messages shown on the home timeline and on profiles.
pub const FEED_LIMIT: u32 = 100;

/// GET / — the viewer's timeline, or the landing page when anonymous.
pub async fn home(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(pages::render(jar, None, pages::home_anon()));
    };

    let viewer_id = viewer.id;
    let (stats, messages, liked) = blocking(&state, move |s| {
        let stats = s.db.user_stats(viewer_id)?;
        let messages = s.db.timeline(viewer_id, FEED_LIMIT)?;
        let liked = s.db.liked_message_ids(viewer_id)?;
        Ok((stats, messages, liked))
    })
    .await?;

    let body = pages::home(viewer, stats, &messages, &liked);
    Ok(pages::render(jar, Some(viewer), body))
}

pub async fn new_message_form(Extension(identity): Extension<Identity>, jar: CookieJar) -> Response {
    let Some(viewer) = identity.user() else {
        return unauthorized(jar);
    };
    pages::render(
        jar,
        Some(viewer),
        pages::message_form(&MessageForm::default(), &FormErrors::new()),
    )
}

/// POST /messages/new — the author is always the session user.
pub async fn create_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
    form: Result<Form<MessageForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        warn!("Anonymous attempt to post a message");
        return Ok(unauthorized(jar));
    };

    let form = form_body(form);
    let text = match form.clean() {
        Ok(text) => text,
        Err(errors) => {
            return Ok(pages::render(jar, Some(viewer), pages::message_form(&form, &errors)));
        }
    };

    let viewer_id = viewer.id;
    let msg = blocking(&state, move |s| Ok(s.db.insert_message(viewer_id, &text)?)).await?;

    info!("User {} posted message {}", viewer_id, msg.id);
    Ok(redirect(&format!("/users/{}", viewer_id)))
}

/// GET /messages/{message_id} — public.
pub async fn show_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(message_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let viewer_id = identity.user().map(|u| u.id);
    let (msg, liked) = blocking(&state, move |s| {
        let msg = s.db.get_message(message_id)?.ok_or(AppError::NotFound)?;
        let liked = match viewer_id {
            Some(uid) => s.db.is_liked_by(msg.id, uid)?,
            None => false,
        };
        Ok((msg, liked))
    })
    .await?;

    let body = pages::message_detail(identity.user(), &msg, liked);
    Ok(pages::render(jar, identity.user(), body))
}

/// POST /messages/{message_id}/delete — only the author may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(message_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        warn!("Anonymous attempt to delete message {}", message_id);
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    let deleted = blocking(&state, move |s| {
        let msg = s.db.get_message(message_id)?.ok_or(AppError::NotFound)?;
        if msg.user_id != viewer_id {
            return Ok(false);
        }
        Ok(s.db.delete_message(message_id)?)
    })
    .await?;

    if !deleted {
        warn!("User {} tried to delete message {} they do not own", viewer_id, message_id);
        return Ok(unauthorized(jar));
    }

    info!("User {} deleted message {}", viewer_id, message_id);
    Ok(redirect(&format!("/users/{}", viewer_id)))
}

/// POST /users/add_like/{message_id} — toggle the viewer's like. Users
/// cannot like their own messages.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(message_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    let toggled = blocking(&state, move |s| {
        let msg = s.db.get_message(message_id)?.ok_or(AppError::NotFound)?;
        if msg.user_id == viewer_id {
            return Ok(None);
        }
        Ok(Some(s.db.toggle_like(viewer_id, message_id)?))
    })
    .await?;

    match toggled {
        Some(added) => {
            info!("User {} {} message {}", viewer_id, if added { "liked" } else { "unliked" }, message_id);
            Ok(redirect("/"))
        }
        None => Ok(unauthorized(jar)),
    }
}

/// Like state for the messages a viewer is looking at.
pub(crate) fn liked_ids(state: &AppStateInner, viewer_id: Option<i64>) -> Result<HashSet<i64>, AppError> {
    match viewer_id {
        Some(uid) => Ok(state.db.liked_message_ids(uid)?),
        None => Ok(HashSet::new()),
    }
}
