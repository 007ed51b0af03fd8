use std::collections::HashSet;

use axum::{
    Extension, Form,
    extract::{Path, Query, State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use warbler_db::models::{UserRow, UserStats, UserUpdate};
use warbler_types::forms::{FormErrors, UserProfileForm};

use crate::auth::{AppState, AppStateInner, authenticate, blocking, form_body};
use crate::error::AppError;
use crate::flash;
use crate::messages::{FEED_LIMIT, liked_ids};
use crate::middleware::{Identity, log_out, unauthorized};
use crate::pages::{self, ProfileHeader, redirect};

#[derive(Debug, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
}

/// Everything needed to draw the profile banner for `user_id`.
struct Profile {
    user: UserRow,
    stats: UserStats,
    viewer_follows: bool,
    viewer_following: HashSet<i64>,
}

impl Profile {
    fn load(s: &AppStateInner, user_id: i64, viewer_id: Option<i64>) -> Result<Self, AppError> {
        let user = s.db.get_user_by_id(user_id)?.ok_or(AppError::NotFound)?;
        let stats = s.db.user_stats(user_id)?;
        let viewer_following = match viewer_id {
            Some(vid) => s.db.following_ids(vid)?,
            None => HashSet::new(),
        };
        Ok(Self {
            viewer_follows: viewer_following.contains(&user_id),
            user,
            stats,
            viewer_following,
        })
    }

    fn header(&self) -> ProfileHeader<'_> {
        ProfileHeader {
            user: &self.user,
            stats: self.stats,
            viewer_follows: self.viewer_follows,
        }
    }
}

/// GET /users — everyone, or usernames containing `q`.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(search): Query<UserSearch>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let viewer_id = identity.user().map(|u| u.id);
    let q = search.q.filter(|q| !q.trim().is_empty());

    let (users, following) = blocking(&state, move |s| {
        let users = s.db.list_users(q.as_deref().map(str::trim))?;
        let following = match viewer_id {
            Some(vid) => s.db.following_ids(vid)?,
            None => HashSet::new(),
        };
        Ok((users, following))
    })
    .await?;

    let body = pages::users_index(identity.user(), &users, &following);
    Ok(pages::render(jar, identity.user(), body))
}

/// GET /users/{user_id} — public profile with recent messages.
pub async fn show_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let viewer_id = identity.user().map(|u| u.id);
    let (profile, messages, liked) = blocking(&state, move |s| {
        let profile = Profile::load(s, user_id, viewer_id)?;
        let messages = s.db.user_messages(user_id, FEED_LIMIT)?;
        let liked = liked_ids(s, viewer_id)?;
        Ok((profile, messages, liked))
    })
    .await?;

    let body = pages::user_profile(identity.user(), &profile.header(), &messages, &liked);
    Ok(pages::render(jar, identity.user(), body))
}

/// GET /users/{user_id}/following
pub async fn show_following(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    let (profile, users) = blocking(&state, move |s| {
        let profile = Profile::load(s, user_id, Some(viewer_id))?;
        let users = s.db.following(user_id)?;
        Ok((profile, users))
    })
    .await?;

    let body = pages::follow_list(
        Some(viewer),
        &profile.header(),
        "Following",
        &users,
        &profile.viewer_following,
    );
    Ok(pages::render(jar, Some(viewer), body))
}

/// GET /users/{user_id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    let (profile, users) = blocking(&state, move |s| {
        let profile = Profile::load(s, user_id, Some(viewer_id))?;
        let users = s.db.followers(user_id)?;
        Ok((profile, users))
    })
    .await?;

    let body = pages::follow_list(
        Some(viewer),
        &profile.header(),
        "Followers",
        &users,
        &profile.viewer_following,
    );
    Ok(pages::render(jar, Some(viewer), body))
}

/// GET /users/{user_id}/likes
pub async fn show_likes(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    let (profile, messages, liked) = blocking(&state, move |s| {
        let profile = Profile::load(s, user_id, Some(viewer_id))?;
        let messages = s.db.liked_messages(user_id)?;
        let liked = liked_ids(s, Some(viewer_id))?;
        Ok((profile, messages, liked))
    })
    .await?;

    let body = pages::liked_messages(Some(viewer), &profile.header(), &messages, &liked);
    Ok(pages::render(jar, Some(viewer), body))
}

/// POST /users/follow/{follow_id}
pub async fn follow(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(follow_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        warn!("Anonymous attempt to follow user {}", follow_id);
        return Ok(unauthorized(jar));
    };
    if viewer.id == follow_id {
        return Ok(unauthorized(jar));
    }

    let viewer_id = viewer.id;
    blocking(&state, move |s| {
        s.db.get_user_by_id(follow_id)?.ok_or(AppError::NotFound)?;
        Ok(s.db.follow(viewer_id, follow_id)?)
    })
    .await?;

    info!("User {} followed user {}", viewer_id, follow_id);
    Ok(redirect(&format!("/users/{}/following", viewer_id)))
}

/// POST /users/stop-following/{follow_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(follow_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        warn!("Anonymous attempt to unfollow user {}", follow_id);
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    let removed = blocking(&state, move |s| Ok(s.db.unfollow(viewer_id, follow_id)?)).await?;

    if removed {
        info!("User {} stopped following user {}", viewer_id, follow_id);
    }
    Ok(redirect(&format!("/users/{}/following", viewer_id)))
}

/// GET /users/profile — edit form prefilled with the viewer's profile.
pub async fn edit_profile_form(Extension(identity): Extension<Identity>, jar: CookieJar) -> Response {
    let Some(viewer) = identity.user() else {
        return unauthorized(jar);
    };

    let form = UserProfileForm {
        username: viewer.username.clone(),
        email: viewer.email.clone(),
        password: String::new(),
        image_url: viewer.image_url.clone(),
        header_image_url: viewer.header_image_url.clone(),
        bio: viewer.bio.clone().unwrap_or_default(),
        location: viewer.location.clone().unwrap_or_default(),
    };
    pages::render(jar, Some(viewer), pages::profile_form(&form, &FormErrors::new()))
}

enum ProfileEdit {
    Saved,
    WrongPassword,
    Taken,
}

/// POST /users/profile — the current password must be supplied.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
    form: Result<Form<UserProfileForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(unauthorized(jar));
    };

    let form = form_body(form);
    let data = match form.clean() {
        Ok(data) => data,
        Err(errors) => {
            return Ok(pages::render(jar, Some(viewer), pages::profile_form(&form, &errors)));
        }
    };

    let viewer_id = viewer.id;
    let viewer_username = viewer.username.clone();
    let outcome = blocking(&state, move |s| {
        if authenticate(&s.db, &viewer_username, &data.password)?.is_none() {
            return Ok(ProfileEdit::WrongPassword);
        }
        let update = UserUpdate {
            username: data.username,
            email: data.email,
            image_url: data.image_url,
            header_image_url: data.header_image_url,
            bio: data.bio,
            location: data.location,
        };
        match s.db.update_user(viewer_id, &update) {
            Ok(_) => Ok(ProfileEdit::Saved),
            Err(e) if e.is_integrity() => Ok(ProfileEdit::Taken),
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    match outcome {
        ProfileEdit::Saved => {
            info!("User {} updated their profile", viewer_id);
            Ok(redirect(&format!("/users/{}", viewer_id)))
        }
        ProfileEdit::WrongPassword => {
            let jar = flash::push(jar, "danger", "Wrong password, please try again.");
            Ok((jar, redirect("/")).into_response())
        }
        ProfileEdit::Taken => {
            let mut errors = FormErrors::new();
            errors.add("username", "Username or email already taken");
            Ok(pages::render(jar, Some(viewer), pages::profile_form(&form, &errors)))
        }
    }
}

/// POST /users/delete — remove the viewer's account and everything it owns.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(viewer) = identity.user() else {
        return Ok(unauthorized(jar));
    };

    let viewer_id = viewer.id;
    blocking(&state, move |s| Ok(s.db.delete_user(viewer_id)?)).await?;

    info!("User {} deleted their account", viewer_id);
    Ok((log_out(jar), redirect("/signup")).into_response())
}
