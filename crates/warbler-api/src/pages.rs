//! Server-rendered HTML. Pages are plain strings assembled here; every piece
//! of user-supplied text goes through `html_escape` on the way out.

use std::collections::HashSet;

use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use warbler_db::models::{MessageRow, UserRow, UserStats};
use warbler_types::forms::{FormErrors, LoginForm, MessageForm, UserAddForm, UserProfileForm};

use crate::flash::{self, Flash};

/// 302 to `to`.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

/// Wrap `body` in the site layout, consuming any pending flash message.
pub fn render(jar: CookieJar, viewer: Option<&UserRow>, body: String) -> Response {
    let (jar, flash) = flash::take(jar);
    (jar, Html(layout(viewer, flash.as_ref(), &body))).into_response()
}

pub fn error_page(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    layout(
        None,
        None,
        &format!("<h1>{}</h1><p>{}</p><a href=\"/\">Go home</a>", status.as_u16(), reason),
    )
}

fn layout(viewer: Option<&UserRow>, flash: Option<&Flash>, body: &str) -> String {
    let nav = match viewer {
        Some(user) => format!(
            "<a href=\"/users/{}\">@{}</a> <a href=\"/messages/new\">New Message</a> <a href=\"/logout\">Log out</a>",
            user.id,
            text(&user.username)
        ),
        None => "<a href=\"/signup\">Sign up</a> <a href=\"/login\">Log in</a>".to_string(),
    };

    let flash = flash
        .map(|f| {
            format!(
                "<div class=\"alert alert-{}\">{}</div>",
                attr(&f.category),
                text(&f.message)
            )
        })
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>
<html>
<head><meta charset=\"utf-8\"><title>Warbler</title></head>
<body>
<nav>
<a href=\"/\">Warbler</a>
<form action=\"/users\" method=\"GET\"><input name=\"q\" placeholder=\"Search Warbler\"></form>
{nav}
</nav>
{flash}
<main>
{body}
</main>
</body>
</html>"
    )
}

// -- Building blocks --

fn field_errors(errors: &FormErrors, name: &str) -> String {
    errors
        .get(name)
        .iter()
        .map(|e| format!("<span class=\"text-danger\">{}</span>", text(e)))
        .collect()
}

fn input(name: &str, label: &str, kind: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        "<div class=\"form-group\">
<label for=\"{name}\">{label}</label>
<input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{value}\" placeholder=\"{label}\">
{errs}
</div>",
        value = attr(value),
        errs = field_errors(errors, name),
    )
}

fn textarea(name: &str, label: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        "<div class=\"form-group\">
<label for=\"{name}\">{label}</label>
<textarea id=\"{name}\" name=\"{name}\" placeholder=\"{label}\">{value}</textarea>
{errs}
</div>",
        value = text(value),
        errs = field_errors(errors, name),
    )
}

fn form_page(heading: &str, action: &str, fields: &str, submit: &str, errors: &FormErrors) -> String {
    format!(
        "<h2>{heading}</h2>
{form_errs}
<form method=\"POST\" action=\"{action}\">
{fields}
<button type=\"submit\">{submit}</button>
</form>",
        form_errs = field_errors(errors, "form"),
    )
}

fn follow_button(viewer: Option<&UserRow>, target: &UserRow, following: bool) -> String {
    match viewer {
        Some(v) if v.id != target.id => {
            if following {
                format!(
                    "<form method=\"POST\" action=\"/users/stop-following/{}\"><button>Unfollow</button></form>",
                    target.id
                )
            } else {
                format!(
                    "<form method=\"POST\" action=\"/users/follow/{}\"><button>Follow</button></form>",
                    target.id
                )
            }
        }
        _ => String::new(),
    }
}

fn message_item(viewer: Option<&UserRow>, msg: &MessageRow, liked: bool) -> String {
    let like = match viewer {
        Some(v) if v.id != msg.user_id => format!(
            "<form method=\"POST\" action=\"/users/add_like/{}\"><button>{}</button></form>",
            msg.id,
            if liked { "Unlike" } else { "Like" }
        ),
        _ => String::new(),
    };

    format!(
        "<li class=\"message\">
<img src=\"{img}\" alt=\"\">
<a href=\"/users/{uid}\">@{username}</a>
<a href=\"/messages/{id}\"><span class=\"timestamp\">{ts}</span></a>
<p>{body}</p>
{like}
</li>",
        img = attr(&msg.author_image_url),
        uid = msg.user_id,
        username = text(&msg.author_username),
        id = msg.id,
        ts = msg.timestamp.format("%d %B %Y"),
        body = text(&msg.text),
    )
}

fn message_list(viewer: Option<&UserRow>, messages: &[MessageRow], liked: &HashSet<i64>) -> String {
    if messages.is_empty() {
        return "<p>No messages yet.</p>".to_string();
    }
    let items: String = messages
        .iter()
        .map(|m| message_item(viewer, m, liked.contains(&m.id)))
        .collect();
    format!("<ul class=\"messages\">{items}</ul>")
}

fn user_card(viewer: Option<&UserRow>, user: &UserRow, following: bool) -> String {
    format!(
        "<div class=\"card user-card\">
<img src=\"{img}\" alt=\"\">
<a href=\"/users/{id}\">@{username}</a>
{follow}
<p>{bio}</p>
</div>",
        img = attr(&user.image_url),
        id = user.id,
        username = text(&user.username),
        follow = follow_button(viewer, user, following),
        bio = text(user.bio.as_deref().unwrap_or("")),
    )
}

/// Profile banner shared by the profile, following, followers and likes pages.
pub struct ProfileHeader<'a> {
    pub user: &'a UserRow,
    pub stats: UserStats,
    pub viewer_follows: bool,
}

fn profile_header(viewer: Option<&UserRow>, header: &ProfileHeader<'_>) -> String {
    let user = header.user;
    let mut out = format!(
        "<div class=\"profile-header\" style=\"background-image: url('{hero}')\">
<img src=\"{img}\" alt=\"\">
<h4>@{username}</h4>
<ul class=\"user-stats\">
<li><a href=\"/users/{id}\">Messages <b>{messages}</b></a></li>
<li><a href=\"/users/{id}/following\">Following <b>{following}</b></a></li>
<li><a href=\"/users/{id}/followers\">Followers <b>{followers}</b></a></li>
<li><a href=\"/users/{id}/likes\">Likes <b>{likes}</b></a></li>
</ul>
",
        hero = attr(&user.header_image_url),
        img = attr(&user.image_url),
        username = text(&user.username),
        id = user.id,
        messages = header.stats.messages,
        following = header.stats.following,
        followers = header.stats.followers,
        likes = header.stats.likes,
    );

    if let Some(bio) = &user.bio {
        out.push_str(&format!("<p class=\"bio\">{}</p>\n", text(bio)));
    }
    if let Some(location) = &user.location {
        out.push_str(&format!("<p class=\"location\">{}</p>\n", text(location)));
    }

    match viewer {
        Some(v) if v.id == user.id => out.push_str(
            "<a href=\"/users/profile\">Edit Profile</a>
<form method=\"POST\" action=\"/users/delete\"><button>Delete Profile</button></form>",
        ),
        _ => out.push_str(&follow_button(viewer, user, header.viewer_follows)),
    }

    out.push_str("</div>");
    out
}

// -- Pages --

pub fn home_anon() -> String {
    "<div class=\"home-hero\">
<h1>What's Happening?</h1>
<h4>New to Warbler?</h4>
<a href=\"/signup\">Sign up now</a>
</div>"
        .to_string()
}

pub fn home(viewer: &UserRow, stats: UserStats, messages: &[MessageRow], liked: &HashSet<i64>) -> String {
    format!(
        "<aside class=\"user-aside\">
<img src=\"{img}\" alt=\"\">
<a href=\"/users/{id}\">@{username}</a>
<ul class=\"user-stats\">
<li>Messages <b>{m}</b></li>
<li>Following <b>{fg}</b></li>
<li>Followers <b>{fr}</b></li>
</ul>
</aside>
{list}",
        img = attr(&viewer.image_url),
        id = viewer.id,
        username = text(&viewer.username),
        m = stats.messages,
        fg = stats.following,
        fr = stats.followers,
        list = message_list(Some(viewer), messages, liked),
    )
}

pub fn users_index(viewer: Option<&UserRow>, users: &[UserRow], following: &HashSet<i64>) -> String {
    if users.is_empty() {
        return "<h3>Sorry, no users found</h3>".to_string();
    }
    users
        .iter()
        .map(|u| user_card(viewer, u, following.contains(&u.id)))
        .collect()
}

pub fn user_profile(
    viewer: Option<&UserRow>,
    header: &ProfileHeader<'_>,
    messages: &[MessageRow],
    liked: &HashSet<i64>,
) -> String {
    format!(
        "{}\n{}",
        profile_header(viewer, header),
        message_list(viewer, messages, liked)
    )
}

/// The following or followers page: `title` heads a grid of user cards.
pub fn follow_list(
    viewer: Option<&UserRow>,
    header: &ProfileHeader<'_>,
    title: &str,
    users: &[UserRow],
    viewer_following: &HashSet<i64>,
) -> String {
    let cards: String = users
        .iter()
        .map(|u| user_card(viewer, u, viewer_following.contains(&u.id)))
        .collect();
    format!(
        "{}\n<h2>{}</h2>\n<div class=\"user-grid\">{}</div>",
        profile_header(viewer, header),
        title,
        cards
    )
}

pub fn liked_messages(
    viewer: Option<&UserRow>,
    header: &ProfileHeader<'_>,
    messages: &[MessageRow],
    liked: &HashSet<i64>,
) -> String {
    format!(
        "{}\n<h2>Liked Messages</h2>\n{}",
        profile_header(viewer, header),
        message_list(viewer, messages, liked)
    )
}

pub fn message_detail(viewer: Option<&UserRow>, msg: &MessageRow, liked: bool) -> String {
    let delete = match viewer {
        Some(v) if v.id == msg.user_id => format!(
            "<form method=\"POST\" action=\"/messages/{}/delete\"><button>Delete</button></form>",
            msg.id
        ),
        _ => String::new(),
    };
    format!(
        "<div class=\"message-detail\">{}{}</div>",
        message_item(viewer, msg, liked),
        delete
    )
}

// -- Forms --

pub fn message_form(form: &MessageForm, errors: &FormErrors) -> String {
    form_page(
        "New Message",
        "/messages/new",
        &textarea("text", "What's happening?", &form.text, errors),
        "Add my message!",
        errors,
    )
}

pub fn signup_form(form: &UserAddForm, errors: &FormErrors) -> String {
    let fields = [
        input("username", "Username", "text", &form.username, errors),
        input("email", "E-mail", "email", &form.email, errors),
        input("password", "Password", "password", "", errors),
        input("image_url", "(Optional) Image URL", "text", &form.image_url, errors),
    ]
    .concat();
    form_page("Join Warbler today.", "/signup", &fields, "Sign me up!", errors)
}

pub fn login_form(form: &LoginForm, errors: &FormErrors) -> String {
    let fields = [
        input("username", "Username", "text", &form.username, errors),
        input("password", "Password", "password", "", errors),
    ]
    .concat();
    form_page("Welcome back.", "/login", &fields, "Log in", errors)
}

pub fn profile_form(form: &UserProfileForm, errors: &FormErrors) -> String {
    let fields = [
        input("username", "Username", "text", &form.username, errors),
        input("email", "E-mail", "email", &form.email, errors),
        input("image_url", "(Optional) Image URL", "text", &form.image_url, errors),
        input("header_image_url", "Header Image URL", "text", &form.header_image_url, errors),
        textarea("bio", "Bio", &form.bio, errors),
        input("location", "Location", "text", &form.location, errors),
        input("password", "Current Password", "password", "", errors),
    ]
    .concat();
    form_page("Edit Your Profile.", "/users/profile", &fields, "Edit this user!", errors)
}
