//! One-shot status messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;

pub const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

impl Flash {
    fn encode(&self) -> String {
        B64.encode(format!("{}\n{}", self.category, self.message))
    }

    fn decode(value: &str) -> Option<Self> {
        let bytes = B64.decode(value).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        let (category, message) = text.split_once('\n')?;
        Some(Self {
            category: category.to_string(),
            message: message.to_string(),
        })
    }
}

/// Queue a message for the next rendered page. A later push replaces it.
pub fn push(jar: CookieJar, category: &str, message: impl Into<String>) -> CookieJar {
    let flash = Flash {
        category: category.to_string(),
        message: message.into(),
    };
    jar.add(
        Cookie::build((FLASH_KEY, flash.encode()))
            .path("/")
            .http_only(true),
    )
}

/// Remove and return the pending message, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(value) = jar.get(FLASH_KEY).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build(FLASH_KEY).path("/"));
    (jar, Flash::decode(&value))
}
