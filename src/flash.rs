use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

const FLASH_COOKIE: &str = "flash";

/// FlashKind
///
/// Category of a one-shot status message; picks the banner style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Info,
    Error,
}

impl FlashKind {
    fn as_str(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Info => "info",
            FlashKind::Error => "error",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(FlashKind::Success),
            "info" => Some(FlashKind::Info),
            "error" => Some(FlashKind::Error),
            _ => None,
        }
    }

    /// CSS class used by the layout template.
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashKind::Success => "flash flash-success",
            FlashKind::Info => "flash flash-info",
            FlashKind::Error => "flash flash-error",
        }
    }
}

/// Flash
///
/// A user-facing status message that survives exactly one redirect. Carried in
/// its own cookie and dropped the first time a page renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        format!("{}|{}", self.kind.as_str(), self.message)
    }

    fn decode(raw: &str) -> Option<Self> {
        let (kind, message) = raw.split_once('|')?;
        Some(Self {
            kind: FlashKind::parse(kind)?,
            message: message.to_string(),
        })
    }
}

/// Stores a flash for the next rendered page.
pub fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Removes and returns the pending flash, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = Flash::decode(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

/// Redirect-after-post: store the flash and send the browser to `to` with a 303.
pub fn redirect(jar: CookieJar, flash: Flash, to: &str) -> (CookieJar, Redirect) {
    (set(jar, flash), Redirect::to(to))
}
