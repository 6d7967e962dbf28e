//! One-shot notices carried across the post/redirect/get cycle
//!
//! After a successful submission the redirect sets `mmd_flash=<kind>.<tag>`,
//! where `tag` is a keyed SHA-256 hash of the secret key and the kind. This is
//! not an HMAC; it only stops a third party from planting a notice, and the
//! cookie carries nothing but the notice kind. The dashboard shows the notice
//! once, only if the tag verifies, and clears the cookie.

use axum::http::{header, HeaderMap};
use mmd_common::db::FactKind;
use sha2::{Digest, Sha256};

/// Cookie name
pub const FLASH_COOKIE: &str = "mmd_flash";

/// `Set-Cookie` value that removes the flash cookie
pub const CLEAR_FLASH_COOKIE: &str = "mmd_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

fn tag(secret_key: &str, kind: FactKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update([0u8]);
    hasher.update(kind.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Signed cookie value for a notice about `kind`
pub fn sign(secret_key: &str, kind: FactKind) -> String {
    format!("{}.{}", kind.as_str(), tag(secret_key, kind))
}

/// Recover the notice kind from a cookie value, if the tag matches
pub fn verify(secret_key: &str, value: &str) -> Option<FactKind> {
    let (kind, received) = value.split_once('.')?;
    let kind: FactKind = kind.parse().ok()?;

    if tags_match(&tag(secret_key, kind), received) {
        Some(kind)
    } else {
        None
    }
}

/// Compare two tags without stopping at the first differing byte
fn tags_match(expected: &str, received: &str) -> bool {
    expected.len() == received.len()
        && expected
            .bytes()
            .zip(received.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// Full `Set-Cookie` value announcing a successful insert
pub fn set_cookie(secret_key: &str, kind: FactKind) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=60",
        FLASH_COOKIE,
        sign(secret_key, kind)
    )
}

/// Raw flash cookie value from the request, if present
pub fn cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Human-readable notice text
pub fn message(kind: FactKind) -> &'static str {
    match kind {
        FactKind::Leads => "Lead data added successfully.",
        FactKind::Conversions => "Conversion data added successfully.",
    }
}
