//! `session-token` cookie encoding and parsing.

use axum::http::{header, HeaderMap};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const SESSION_COOKIE: &str = "session-token";

/// Value written when the cookie is cleared.
const CLEARED_VALUE: &str = "deleted";

/// Characters left unescaped, matching JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn with_attributes(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let encoded = utf8_percent_encode(token, COMPONENT).to_string();
    with_attributes(&encoded, max_age_secs, secure)
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    with_attributes(CLEARED_VALUE, 0, secure)
}

/// The decoded `session-token` value from the request's `Cookie` headers.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| percent_decode_str(value).decode_utf8().ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_cookie_attributes() {
        assert_eq!(
            session_cookie("abc123", 86_400, false),
            "session-token=abc123; Path=/; Max-Age=86400; HttpOnly; SameSite=Lax"
        );
        assert_eq!(
            session_cookie("abc123", 60, true),
            "session-token=abc123; Path=/; Max-Age=60; HttpOnly; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn test_session_cookie_url_encodes() {
        assert_eq!(
            session_cookie("a b;c=d", 1, false),
            "session-token=a%20b%3Bc%3Dd; Path=/; Max-Age=1; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_clear_session_cookie() {
        assert_eq!(
            clear_session_cookie(false),
            "session-token=deleted; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"
        );
        assert!(clear_session_cookie(true).ends_with("; Secure"));
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session-token=a%20b; other=1"),
        );
        assert_eq!(session_token_from_headers(&headers), Some("a b".to_string()));
    }

    #[test]
    fn test_token_from_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("session-token=ff00"));
        assert_eq!(session_token_from_headers(&headers), Some("ff00".to_string()));
    }

    #[test]
    fn test_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session-token="));
        assert_eq!(session_token_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session-tokenx=abc"));
        assert_eq!(session_token_from_headers(&headers), None);
    }
}
