use axum::http::{header, HeaderMap};
use cookie::{time::Duration, Cookie, SameSite};

use crate::config;

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

/// CSRF cookie lifetime, one year
const CSRF_COOKIE_DAYS: i64 = 365;

/// First value of the named cookie across all `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for cookie in Cookie::split_parse(raw).flatten() {
            if cookie.name() == name {
                return Some(cookie.value().to_string());
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a session token. Not readable from scripts.
pub fn session_cookie(token: &str) -> String {
    let security = &config::config().security;
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(security.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(security.session_ttl()))
        .build()
        .to_string()
}

/// `Set-Cookie` value carrying a CSRF token. Scripts must read it to echo it
/// back in the `X-CSRFToken` header, so it is not HttpOnly.
pub fn csrf_cookie(token: &str) -> String {
    Cookie::build((CSRF_COOKIE, token.to_string()))
        .path("/")
        .secure(config::config().security.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(CSRF_COOKIE_DAYS))
        .build()
        .to_string()
}

/// `Set-Cookie` value that clears the session cookie
pub fn expired_session_cookie() -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; sessionid=abc; csrftoken=def"));

        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, CSRF_COOKIE).as_deref(), Some("def"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn reads_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("sessionid=xyz"));

        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("xyz"));
    }

    #[test]
    fn session_cookie_is_http_only() {
        let value = session_cookie("token");
        assert!(value.starts_with("sessionid=token"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Path=/"));
    }

    #[test]
    fn csrf_cookie_is_script_readable() {
        let value = csrf_cookie("token");
        assert!(value.starts_with("csrftoken=token"));
        assert!(!value.contains("HttpOnly"));
    }

    #[test]
    fn expired_cookie_clears_session() {
        let value = expired_session_cookie();
        assert!(value.starts_with("sessionid="));
        assert!(value.contains("Max-Age=0"));
    }
}
