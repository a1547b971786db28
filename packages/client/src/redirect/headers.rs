//! Header rewriting for followed redirects

use http::header::{
    AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST,
    PROXY_AUTHORIZATION, TRANSFER_ENCODING, WWW_AUTHENTICATE,
};
use http::{HeaderMap, HeaderValue};
use url::Url;

/// Remove credentials when the redirect leaves the previous origin.
pub(crate) fn remove_sensitive_headers(headers: &mut HeaderMap, next: &Url, previous: &Url) {
    let cross_origin = next.scheme() != previous.scheme()
        || next.host_str() != previous.host_str()
        || next.port_or_known_default() != previous.port_or_known_default();
    if cross_origin {
        headers.remove(AUTHORIZATION);
        headers.remove(COOKIE);
        headers.remove("cookie2");
        headers.remove(PROXY_AUTHORIZATION);
        headers.remove(WWW_AUTHENTICATE);
    }
    headers.remove(HOST);
}

/// Headers describing a body that a 303 redirect drops.
pub(crate) fn remove_content_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
    headers.remove(CONTENT_ENCODING);
    headers.remove(TRANSFER_ENCODING);
}

/// Referer for `next`, omitted on an https to http downgrade.
pub(crate) fn make_referer(next: &Url, previous: &Url) -> Option<HeaderValue> {
    if next.scheme() == "http" && previous.scheme() == "https" {
        return None;
    }

    let mut referer = previous.clone();
    let _ = referer.set_username("");
    let _ = referer.set_password(None);
    referer.set_fragment(None);
    referer.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test url")
    }

    #[test]
    fn same_origin_keeps_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        remove_sensitive_headers(&mut headers, &url("https://a.example/x"), &url("https://a.example:443/y"));
        assert!(headers.contains_key(AUTHORIZATION));

        remove_sensitive_headers(&mut headers, &url("https://b.example/x"), &url("https://a.example/y"));
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn referer_skips_downgrade_and_userinfo() {
        assert!(make_referer(&url("http://a.example/"), &url("https://a.example/")).is_none());
        let referer = make_referer(&url("https://b.example/"), &url("https://u:p@a.example/p#f"))
            .expect("referer");
        assert_eq!(referer, "https://a.example/p");
    }
}
