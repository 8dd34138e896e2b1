//! LeetCode GraphQL request headers
//!
//! The endpoint sits behind bot protection that is happier with a browser-shaped
//! request, so every call carries the same static set:
//! - Content-Type / Accept / Accept-Language
//! - Accept-Encoding: gzip, deflate, br (the client decodes all three)
//! - User-Agent: desktop Chrome
//! - Origin / Referer pointing at the leaderboard page
//! - Sec-Fetch-* hints
//!
//! CSRF tokens and cookies are not needed for the two public queries we issue.

use anyhow::{Context, Result};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE,
    ORIGIN, REFERER, USER_AGENT,
};
use url::Url;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";
pub const ACCEPTED_ENCODINGS: &str = "gzip, deflate, br";

/// Build the default header map for a GraphQL endpoint.
///
/// Origin and Referer are derived from the endpoint so a mock server (or a
/// regional mirror such as leetcode.cn) gets consistent values.
pub fn graphql_headers(endpoint: &str) -> Result<HeaderMap> {
    let url = Url::parse(endpoint).with_context(|| format!("invalid graphql endpoint {endpoint}"))?;
    let origin = url.origin().ascii_serialization();
    let referer = format!("{origin}/contest/globalranking/");

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPTED_ENCODINGS));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ORIGIN,
        HeaderValue::from_str(&origin).context("Failed to create Origin header")?,
    );
    headers.insert(
        REFERER,
        HeaderValue::from_str(&referer).context("Failed to create Referer header")?,
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_headers() {
        let headers = graphql_headers("https://leetcode.com/graphql").unwrap();

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "gzip, deflate, br");
        assert_eq!(headers.get(ORIGIN).unwrap(), "https://leetcode.com");
        assert_eq!(
            headers.get(REFERER).unwrap(),
            "https://leetcode.com/contest/globalranking/"
        );
        assert!(headers
            .get(USER_AGENT)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Mozilla/5.0"));
        assert!(headers.contains_key("sec-fetch-mode"));
    }

    #[test]
    fn test_origin_keeps_port() {
        let headers = graphql_headers("http://127.0.0.1:4010/graphql").unwrap();
        assert_eq!(headers.get(ORIGIN).unwrap(), "http://127.0.0.1:4010");
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(graphql_headers("not a url").is_err());
    }
}
