use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::headers::graphql_headers;
use super::queries::{GLOBAL_RANKING, MATCHED_USER};
use super::types::{
    GlobalRankingData, GraphQlRequest, GraphQlResponse, IdentityStats, LeaderboardPage,
    MatchedUserData,
};
use crate::error::SyncError;
use crate::leaderboard::LeaderboardApi;
use crate::util::env::{env_flag, env_opt, env_parse};

pub const DEFAULT_ENDPOINT: &str = "https://leetcode.com/graphql";

#[derive(Clone, Debug)]
pub struct LeetCodeConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// Log (truncated) response bodies at debug level.
    pub debug: bool,
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            debug: false,
        }
    }
}

impl LeetCodeConfig {
    /// LEETCODE_GRAPHQL_URL, LEETCODE_TIMEOUT_SECS, LEETCODE_DEBUG.
    pub fn from_env() -> Self {
        Self {
            endpoint: env_opt("LEETCODE_GRAPHQL_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            timeout: Duration::from_secs(env_parse("LEETCODE_TIMEOUT_SECS", 30u64)),
            debug: env_flag("LEETCODE_DEBUG", false),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// GraphQL client for the public leaderboard and per-user profile queries.
///
/// Cheap to clone; all clones share one connection pool. No retries happen here,
/// callers decide what to do with transport errors.
#[derive(Clone)]
pub struct LeetCodeClient {
    http: Client,
    endpoint: Arc<str>,
    debug: bool,
}

impl LeetCodeClient {
    pub fn new(cfg: LeetCodeConfig) -> anyhow::Result<Self> {
        let headers = graphql_headers(&cfg.endpoint)?;
        let http = Client::builder()
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .timeout(cfg.timeout)
            .pool_idle_timeout(Duration::from_secs(50))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("failed to build LeetCode http client")?;
        Ok(Self {
            http,
            endpoint: Arc::from(cfg.endpoint.as_str()),
            debug: cfg.debug,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(LeetCodeConfig::from_env())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one leaderboard page (1-based).
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, page: u32) -> Result<LeaderboardPage, SyncError> {
        let data: GlobalRankingData = self.graphql(GLOBAL_RANKING, json!({ "page": page })).await?;
        Ok(data.global_ranking)
    }

    /// Fetch the public profile of one user; `matchedUser: null` becomes
    /// `SyncError::IdentityNotAvailable`.
    #[instrument(skip(self))]
    pub async fn fetch_identity(&self, username: &str) -> Result<IdentityStats, SyncError> {
        let data: MatchedUserData = self
            .graphql(MATCHED_USER, json!({ "username": username }))
            .await?;
        match data.matched_user {
            Some(user) => Ok(IdentityStats {
                username: username.to_string(),
                user,
            }),
            None => Err(SyncError::IdentityNotAvailable(username.to_string())),
        }
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, SyncError> {
        let body = GraphQlRequest { query, variables };
        let resp = self.http.post(&*self.endpoint).json(&body).send().await?;
        let status = resp.status();
        // Content-Encoding (gzip/br/deflate) is undone by reqwest while reading;
        // a body that fails to decompress is a bad payload, not a network fault.
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.is_decode() => {
                return Err(SyncError::Decode(<serde_json::Error as serde::de::Error>::custom(
                    format!("undecodable response body: {e}"),
                )))
            }
            Err(e) => return Err(SyncError::Net(e)),
        };

        if self.debug {
            debug!(
                status = status.as_u16(),
                body = %truncate(&String::from_utf8_lossy(&bytes), 800),
                "graphql response"
            );
        }

        if !status.is_success() {
            return Err(SyncError::Http {
                status: status.as_u16(),
                body: truncate(&String::from_utf8_lossy(&bytes), 400),
            });
        }

        let envelope: GraphQlResponse<T> = serde_json::from_slice(&bytes)?;
        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            return Err(SyncError::Upstream(errors));
        }
        envelope.data.ok_or_else(|| {
            SyncError::Decode(<serde_json::Error as serde::de::Error>::custom(
                "graphql response carried no data",
            ))
        })
    }
}

#[async_trait]
impl LeaderboardApi for LeetCodeClient {
    async fn fetch_page(&self, page: u32) -> Result<LeaderboardPage, SyncError> {
        LeetCodeClient::fetch_page(self, page).await
    }

    async fn fetch_identity(&self, username: &str) -> Result<IdentityStats, SyncError> {
        LeetCodeClient::fetch_identity(self, username).await
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use mockito::Matcher;
    use std::io::Write;

    fn client_for(server: &mockito::ServerGuard) -> LeetCodeClient {
        let cfg = LeetCodeConfig::default().with_endpoint(format!("{}/graphql", server.url()));
        LeetCodeClient::new(cfg).unwrap()
    }

    fn page_body(usernames: &[&str], total_pages: u32) -> String {
        let nodes: Vec<Value> = usernames
            .iter()
            .enumerate()
            .map(|(i, u)| {
                json!({
                    "ranking": (i + 1).to_string(),
                    "currentRating": "2500.0",
                    "currentGlobalRanking": i + 1,
                    "dataRegion": "US",
                    "user": { "username": u, "nameColor": null, "activeBadge": null, "profile": null }
                })
            })
            .collect();
        json!({
            "data": { "globalRanking": {
                "totalUsers": 25 * total_pages,
                "totalPages": total_pages,
                "userPerPage": 25,
                "rankingNodes": nodes
            }}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fetch_page_sends_page_variable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .match_header("accept-encoding", "gzip, deflate, br")
            .match_body(Matcher::PartialJson(json!({ "variables": { "page": 3 } })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_body(&["alice", "bob"], 7))
            .create_async()
            .await;

        let page = client_for(&server).fetch_page(3).await.unwrap();
        assert_eq!(page.total_pages, 7);
        assert_eq!(page.ranking_nodes.len(), 2);
        assert_eq!(page.ranking_nodes[1].user.username, "bob");
    }

    #[tokio::test]
    async fn test_gzip_payload_is_decoded() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(page_body(&["carol"], 1).as_bytes()).unwrap();
        let compressed = enc.finish().unwrap();

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("content-encoding", "gzip")
            .with_body(compressed)
            .create_async()
            .await;

        let page = client_for(&server).fetch_page(1).await.unwrap();
        assert_eq!(page.ranking_nodes[0].user.username, "carol");
    }

    #[tokio::test]
    async fn test_brotli_payload_is_decoded() {
        let mut enc = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
        enc.write_all(page_body(&["dmitri"], 1).as_bytes()).unwrap();
        let compressed = enc.into_inner();

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("content-encoding", "br")
            .with_body(compressed)
            .create_async()
            .await;

        let page = client_for(&server).fetch_page(1).await.unwrap();
        assert_eq!(page.ranking_nodes[0].user.username, "dmitri");
    }

    #[tokio::test]
    async fn test_deflate_payload_is_decoded() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(page_body(&["eve"], 1).as_bytes()).unwrap();
        let compressed = enc.finish().unwrap();

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("content-encoding", "deflate")
            .with_body(compressed)
            .create_async()
            .await;

        let page = client_for(&server).fetch_page(1).await.unwrap();
        assert_eq!(page.ranking_nodes[0].user.username, "eve");
    }

    #[tokio::test]
    async fn test_corrupt_gzip_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("content-encoding", "gzip")
            .with_body(b"not gzip at all {}".to_vec())
            .create_async()
            .await;

        let err = client_for(&server).fetch_page(1).await.unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)), "{err:?}");
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_graphql_errors_under_200_are_upstream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(r#"{"data":null,"errors":[{"message":"too many requests","path":["globalRanking"]}]}"#)
            .create_async()
            .await;

        let err = client_for(&server).fetch_page(1).await.unwrap_err();
        match err {
            SyncError::Upstream(errors) => assert_eq!(errors[0].message, "too many requests"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_2xx_is_transport() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(503)
            .with_body("upstream busy")
            .create_async()
            .await;

        let err = client_for(&server).fetch_page(1).await.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, SyncError::Http { status: 503, ref body } if body == "upstream busy"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body("<html>challenge</html>")
            .create_async()
            .await;

        let err = client_for(&server).fetch_page(1).await.unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_available() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(
                json!({ "variables": { "username": "ghost" } }),
            ))
            .with_status(200)
            .with_body(r#"{"data":{"matchedUser":null}}"#)
            .create_async()
            .await;

        let err = client_for(&server).fetch_identity("ghost").await.unwrap_err();
        assert!(err.is_skip());
        assert!(matches!(err, SyncError::IdentityNotAvailable(ref u) if u == "ghost"));
    }

    #[tokio::test]
    async fn test_fetch_identity_decodes_profile() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "data": { "matchedUser": {
                "submitStats": {
                    "acSubmissionNum": [
                        { "difficulty": "All", "count": 812, "submissions": 1490 },
                        { "difficulty": "Easy", "count": 300, "submissions": 500 }
                    ],
                    "totalSubmissionNum": [
                        { "difficulty": "All", "count": 900, "submissions": 2400 }
                    ]
                },
                "profile": {
                    "userSlug": "alice",
                    "userAvatar": "https://assets.leetcode.com/a.png",
                    "countryCode": "SG",
                    "countryName": "Singapore",
                    "realName": "Alice",
                    "__typename": "UserProfileNode"
                }
            }}
        });
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let stats = client_for(&server).fetch_identity("alice").await.unwrap();
        assert_eq!(stats.username, "alice");
        assert_eq!(stats.accepted_all().unwrap().count, 812);
        assert_eq!(stats.user.profile.country_code.as_deref(), Some("SG"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 10), "héllo");
        assert_eq!(truncate("héllo", 2), "hé...");
    }
}
