//! Wire models for the two LeetCode GraphQL queries.
//!
//! Upstream is unversioned and loosely typed, so most scalar fields carry
//! `#[serde(default)]` and nullable profile strings are `Option<String>`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard GraphQL response envelope: `errors` may accompany an HTTP 200.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQlErrorLocation>,
    // Path segments are field names or list indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQlErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// Outbound request body.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

// ---------- globalRanking ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRankingData {
    pub global_ranking: LeaderboardPage,
}

/// One page of the global leaderboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub user_per_page: u32,
    #[serde(default)]
    pub ranking_nodes: Vec<RankingEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    #[serde(default)]
    pub ranking: String,
    #[serde(default)]
    pub current_rating: String,
    #[serde(default)]
    pub current_global_ranking: i64,
    #[serde(default)]
    pub data_region: String,
    pub user: UserLite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLite {
    #[serde(default)]
    pub username: String,
    pub name_color: Option<String>,
    pub active_badge: Option<Badge>,
    pub profile: Option<ProfileLite>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLite {
    pub user_slug: Option<String>,
    pub user_avatar: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub real_name: Option<String>,
}

// ---------- matchedUser ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUserData {
    pub matched_user: Option<MatchedUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUser {
    #[serde(default)]
    pub submit_stats: SubmitStats,
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStats {
    #[serde(default)]
    pub ac_submission_num: Vec<SubmissionCount>,
    #[serde(default)]
    pub total_submission_num: Vec<SubmissionCount>,
}

/// Per-difficulty counter; `difficulty == "All"` is the aggregate row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionCount {
    pub difficulty: String,
    #[serde(default)]
    pub count: i32,
    #[serde(default)]
    pub submissions: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub user_slug: String,
    pub user_avatar: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub real_name: Option<String>,
    #[serde(rename = "__typename")]
    pub typename: Option<String>,
}

/// A resolved `matchedUser` together with the username it was requested for.
#[derive(Debug, Clone)]
pub struct IdentityStats {
    pub username: String,
    pub user: MatchedUser,
}

impl IdentityStats {
    pub const AGGREGATE_TIER: &'static str = "All";

    /// The accepted-submission counter for the "All" tier, if upstream sent one.
    pub fn accepted_all(&self) -> Option<&SubmissionCount> {
        self.user
            .submit_stats
            .ac_submission_num
            .iter()
            .find(|s| s.difficulty == Self::AGGREGATE_TIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ranking_page_with_nulls() {
        let raw = serde_json::json!({
            "data": {
                "globalRanking": {
                    "totalUsers": 250,
                    "totalPages": 10,
                    "userPerPage": 25,
                    "rankingNodes": [{
                        "ranking": "1",
                        "currentRating": "3700.1",
                        "currentGlobalRanking": 1,
                        "dataRegion": "US",
                        "user": {
                            "username": "neal_wu",
                            "nameColor": null,
                            "activeBadge": null,
                            "profile": {
                                "userSlug": "neal_wu",
                                "userAvatar": null,
                                "countryCode": "US",
                                "countryName": "United States",
                                "realName": "Neal Wu",
                                "__typename": "UserProfileNode"
                            },
                            "__typename": "PublicUserNode"
                        },
                        "__typename": "GlobalRankingNode"
                    }],
                    "__typename": "GlobalRankingNode"
                }
            }
        });
        let env: GraphQlResponse<GlobalRankingData> = serde_json::from_value(raw).unwrap();
        assert!(env.errors.is_none());
        let page = env.data.unwrap().global_ranking;
        assert_eq!(page.total_pages, 10);
        assert_eq!(page.ranking_nodes.len(), 1);
        assert_eq!(page.ranking_nodes[0].user.username, "neal_wu");
        assert!(page.ranking_nodes[0].user.active_badge.is_none());
    }

    #[test]
    fn finds_all_tier() {
        let stats = IdentityStats {
            username: "a".into(),
            user: MatchedUser {
                submit_stats: SubmitStats {
                    ac_submission_num: vec![
                        SubmissionCount {
                            difficulty: "Easy".into(),
                            count: 3,
                            submissions: 4,
                        },
                        SubmissionCount {
                            difficulty: "All".into(),
                            count: 10,
                            submissions: 12,
                        },
                    ],
                    total_submission_num: vec![],
                },
                profile: Profile::default(),
            },
        };
        assert_eq!(stats.accepted_all().map(|s| s.count), Some(10));
    }

    #[test]
    fn missing_matched_user_decodes_as_none() {
        let env: GraphQlResponse<MatchedUserData> =
            serde_json::from_str(r#"{"data":{"matchedUser":null}}"#).unwrap();
        assert!(env.data.unwrap().matched_user.is_none());
    }
}
