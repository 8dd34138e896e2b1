/// Leaderboard page; the only variable is the 1-based `$page`.
pub const GLOBAL_RANKING: &str = r#"query globalRanking($page: Int) {
  globalRanking(page: $page) {
    totalUsers
    totalPages
    userPerPage
    rankingNodes {
      ranking
      currentRating
      currentGlobalRanking
      dataRegion
      user {
        username
        nameColor
        activeBadge { displayName icon __typename }
        profile {
          userSlug
          userAvatar
          countryCode
          countryName
          realName
          __typename
        }
        __typename
      }
      __typename
    }
    __typename
  }
}"#;

/// Public profile and submission counters for one user.
pub const MATCHED_USER: &str = r#"query userProfilePublicProfile($username: String!) {
  matchedUser(username: $username) {
    submitStats {
      acSubmissionNum {
        difficulty
        count
        submissions
      }
      totalSubmissionNum {
        difficulty
        count
        submissions
      }
    }
    profile {
      userSlug
      userAvatar
      countryCode
      countryName
      realName
      __typename
    }
  }
}"#;
