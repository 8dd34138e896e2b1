use std::collections::BTreeSet;

use crate::database_ops::leetcode::types::LeaderboardPage;

/// Usernames on one page: trimmed, blanks dropped, de-duplicated by exact
/// equality, and returned in lexicographic order so per-page processing is
/// reproducible regardless of upstream ordering.
pub fn extract_usernames(page: &LeaderboardPage) -> Vec<String> {
    page.ranking_nodes
        .iter()
        .map(|node| node.user.username.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::leetcode::types::{RankingEntry, UserLite};

    fn page(usernames: &[&str]) -> LeaderboardPage {
        LeaderboardPage {
            total_users: usernames.len() as u64,
            total_pages: 1,
            user_per_page: 25,
            ranking_nodes: usernames
                .iter()
                .map(|u| RankingEntry {
                    user: UserLite {
                        username: u.to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(extract_usernames(&page(&[])).is_empty());
    }

    #[test]
    fn duplicates_collapse_and_output_is_sorted() {
        assert_eq!(
            extract_usernames(&page(&["bob", "alice", "alice"])),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn whitespace_only_names_are_dropped_anywhere() {
        let got = extract_usernames(&page(&["   ", "zed", "\t\n", "amy", " "]));
        assert_eq!(got, vec!["amy".to_string(), "zed".to_string()]);
    }

    #[test]
    fn names_are_trimmed_before_dedup() {
        let got = extract_usernames(&page(&[" carol", "carol ", "Carol"]));
        assert_eq!(got, vec!["Carol".to_string(), "carol".to_string()]);
    }
}
