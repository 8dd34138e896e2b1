use thiserror::Error;

use crate::database_ops::leetcode::types::GraphQlError;

/// Failure taxonomy shared by the GraphQL clients, the enricher and the batch sink.
///
/// Transport-class errors (`Http`, `Net`) are retryable by caller policy; nothing in
/// this crate retries. `IdentityNotAvailable` and `MissingAggregateStat` are expected
/// per-identity outcomes and are always skipped by the pipeline.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("transport: http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport: {0}")]
    Net(#[from] reqwest::Error),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("upstream graphql errors: {}", join_messages(.0))]
    Upstream(Vec<GraphQlError>),
    #[error("identity not available: {0}")]
    IdentityNotAvailable(String),
    #[error("missing aggregate 'All' stat for {0}")]
    MissingAggregateStat(String),
    #[error("persistence: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("persistence: staging encode: {0}")]
    StagingEncode(#[from] csv::Error),
}

impl SyncError {
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Http { .. } | SyncError::Net(_))
    }

    /// Expected absences the pipeline drops without treating as a failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            SyncError::IdentityNotAvailable(_) | SyncError::MissingAggregateStat(_)
        )
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, SyncError::Persistence(_) | SyncError::StagingEncode(_))
    }

    /// Unique-key violation from the store (duplicate username).
    pub fn is_conflict(&self) -> bool {
        match self {
            SyncError::Persistence(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_variants() {
        let http = SyncError::Http {
            status: 503,
            body: "busy".into(),
        };
        assert!(http.is_transport());
        assert!(!http.is_skip());

        let gone = SyncError::IdentityNotAvailable("ghost".into());
        assert!(gone.is_skip());
        assert!(!gone.is_transport());

        assert!(SyncError::MissingAggregateStat("x".into()).is_skip());
        assert!(SyncError::Persistence(sqlx::Error::PoolTimedOut).is_persistence());
    }

    #[test]
    fn upstream_message_joins_graphql_errors() {
        let err = SyncError::Upstream(vec![
            GraphQlError {
                message: "rate limited".into(),
                ..Default::default()
            },
            GraphQlError {
                message: "try later".into(),
                ..Default::default()
            },
        ]);
        assert_eq!(
            err.to_string(),
            "upstream graphql errors: rate limited; try later"
        );
    }
}
