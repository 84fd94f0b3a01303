use thiserror::Error;

/// Failures at the data-store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Match store is not configured (set MATCH_API_URL and MATCH_API_KEY, or MATCH_STORE=sqlite|memory)")]
    NotConfigured,

    #[error("Match store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Match store rejected the query ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not decode store response: {0}")]
    Decode(String),

    #[error("Invalid match: {0}")]
    Invalid(String),
}

impl StoreError {
    /// True for configuration and connectivity failures, false for errors the
    /// store reported about the query itself.
    pub fn is_connectivity(&self) -> bool {
        match self {
            StoreError::NotConfigured => true,
            StoreError::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Configuration(_)
            ),
            StoreError::Rejected { .. } | StoreError::Decode(_) | StoreError::Invalid(_) => false,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(StoreError::NotConfigured.is_connectivity());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(!StoreError::Rejected { status: 400, message: "bad filter".to_string() }.is_connectivity());
        assert!(!StoreError::Invalid("x".to_string()).is_connectivity());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::Rejected { status: 404, message: "relation \"matches\" does not exist".to_string() };
        assert_eq!(
            err.to_string(),
            "Match store rejected the query (404): relation \"matches\" does not exist"
        );
    }
}
