//! Backends for the `matches`, `teams` and `leagues` tables.

pub mod memory;
pub mod query;
pub mod rest;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use query::*;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{League, NewMatch, RawMatchRow, Team};

/// The query surface the repository relies on. Filtering, counting, ordering
/// and paging happen inside the store.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// One page of rows satisfying `query.filters`, in `query.order`.
    async fn select_matches(&self, query: &MatchQuery) -> StoreResult<Vec<RawMatchRow>>;

    /// Number of rows satisfying `filters`, ignoring paging.
    async fn count_matches(&self, filters: &MatchFilters) -> StoreResult<u64>;

    /// Append one row and return it as stored (with id and computed columns).
    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<RawMatchRow>;

    async fn teams(&self) -> StoreResult<Vec<Team>>;

    async fn leagues(&self) -> StoreResult<Vec<League>>;

    /// One-row select to check connectivity.
    async fn ping(&self) -> StoreResult<()>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}
