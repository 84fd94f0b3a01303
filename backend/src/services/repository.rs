use anyhow::{Context, Result};
use std::sync::Arc;

use super::normalize::normalize_match;
use crate::config::{AppConfig, StoreBackend};
use crate::error::{StoreError, StoreResult};
use crate::models::{League, Match, MatchPage, NewMatch, Team};
use crate::store::{
    InMemoryStore, MatchFilters, MatchQuery, MatchStore, PageRequest, RestStore, SortOrder, SqliteStore, MAX_PAGE_SIZE,
};

/// Read and write access to matches through an injected store.
///
/// Read paths degrade: an unconfigured or failing store yields empty results
/// and a log line. The insert path propagates every failure.
#[derive(Clone)]
pub struct MatchRepository {
    store: Option<Arc<dyn MatchStore>>,
}

impl MatchRepository {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn unconfigured() -> Self {
        Self { store: None }
    }

    /// Build the store named by the configuration. A missing REST URL or key
    /// leaves the repository unconfigured rather than failing start-up.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        match config.backend {
            StoreBackend::Rest => match &config.rest {
                Some(rest) => {
                    let store = RestStore::new(&rest.url, &rest.api_key, config.request_timeout)?;
                    tracing::info!("Using hosted match store at {}", rest.url);
                    Ok(Self::new(Arc::new(store)))
                }
                None => {
                    tracing::warn!("Match store not configured. Check MATCH_API_URL and MATCH_API_KEY");
                    Ok(Self::unconfigured())
                }
            },
            StoreBackend::Sqlite => {
                let store = SqliteStore::connect(&config.database_url).await?;
                store.init_schema().await?;
                tracing::info!("Using SQLite match store at {}", config.database_url);
                Ok(Self::new(Arc::new(store)))
            }
            StoreBackend::Memory => {
                let path = &config.data_file;
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read match data from {}", path.display()))?;
                let store = InMemoryStore::from_json(&json)?;
                tracing::info!("Using in-memory match store loaded from {}", path.display());
                Ok(Self::new(Arc::new(store)))
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> StoreResult<&Arc<dyn MatchStore>> {
        self.store.as_ref().ok_or(StoreError::NotConfigured)
    }

    /// Page of normalized matches plus the unpaged total, or the store error.
    pub async fn try_fetch_matches(&self, query: &MatchQuery) -> StoreResult<MatchPage> {
        let store = self.store()?;
        let total_count = store.count_matches(&query.filters).await?;
        let rows = store.select_matches(query).await?;

        Ok(MatchPage {
            matches: rows.iter().map(normalize_match).collect(),
            total_count,
        })
    }

    /// Like `try_fetch_matches`, but any failure becomes an empty page.
    pub async fn fetch_matches(&self, query: &MatchQuery) -> MatchPage {
        match self.try_fetch_matches(query).await {
            Ok(page) => page,
            Err(e) => {
                log_degraded("fetch matches", &e);
                MatchPage::empty()
            }
        }
    }

    /// Every match satisfying `filters`, walking pages of the maximum size.
    pub async fn try_fetch_all(&self, filters: &MatchFilters, order: SortOrder) -> StoreResult<Vec<Match>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let query = MatchQuery::new(filters.clone(), PageRequest::new(page, MAX_PAGE_SIZE), order);
            let batch = self.try_fetch_matches(&query).await?;
            let batch_len = batch.matches.len();
            all.extend(batch.matches);

            if batch_len < MAX_PAGE_SIZE as usize || all.len() as u64 >= batch.total_count {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    pub async fn fetch_all(&self, filters: &MatchFilters, order: SortOrder) -> Vec<Match> {
        self.try_fetch_all(filters, order).await.unwrap_or_else(|e| {
            log_degraded("fetch all matches", &e);
            Vec::new()
        })
    }

    /// Validate and append one match. Errors are returned, never swallowed.
    pub async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<Match> {
        new_match.validate().map_err(StoreError::Invalid)?;
        let store = self.store()?;
        let row = store.insert_match(new_match).await.map_err(|e| {
            tracing::error!("Failed to insert {} vs {}: {}", new_match.home_team, new_match.away_team, e);
            e
        })?;
        let inserted = normalize_match(&row);
        tracing::info!("Inserted match {}: {} vs {}", inserted.id, inserted.home_team, inserted.away_team);
        Ok(inserted)
    }

    pub async fn teams(&self) -> Vec<Team> {
        match self.store() {
            Ok(store) => store.teams().await.unwrap_or_else(|e| {
                log_degraded("fetch teams", &e);
                Vec::new()
            }),
            Err(e) => {
                log_degraded("fetch teams", &e);
                Vec::new()
            }
        }
    }

    pub async fn team_names(&self) -> Vec<String> {
        self.teams().await.into_iter().map(|t| t.name).collect()
    }

    pub async fn leagues(&self) -> Vec<League> {
        match self.store() {
            Ok(store) => store.leagues().await.unwrap_or_else(|e| {
                log_degraded("fetch leagues", &e);
                Vec::new()
            }),
            Err(e) => {
                log_degraded("fetch leagues", &e);
                Vec::new()
            }
        }
    }

    /// Connection test: true when a one-row select succeeds.
    pub async fn ping(&self) -> bool {
        let store = match self.store() {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Connection test failed: {}", e);
                return false;
            }
        };
        match store.ping().await {
            Ok(()) => {
                tracing::info!("Connection test against {} store succeeded", store.backend_name());
                true
            }
            Err(e) => {
                tracing::error!("Connection test against {} store failed: {}", store.backend_name(), e);
                false
            }
        }
    }
}

fn log_degraded(operation: &str, error: &StoreError) {
    if error.is_connectivity() {
        tracing::warn!("Could not {} (store unavailable), returning empty result: {}", operation, error);
    } else {
        tracing::error!("Could not {}, returning empty result: {}", operation, error);
    }
}
