use super::predictor::PredictionEngine;
use super::repository::MatchRepository;
use super::team_stats::compute_team_stats;
use crate::models::MatchQueryResponse;
use crate::store::MatchQuery;

/// Repository access plus the statistics engine, combined into one payload.
pub struct MatchBrowser {
    repository: MatchRepository,
    predictor: PredictionEngine,
}

impl MatchBrowser {
    pub fn new(repository: MatchRepository, predictor: PredictionEngine) -> Self {
        Self { repository, predictor }
    }

    pub fn repository(&self) -> &MatchRepository {
        &self.repository
    }

    /// Fetch a page of matches, then add head-to-head analysis and a
    /// prediction when both teams are named and the page holds a fixture
    /// between them.
    pub async fn browse(&self, query: &MatchQuery) -> MatchQueryResponse {
        let page = self.repository.fetch_matches(query).await;
        let teams = self.repository.team_names().await;

        tracing::debug!(
            "Fetched {} of {} matches (page {}, size {})",
            page.matches.len(),
            page.total_count,
            query.page.page(),
            query.page.page_size()
        );

        let (team_analysis, prediction) = match query.filters.team_pair() {
            Some((home, away)) => match compute_team_stats(&home, &away, &page.matches) {
                Some(stats) => {
                    let prediction = self.predictor.generate_prediction(&home, &away, &stats);
                    (Some(stats), Some(prediction))
                }
                None => {
                    tracing::info!("No head-to-head statistics available for {} vs {}", home, away);
                    (None, None)
                }
            },
            None => (None, None),
        };

        MatchQueryResponse {
            matches: page.matches,
            total_count: page.total_count,
            page: query.page.page(),
            page_size: query.page.page_size(),
            team_analysis,
            prediction,
            teams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchOutcome, Team};
    use crate::services::repository::test_support::FailingStore;
    use crate::store::memory::fixtures::season;
    use crate::store::{InMemoryStore, MatchFilters, PageRequest, SortOrder};
    use std::sync::Arc;

    fn browser() -> MatchBrowser {
        let teams = ["Debrecen", "Ferencváros", "Paks", "Újpest"]
            .iter()
            .enumerate()
            .map(|(i, name)| Team {
                id: (i + 1).to_string(),
                name: name.to_string(),
                created_at: None,
            })
            .collect();
        let store = InMemoryStore::with_lookups(season(), teams, Vec::new());
        MatchBrowser::new(MatchRepository::new(Arc::new(store)), PredictionEngine::with_seed(3))
    }

    fn query(filters: MatchFilters) -> MatchQuery {
        MatchQuery::new(filters, PageRequest::new(1, 20), SortOrder::default())
    }

    #[tokio::test]
    async fn test_browse_without_teams_has_no_analysis() {
        let response = browser().browse(&query(MatchFilters::default())).await;
        assert_eq!(response.matches.len(), 9);
        assert_eq!(response.total_count, 9);
        assert_eq!(response.page, 1);
        assert_eq!(response.page_size, 20);
        assert!(response.team_analysis.is_none());
        assert!(response.prediction.is_none());
        assert_eq!(response.teams, vec!["Debrecen", "Ferencváros", "Paks", "Újpest"]);
    }

    #[tokio::test]
    async fn test_browse_with_single_team_has_no_analysis() {
        let filters = MatchFilters {
            home_team: Some("Ferencváros".to_string()),
            ..Default::default()
        };
        let response = browser().browse(&query(filters)).await;
        assert!(!response.matches.is_empty());
        assert!(response.matches.iter().all(|m| m.home_team == "Ferencváros"));
        assert!(response.team_analysis.is_none());
    }

    #[tokio::test]
    async fn test_browse_with_team_pair_adds_analysis_and_prediction() {
        let filters = MatchFilters {
            home_team: Some("Ferencváros".to_string()),
            away_team: Some("Újpest".to_string()),
            ..Default::default()
        };
        let response = browser().browse(&query(filters)).await;

        let analysis = response.team_analysis.expect("analysis");
        assert_eq!(analysis.home_team, "Ferencváros");
        assert_eq!(analysis.away_team, "Újpest");
        assert_eq!(analysis.matches_count as usize, response.matches.len());

        let prediction = response.prediction.expect("prediction");
        assert_eq!(prediction.home_team, "Ferencváros");
        assert_eq!(prediction.model_predictions.random_forest, prediction.predicted_winner);
        assert!(matches!(
            prediction.predicted_winner,
            MatchOutcome::HomeWin | MatchOutcome::AwayWin | MatchOutcome::Draw
        ));
    }

    #[tokio::test]
    async fn test_browse_pair_without_fixture_has_no_analysis() {
        let filters = MatchFilters {
            home_team: Some("Ferencváros".to_string()),
            away_team: Some("Barcelona".to_string()),
            ..Default::default()
        };
        let response = browser().browse(&query(filters)).await;
        assert!(response.matches.is_empty());
        assert_eq!(response.total_count, 0);
        assert!(response.team_analysis.is_none());
        assert!(response.prediction.is_none());
    }

    #[tokio::test]
    async fn test_browse_degrades_when_store_fails() {
        let browser = MatchBrowser::new(MatchRepository::new(Arc::new(FailingStore)), PredictionEngine::with_seed(1));
        let filters = MatchFilters {
            home_team: Some("A".to_string()),
            away_team: Some("B".to_string()),
            ..Default::default()
        };
        let response = browser.browse(&query(filters)).await;
        assert!(response.matches.is_empty());
        assert_eq!(response.total_count, 0);
        assert!(response.teams.is_empty());
        assert!(response.team_analysis.is_none());
    }
}
