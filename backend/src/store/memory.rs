use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use std::collections::BTreeSet;

use super::{MatchFilters, MatchQuery, MatchStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{League, NewMatch, RawMatchRow, Team};

/// Store backed by a `Vec` of rows, loaded from a JSON dump or built in tests.
/// Evaluates the same predicates the remote backends receive.
pub struct InMemoryStore {
    rows: RwLock<Vec<RawMatchRow>>,
    teams: RwLock<Vec<Team>>,
    leagues: Vec<League>,
}

impl InMemoryStore {
    pub fn new(rows: Vec<RawMatchRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
            teams: RwLock::new(Vec::new()),
            leagues: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_lookups(rows: Vec<RawMatchRow>, teams: Vec<Team>, leagues: Vec<League>) -> Self {
        Self {
            rows: RwLock::new(rows),
            teams: RwLock::new(teams),
            leagues,
        }
    }

    /// Rows in a JSON array, as exported from the hosted service. Teams and
    /// leagues are the distinct names found in the rows.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let rows: Vec<RawMatchRow> =
            serde_json::from_str(json).map_err(|e| StoreError::Decode(e.to_string()))?;

        let team_names: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| [r.home_team.as_deref(), r.away_team.as_deref()])
            .flatten()
            .filter(|name| !name.trim().is_empty())
            .collect();
        let teams = team_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Team {
                id: (i + 1).to_string(),
                name: name.to_string(),
                created_at: None,
            })
            .collect();

        let league_names: BTreeSet<&str> = rows
            .iter()
            .filter_map(|r| r.league.as_deref())
            .filter(|name| !name.trim().is_empty())
            .collect();
        let leagues = league_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| League {
                id: (i + 1).to_string(),
                name: name.to_string(),
                created_at: None,
            })
            .collect();

        Ok(Self {
            rows: RwLock::new(rows),
            teams: RwLock::new(teams),
            leagues,
        })
    }

    async fn next_id(&self) -> String {
        let rows = self.rows.read().await;
        let max = rows
            .iter()
            .filter_map(|r| r.id.as_deref().and_then(|id| id.parse::<u64>().ok()))
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn select_matches(&self, query: &MatchQuery) -> StoreResult<Vec<RawMatchRow>> {
        let rows = self.rows.read().await;
        let mut selected: Vec<RawMatchRow> = rows
            .iter()
            .filter(|r| query.filters.matches_row(r))
            .cloned()
            .collect();
        selected.sort_by(|a, b| query.order.compare_rows(a, b));

        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page.limit()).unwrap_or(usize::MAX);
        Ok(selected.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_matches(&self, filters: &MatchFilters) -> StoreResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| filters.matches_row(r)).count() as u64)
    }

    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<RawMatchRow> {
        let id = self.next_id().await;
        let row = new_match.to_row(id);
        self.rows.write().await.push(row.clone());

        let mut teams = self.teams.write().await;
        for name in [&new_match.home_team, &new_match.away_team] {
            if !teams.iter().any(|t| &t.name == name) {
                let id = (teams.len() + 1).to_string();
                teams.push(Team {
                    id,
                    name: name.clone(),
                    created_at: Some(Utc::now()),
                });
            }
        }

        Ok(row)
    }

    async fn teams(&self) -> StoreResult<Vec<Team>> {
        let mut teams = self.teams.read().await.clone();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn leagues(&self) -> StoreResult<Vec<League>> {
        let mut leagues = self.leagues.clone();
        leagues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(leagues)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::RawMatchRow;

    /// A finished row with store-computed columns filled in.
    pub fn row(id: u32, home: &str, away: &str, time: &str, ht: (i64, i64), ft: (i64, i64)) -> RawMatchRow {
        let result = match ft.0.cmp(&ft.1) {
            std::cmp::Ordering::Greater => "home_win",
            std::cmp::Ordering::Less => "away_win",
            std::cmp::Ordering::Equal => "draw",
        };
        RawMatchRow {
            id: Some(id.to_string()),
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
            match_time: Some(time.to_string()),
            half_time_home_goals: Some(ht.0),
            half_time_away_goals: Some(ht.1),
            full_time_home_goals: Some(ft.0),
            full_time_away_goals: Some(ft.1),
            match_status: Some("finished".to_string()),
            btts_computed: Some(ft.0 > 0 && ft.1 > 0),
            comeback_computed: Some((ht.0 < ht.1 && ft.0 >= ft.1) || (ht.1 < ht.0 && ft.1 >= ft.0)),
            result_computed: Some(result.to_string()),
            league: Some("NB I".to_string()),
            country: Some("Hungary".to_string()),
            season: Some("2023/2024".to_string()),
        }
    }

    pub fn season() -> Vec<RawMatchRow> {
        vec![
            row(1, "Ferencváros", "Újpest", "2023-08-05T18:00:00Z", (1, 0), (2, 0)),
            row(2, "Paks", "Debrecen", "2023-08-06T18:00:00Z", (0, 1), (2, 2)),
            row(3, "Újpest", "Paks", "2023-08-12T18:00:00Z", (1, 1), (1, 3)),
            row(4, "Debrecen", "Ferencváros", "2023-08-13T18:00:00Z", (2, 0), (2, 3)),
            row(5, "Újpest", "Ferencváros", "2023-09-02T18:00:00Z", (0, 0), (0, 0)),
            row(6, "Paks", "Ferencváros", "2023-09-03T18:00:00Z", (0, 1), (2, 1)),
            row(7, "Debrecen", "Újpest", "2023-09-16T18:00:00Z", (0, 0), (2, 1)),
            row(8, "Ferencváros", "Paks", "2023-09-17T18:00:00Z", (2, 0), (2, 0)),
            row(9, "Ferencváros", "Debrecen", "2023-09-17T18:00:00Z", (1, 1), (1, 2)),
        ]
    }
}
