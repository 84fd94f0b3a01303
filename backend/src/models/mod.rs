use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl MatchStatus {
    /// Map a store status string onto the three canonical states.
    /// Unknown or missing values count as finished.
    pub fn from_store(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return MatchStatus::Finished;
        };
        match raw.trim().to_lowercase().as_str() {
            "scheduled" | "timed" | "not_started" | "ns" | "postponed" => MatchStatus::Scheduled,
            "live" | "in_play" | "paused" | "1h" | "2h" | "ht" => MatchStatus::Live,
            _ => MatchStatus::Finished,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl MatchOutcome {
    pub fn from_score(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
            std::cmp::Ordering::Less => MatchOutcome::AwayWin,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Accepts the wire value plus the short codes some feeds use ("H", "1", "X" ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "home_win" | "home" | "h" | "1" => Some(MatchOutcome::HomeWin),
            "away_win" | "away" | "a" | "2" => Some(MatchOutcome::AwayWin),
            "draw" | "d" | "x" => Some(MatchOutcome::Draw),
            _ => None,
        }
    }

    /// Value stored in the `result_computed` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::HomeWin => "home_win",
            MatchOutcome::AwayWin => "away_win",
            MatchOutcome::Draw => "draw",
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchOutcome::parse(s).ok_or_else(|| format!("unknown result '{}', use home_win, away_win or draw", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Canonical match shape handed to the statistics engine and to callers.
/// Every numeric field is populated; see `services::normalize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    /// `None` until both half-time goals are known.
    pub half_time: Option<Score>,
    pub full_time: Score,
    pub status: MatchStatus,
    pub btts: bool,
    pub comeback: bool,
    pub result: MatchOutcome,
    pub league: Option<String>,
    pub country: Option<String>,
    pub season: Option<String>,
}

impl Match {
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Goals for and against from `team`'s point of view. `None` if the team did not play.
    pub fn goals_for(&self, team: &str) -> Option<(u32, u32)> {
        if self.home_team == team {
            Some((self.full_time.home, self.full_time.away))
        } else if self.away_team == team {
            Some((self.full_time.away, self.full_time.home))
        } else {
            None
        }
    }
}

/// A `matches` row exactly as the store returns it. Any column may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMatchRow {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub match_time: Option<String>,
    #[serde(default)]
    pub half_time_home_goals: Option<i64>,
    #[serde(default)]
    pub half_time_away_goals: Option<i64>,
    #[serde(default)]
    pub full_time_home_goals: Option<i64>,
    #[serde(default)]
    pub full_time_away_goals: Option<i64>,
    #[serde(default)]
    pub match_status: Option<String>,
    #[serde(default)]
    pub btts_computed: Option<bool>,
    #[serde(default)]
    pub comeback_computed: Option<bool>,
    #[serde(default)]
    pub result_computed: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
}

/// Minimal payload for appending a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMatch {
    pub home_team: String,
    pub away_team: String,
    pub match_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_time_home_goals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_time_away_goals: Option<u32>,
    pub full_time_home_goals: u32,
    pub full_time_away_goals: u32,
}

impl NewMatch {
    pub fn validate(&self) -> Result<(), String> {
        if !crate::utils::validate_team_name(&self.home_team) {
            return Err(format!("invalid home team name '{}'", self.home_team));
        }
        if !crate::utils::validate_team_name(&self.away_team) {
            return Err(format!("invalid away team name '{}'", self.away_team));
        }
        if self.home_team.trim() == self.away_team.trim() {
            return Err("home and away team must differ".to_string());
        }
        match (self.half_time_home_goals, self.half_time_away_goals) {
            (Some(ht_home), Some(ht_away)) => {
                if ht_home > self.full_time_home_goals || ht_away > self.full_time_away_goals {
                    return Err(format!(
                        "half-time score {}-{} exceeds full-time score {}-{}",
                        ht_home, ht_away, self.full_time_home_goals, self.full_time_away_goals
                    ));
                }
            }
            (None, None) => {}
            _ => return Err("half-time score needs both home and away goals".to_string()),
        }
        Ok(())
    }

    /// Store-side derivations for backends that do not compute the `_computed`
    /// columns themselves.
    pub fn to_row(&self, id: String) -> RawMatchRow {
        let (fh, fa) = (self.full_time_home_goals, self.full_time_away_goals);
        RawMatchRow {
            id: Some(id),
            home_team: Some(self.home_team.clone()),
            away_team: Some(self.away_team.clone()),
            match_time: Some(self.match_time.to_rfc3339()),
            half_time_home_goals: self.half_time_home_goals.map(i64::from),
            half_time_away_goals: self.half_time_away_goals.map(i64::from),
            full_time_home_goals: Some(i64::from(fh)),
            full_time_away_goals: Some(i64::from(fa)),
            match_status: Some(MatchStatus::Finished.as_str().to_string()),
            btts_computed: Some(fh > 0 && fa > 0),
            comeback_computed: Some(is_comeback(
                self.half_time_home_goals.zip(self.half_time_away_goals),
                (fh, fa),
            )),
            result_computed: Some(MatchOutcome::from_score(fh, fa).as_str().to_string()),
            league: None,
            country: None,
            season: None,
        }
    }
}

/// A side trailing at half-time that avoided defeat at full-time.
pub fn is_comeback(half_time: Option<(u32, u32)>, full_time: (u32, u32)) -> bool {
    match half_time {
        Some((hh, ha)) => (hh < ha && full_time.0 >= full_time.1) || (ha < hh && full_time.1 >= full_time.0),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "required_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    #[serde(deserialize_with = "required_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageGoals {
    pub average_total_goals: f64,
    pub average_home_goals: f64,
    pub average_away_goals: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadStats {
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    pub home_win_percentage: u32,
    pub away_win_percentage: u32,
    pub draw_percentage: u32,
}

/// Head-to-head and form aggregate for an ordered (home, away) team pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub home_team: String,
    pub away_team: String,
    pub matches_count: u32,
    pub both_teams_scored_percentage: u32,
    pub average_goals: AverageGoals,
    pub home_form_index: u32,
    pub away_form_index: u32,
    pub head_to_head_stats: HeadToHeadStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoissonGoals {
    pub home_goals: u32,
    pub away_goals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloProbabilities {
    pub home_win_prob: f64,
    pub draw_prob: f64,
    pub away_win_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPredictions {
    pub random_forest: MatchOutcome,
    pub poisson: PoissonGoals,
    pub elo: EloProbabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub home_expected_goals: f64,
    pub away_expected_goals: f64,
    pub both_teams_to_score_prob: u32,
    pub predicted_winner: MatchOutcome,
    pub confidence: f64,
    pub model_predictions: ModelPredictions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPage {
    pub matches: Vec<Match>,
    pub total_count: u64,
}

impl MatchPage {
    pub fn empty() -> Self {
        Self {
            matches: Vec::new(),
            total_count: 0,
        }
    }
}

/// Everything the match browser returns for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQueryResponse {
    pub matches: Vec<Match>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_analysis: Option<TeamAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    pub teams: Vec<String>,
}

/// Calendar-date bounds as accepted from callers.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

/// Exclusive upper bound for an inclusive end date: midnight of the next day.
pub fn next_day_start(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing id"))
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn raw_row_accepts_numeric_and_string_ids() {
        let numeric: RawMatchRow = serde_json::from_str(r#"{"id": 42, "home_team": "Ferencváros"}"#).unwrap();
        assert_eq!(numeric.id.as_deref(), Some("42"));

        let text: RawMatchRow = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(text.id.as_deref(), Some("abc"));

        let missing: RawMatchRow = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.id, None);
        assert_eq!(missing.full_time_home_goals, None);
    }

    #[test]
    fn test_comeback_rule() {
        assert!(is_comeback(Some((0, 1)), (2, 1)));
        assert!(is_comeback(Some((0, 2)), (2, 2)));
        assert!(is_comeback(Some((2, 0)), (2, 3)));
        assert!(!is_comeback(Some((1, 0)), (2, 0)));
        assert!(!is_comeback(Some((0, 1)), (0, 2)));
        assert!(!is_comeback(None, (3, 3)));
    }

    #[test]
    fn test_new_match_validation() {
        let mut new_match = NewMatch {
            home_team: "Debrecen".to_string(),
            away_team: "Paks".to_string(),
            match_time: Utc.with_ymd_and_hms(2024, 3, 2, 17, 0, 0).unwrap(),
            half_time_home_goals: Some(1),
            half_time_away_goals: Some(0),
            full_time_home_goals: 2,
            full_time_away_goals: 0,
        };
        assert!(new_match.validate().is_ok());

        new_match.half_time_away_goals = Some(1);
        assert!(new_match.validate().is_err());

        new_match.half_time_away_goals = None;
        new_match.away_team = "Debrecen".to_string();
        assert!(new_match.validate().is_err());

        new_match.away_team = "  ".to_string();
        assert!(new_match.validate().is_err());
    }

    #[test]
    fn test_half_time_needs_both_sides() {
        let mut new_match = NewMatch {
            home_team: "Debrecen".to_string(),
            away_team: "Paks".to_string(),
            match_time: Utc.with_ymd_and_hms(2024, 3, 2, 17, 0, 0).unwrap(),
            half_time_home_goals: None,
            half_time_away_goals: None,
            full_time_home_goals: 2,
            full_time_away_goals: 0,
        };
        assert!(new_match.validate().is_ok());

        new_match.half_time_home_goals = Some(1);
        let err = new_match.validate().unwrap_err();
        assert!(err.contains("both"));

        new_match.half_time_home_goals = None;
        new_match.half_time_away_goals = Some(0);
        assert!(new_match.validate().is_err());
    }

    #[test]
    fn test_new_match_row_derivations() {
        let new_match = NewMatch {
            home_team: "Paks".to_string(),
            away_team: "Újpest".to_string(),
            match_time: Utc.with_ymd_and_hms(2024, 4, 1, 18, 0, 0).unwrap(),
            half_time_home_goals: Some(0),
            half_time_away_goals: Some(1),
            full_time_home_goals: 1,
            full_time_away_goals: 1,
        };
        let row = new_match.to_row("7".to_string());
        assert_eq!(row.btts_computed, Some(true));
        assert_eq!(row.comeback_computed, Some(true));
        assert_eq!(row.result_computed.as_deref(), Some("draw"));
    }

    #[test]
    fn test_outcome_parsing() {
        assert_eq!(MatchOutcome::parse("H"), Some(MatchOutcome::HomeWin));
        assert_eq!(MatchOutcome::parse("away_win"), Some(MatchOutcome::AwayWin));
        assert_eq!(MatchOutcome::parse("X"), Some(MatchOutcome::Draw));
        assert_eq!(MatchOutcome::parse("abandoned"), None);
        assert_eq!(MatchOutcome::from_score(0, 0), MatchOutcome::Draw);
    }

    #[test]
    fn test_status_fallback() {
        assert_eq!(MatchStatus::from_store(None), MatchStatus::Finished);
        assert_eq!(MatchStatus::from_store(Some("IN_PLAY")), MatchStatus::Live);
        assert_eq!(MatchStatus::from_store(Some("Scheduled")), MatchStatus::Scheduled);
        assert_eq!(MatchStatus::from_store(Some("FT")), MatchStatus::Finished);
    }

    #[test]
    fn test_day_bounds_cover_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(day_start(date), Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
        assert_eq!(next_day_start(date), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let leap = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        assert_eq!(next_day_start(leap), Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }
}
