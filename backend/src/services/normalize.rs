use chrono::Utc;
use uuid::Uuid;

use crate::models::{Match, MatchOutcome, MatchStatus, RawMatchRow, Score};
use crate::utils::parse_timestamp;

pub const HOME_TEAM_PLACEHOLDER: &str = "Home Team";
pub const AWAY_TEAM_PLACEHOLDER: &str = "Away Team";

/// Map a raw store row onto the canonical `Match`.
///
/// Fallbacks: missing id → generated placeholder, missing or unreadable
/// timestamp → now, missing team → placeholder label, missing full-time
/// goals → 0, missing flags → false. A half-time score with either side
/// missing stays unset. The statistics engine relies on every numeric
/// field being present afterwards.
pub fn normalize_match(raw: &RawMatchRow) -> Match {
    let id = match raw.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id.to_string(),
        None => format!("generated-{}", Uuid::new_v4()),
    };

    let kickoff = match raw.match_time.as_deref() {
        Some(ts) => parse_timestamp(ts).unwrap_or_else(|| {
            tracing::warn!("Match {} has unreadable timestamp '{}', using now", id, ts);
            Utc::now()
        }),
        None => Utc::now(),
    };

    let half_time = match (raw.half_time_home_goals, raw.half_time_away_goals) {
        (Some(home), Some(away)) => Some(Score::new(goals(Some(home)), goals(Some(away)))),
        _ => None,
    };
    let full_time = Score::new(goals(raw.full_time_home_goals), goals(raw.full_time_away_goals));

    let result = raw
        .result_computed
        .as_deref()
        .and_then(MatchOutcome::parse)
        .unwrap_or_else(|| MatchOutcome::from_score(full_time.home, full_time.away));

    Match {
        id,
        home_team: team(&raw.home_team, HOME_TEAM_PLACEHOLDER),
        away_team: team(&raw.away_team, AWAY_TEAM_PLACEHOLDER),
        kickoff,
        half_time,
        full_time,
        status: MatchStatus::from_store(raw.match_status.as_deref()),
        btts: raw.btts_computed.unwrap_or(false),
        comeback: raw.comeback_computed.unwrap_or(false),
        result,
        league: raw.league.clone(),
        country: raw.country.clone(),
        season: raw.season.clone(),
    }
}

fn goals(value: Option<i64>) -> u32 {
    value.and_then(|g| u32::try_from(g).ok()).unwrap_or(0)
}

fn team(value: &Option<String>, placeholder: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_row_normalizes_with_fallbacks() {
        let before = Utc::now();
        let m = normalize_match(&RawMatchRow::default());

        assert!(m.id.starts_with("generated-"));
        assert!(m.id.len() > "generated-".len());
        assert!(m.kickoff >= before);
        assert!(!m.kickoff.to_rfc3339().is_empty());
        assert_eq!(m.home_team, HOME_TEAM_PLACEHOLDER);
        assert_eq!(m.away_team, AWAY_TEAM_PLACEHOLDER);
        assert_eq!(m.half_time, None);
        assert_eq!(m.full_time, Score::new(0, 0));
        assert!(!m.btts);
        assert!(!m.comeback);
        assert_eq!(m.result, MatchOutcome::Draw);
        assert_eq!(m.status, MatchStatus::Finished);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = normalize_match(&RawMatchRow::default());
        let b = normalize_match(&RawMatchRow::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_full_row_is_preserved() {
        let raw = RawMatchRow {
            id: Some("311".to_string()),
            home_team: Some("MTK".to_string()),
            away_team: Some("Kisvárda".to_string()),
            match_time: Some("2024-04-13T14:00:00+00:00".to_string()),
            half_time_home_goals: Some(0),
            half_time_away_goals: Some(2),
            full_time_home_goals: Some(3),
            full_time_away_goals: Some(2),
            match_status: Some("finished".to_string()),
            btts_computed: Some(true),
            comeback_computed: Some(true),
            result_computed: Some("home_win".to_string()),
            league: Some("NB I".to_string()),
            country: Some("Hungary".to_string()),
            season: Some("2023/2024".to_string()),
        };
        let m = normalize_match(&raw);

        assert_eq!(m.id, "311");
        assert_eq!(m.kickoff, Utc.with_ymd_and_hms(2024, 4, 13, 14, 0, 0).unwrap());
        assert_eq!(m.half_time, Some(Score::new(0, 2)));
        assert_eq!(m.full_time, Score::new(3, 2));
        assert!(m.btts && m.comeback);
        assert_eq!(m.result, MatchOutcome::HomeWin);
        assert_eq!(m.league.as_deref(), Some("NB I"));
    }

    #[test]
    fn test_missing_result_is_derived_from_score() {
        let raw = RawMatchRow {
            full_time_home_goals: Some(0),
            full_time_away_goals: Some(1),
            ..Default::default()
        };
        assert_eq!(normalize_match(&raw).result, MatchOutcome::AwayWin);
    }

    #[test]
    fn test_one_sided_half_time_stays_unset() {
        let raw = RawMatchRow {
            half_time_home_goals: Some(1),
            full_time_home_goals: Some(2),
            full_time_away_goals: Some(0),
            ..Default::default()
        };
        let m = normalize_match(&raw);
        assert_eq!(m.half_time, None);
        assert_eq!(m.full_time, Score::new(2, 0));
    }

    #[test]
    fn test_negative_goals_become_zero() {
        let raw = RawMatchRow {
            full_time_home_goals: Some(-1),
            ..Default::default()
        };
        assert_eq!(normalize_match(&raw).full_time.home, 0);
    }
}
