use crate::models::{AverageGoals, HeadToHeadStats, Match, TeamAnalysis};
use crate::utils::{calculate_form_percentage, round2, round_percentage};

/// Matches considered for the form index.
pub const FORM_WINDOW: usize = 10;
/// Form index reported when a team has no matches to judge.
pub const NEUTRAL_FORM_INDEX: u32 = 50;

/// Head-to-head record and current form for `home_team` vs `away_team`.
///
/// Head-to-head fixtures are those between the two teams in either order.
/// Returns `None` when there are none. Form indices look at each team's most
/// recent matches anywhere in `matches`, not only the head-to-head ones.
pub fn compute_team_stats(home_team: &str, away_team: &str, matches: &[Match]) -> Option<TeamAnalysis> {
    let h2h: Vec<&Match> = matches
        .iter()
        .filter(|m| {
            (m.home_team == home_team && m.away_team == away_team)
                || (m.home_team == away_team && m.away_team == home_team)
        })
        .collect();

    if h2h.is_empty() {
        return None;
    }

    let total = h2h.len() as u32;
    let mut home_wins = 0u32;
    let mut away_wins = 0u32;
    let mut draws = 0u32;
    let mut both_scored = 0u32;
    let mut home_side_goals = 0u32;
    let mut away_side_goals = 0u32;

    for m in &h2h {
        let score = m.full_time;
        home_side_goals += score.home;
        away_side_goals += score.away;
        if score.home > 0 && score.away > 0 {
            both_scored += 1;
        }

        match m.goals_for(home_team) {
            Some((scored, conceded)) if scored > conceded => home_wins += 1,
            Some((scored, conceded)) if scored < conceded => away_wins += 1,
            _ => draws += 1,
        }
    }

    let mean = |goals: u32| round2(f64::from(goals) / f64::from(total));

    Some(TeamAnalysis {
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        matches_count: total,
        both_teams_scored_percentage: round_percentage(both_scored, total),
        average_goals: AverageGoals {
            average_total_goals: mean(home_side_goals + away_side_goals),
            average_home_goals: mean(home_side_goals),
            average_away_goals: mean(away_side_goals),
        },
        home_form_index: calculate_form_index(home_team, matches),
        away_form_index: calculate_form_index(away_team, matches),
        head_to_head_stats: HeadToHeadStats {
            home_wins,
            away_wins,
            draws,
            home_win_percentage: round_percentage(home_wins, total),
            away_win_percentage: round_percentage(away_wins, total),
            draw_percentage: round_percentage(draws, total),
        },
    })
}

/// 0-100 score over the team's last `FORM_WINDOW` matches by kickoff,
/// 3 points a win and 1 a draw. `NEUTRAL_FORM_INDEX` when it has none.
pub fn calculate_form_index(team: &str, matches: &[Match]) -> u32 {
    let mut played: Vec<&Match> = matches.iter().filter(|m| m.involves(team)).collect();
    // Stable sort keeps input order for simultaneous kickoffs.
    played.sort_by_key(|m| m.kickoff);
    let recent = &played[played.len().saturating_sub(FORM_WINDOW)..];

    let (mut wins, mut draws, mut losses) = (0u32, 0u32, 0u32);
    for m in recent {
        match m.goals_for(team) {
            Some((scored, conceded)) if scored > conceded => wins += 1,
            Some((scored, conceded)) if scored == conceded => draws += 1,
            _ => losses += 1,
        }
    }

    calculate_form_percentage(wins, draws, losses).unwrap_or(NEUTRAL_FORM_INDEX)
}
