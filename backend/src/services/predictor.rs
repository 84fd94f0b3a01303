use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::models::{EloProbabilities, MatchOutcome, ModelPredictions, PoissonGoals, Prediction, TeamAnalysis};
use crate::utils::round2;

const OUTCOMES: [MatchOutcome; 3] = [MatchOutcome::HomeWin, MatchOutcome::AwayWin, MatchOutcome::Draw];

/// Produces the prediction block shown next to a head-to-head analysis.
///
/// The output is drawn uniformly inside fixed bounds and does not depend on
/// the statistics yet. It is a placeholder until a real model (Poisson goals,
/// Elo ratings) is fitted; only the shape and the bounds are contractual.
pub struct PredictionEngine {
    rng: Mutex<StdRng>,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic engine for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate_prediction(&self, home_team: &str, away_team: &str, stats: &TeamAnalysis) -> Prediction {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let home_expected = rng.gen_range(1.0..=3.0_f64);
        let away_expected = rng.gen_range(1.0..=3.0_f64);
        let predicted_winner = OUTCOMES[rng.gen_range(0..OUTCOMES.len())];
        let both_teams_to_score_prob = rng.gen_range(60.0..=90.0_f64).round() as u32;
        let confidence = round2(rng.gen_range(0.4..=0.8));

        let elo = EloProbabilities {
            home_win_prob: round2(rng.gen_range(0.2..=0.6)),
            draw_prob: round2(rng.gen_range(0.2..=0.5)),
            away_win_prob: round2(rng.gen_range(0.2..=0.6)),
        };

        tracing::debug!(
            "Prediction for {} vs {} over {} head-to-head matches: {}",
            home_team,
            away_team,
            stats.matches_count,
            predicted_winner
        );

        Prediction {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_expected_goals: round2(home_expected),
            away_expected_goals: round2(away_expected),
            both_teams_to_score_prob,
            predicted_winner,
            confidence,
            model_predictions: ModelPredictions {
                random_forest: predicted_winner,
                poisson: PoissonGoals {
                    home_goals: home_expected.round() as u32,
                    away_goals: away_expected.round() as u32,
                },
                elo,
            },
        }
    }
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AverageGoals, HeadToHeadStats};
    use std::collections::HashSet;

    fn stats() -> TeamAnalysis {
        TeamAnalysis {
            home_team: "Ferencváros".to_string(),
            away_team: "Újpest".to_string(),
            matches_count: 4,
            both_teams_scored_percentage: 50,
            average_goals: AverageGoals {
                average_total_goals: 2.5,
                average_home_goals: 1.5,
                average_away_goals: 1.0,
            },
            home_form_index: 70,
            away_form_index: 40,
            head_to_head_stats: HeadToHeadStats {
                home_wins: 2,
                away_wins: 1,
                draws: 1,
                home_win_percentage: 50,
                away_win_percentage: 25,
                draw_percentage: 25,
            },
        }
    }

    #[test]
    fn test_prediction_stays_in_bounds() {
        let engine = PredictionEngine::with_seed(7);
        let stats = stats();
        let mut winners = HashSet::new();

        for _ in 0..500 {
            let p = engine.generate_prediction("Ferencváros", "Újpest", &stats);
            assert!((1.0..=3.0).contains(&p.home_expected_goals));
            assert!((1.0..=3.0).contains(&p.away_expected_goals));
            assert!((60..=90).contains(&p.both_teams_to_score_prob));
            assert!((0.4..=0.8).contains(&p.confidence));

            let elo = &p.model_predictions.elo;
            assert!((0.2..=0.6).contains(&elo.home_win_prob));
            assert!((0.2..=0.5).contains(&elo.draw_prob));
            assert!((0.2..=0.6).contains(&elo.away_win_prob));

            assert_eq!(p.model_predictions.random_forest, p.predicted_winner);
            assert!((1..=3).contains(&p.model_predictions.poisson.home_goals));
            assert!((1..=3).contains(&p.model_predictions.poisson.away_goals));
            winners.insert(p.predicted_winner);
        }

        assert_eq!(winners.len(), 3);
    }

    #[test]
    fn test_poisson_goals_follow_expected_goals() {
        let engine = PredictionEngine::with_seed(11);
        for _ in 0..100 {
            let p = engine.generate_prediction("A", "B", &stats());
            let poisson = &p.model_predictions.poisson;
            assert!((f64::from(poisson.home_goals) - p.home_expected_goals).abs() <= 0.5 + 1e-9);
            assert!((f64::from(poisson.away_goals) - p.away_expected_goals).abs() <= 0.5 + 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_prediction() {
        let a = PredictionEngine::with_seed(42).generate_prediction("A", "B", &stats());
        let b = PredictionEngine::with_seed(42).generate_prediction("A", "B", &stats());
        assert_eq!(a, b);
        assert_eq!(a.home_team, "A");
        assert_eq!(a.away_team, "B");
    }
}
