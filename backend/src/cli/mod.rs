use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use std::path::Path;

use crate::config::{AppConfig, StoreBackend};
use crate::models::{MatchOutcome, MatchQueryResponse, NewMatch};
use crate::services::{export_to_file, MatchBrowser, MatchRepository};
use crate::store::{MatchFilters, MatchQuery, PageRequest, SortDirection, SortKey, SortOrder, SqliteStore};
use crate::utils::{parse_timestamp, suggest_team_name};

/// Match filters shared by the `matches` and `export` subcommands.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub home_team: Option<String>,
    #[arg(long)]
    pub away_team: Option<String>,
    /// Only matches where both teams scored (true/false)
    #[arg(long)]
    pub btts: Option<bool>,
    #[arg(long)]
    pub comeback: Option<bool>,
    /// First day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub league: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub season: Option<String>,
    #[arg(long)]
    pub min_home_goals: Option<u32>,
    #[arg(long)]
    pub max_home_goals: Option<u32>,
    #[arg(long)]
    pub min_away_goals: Option<u32>,
    #[arg(long)]
    pub max_away_goals: Option<u32>,
    /// home_win, away_win or draw
    #[arg(long)]
    pub result: Option<MatchOutcome>,
    /// match_time, id, home_team or away_team
    #[arg(long, default_value = "match_time")]
    pub sort: SortKey,
    /// Ascending instead of newest first
    #[arg(long)]
    pub asc: bool,
}

impl FilterArgs {
    pub fn filters(&self) -> MatchFilters {
        MatchFilters {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            btts: self.btts,
            comeback: self.comeback,
            start_date: self.from,
            end_date: self.to,
            league: self.league.clone(),
            country: self.country.clone(),
            season: self.season.clone(),
            min_home_goals: self.min_home_goals,
            max_home_goals: self.max_home_goals,
            min_away_goals: self.min_away_goals,
            max_away_goals: self.max_away_goals,
            result: self.result,
        }
    }

    pub fn order(&self) -> SortOrder {
        let direction = if self.asc { SortDirection::Asc } else { SortDirection::Desc };
        SortOrder::new(self.sort, direction)
    }
}

pub async fn list_matches(browser: &MatchBrowser, args: &FilterArgs, page: u32, page_size: u32) -> Result<()> {
    let query = MatchQuery::new(args.filters(), PageRequest::new(page, page_size), args.order());
    let response = browser.browse(&query).await;

    if response.matches.is_empty() {
        println!("📭 No matches found");
        print_team_hints(args, &response.teams);
        return Ok(());
    }

    print_matches(&response);
    print_analysis(&response);
    Ok(())
}

fn print_team_hints(args: &FilterArgs, known: &[String]) {
    for team in [&args.home_team, &args.away_team].into_iter().flatten() {
        if known.iter().any(|k| k == team) {
            continue;
        }
        if let Some(suggestion) = suggest_team_name(team, known) {
            println!("💡 No team named '{}'. Did you mean '{}'?", team, suggestion);
        }
    }
}

fn print_matches(response: &MatchQueryResponse) {
    let pages = response.total_count.div_ceil(u64::from(response.page_size)).max(1);
    println!(
        "📋 {} matches (page {} of {}, {} per page)\n",
        response.total_count, response.page, pages, response.page_size
    );

    for m in &response.matches {
        let mut flags = Vec::new();
        if m.btts {
            flags.push("BTTS");
        }
        if m.comeback {
            flags.push("comeback");
        }
        let half_time = m.half_time.map_or_else(|| "-".to_string(), |s| s.to_string());
        println!(
            "   {}  {} {} {}  (HT {})  {}",
            m.kickoff.format("%Y-%m-%d %H:%M"),
            m.home_team,
            m.full_time,
            m.away_team,
            half_time,
            flags.join(", ")
        );
    }
}

fn print_analysis(response: &MatchQueryResponse) {
    let Some(stats) = &response.team_analysis else {
        return;
    };

    let h2h = &stats.head_to_head_stats;
    println!("\n📊 {} vs {} ({} head-to-head matches):", stats.home_team, stats.away_team, stats.matches_count);
    println!(
        "   {} wins: {} ({}%) | {} wins: {} ({}%) | Draws: {} ({}%)",
        stats.home_team,
        h2h.home_wins,
        h2h.home_win_percentage,
        stats.away_team,
        h2h.away_wins,
        h2h.away_win_percentage,
        h2h.draws,
        h2h.draw_percentage
    );
    println!(
        "   Goals per match: {:.2} (home side {:.2}, away side {:.2})",
        stats.average_goals.average_total_goals,
        stats.average_goals.average_home_goals,
        stats.average_goals.average_away_goals
    );
    println!("   Both teams scored: {}%", stats.both_teams_scored_percentage);
    println!("   Form index: {} {} | {} {}", stats.home_team, stats.home_form_index, stats.away_team, stats.away_form_index);

    if let Some(prediction) = &response.prediction {
        println!("\n🎯 Prediction:");
        println!(
            "   Expected goals: {:.2} - {:.2} | Winner: {} | Confidence: {:.0}%",
            prediction.home_expected_goals,
            prediction.away_expected_goals,
            prediction.predicted_winner,
            prediction.confidence * 100.0
        );
        println!("   Both teams to score: {}%", prediction.both_teams_to_score_prob);
        let elo = &prediction.model_predictions.elo;
        println!(
            "   Poisson: {}-{} | Elo: {:.2} / {:.2} / {:.2}",
            prediction.model_predictions.poisson.home_goals,
            prediction.model_predictions.poisson.away_goals,
            elo.home_win_prob,
            elo.draw_prob,
            elo.away_win_prob
        );
    }
}

pub async fn export_matches(repository: &MatchRepository, args: &FilterArgs, output: &Path) -> Result<()> {
    println!("📥 Fetching matches...");
    let matches = repository.try_fetch_all(&args.filters(), args.order()).await?;
    export_to_file(output, &matches).await?;
    println!("✅ Exported {} matches to {}", matches.len(), output.display());
    Ok(())
}

/// Kickoff given as RFC 3339, `YYYY-MM-DD HH:MM` or a bare date.
pub fn parse_kickoff(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("unrecognized kickoff time '{}'", raw))
}

pub async fn insert_match(repository: &MatchRepository, new_match: NewMatch) -> Result<()> {
    let inserted = repository
        .insert_match(&new_match)
        .await
        .context("Failed to insert match")?;

    println!(
        "✅ Inserted match {}: {} {} {} ({})",
        inserted.id, inserted.home_team, inserted.full_time, inserted.away_team, inserted.result
    );
    Ok(())
}

pub async fn list_teams(repository: &MatchRepository) -> Result<()> {
    let teams = repository.teams().await;
    if teams.is_empty() {
        println!("📭 No teams found");
        return Ok(());
    }
    println!("📋 {} teams:", teams.len());
    for team in teams {
        println!("   • {}", team.name);
    }
    Ok(())
}

pub async fn list_leagues(repository: &MatchRepository) -> Result<()> {
    let leagues = repository.leagues().await;
    if leagues.is_empty() {
        println!("📭 No leagues found");
        return Ok(());
    }
    println!("📋 {} leagues:", leagues.len());
    for league in leagues {
        println!("   • {}", league.name);
    }
    Ok(())
}

pub async fn ping(repository: &MatchRepository) -> Result<()> {
    if repository.ping().await {
        println!("✅ Match store is reachable");
        Ok(())
    } else {
        anyhow::bail!("match store is not reachable")
    }
}

pub async fn init_database(config: &AppConfig) -> Result<()> {
    if config.backend != StoreBackend::Sqlite {
        tracing::warn!("init-db only applies to the SQLite store; MATCH_STORE is not 'sqlite'");
    }
    let store = SqliteStore::connect(&config.database_url).await?;
    store.init_schema().await?;
    println!("✅ Database initialized at {}", config.database_url);
    Ok(())
}
