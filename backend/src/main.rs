mod api;
mod cli;
mod config;
mod error;
mod models;
mod services;
mod store;
mod utils;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::models::NewMatch;
use crate::services::{MatchBrowser, MatchRepository, PredictionEngine};

#[derive(Parser)]
#[command(name = "goalscope")]
#[command(about = "Browse football matches with head-to-head statistics and predictions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// List a page of matches, with analysis when both teams are given
    Matches {
        #[command(flatten)]
        filters: cli::FilterArgs,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Export every matching match to CSV
    Export {
        #[command(flatten)]
        filters: cli::FilterArgs,
        #[arg(short, long, default_value = "matches.csv")]
        output: PathBuf,
    },
    /// Insert a finished match
    Insert {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        /// Kickoff time (RFC 3339 or YYYY-MM-DD HH:MM, UTC)
        #[arg(long, value_parser = cli::parse_kickoff)]
        kickoff: DateTime<Utc>,
        #[arg(long, requires = "ht_away")]
        ht_home: Option<u32>,
        #[arg(long, requires = "ht_home")]
        ht_away: Option<u32>,
        #[arg(long)]
        ft_home: u32,
        #[arg(long)]
        ft_away: u32,
    },
    /// List known teams
    Teams,
    /// List known leagues
    Leagues,
    /// Test the match store connection
    Ping,
    /// Initialize the SQLite database
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    if let Some(Commands::InitDb) = cli.command {
        tracing::info!("Initializing database...");
        return cli::init_database(&config).await;
    }

    let repository = MatchRepository::from_config(&config).await?;

    match cli.command {
        Some(Commands::Serve { port }) => serve(port, repository, &config).await?,
        Some(Commands::Matches { filters, page, page_size }) => {
            let browser = MatchBrowser::new(repository, prediction_engine(&config));
            let page_size = page_size.unwrap_or(config.default_page_size);
            cli::list_matches(&browser, &filters, page, page_size).await?;
        }
        Some(Commands::Export { filters, output }) => {
            cli::export_matches(&repository, &filters, &output).await?;
        }
        Some(Commands::Insert {
            home,
            away,
            kickoff,
            ht_home,
            ht_away,
            ft_home,
            ft_away,
        }) => {
            let new_match = NewMatch {
                home_team: home,
                away_team: away,
                match_time: kickoff,
                half_time_home_goals: ht_home,
                half_time_away_goals: ht_away,
                full_time_home_goals: ft_home,
                full_time_away_goals: ft_away,
            };
            cli::insert_match(&repository, new_match).await?;
        }
        Some(Commands::Teams) => cli::list_teams(&repository).await?,
        Some(Commands::Leagues) => cli::list_leagues(&repository).await?,
        Some(Commands::Ping) => cli::ping(&repository).await?,
        Some(Commands::InitDb) => {}
        None => {
            // Default to serving
            serve(3000, repository, &config).await?;
        }
    }

    Ok(())
}

fn prediction_engine(config: &AppConfig) -> PredictionEngine {
    match config.prediction_seed {
        Some(seed) => PredictionEngine::with_seed(seed),
        None => PredictionEngine::new(),
    }
}

async fn serve(port: u16, repository: MatchRepository, config: &AppConfig) -> Result<()> {
    tracing::info!("Starting goalscope API server on port {}", port);
    let state = api::AppState {
        browser: Arc::new(MatchBrowser::new(repository, prediction_engine(config))),
        default_page_size: config.default_page_size,
    };
    api::serve(port, state).await
}
