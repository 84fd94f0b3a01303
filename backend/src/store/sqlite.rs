//! Local SQLite mirror of the hosted schema.
//!
//! The `_computed` columns are generated columns, so rows inserted here get
//! the same derived flags the hosted service computes.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;

use super::{FilterValue, MatchFilters, MatchQuery, MatchStore, Predicate};
use crate::error::StoreResult;
use crate::models::{League, MatchStatus, NewMatch, RawMatchRow, Team};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
        let file_path = database_url
            .strip_prefix("sqlite:///")
            .or_else(|| database_url.strip_prefix("sqlite://"))
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        if !file_path.starts_with(":memory:") {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.ok();
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leagues (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                match_time TEXT NOT NULL,
                half_time_home_goals INTEGER,
                half_time_away_goals INTEGER,
                full_time_home_goals INTEGER NOT NULL,
                full_time_away_goals INTEGER NOT NULL,
                match_status TEXT NOT NULL DEFAULT 'finished',
                league TEXT,
                country TEXT,
                season TEXT,
                btts_computed INTEGER GENERATED ALWAYS AS (
                    full_time_home_goals > 0 AND full_time_away_goals > 0
                ) VIRTUAL,
                comeback_computed INTEGER GENERATED ALWAYS AS (
                    CASE
                        WHEN half_time_home_goals IS NULL OR half_time_away_goals IS NULL THEN 0
                        WHEN half_time_home_goals < half_time_away_goals
                             AND full_time_home_goals >= full_time_away_goals THEN 1
                        WHEN half_time_away_goals < half_time_home_goals
                             AND full_time_away_goals >= full_time_home_goals THEN 1
                        ELSE 0
                    END
                ) VIRTUAL,
                result_computed TEXT GENERATED ALWAYS AS (
                    CASE
                        WHEN full_time_home_goals > full_time_away_goals THEN 'home_win'
                        WHEN full_time_home_goals < full_time_away_goals THEN 'away_win'
                        ELSE 'draw'
                    END
                ) VIRTUAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_time ON matches(match_time)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_teams ON matches(home_team, away_team)")
            .execute(&self.pool)
            .await?;

        tracing::info!("SQLite match store initialized");
        Ok(())
    }

    async fn register_team(&self, name: &str) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO teams (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn push_predicates(builder: &mut QueryBuilder<'_, Sqlite>, predicates: &[Predicate]) {
    for predicate in predicates {
        builder.push(" AND ");
        builder.push(predicate.column.name());
        builder.push(predicate.op.sql_op());
        match &predicate.value {
            FilterValue::Text(s) => builder.push_bind(s.clone()),
            FilterValue::Int(i) => builder.push_bind(*i),
            FilterValue::Bool(b) => builder.push_bind(i64::from(*b)),
            FilterValue::Time(t) => builder.push_bind(t.to_rfc3339()),
        };
    }
}

fn row_to_raw(row: &SqliteRow) -> StoreResult<RawMatchRow> {
    Ok(RawMatchRow {
        id: Some(row.try_get::<i64, _>("id")?.to_string()),
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        match_time: row.try_get("match_time")?,
        half_time_home_goals: row.try_get("half_time_home_goals")?,
        half_time_away_goals: row.try_get("half_time_away_goals")?,
        full_time_home_goals: row.try_get("full_time_home_goals")?,
        full_time_away_goals: row.try_get("full_time_away_goals")?,
        match_status: row.try_get("match_status")?,
        btts_computed: row.try_get::<Option<i64>, _>("btts_computed")?.map(|v| v != 0),
        comeback_computed: row.try_get::<Option<i64>, _>("comeback_computed")?.map(|v| v != 0),
        result_computed: row.try_get("result_computed")?,
        league: row.try_get("league")?,
        country: row.try_get("country")?,
        season: row.try_get("season")?,
    })
}

fn parse_created_at(row: &SqliteRow) -> StoreResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get("created_at")?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc)))
}

#[async_trait]
impl MatchStore for SqliteStore {
    async fn select_matches(&self, query: &MatchQuery) -> StoreResult<Vec<RawMatchRow>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM matches WHERE 1=1");
        push_predicates(&mut builder, &query.filters.predicates());
        builder.push(" ORDER BY ");
        builder.push(query.order.to_sql());
        builder.push(" LIMIT ");
        builder.push_bind(query.page.limit() as i64);
        builder.push(" OFFSET ");
        builder.push_bind(query.page.offset() as i64);

        tracing::debug!("{}", builder.sql());
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_raw).collect()
    }

    async fn count_matches(&self, filters: &MatchFilters) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM matches WHERE 1=1");
        push_predicates(&mut builder, &filters.predicates());

        let count: i64 = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<RawMatchRow> {
        let row = sqlx::query(
            r#"
            INSERT INTO matches
            (home_team, away_team, match_time, half_time_home_goals, half_time_away_goals,
             full_time_home_goals, full_time_away_goals, match_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new_match.home_team)
        .bind(&new_match.away_team)
        .bind(new_match.match_time.to_rfc3339())
        .bind(new_match.half_time_home_goals.map(i64::from))
        .bind(new_match.half_time_away_goals.map(i64::from))
        .bind(i64::from(new_match.full_time_home_goals))
        .bind(i64::from(new_match.full_time_away_goals))
        .bind(MatchStatus::Finished.as_str())
        .fetch_one(&self.pool)
        .await?;

        self.register_team(&new_match.home_team).await?;
        self.register_team(&new_match.away_team).await?;

        row_to_raw(&row)
    }

    async fn teams(&self) -> StoreResult<Vec<Team>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM teams ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let mut teams = Vec::new();
        for row in rows {
            teams.push(Team {
                id: row.try_get::<i64, _>("id")?.to_string(),
                name: row.try_get("name")?,
                created_at: parse_created_at(&row)?,
            });
        }
        Ok(teams)
    }

    async fn leagues(&self) -> StoreResult<Vec<League>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM leagues ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let mut leagues = Vec::new();
        for row in rows {
            leagues.push(League {
                id: row.try_get::<i64, _>("id")?.to_string(),
                name: row.try_get("name")?,
                created_at: parse_created_at(&row)?,
            });
        }
        Ok(leagues)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}
