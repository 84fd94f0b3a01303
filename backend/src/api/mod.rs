use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::StoreError;
use crate::models::{ApiResponse, League, Match, MatchOutcome, MatchQueryResponse, NewMatch};
use crate::services::{matches_to_csv_string, MatchBrowser};
use crate::store::{MatchFilters, MatchQuery, PageRequest, SortDirection, SortKey, SortOrder};

#[derive(Clone)]
pub struct AppState {
    pub browser: Arc<MatchBrowser>,
    pub default_page_size: u32,
}

pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("goalscope API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/matches", get(get_matches_handler).post(insert_match_handler))
        .route("/matches/export", get(export_matches_handler))
        .route("/teams", get(get_teams_handler))
        .route("/leagues", get(get_leagues_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<&'static str>> {
    if state.browser.repository().is_configured() {
        Json(ApiResponse::success("goalscope API is running"))
    } else {
        Json(ApiResponse::success("goalscope API is running without a match store"))
    }
}

/// Flat query-string form of a match query.
#[derive(Debug, Default, Deserialize)]
struct MatchParams {
    home_team: Option<String>,
    away_team: Option<String>,
    btts: Option<bool>,
    comeback: Option<bool>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    league: Option<String>,
    country: Option<String>,
    season: Option<String>,
    min_home_goals: Option<u32>,
    max_home_goals: Option<u32>,
    min_away_goals: Option<u32>,
    max_away_goals: Option<u32>,
    result: Option<MatchOutcome>,
    page: Option<u32>,
    page_size: Option<u32>,
    sort: Option<String>,
    asc: Option<bool>,
}

impl MatchParams {
    fn into_query(self, default_page_size: u32) -> Result<MatchQuery, String> {
        let key = match self.sort.as_deref() {
            Some(raw) => raw.parse::<SortKey>()?,
            None => SortKey::default(),
        };
        let direction = if self.asc.unwrap_or(false) {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let filters = MatchFilters {
            home_team: non_empty(self.home_team),
            away_team: non_empty(self.away_team),
            btts: self.btts,
            comeback: self.comeback,
            start_date: self.start_date,
            end_date: self.end_date,
            league: non_empty(self.league),
            country: non_empty(self.country),
            season: non_empty(self.season),
            min_home_goals: self.min_home_goals,
            max_home_goals: self.max_home_goals,
            min_away_goals: self.min_away_goals,
            max_away_goals: self.max_away_goals,
            result: self.result,
        };

        Ok(MatchQuery::new(
            filters,
            PageRequest::new(self.page.unwrap_or(1), self.page_size.unwrap_or(default_page_size)),
            SortOrder::new(key, direction),
        ))
    }
}

// GET /matches - Filtered page with optional head-to-head analysis
async fn get_matches_handler(
    State(state): State<AppState>,
    Query(params): Query<MatchParams>,
) -> Result<Json<ApiResponse<MatchQueryResponse>>, StatusCode> {
    let query = params.into_query(state.default_page_size).map_err(|e| {
        tracing::warn!("Rejected match query: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let response = state.browser.browse(&query).await;
    Ok(Json(ApiResponse::success(response)))
}

// POST /matches - Append one match
async fn insert_match_handler(
    State(state): State<AppState>,
    Json(new_match): Json<NewMatch>,
) -> (StatusCode, Json<ApiResponse<Match>>) {
    match state.browser.repository().insert_match(&new_match).await {
        Ok(inserted) => (StatusCode::CREATED, Json(ApiResponse::success(inserted))),
        Err(StoreError::Invalid(message)) => {
            tracing::warn!("Rejected match insert: {}", message);
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
        }
        Err(e) => {
            tracing::error!("Failed to insert match: {}", e);
            (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string())))
        }
    }
}

// GET /matches/export - Every matching row as CSV
async fn export_matches_handler(
    State(state): State<AppState>,
    Query(params): Query<MatchParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let query = params.into_query(state.default_page_size).map_err(|e| {
        tracing::warn!("Rejected export query: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let matches = state
        .browser
        .repository()
        .fetch_all(&query.filters, query.order)
        .await;

    match matches_to_csv_string(&matches) {
        Ok(body) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"matches.csv\""),
            ],
            body,
        )),
        Err(e) => {
            tracing::error!("Failed to export matches: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /teams - Known team names
async fn get_teams_handler(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.browser.repository().team_names().await))
}

// GET /leagues
async fn get_leagues_handler(State(state): State<AppState>) -> Json<ApiResponse<Vec<League>>> {
    Json(ApiResponse::success(state.browser.repository().leagues().await))
}
