//! Typed filter set and the predicates it expands into.
//!
//! Every store backend consumes the same `Predicate` list, so a filter means
//! the same thing whether it ends up as PostgREST query parameters, a SQL
//! `WHERE` clause or an in-memory scan.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{day_start, next_day_start, MatchOutcome, RawMatchRow};
use crate::utils::parse_timestamp;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Every recognized match filter. `None` means "no predicate".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchFilters {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    /// both-teams-scored flag
    pub btts: Option<bool>,
    pub comeback: Option<bool>,
    /// inclusive, from the first second of the day
    pub start_date: Option<NaiveDate>,
    /// inclusive, up to the last second of the day
    pub end_date: Option<NaiveDate>,
    pub league: Option<String>,
    pub country: Option<String>,
    pub season: Option<String>,
    pub min_home_goals: Option<u32>,
    pub max_home_goals: Option<u32>,
    pub min_away_goals: Option<u32>,
    pub max_away_goals: Option<u32>,
    pub result: Option<MatchOutcome>,
}

impl MatchFilters {
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut preds = Vec::new();

        if let Some(team) = non_empty(&self.home_team) {
            preds.push(Predicate::eq(Column::HomeTeam, FilterValue::Text(team)));
        }
        if let Some(team) = non_empty(&self.away_team) {
            preds.push(Predicate::eq(Column::AwayTeam, FilterValue::Text(team)));
        }
        if let Some(btts) = self.btts {
            preds.push(Predicate::eq(Column::Btts, FilterValue::Bool(btts)));
        }
        if let Some(comeback) = self.comeback {
            preds.push(Predicate::eq(Column::Comeback, FilterValue::Bool(comeback)));
        }
        if let Some(date) = self.start_date {
            preds.push(Predicate::new(Column::MatchTime, Op::Gte, FilterValue::Time(day_start(date))));
        }
        if let Some(date) = self.end_date {
            preds.push(Predicate::new(Column::MatchTime, Op::Lt, FilterValue::Time(next_day_start(date))));
        }
        if let Some(league) = non_empty(&self.league) {
            preds.push(Predicate::eq(Column::League, FilterValue::Text(league)));
        }
        if let Some(country) = non_empty(&self.country) {
            preds.push(Predicate::eq(Column::Country, FilterValue::Text(country)));
        }
        if let Some(season) = non_empty(&self.season) {
            preds.push(Predicate::eq(Column::Season, FilterValue::Text(season)));
        }
        if let Some(goals) = self.min_home_goals {
            preds.push(Predicate::new(Column::FullTimeHomeGoals, Op::Gte, FilterValue::Int(goals.into())));
        }
        if let Some(goals) = self.max_home_goals {
            preds.push(Predicate::new(Column::FullTimeHomeGoals, Op::Lte, FilterValue::Int(goals.into())));
        }
        if let Some(goals) = self.min_away_goals {
            preds.push(Predicate::new(Column::FullTimeAwayGoals, Op::Gte, FilterValue::Int(goals.into())));
        }
        if let Some(goals) = self.max_away_goals {
            preds.push(Predicate::new(Column::FullTimeAwayGoals, Op::Lte, FilterValue::Int(goals.into())));
        }
        if let Some(result) = self.result {
            preds.push(Predicate::eq(Column::Result, FilterValue::Text(result.as_str().to_string())));
        }

        preds
    }

    /// Both team filters, when the caller asked about a specific pairing.
    pub fn team_pair(&self) -> Option<(String, String)> {
        match (non_empty(&self.home_team), non_empty(&self.away_team)) {
            (Some(home), Some(away)) => Some((home, away)),
            _ => None,
        }
    }

    pub fn matches_row(&self, row: &RawMatchRow) -> bool {
        self.predicates().iter().all(|p| p.matches_row(row))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    HomeTeam,
    AwayTeam,
    MatchTime,
    FullTimeHomeGoals,
    FullTimeAwayGoals,
    Btts,
    Comeback,
    Result,
    League,
    Country,
    Season,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::HomeTeam => "home_team",
            Column::AwayTeam => "away_team",
            Column::MatchTime => "match_time",
            Column::FullTimeHomeGoals => "full_time_home_goals",
            Column::FullTimeAwayGoals => "full_time_away_goals",
            Column::Btts => "btts_computed",
            Column::Comeback => "comeback_computed",
            Column::Result => "result_computed",
            Column::League => "league",
            Column::Country => "country",
            Column::Season => "season",
        }
    }

    fn read(&self, row: &RawMatchRow) -> Option<FilterValue> {
        let text = |v: &Option<String>| v.clone().map(FilterValue::Text);
        match self {
            Column::Id => row.id.as_deref().map(id_value),
            Column::HomeTeam => text(&row.home_team),
            Column::AwayTeam => text(&row.away_team),
            Column::MatchTime => row.match_time.as_deref().and_then(parse_timestamp).map(FilterValue::Time),
            Column::FullTimeHomeGoals => row.full_time_home_goals.map(FilterValue::Int),
            Column::FullTimeAwayGoals => row.full_time_away_goals.map(FilterValue::Int),
            Column::Btts => row.btts_computed.map(FilterValue::Bool),
            Column::Comeback => row.comeback_computed.map(FilterValue::Bool),
            Column::Result => text(&row.result_computed),
            Column::League => text(&row.league),
            Column::Country => text(&row.country),
            Column::Season => text(&row.season),
        }
    }
}

/// Numeric ids order numerically, anything else lexically.
fn id_value(id: &str) -> FilterValue {
    id.parse::<i64>()
        .map(FilterValue::Int)
        .unwrap_or_else(|_| FilterValue::Text(id.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gte,
    Lte,
    Lt,
}

impl Op {
    pub fn rest_op(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Gte => "gte",
            Op::Lte => "lte",
            Op::Lt => "lt",
        }
    }

    pub fn sql_op(&self) -> &'static str {
        match self {
            Op::Eq => " = ",
            Op::Gte => " >= ",
            Op::Lte => " <= ",
            Op::Lt => " < ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl FilterValue {
    pub fn to_rest(&self) -> String {
        match self {
            FilterValue::Text(s) => s.clone(),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Time(t) => t.to_rfc3339(),
        }
    }

    /// Ordering between values of the same kind; mixed kinds never compare.
    fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
            (FilterValue::Int(a), FilterValue::Int(b)) => Some(a.cmp(b)),
            (FilterValue::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
            (FilterValue::Time(a), FilterValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            FilterValue::Bool(_) => 0,
            FilterValue::Int(_) => 1,
            FilterValue::Time(_) => 2,
            FilterValue::Text(_) => 3,
        }
    }

    /// Total order for sorting: values of different kinds order by kind.
    fn total_cmp(&self, other: &FilterValue) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| self.kind_rank().cmp(&other.kind_rank()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: Column,
    pub op: Op,
    pub value: FilterValue,
}

impl Predicate {
    pub fn new(column: Column, op: Op, value: FilterValue) -> Self {
        Self { column, op, value }
    }

    pub fn eq(column: Column, value: FilterValue) -> Self {
        Self::new(column, Op::Eq, value)
    }

    /// `("full_time_home_goals", "gte.2")`
    pub fn to_rest_param(&self) -> (String, String) {
        (
            self.column.name().to_string(),
            format!("{}.{}", self.op.rest_op(), self.value.to_rest()),
        )
    }

    /// SQL semantics: a missing column never satisfies a predicate.
    pub fn matches_row(&self, row: &RawMatchRow) -> bool {
        let Some(actual) = self.column.read(row) else {
            return false;
        };
        let Some(ord) = actual.compare(&self.value) else {
            return false;
        };
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Gte => ord != Ordering::Less,
            Op::Lte => ord != Ordering::Greater,
            Op::Lt => ord == Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    MatchTime,
    Id,
    HomeTeam,
    AwayTeam,
}

impl SortKey {
    pub fn column(&self) -> Column {
        match self {
            SortKey::MatchTime => Column::MatchTime,
            SortKey::Id => Column::Id,
            SortKey::HomeTeam => Column::HomeTeam,
            SortKey::AwayTeam => Column::AwayTeam,
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match_time" | "date" => Ok(SortKey::MatchTime),
            "id" => Ok(SortKey::Id),
            "home_team" => Ok(SortKey::HomeTeam),
            "away_team" => Ok(SortKey::AwayTeam),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// PostgREST `order` value. `id` breaks ties so pages never overlap.
    pub fn to_rest(&self) -> String {
        let primary = format!("{}.{}", self.key.column().name(), self.direction.as_str());
        if self.key == SortKey::Id {
            primary
        } else {
            format!("{},id.asc", primary)
        }
    }

    pub fn to_sql(&self) -> String {
        let primary = format!("{} {}", self.key.column().name(), self.direction.as_str().to_uppercase());
        if self.key == SortKey::Id {
            primary
        } else {
            format!("{}, id ASC", primary)
        }
    }

    /// Comparator for in-memory rows matching `to_sql`. Missing values sort last.
    pub fn compare_rows(&self, a: &RawMatchRow, b: &RawMatchRow) -> Ordering {
        let primary = compare_column(self.key.column(), a, b, self.direction);
        if primary != Ordering::Equal || self.key == SortKey::Id {
            return primary;
        }
        compare_column(Column::Id, a, b, SortDirection::Asc)
    }
}

/// Missing values sort last in either direction.
fn compare_column(column: Column, a: &RawMatchRow, b: &RawMatchRow, direction: SortDirection) -> Ordering {
    match (column.read(a), column.read(b)) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One-based page number and a page size clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchQuery {
    pub filters: MatchFilters,
    pub page: PageRequest,
    pub order: SortOrder,
}

impl MatchQuery {
    pub fn new(filters: MatchFilters, page: PageRequest, order: SortOrder) -> Self {
        Self { filters, page, order }
    }
}
