use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse the timestamp shapes the store emits: RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// (assumed UTC) or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `round(count / total * 100)` with halves rounded up, in integer arithmetic.
pub fn round_percentage(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (count, total) = (u64::from(count), u64::from(total));
    ((200 * count + total) / (2 * total)) as u32
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Points share of a football record on a 0-100 scale (3 per win, 1 per draw).
pub fn calculate_form_percentage(wins: u32, draws: u32, losses: u32) -> Option<u32> {
    let total_games = wins + draws + losses;
    if total_games == 0 {
        return None;
    }
    let points = wins * 3 + draws;
    Some(round_percentage(points, total_games * 3))
}

/// Validate team name format
pub fn validate_team_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() <= 100
}

/// Closest known team name, for "did you mean" hints. Case-insensitive.
pub fn suggest_team_name<'a>(input: &str, known: &'a [String]) -> Option<&'a str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    known
        .iter()
        .map(|name| (name, strsim::jaro_winkler(&needle, &name.to_lowercase())))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name.as_str())
}
