use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::models::Match;

pub const CSV_COLUMNS: [&str; 8] = [
    "date",
    "home_team",
    "away_team",
    "half_time",
    "full_time",
    "btts",
    "comeback",
    "result",
];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Write the header and one record per match.
pub fn write_matches_csv<W: Write>(writer: W, matches: &[Match]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_COLUMNS)?;

    for m in matches {
        writer.write_record([
            m.kickoff.format("%Y-%m-%d %H:%M").to_string(),
            m.home_team.clone(),
            m.away_team.clone(),
            m.half_time.map(|s| s.to_string()).unwrap_or_default(),
            m.full_time.to_string(),
            yes_no(m.btts).to_string(),
            yes_no(m.comeback).to_string(),
            m.result.as_str().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn matches_to_csv_string(matches: &[Match]) -> Result<String> {
    let mut buffer = Vec::new();
    write_matches_csv(&mut buffer, matches)?;
    Ok(String::from_utf8(buffer)?)
}

/// Export to a file, creating parent directories as needed.
pub async fn export_to_file(path: &Path, matches: &[Match]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = matches_to_csv_string(matches)?;
    tokio::fs::write(path, contents).await?;
    tracing::info!("Exported {} matches to {}", matches.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchOutcome, MatchStatus, Score};
    use chrono::{TimeZone, Utc};

    fn sample() -> Match {
        Match {
            id: "7".to_string(),
            home_team: "Puskás Akadémia".to_string(),
            away_team: "Fehérvár, FC".to_string(),
            kickoff: Utc.with_ymd_and_hms(2023, 10, 21, 17, 45, 30).unwrap(),
            half_time: Some(Score::new(0, 1)),
            full_time: Score::new(2, 1),
            status: MatchStatus::Finished,
            btts: true,
            comeback: true,
            result: MatchOutcome::HomeWin,
            league: None,
            country: None,
            season: None,
        }
    }

    #[test]
    fn test_header_and_row() {
        let csv = matches_to_csv_string(&[sample()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,home_team,away_team,half_time,full_time,btts,comeback,result");
        // names containing the delimiter are quoted
        assert_eq!(
            lines[1],
            "2023-10-21 17:45,Puskás Akadémia,\"Fehérvár, FC\",0-1,2-1,yes,yes,home_win"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let csv = matches_to_csv_string(&[]).unwrap();
        assert_eq!(csv, "date,home_team,away_team,half_time,full_time,btts,comeback,result\n");
    }

    #[test]
    fn test_flags_render_as_no() {
        let mut m = sample();
        m.btts = false;
        m.comeback = false;
        m.result = MatchOutcome::Draw;
        let csv = matches_to_csv_string(&[m]).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(",no,no,draw"));
    }

    #[test]
    fn test_unknown_half_time_renders_empty() {
        let mut m = sample();
        m.half_time = None;
        let csv = matches_to_csv_string(&[m]).unwrap();
        assert!(csv.lines().nth(1).unwrap().contains(",\"Fehérvár, FC\",,2-1,"));
    }

    #[tokio::test]
    async fn test_export_to_file_creates_directories() {
        let dir = std::env::temp_dir().join(format!("goalscope-export-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("matches.csv");

        export_to_file(&path, &[sample()]).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
