use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::StringRecord;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::db::models::PLACEHOLDER_SCORE;
use super::{FeedError, FeedRow, FeedSource};

/// Number of leading characters (weekday prefix) dropped from the feed's `Date` column.
const DATE_PREFIX_LEN: usize = 5;

/// Results feed published as a CSV spreadsheet export.
pub struct CsvFeed {
    http: Client,
    url: String,
}

impl CsvFeed {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CsvFeed {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for CsvFeed {
    fn name(&self) -> &str {
        "CsvFeed"
    }

    async fn fetch_rows(&self) -> Result<Vec<FeedRow>> {
        debug!("Fetching results feed from {}", self.url);

        let resp = self.http.get(&self.url).send().await.map_err(FeedError::from)?;
        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status()).into());
        }
        let body = resp.text().await.map_err(FeedError::from)?;

        Ok(parse_feed(&body)?)
    }
}

/// Column positions resolved from the header line.
struct Columns {
    date: usize,
    visitor: usize,
    visitor_pts: usize,
    home: usize,
    home_pts: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, FeedError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(FeedError::MissingColumn(name))
        };
        let pts: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.trim() == "PTS")
            .map(|(i, _)| i)
            .collect();

        let visitor_pts = *pts.first().ok_or(FeedError::MissingColumn("PTS"))?;
        // Exports that de-duplicate headers name the home column "PTS.1"
        let home_pts = match find("PTS.1") {
            Ok(i) => i,
            Err(_) => *pts.get(1).ok_or(FeedError::MissingColumn("PTS.1"))?,
        };

        Ok(Columns {
            date: find("Date")?,
            visitor: find("Visitor/Neutral")?,
            visitor_pts,
            home: find("Home/Neutral")?,
            home_pts,
        })
    }
}

/// Parse the results CSV into rows keyed by truncated date.
pub fn parse_feed(text: &str) -> Result<Vec<FeedRow>, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let columns = Columns::resolve(reader.headers()?)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1
        let line = i + 2;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(parse_row(&record, &columns, line)?);
    }
    Ok(rows)
}

fn parse_row(record: &StringRecord, columns: &Columns, line: usize) -> Result<FeedRow, FeedError> {
    let field = |idx: usize, name: &str| {
        record
            .get(idx)
            .map(str::trim)
            .ok_or_else(|| FeedError::MalformedRow {
                row: line,
                reason: format!("missing {} field", name),
            })
    };

    Ok(FeedRow {
        date: strip_date_prefix(field(columns.date, "Date")?, line)?,
        visitor: field(columns.visitor, "Visitor/Neutral")?.to_string(),
        visitor_score: parse_score(field(columns.visitor_pts, "PTS")?, line)?,
        home: field(columns.home, "Home/Neutral")?.to_string(),
        home_score: parse_score(field(columns.home_pts, "PTS.1")?, line)?,
    })
}

/// "Wed, Jan 5" -> "Jan 5"
fn strip_date_prefix(raw: &str, line: usize) -> Result<String, FeedError> {
    let rest: String = raw.chars().skip(DATE_PREFIX_LEN).collect();
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(FeedError::MalformedRow {
            row: line,
            reason: format!("date '{}' is too short", raw),
        });
    }
    Ok(rest.to_string())
}

/// Blank points mean the game has not been played yet.
fn parse_score(raw: &str, line: usize) -> Result<i64, FeedError> {
    if raw.is_empty() {
        return Ok(PLACEHOLDER_SCORE);
    }
    raw.parse::<i64>().map_err(|_| FeedError::MalformedRow {
        row: line,
        reason: format!("score '{}' is not an integer", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEDUPED: &str = "\
Date,Start (ET),Visitor/Neutral,PTS,Home/Neutral,PTS.1,Attend.,Notes
\"Wed, Jan 5\",7:30p,Celtics,99,Lakers,101,18997,
\"Thu, Jan 6\",8:00p,Knicks,88,Nets,90,17732,
";

    #[test]
    fn test_parse_deduplicated_headers() {
        let rows = parse_feed(DEDUPED).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            FeedRow {
                date: "Jan 5".into(),
                visitor: "Celtics".into(),
                visitor_score: 99,
                home: "Lakers".into(),
                home_score: 101,
            }
        );
        assert_eq!(rows[1].date, "Jan 6");
    }

    #[test]
    fn test_parse_repeated_pts_headers() {
        let csv = "Date,Visitor/Neutral,PTS,Home/Neutral,PTS\n\"Fri, Jan 7\",Heat,97,Bulls,95\n";
        let rows = parse_feed(csv).unwrap();
        assert_eq!(rows[0].visitor_score, 97);
        assert_eq!(rows[0].home_score, 95);
    }

    #[test]
    fn test_unplayed_game_gets_placeholder() {
        let csv = "Date,Visitor/Neutral,PTS,Home/Neutral,PTS.1\n\"Sat, Jan 8\",Heat,,Bulls,\n";
        let rows = parse_feed(csv).unwrap();
        assert_eq!(rows[0].visitor_score, PLACEHOLDER_SCORE);
        assert_eq!(rows[0].home_score, PLACEHOLDER_SCORE);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let csv = "Date,Visitor/Neutral,PTS,Home/Neutral,PTS.1\n,,,,\n\"Sat, Jan 8\",Heat,1,Bulls,2\n";
        assert_eq!(parse_feed(csv).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_column() {
        let csv = "Date,Visitor/Neutral,PTS,PTS.1\n";
        match parse_feed(csv) {
            Err(FeedError::MissingColumn(name)) => assert_eq!(name, "Home/Neutral"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_integer_score_reports_line() {
        let csv = "Date,Visitor/Neutral,PTS,Home/Neutral,PTS.1\n\"Sat, Jan 8\",Heat,1,Bulls,2\n\"Sun, Jan 9\",Heat,abc,Bulls,2\n";
        match parse_feed(csv) {
            Err(FeedError::MalformedRow { row, reason }) => {
                assert_eq!(row, 3);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_short_date_is_malformed() {
        let csv = "Date,Visitor/Neutral,PTS,Home/Neutral,PTS.1\nWed,Heat,1,Bulls,2\n";
        assert!(matches!(parse_feed(csv), Err(FeedError::MalformedRow { row: 2, .. })));
    }

    #[test]
    fn test_strip_date_prefix_is_char_aware() {
        assert_eq!(strip_date_prefix("Mié, Ene 5", 2).unwrap(), "Ene 5");
        assert_eq!(strip_date_prefix("Wed, Jan 5", 2).unwrap(), "Jan 5");
    }
}
