use anyhow::{anyhow, Context, Result};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

/// Process-wide handle to the games database (single connection behind a mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Create the games table if it is missing (idempotent)
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// Run `f` inside a transaction that is committed on success.
    ///
    /// The table is recreated first, so writes succeed after a clear.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA_SQL)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn table_exists(&self) -> Result<bool> {
        let conn = self.lock()?;
        table_exists(&conn)
    }

    /// True iff a game with this date and unordered team pair is stored
    #[allow(dead_code)]
    pub fn record_exists(&self, date: &str, team_a: &str, team_b: &str) -> Result<bool> {
        let conn = self.lock()?;
        record_exists(&conn, date, team_a, team_b)
    }

    /// First stored game matching the date and unordered team pair, in stored team order
    pub fn get_record(&self, date: &str, team_a: &str, team_b: &str) -> Result<Option<GameRecord>> {
        let conn = self.lock()?;
        get_record(&conn, date, team_a, team_b)
    }

    /// Every stored game in storage order. `None` when the table does not exist.
    pub fn dump_all(&self) -> Result<Option<Vec<GameRecord>>> {
        let conn = self.lock()?;
        if !table_exists(&conn)? {
            return Ok(None);
        }
        let mut stmt = conn.prepare(
            "SELECT team1, team1Score, team2, team2Score, date
             FROM games_and_scores ORDER BY rowid",
        )?;
        let records = stmt
            .query_map([], map_game_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(records))
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Append a row verbatim; the caller is responsible for checking existence
    #[allow(dead_code)]
    pub fn insert(&self, record: &GameRecord) -> Result<()> {
        self.write(|tx| insert(tx, record))
    }

    /// Overwrite the scores of the stored game matching `{team_a, team_b}` on `date`.
    /// Returns the number of rows changed.
    #[allow(dead_code)]
    pub fn update(
        &self,
        date: &str,
        team_a: &str,
        score_a: i64,
        team_b: &str,
        score_b: i64,
    ) -> Result<usize> {
        self.write(|tx| update(tx, date, team_a, score_a, team_b, score_b))
    }

    /// Drop the games table
    pub fn clear_table(&self) -> Result<ClearOutcome> {
        let conn = self.lock()?;
        if !table_exists(&conn)? {
            return Ok(ClearOutcome::NoSuchTable);
        }
        conn.execute_batch("DROP TABLE games_and_scores;")?;
        Ok(ClearOutcome::Removed)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────
//
// Shared by the `Database` methods and by callers that need several statements
// under one transaction.

pub(crate) fn table_exists(conn: &Connection) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='games_and_scores'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn record_exists(conn: &Connection, date: &str, team_a: &str, team_b: &str) -> Result<bool> {
    Ok(get_record(conn, date, team_a, team_b)?.is_some())
}

pub(crate) fn get_record(
    conn: &Connection,
    date: &str,
    team_a: &str,
    team_b: &str,
) -> Result<Option<GameRecord>> {
    if !table_exists(conn)? {
        return Ok(None);
    }
    let record = conn
        .query_row(
            "SELECT team1, team1Score, team2, team2Score, date
             FROM games_and_scores
             WHERE date = ?1
               AND ((team1 = ?2 AND team2 = ?3) OR (team1 = ?3 AND team2 = ?2))
             ORDER BY rowid LIMIT 1",
            params![date, team_a, team_b],
            map_game_record,
        )
        .optional()?;
    Ok(record)
}

pub(crate) fn insert(conn: &Connection, record: &GameRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO games_and_scores (team1, team1Score, team2, team2Score, date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.team1,
            record.team1_score.to_string(),
            record.team2,
            record.team2_score.to_string(),
            record.date,
        ],
    )?;
    Ok(())
}

/// Scores follow team identity: `score_a` lands in whichever column holds `team_a`.
pub(crate) fn update(
    conn: &Connection,
    date: &str,
    team_a: &str,
    score_a: i64,
    team_b: &str,
    score_b: i64,
) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE games_and_scores
         SET team1Score = CASE WHEN team1 = ?2 THEN ?3 ELSE ?5 END,
             team2Score = CASE WHEN team1 = ?2 THEN ?5 ELSE ?3 END
         WHERE date = ?1
           AND ((team1 = ?2 AND team2 = ?4) OR (team1 = ?4 AND team2 = ?2))",
        params![date, team_a, score_a.to_string(), team_b, score_b.to_string()],
    )?;
    Ok(changed)
}

fn map_game_record(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        team1: row.get(0)?,
        team1_score: score_at(row, 1)?,
        team2: row.get(2)?,
        team2_score: score_at(row, 3)?,
        date: row.get(4)?,
    })
}

/// Scores are stored as TEXT so the `-1` sentinel sits alongside real values.
fn score_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<i64> {
    match row.get_ref(idx)? {
        ValueRef::Integer(v) => Ok(v),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?
            .trim()
            .parse::<i64>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "score".to_string(),
            other.data_type(),
        )),
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS games_and_scores (
    team1       TEXT,
    team1Score  TEXT,
    team2       TEXT,
    team2Score  TEXT,
    date        TEXT
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open(":memory:").unwrap()
    }

    fn record(team1: &str, s1: i64, team2: &str, s2: i64, date: &str) -> GameRecord {
        GameRecord {
            team1: team1.into(),
            team1_score: s1,
            team2: team2.into(),
            team2_score: s2,
            date: date.into(),
        }
    }

    #[test]
    fn test_open_creates_table() {
        let db = db();
        assert!(db.table_exists().unwrap());
        assert_eq!(db.dump_all().unwrap(), Some(vec![]));
    }

    #[test]
    fn test_lookup_is_order_independent() {
        let db = db();
        db.insert(&record("Lakers", -1, "Celtics", -1, "Jan 5")).unwrap();

        assert!(db.record_exists("Jan 5", "Lakers", "Celtics").unwrap());
        assert!(db.record_exists("Jan 5", "Celtics", "Lakers").unwrap());

        let found = db.get_record("Jan 5", "Celtics", "Lakers").unwrap().unwrap();
        assert_eq!(found.team1, "Lakers");
        assert_eq!(found.team2, "Celtics");
    }

    #[test]
    fn test_lookup_requires_exact_match() {
        let db = db();
        db.insert(&record("Lakers", -1, "Celtics", -1, "Jan 5")).unwrap();

        assert!(!db.record_exists("Jan 6", "Lakers", "Celtics").unwrap());
        assert!(!db.record_exists("Jan 5", "lakers", "Celtics").unwrap());
        assert!(!db.record_exists("Jan 5", "Lakers", "Lakers").unwrap());
    }

    #[test]
    fn test_update_assigns_scores_by_team() {
        let db = db();
        db.insert(&record("Lakers", -1, "Celtics", -1, "Jan 5")).unwrap();

        let changed = db.update("Jan 5", "Celtics", 99, "Lakers", 101).unwrap();
        assert_eq!(changed, 1);

        let found = db.get_record("Jan 5", "Lakers", "Celtics").unwrap().unwrap();
        assert_eq!(found, record("Lakers", 101, "Celtics", 99, "Jan 5"));
    }

    #[test]
    fn test_update_missing_row_changes_nothing() {
        let db = db();
        assert_eq!(db.update("Jan 5", "Lakers", 1, "Celtics", 2).unwrap(), 0);
    }

    #[test]
    fn test_clear_then_reads_report_missing_table() {
        let db = db();
        db.insert(&record("Lakers", 101, "Celtics", 99, "Jan 5")).unwrap();

        assert_eq!(db.clear_table().unwrap(), ClearOutcome::Removed);
        assert_eq!(db.clear_table().unwrap(), ClearOutcome::NoSuchTable);

        assert!(!db.table_exists().unwrap());
        assert_eq!(db.dump_all().unwrap(), None);
        assert_eq!(db.get_record("Jan 5", "Lakers", "Celtics").unwrap(), None);
        assert!(!db.record_exists("Jan 5", "Lakers", "Celtics").unwrap());
    }

    #[test]
    fn test_insert_after_clear_recreates_table() {
        let db = db();
        db.clear_table().unwrap();
        db.insert(&record("Knicks", 88, "Nets", 90, "Feb 1")).unwrap();

        assert!(db.table_exists().unwrap());
        assert_eq!(db.dump_all().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_dump_all_keeps_storage_order() {
        let db = db();
        db.insert(&record("B", 1, "A", 2, "Jan 1")).unwrap();
        db.insert(&record("C", 3, "D", 4, "Jan 2")).unwrap();

        let rows = db.dump_all().unwrap().unwrap();
        assert_eq!(rows[0], record("B", 1, "A", 2, "Jan 1"));
        assert_eq!(rows[1], record("C", 3, "D", 4, "Jan 2"));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let db = db();
        let result: Result<()> = db.write(|tx| {
            insert(tx, &record("Lakers", 1, "Celtics", 2, "Jan 5"))?;
            anyhow::bail!("boom")
        });
        assert!(result.is_err());
        assert_eq!(db.dump_all().unwrap(), Some(vec![]));
    }

    #[test]
    fn test_integer_scores_are_read_back() {
        let db = db();
        {
            let conn = db.lock().unwrap();
            conn.execute(
                "INSERT INTO games_and_scores VALUES ('Heat', 97, 'Bulls', -1, 'Mar 3')",
                [],
            )
            .unwrap();
        }
        let found = db.get_record("Mar 3", "Bulls", "Heat").unwrap().unwrap();
        assert_eq!(found, record("Heat", 97, "Bulls", -1, "Mar 3"));
    }
}
