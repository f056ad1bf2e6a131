//! Insert-or-update decision for incoming game results.
//!
//! Every write to the games table goes through [`Reconciler::reconcile`]: bets
//! registered by the client (placeholder scores) and rows imported from the
//! results feed take the same path. A game is keyed by its date plus the
//! unordered team pair, so the feed may list the teams in the opposite order
//! from the client and still land on the same record.
//!
//! The existence check and the write run in one transaction while the
//! connection lock is held, so concurrent requests cannot insert the same game
//! twice.

use anyhow::Result;
use tracing::{debug, info};

use crate::db::models::GameResult;
use crate::db::{self, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted,
    Updated,
}

/// Counts from one feed import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Clone)]
pub struct Reconciler {
    db: Database,
}

impl Reconciler {
    pub fn new(db: Database) -> Self {
        Reconciler { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Store `result`, overwriting the scores of an existing game with the same key.
    ///
    /// Last write wins: a placeholder arriving after real scores replaces them.
    pub fn reconcile(&self, result: &GameResult) -> Result<ReconcileOutcome> {
        let outcome = self.db.write(|tx| {
            if db::record_exists(tx, &result.date, &result.team1, &result.team2)? {
                db::update(
                    tx,
                    &result.date,
                    &result.team1,
                    result.team1_score,
                    &result.team2,
                    result.team2_score,
                )?;
                Ok(ReconcileOutcome::Updated)
            } else {
                db::insert(tx, &result.clone().into_record())?;
                Ok(ReconcileOutcome::Inserted)
            }
        })?;
        debug!(
            "{:?} {} {} - {} {} on {}",
            outcome,
            result.team1,
            result.team1_score,
            result.team2_score,
            result.team2,
            result.date
        );
        Ok(outcome)
    }

    /// Register a bet on a game whose outcome is not known yet.
    pub fn record_bet(&self, date: &str, team1: &str, team2: &str) -> Result<ReconcileOutcome> {
        self.reconcile(&GameResult::placeholder(date, team1, team2))
    }

    /// Reconcile every result in order. Stops at the first failure; rows
    /// already written stay committed.
    pub fn ingest<I>(&self, results: I) -> Result<IngestSummary>
    where
        I: IntoIterator<Item = GameResult>,
    {
        let mut summary = IngestSummary::default();
        let mut pending = 0usize;
        for result in results {
            if result.is_placeholder() {
                pending += 1;
            }
            match self.reconcile(&result)? {
                ReconcileOutcome::Inserted => summary.inserted += 1,
                ReconcileOutcome::Updated => summary.updated += 1,
            }
        }
        info!(
            "Ingested {} games ({} new, {} updated, {} not yet played)",
            summary.total(),
            summary.inserted,
            summary.updated,
            pending
        );
        Ok(summary)
    }
}
