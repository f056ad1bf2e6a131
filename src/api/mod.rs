use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::db::models::{ClearOutcome, GameInfo};
use crate::feed::{self, FeedSource};
use crate::reconcile::Reconciler;

pub const STORED_MESSAGE: &str = "Data has been stored in table";
pub const NO_SUCH_GAME: &str = "No such game";
pub const SCRAPED_MESSAGE: &str = "Data scraped";
pub const TABLE_REMOVED: &str = "Table removed from Database";
pub const NO_SUCH_TABLE: &str = "No such table";
pub const TABLE_EMPTY: &str = "Table is empty";
pub const NOTHING_IN_DATABASE: &str = "Nothing in database";

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Reconciler,
    pub feed: Arc<dyn FeedSource>,
}

type HandlerResult<T> = Result<T, (StatusCode, String)>;

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!("Request failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

/// Build the Axum router for the client API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sendGameInfo/:team1/:team2/:date", get(send_game_info))
        .route("/getGameInfo/:team1/:team2/:date", get(get_game_info))
        .route("/scrape", get(scrape))
        .route("/clearDatabase", get(clear_database))
        .route("/checkDatabase", get(check_database))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /sendGameInfo/:team1/:team2/:date
///
/// Registers a bet on a game that has not been played yet.
async fn send_game_info(
    State(state): State<Arc<AppState>>,
    Path((team1, team2, date)): Path<(String, String, String)>,
) -> HandlerResult<&'static str> {
    state
        .reconciler
        .record_bet(&date, &team1, &team2)
        .map_err(internal)?;
    Ok(STORED_MESSAGE)
}

/// GET /getGameInfo/:team1/:team2/:date
async fn get_game_info(
    State(state): State<Arc<AppState>>,
    Path((team1, team2, date)): Path<(String, String, String)>,
) -> HandlerResult<Response> {
    let record = state
        .reconciler
        .db()
        .get_record(&date, &team1, &team2)
        .map_err(internal)?;
    Ok(match record {
        Some(r) => {
            if r.is_placeholder() {
                debug!("{} vs {} on {} has no final score yet", r.team1, r.team2, r.date);
            }
            Json(GameInfo::from(r)).into_response()
        }
        None => NO_SUCH_GAME.into_response(),
    })
}

/// GET /scrape
async fn scrape(State(state): State<Arc<AppState>>) -> HandlerResult<&'static str> {
    let summary = feed::import(state.feed.as_ref(), &state.reconciler)
        .await
        .map_err(internal)?;
    info!(
        "Scrape finished: {} new, {} updated",
        summary.inserted, summary.updated
    );
    Ok(SCRAPED_MESSAGE)
}

/// GET /clearDatabase
async fn clear_database(State(state): State<Arc<AppState>>) -> HandlerResult<&'static str> {
    let outcome = state.reconciler.db().clear_table().map_err(internal)?;
    Ok(match outcome {
        ClearOutcome::Removed => {
            info!("Games table dropped");
            TABLE_REMOVED
        }
        ClearOutcome::NoSuchTable => NO_SUCH_TABLE,
    })
}

/// GET /checkDatabase
async fn check_database(State(state): State<Arc<AppState>>) -> HandlerResult<String> {
    let rows = state.reconciler.db().dump_all().map_err(internal)?;
    Ok(match rows {
        None => NOTHING_IN_DATABASE.to_string(),
        Some(rows) if rows.is_empty() => TABLE_EMPTY.to_string(),
        Some(rows) => {
            let rendered: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
            format!("[{}]", rendered.join(", "))
        }
    })
}
