//! Game session CRUD and yearly summaries, scoped to the authenticated
//! caller. Ownership checks never distinguish "someone else's record"
//! from "no such record": both are 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use super::validation::{parse_date, validate_session_request};
use crate::db::{
    CreatedResponse, DbPool, GameSession, GameSessionRequest, GameSessionResponse, NewGameSession,
    User, YearSummary,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub year: Option<i32>,
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// -------------------------------------------------------------------------
// Store operations
// -------------------------------------------------------------------------

pub(crate) async fn insert_session(
    pool: &DbPool,
    user_id: &str,
    record: &NewGameSession,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO game_sessions (id, user_id, date, players, stake, location, rounds, profit, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(date_string(record.date))
    .bind(&record.players)
    .bind(&record.stake)
    .bind(&record.location)
    .bind(record.rounds)
    .bind(record.profit)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Owner's sessions, optionally filtered to one date, ordered by date
/// ascending. rowid breaks same-date ties in insertion order.
pub(crate) async fn find_sessions(
    pool: &DbPool,
    user_id: &str,
    date: Option<NaiveDate>,
) -> Result<Vec<GameSession>, sqlx::Error> {
    match date {
        Some(date) => {
            sqlx::query_as(
                "SELECT * FROM game_sessions WHERE user_id = ? AND date = ? ORDER BY date ASC, rowid ASC",
            )
            .bind(user_id)
            .bind(date_string(date))
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM game_sessions WHERE user_id = ? ORDER BY date ASC, rowid ASC",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await
        }
    }
}

pub(crate) async fn find_session(
    pool: &DbPool,
    user_id: &str,
    id: &str,
) -> Result<Option<GameSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM game_sessions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Wholesale replacement of the mutable fields; created_at is untouched.
/// Returns the number of rows changed (0 when absent or not owned).
pub(crate) async fn replace_session(
    pool: &DbPool,
    user_id: &str,
    id: &str,
    record: &NewGameSession,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE game_sessions
        SET date = ?, players = ?, stake = ?, location = ?, rounds = ?, profit = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(date_string(record.date))
    .bind(&record.players)
    .bind(&record.stake)
    .bind(&record.location)
    .bind(record.rounds)
    .bind(record.profit)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn delete_session_row(
    pool: &DbPool,
    user_id: &str,
    id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM game_sessions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// (profit, rounds) pairs for the caller's sessions inside one calendar
/// year, Jan 1 through Dec 31 inclusive.
pub(crate) async fn sessions_in_year(
    pool: &DbPool,
    user_id: &str,
    year: i32,
) -> Result<Vec<(i64, i64)>, sqlx::Error> {
    let start = format!("{year:04}-01-01");
    let end = format!("{year:04}-12-31");

    sqlx::query_as(
        "SELECT profit, rounds FROM game_sessions WHERE user_id = ? AND date >= ? AND date <= ?",
    )
    .bind(user_id)
    .bind(&start)
    .bind(&end)
    .fetch_all(pool)
    .await
}

/// Single scan-and-fold over (profit, rounds) pairs.
pub(crate) fn summarize(rows: impl IntoIterator<Item = (i64, i64)>) -> YearSummary {
    rows.into_iter()
        .fold(YearSummary::default(), |mut acc, (profit, rounds)| {
            acc.total_profit += profit;
            if profit > 0 {
                acc.win_profit += profit;
            } else if profit < 0 {
                acc.lose_profit += profit;
            }
            acc.total_rounds += rounds;
            acc
        })
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Record a new game session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<GameSessionRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let record = validate_session_request(&req)?;
    let id = insert_session(&state.db, &user.id, &record).await?;

    tracing::debug!(user_id = %user.id, session_id = %id, "game session created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// List the caller's game sessions, optionally for one exact date
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<GameSessionResponse>>, ApiError> {
    let filter = match params.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_date(raw, "date")?),
        _ => None,
    };

    let sessions = find_sessions(&state.db, &user.id, filter).await?;
    Ok(Json(
        sessions.into_iter().map(GameSessionResponse::from).collect(),
    ))
}

/// Fetch one of the caller's game sessions
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<GameSessionResponse>, ApiError> {
    let session = find_session(&state.db, &user.id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    Ok(Json(GameSessionResponse::from(session)))
}

/// Replace one of the caller's game sessions. Runs the same validation
/// as create.
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<GameSessionRequest>,
) -> Result<Json<GameSessionResponse>, ApiError> {
    let record = validate_session_request(&req)?;

    let changed = replace_session(&state.db, &user.id, &id, &record).await?;
    if changed == 0 {
        return Err(ApiError::not_found("Session not found"));
    }

    let session = find_session(&state.db, &user.id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;
    Ok(Json(GameSessionResponse::from(session)))
}

/// Hard-delete one of the caller's game sessions
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = delete_session_row(&state.db, &user.id, &id).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Session not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Yearly win/loss/rounds summary
pub async fn year_summary(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(params): Query<SummaryParams>,
) -> Result<Json<YearSummary>, ApiError> {
    let year = params.year.ok_or_else(ApiError::missing_year)?;

    let rows = sessions_in_year(&state.db, &user.id, year).await?;
    Ok(Json(summarize(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_test_user, test_pool};

    fn record(date: &str, rounds: i64, profit: i64) -> NewGameSession {
        NewGameSession {
            date: date.parse().unwrap(),
            players: "A, B, C, D".to_string(),
            stake: "10/20".to_string(),
            location: Some("Home".to_string()),
            rounds,
            profit,
        }
    }

    #[test]
    fn summarize_splits_wins_and_losses() {
        let summary = summarize(vec![(100, 4), (-40, 8), (0, 2)]);
        assert_eq!(summary.total_profit, 60);
        assert_eq!(summary.win_profit, 100);
        assert_eq!(summary.lose_profit, -40);
        assert_eq!(summary.total_rounds, 14);
    }

    #[test]
    fn summarize_empty_is_all_zero() {
        assert_eq!(summarize(vec![]), YearSummary::default());
    }

    #[tokio::test]
    async fn created_session_round_trips_every_field() {
        let pool = test_pool().await;
        let user_id = insert_test_user(&pool, "g-10", "rt@example.com").await;

        let input = record("2026-02-14", 12, -250);
        let id = insert_session(&pool, &user_id, &input).await.unwrap();

        let stored = find_session(&pool, &user_id, &id).await.unwrap().unwrap();
        assert_eq!(stored.date, "2026-02-14");
        assert_eq!(stored.players, input.players);
        assert_eq!(stored.stake, input.stake);
        assert_eq!(stored.location, input.location);
        assert_eq!(stored.rounds, 12);
        assert_eq!(stored.profit, -250);
        assert!(!stored.created_at.is_empty());
    }

    #[tokio::test]
    async fn ownership_is_indistinguishable_from_absence() {
        let pool = test_pool().await;
        let owner = insert_test_user(&pool, "g-11", "owner@example.com").await;
        let other = insert_test_user(&pool, "g-12", "other@example.com").await;

        let id = insert_session(&pool, &owner, &record("2026-03-01", 8, 100))
            .await
            .unwrap();

        assert!(find_session(&pool, &other, &id).await.unwrap().is_none());
        assert_eq!(
            replace_session(&pool, &other, &id, &record("2026-03-02", 4, 0))
                .await
                .unwrap(),
            0
        );
        assert_eq!(delete_session_row(&pool, &other, &id).await.unwrap(), 0);

        // Untouched for the owner
        let stored = find_session(&pool, &owner, &id).await.unwrap().unwrap();
        assert_eq!(stored.date, "2026-03-01");
    }

    #[tokio::test]
    async fn list_orders_by_date_then_insertion() {
        let pool = test_pool().await;
        let user_id = insert_test_user(&pool, "g-13", "list@example.com").await;

        let second = insert_session(&pool, &user_id, &record("2026-05-01", 4, 10))
            .await
            .unwrap();
        let first = insert_session(&pool, &user_id, &record("2026-04-01", 4, 20))
            .await
            .unwrap();
        let third = insert_session(&pool, &user_id, &record("2026-05-01", 4, 30))
            .await
            .unwrap();

        let all = find_sessions(&pool, &user_id, None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str(), third.as_str()]);

        let filtered = find_sessions(&pool, &user_id, "2026-05-01".parse().ok())
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|s| s.date == "2026-05-01"));
    }

    #[tokio::test]
    async fn replace_is_wholesale_and_keeps_created_at() {
        let pool = test_pool().await;
        let user_id = insert_test_user(&pool, "g-14", "upd@example.com").await;

        let id = insert_session(&pool, &user_id, &record("2026-06-01", 8, 500))
            .await
            .unwrap();
        let before = find_session(&pool, &user_id, &id).await.unwrap().unwrap();

        let mut replacement = record("2026-06-02", 16, -100);
        replacement.location = None;
        assert_eq!(
            replace_session(&pool, &user_id, &id, &replacement)
                .await
                .unwrap(),
            1
        );

        let after = find_session(&pool, &user_id, &id).await.unwrap().unwrap();
        assert_eq!(after.date, "2026-06-02");
        assert_eq!(after.rounds, 16);
        assert_eq!(after.profit, -100);
        assert!(after.location.is_none());
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn delete_is_hard() {
        let pool = test_pool().await;
        let user_id = insert_test_user(&pool, "g-15", "del@example.com").await;

        let id = insert_session(&pool, &user_id, &record("2026-07-01", 4, 0))
            .await
            .unwrap();
        assert_eq!(delete_session_row(&pool, &user_id, &id).await.unwrap(), 1);
        assert!(find_session(&pool, &user_id, &id).await.unwrap().is_none());
        // A second delete finds nothing
        assert_eq!(delete_session_row(&pool, &user_id, &id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn year_window_is_inclusive_and_owner_scoped() {
        let pool = test_pool().await;
        let user_id = insert_test_user(&pool, "g-16", "year@example.com").await;
        let other = insert_test_user(&pool, "g-17", "noise@example.com").await;

        insert_session(&pool, &user_id, &record("2026-01-01", 4, 100))
            .await
            .unwrap();
        insert_session(&pool, &user_id, &record("2026-12-31", 8, -40))
            .await
            .unwrap();
        insert_session(&pool, &user_id, &record("2026-06-15", 2, 0))
            .await
            .unwrap();
        // Outside the window or owned by someone else
        insert_session(&pool, &user_id, &record("2025-12-31", 10, 999))
            .await
            .unwrap();
        insert_session(&pool, &other, &record("2026-06-15", 10, 999))
            .await
            .unwrap();

        let summary = summarize(sessions_in_year(&pool, &user_id, 2026).await.unwrap());
        assert_eq!(summary.total_profit, 60);
        assert_eq!(summary.win_profit, 100);
        assert_eq!(summary.lose_profit, -40);
        assert_eq!(summary.total_rounds, 14);

        let empty = summarize(sessions_in_year(&pool, &user_id, 2019).await.unwrap());
        assert_eq!(empty, YearSummary::default());
    }
}
