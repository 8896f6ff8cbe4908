//! Game session models and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameSession {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub players: String,
    pub stake: String,
    pub location: Option<String>,
    pub rounds: i64,
    pub profit: i64,
    pub created_at: String,
}

/// Game session as returned on the wire. The owner is implicit in the
/// authenticated caller, so `user_id` is not exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSessionResponse {
    pub id: String,
    pub date: String,
    pub players: String,
    pub stake: String,
    pub location: Option<String>,
    pub rounds: i64,
    pub profit: i64,
}

impl From<GameSession> for GameSessionResponse {
    fn from(session: GameSession) -> Self {
        Self {
            id: session.id,
            date: session.date,
            players: session.players,
            stake: session.stake,
            location: session.location,
            rounds: session.rounds,
            profit: session.profit,
        }
    }
}

/// Integer field that clients may submit either as a JSON number or as a
/// numeric string (HTML form values arrive as strings).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntField {
    Number(i64),
    Text(String),
}

impl IntField {
    /// Whether the field carries any value at all (an empty or blank
    /// string counts as absent).
    pub fn is_present(&self) -> bool {
        match self {
            IntField::Number(_) => true,
            IntField::Text(s) => !s.trim().is_empty(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            IntField::Number(n) => Some(*n),
            IntField::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Raw submission for creating or replacing a game session. All fields are
/// optional at the serde level so that missing fields surface as structured
/// validation errors instead of deserialization failures.
#[derive(Debug, Deserialize)]
pub struct GameSessionRequest {
    pub date: Option<String>,
    pub players: Option<String>,
    pub stake: Option<String>,
    pub location: Option<String>,
    pub rounds: Option<IntField>,
    pub profit: Option<IntField>,
}

/// A fully validated game session submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameSession {
    pub date: NaiveDate,
    pub players: String,
    pub stake: String,
    pub location: Option<String>,
    pub rounds: i64,
    pub profit: i64,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Yearly aggregation over a caller's game sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    pub total_profit: i64,
    pub win_profit: i64,
    pub lose_profit: i64,
    pub total_rounds: i64,
}
