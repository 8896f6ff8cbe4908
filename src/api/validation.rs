//! Input validation for game session submissions.
//!
//! Checks run in a fixed order: presence of every mandatory field first,
//! then formats, then the rounds range. The first failure wins and is
//! returned as a structured `ApiError`.

use chrono::NaiveDate;

use super::error::ApiError;
use crate::db::{GameSessionRequest, IntField, NewGameSession};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn require_text<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}

fn require_int<'a>(value: &'a Option<IntField>, field: &str) -> Result<&'a IntField, ApiError> {
    match value {
        Some(v) if v.is_present() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}

/// Parse an ISO calendar date, used for both record dates and the list
/// date filter.
pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ApiError::bad_format(field, format!("{field} must be an ISO date (YYYY-MM-DD)")))
}

/// Validate a create/update submission into a [`NewGameSession`].
pub fn validate_session_request(req: &GameSessionRequest) -> Result<NewGameSession, ApiError> {
    // (a) presence of all mandatory fields
    let date = require_text(&req.date, "date")?;
    let players = require_text(&req.players, "players")?;
    let stake = require_text(&req.stake, "stake")?;
    let rounds = require_int(&req.rounds, "rounds")?;
    let profit = require_int(&req.profit, "profit")?;

    // (b) date format
    let date = parse_date(date, "date")?;

    // (c) integer formats
    let rounds = rounds
        .as_i64()
        .ok_or_else(|| ApiError::bad_format("rounds", "rounds must be an integer"))?;
    let profit = profit
        .as_i64()
        .ok_or_else(|| ApiError::bad_format("profit", "profit must be an integer"))?;

    // (d) range
    if rounds <= 0 {
        return Err(ApiError::non_positive_rounds());
    }

    let location = req
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from);

    Ok(NewGameSession {
        date,
        players: players.to_string(),
        stake: stake.to_string(),
        location,
        rounds,
        profit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;

    fn request(json: serde_json::Value) -> GameSessionRequest {
        serde_json::from_value(json).unwrap()
    }

    fn valid() -> serde_json::Value {
        serde_json::json!({
            "date": "2026-04-12",
            "players": "A, B, C, D",
            "stake": "50/100",
            "location": "Club",
            "rounds": 16,
            "profit": -300,
        })
    }

    #[test]
    fn accepts_a_complete_submission() {
        let record = validate_session_request(&request(valid())).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 4, 12).unwrap());
        assert_eq!(record.rounds, 16);
        assert_eq!(record.profit, -300);
        assert_eq!(record.location.as_deref(), Some("Club"));
    }

    #[test]
    fn location_is_optional() {
        let mut json = valid();
        json.as_object_mut().unwrap().remove("location");
        let record = validate_session_request(&request(json)).unwrap();
        assert!(record.location.is_none());

        let mut json = valid();
        json["location"] = serde_json::json!("   ");
        let record = validate_session_request(&request(json)).unwrap();
        assert!(record.location.is_none());
    }

    #[test]
    fn every_mandatory_field_is_required() {
        for field in ["date", "players", "stake", "rounds", "profit"] {
            let mut json = valid();
            json.as_object_mut().unwrap().remove(field);
            let err = validate_session_request(&request(json)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::MissingField, "missing {field}");

            let mut json = valid();
            json[field] = serde_json::json!("");
            let err = validate_session_request(&request(json)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::MissingField, "empty {field}");
        }
    }

    #[test]
    fn presence_is_checked_before_format() {
        // Bad date format AND missing stake: the missing field wins
        let mut json = valid();
        json["date"] = serde_json::json!("12/04/2026");
        json.as_object_mut().unwrap().remove("stake");
        let err = validate_session_request(&request(json)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingField);
    }

    #[test]
    fn rejects_non_iso_dates() {
        for bad in ["2026-13-01", "2026-02-30", "04/12/2026", "yesterday"] {
            let mut json = valid();
            json["date"] = serde_json::json!(bad);
            let err = validate_session_request(&request(json)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::BadFormat, "date {bad}");
        }
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let mut json = valid();
        json["rounds"] = serde_json::json!("8");
        json["profit"] = serde_json::json!("-40");
        let record = validate_session_request(&request(json)).unwrap();
        assert_eq!(record.rounds, 8);
        assert_eq!(record.profit, -40);
    }

    #[test]
    fn non_numeric_strings_are_bad_format() {
        let mut json = valid();
        json["rounds"] = serde_json::json!("eight");
        let err = validate_session_request(&request(json)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadFormat);

        let mut json = valid();
        json["profit"] = serde_json::json!("lots");
        let err = validate_session_request(&request(json)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadFormat);
    }

    #[test]
    fn rounds_must_be_positive() {
        for bad in [0, -3] {
            let mut json = valid();
            json["rounds"] = serde_json::json!(bad);
            let err = validate_session_request(&request(json)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::NonPositiveRounds, "rounds {bad}");
        }

        let mut json = valid();
        json["rounds"] = serde_json::json!(1);
        assert!(validate_session_request(&request(json)).is_ok());
    }
}
