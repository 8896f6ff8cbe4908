//! "Report a problem" endpoint.
//!
//! Fire-and-forget mail to the operator mailbox. Delivery failures are
//! collapsed into one generic upstream error and never touch stored data.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::User;
use crate::notifications::ReportMailer;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub ok: bool,
}

pub async fn report_problem(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let content = req
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::missing_field("content"))?;

    let mailer = ReportMailer::new(state.config.email.clone());
    mailer.send_report(&user.email, content).await.map_err(|e| {
        tracing::error!("Failed to deliver problem report: {e}");
        ApiError::upstream("Failed to deliver report")
    })?;

    Ok(Json(ReportResponse { ok: true }))
}
