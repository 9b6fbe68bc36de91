use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    auth::Redemption,
    error::{AppError, Result},
    files::display_path,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct CheckCodeQuery {
    pub code: Option<String>,
    pub dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckCodeResponse {
    pub ok: bool,
    pub token: String,
}

/// Trades a one-time code for a single-use upload token.
///
/// The target directory is confined before the code is looked at so a bad
/// `dir` never burns a code.
pub async fn check_code(
    State(state): State<AppState>,
    Query(query): Query<CheckCodeQuery>,
) -> Result<Json<CheckCodeResponse>> {
    let dir = query.dir.unwrap_or_default();
    state.confiner.confine(&dir)?;

    let code = query.code.unwrap_or_default();
    if let Redemption::Rejected(reason) = state.codes.redeem(&code).await? {
        return Err(AppError::Forbidden(reason.to_string()));
    }

    let token = state.tokens.issue(state.token_ttl);
    info!(dir = %display_path(&dir), ttl_secs = state.token_ttl.as_secs(), "Upload token issued");

    Ok(Json(CheckCodeResponse { ok: true, token }))
}
