use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::pipeline;
use crate::submission::record::SubmissionRecord;
use crate::submission::reference::ReferenceId;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(rename = "ref")]
    pub reference: ReferenceId,
    pub mailed: bool,
}

pub async fn submit(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, AppError> {
    let record = SubmissionRecord::from_body(&body).map_err(AppError::BadRequest)?;

    let result = pipeline::run(&state, record).await?;

    Ok(Json(SubmitResponse {
        ok: true,
        reference: result.reference,
        mailed: result.mailed,
    }))
}
