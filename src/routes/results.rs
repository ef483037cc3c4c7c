use crate::{
    dto::results_dto::{BatchResultsResponse, ScorePayload},
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

fn ensure_company_access(claims: &Claims, company_id: &str) -> Result<()> {
    if claims.can_access_company(company_id) {
        Ok(())
    } else {
        tracing::warn!(subject = %claims.sub, company_id, "Company access denied");
        Err(Error::Forbidden(format!(
            "Not authorized for company {}",
            company_id
        )))
    }
}

/// Empty bodies are allowed and mean "use the defaults".
fn parse_score_payload(body: &[u8]) -> Result<ScorePayload> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ScorePayload::default());
    }
    let payload: ScorePayload = serde_json::from_slice(body)?;
    payload.validate()?;
    Ok(payload)
}

#[axum::debug_handler]
pub async fn score_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((company_id, interview_id, candidate_id)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    ensure_company_access(&claims, &company_id)?;
    let payload = parse_score_payload(&body)?;

    let analytics = state
        .result_service
        .score_interview(
            &interview_id,
            &candidate_id,
            payload.candidate_name.as_deref(),
            payload.should_persist(),
        )
        .await?;
    Ok(Json(analytics))
}

#[axum::debug_handler]
pub async fn get_candidate_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((company_id, interview_id, candidate_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse> {
    ensure_company_access(&claims, &company_id)?;
    let report = state
        .result_service
        .get_report(&interview_id, &candidate_id)
        .await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn list_interview_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((company_id, interview_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    ensure_company_access(&claims, &company_id)?;
    let results = state
        .result_service
        .score_all_candidates(&interview_id, false)
        .await?;
    Ok(Json(BatchResultsResponse::new(interview_id, results)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_body_uses_defaults() {
        let payload = parse_score_payload(b"  \n").unwrap();
        assert!(payload.should_persist());
        assert!(payload.candidate_name.is_none());
    }

    #[test]
    fn body_is_validated() {
        let payload = parse_score_payload(br#"{"candidateName": "Ann", "persist": false}"#).unwrap();
        assert!(!payload.should_persist());

        let err = parse_score_payload(br#"{"candidateName": ""}"#).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(matches!(parse_score_payload(b"{oops").unwrap_err(), Error::Json(_)));
    }
}
