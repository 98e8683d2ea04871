use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path};
use crate::models::{Survey, SurveyResponse};
use crate::state::AppState;
use crate::store::{DashboardStats, NewResponse, NewSurvey, SurveyPatch, SurveyStats};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn list_surveys(State(state): State<AppState>) -> Json<Vec<Survey>> {
    Json(state.surveys.list())
}

pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Survey>> {
    Ok(Json(state.surveys.get(id)?))
}

pub async fn create_survey(
    State(state): State<AppState>,
    Json(new): Json<NewSurvey>,
) -> AppResult<(StatusCode, Json<Survey>)> {
    let survey = state.surveys.create(new)?;
    info!(survey_id = survey.id, name = %survey.name, "survey created");
    Ok((StatusCode::CREATED, Json(survey)))
}

pub async fn update_survey(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<SurveyPatch>,
) -> AppResult<Json<Survey>> {
    let survey = state.surveys.update(id, patch)?;
    info!(survey_id = survey.id, "survey updated");
    Ok(Json(survey))
}

pub async fn delete_survey(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<MessageResponse>> {
    let removed = state.surveys.delete(id)?;
    info!(survey_id = removed.id, name = %removed.name, "survey deleted");
    Ok(Json(MessageResponse {
        message: "survey deleted".to_string(),
    }))
}

pub async fn launch_survey(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Survey>> {
    let survey = state.surveys.launch(id)?;
    info!(survey_id = survey.id, "survey launched");
    Ok(Json(survey))
}

pub async fn close_survey(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Survey>> {
    let survey = state.surveys.close(id)?;
    info!(survey_id = survey.id, "survey closed");
    Ok(Json(survey))
}

pub async fn submit_response(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(new): Json<NewResponse>,
) -> AppResult<(StatusCode, Json<SurveyResponse>)> {
    let response = state.surveys.submit_response(id, new)?;
    info!(
        survey_id = id,
        response_id = response.id,
        channel = response.channel.as_str(),
        "survey response recorded"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_responses(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<Vec<SurveyResponse>> {
    Json(state.surveys.responses_for(id))
}

pub async fn list_all_responses(State(state): State<AppState>) -> Json<Vec<SurveyResponse>> {
    Json(state.surveys.all_responses())
}

pub async fn survey_stats(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<SurveyStats> {
    Json(state.surveys.stats(id))
}

pub async fn search_surveys(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Json<Vec<Survey>> {
    Json(state.surveys.search(&query))
}

pub async fn dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.surveys.dashboard_stats())
}

pub async fn export_survey(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Response> {
    let csv = state.surveys.export(id)?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"survey-{id}-export.csv\""),
        )
        .body(Body::from(csv))
        .map_err(|err| AppError::internal(format!("failed to build response: {err}")))
}
