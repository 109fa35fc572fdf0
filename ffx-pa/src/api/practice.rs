//! Practice material endpoints
//!
//! POST /generate_questions and POST /generate_pair_exercise. Both render a
//! prompt template and pass it to the language model.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::info;

use crate::services::practice::{
    generate_pair_exercise as run_pair_exercise, generate_questions as run_questions,
    GeneratedQuestions, PairExercise, PairExerciseRequest, QuestionRequest,
};
use crate::{ApiError, ApiResult, AppState};

/// POST /generate_questions
pub async fn generate_questions(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> ApiResult<Json<GeneratedQuestions>> {
    let Json(request) = payload?;
    let count = request.validate()?;
    let llm = state
        .providers
        .llm
        .clone()
        .ok_or(ApiError::ProviderNotConfigured("OpenAI"))?;

    info!(industry = %request.industry, role = %request.role, count, "Generating questions");

    let generated = run_questions(llm.as_ref(), state.providers.prompts.as_deref(), &request).await?;
    Ok(Json(generated))
}

/// POST /generate_pair_exercise
pub async fn generate_pair_exercise(
    State(state): State<AppState>,
    payload: Result<Json<PairExerciseRequest>, JsonRejection>,
) -> ApiResult<Json<PairExercise>> {
    let Json(request) = payload?;
    request.validate()?;
    let llm = state
        .providers
        .llm
        .clone()
        .ok_or(ApiError::ProviderNotConfigured("OpenAI"))?;

    info!(target_phone = %request.target_phone, "Generating pair exercise");

    let exercise =
        run_pair_exercise(llm.as_ref(), state.providers.prompts.as_deref(), &request).await?;
    Ok(Json(exercise))
}

pub fn practice_routes() -> Router<AppState> {
    Router::new()
        .route("/generate_questions", post(generate_questions))
        .route("/generate_pair_exercise", post(generate_pair_exercise))
}
