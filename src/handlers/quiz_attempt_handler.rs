use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{StartAttemptRequest, SubmitAttemptRequest},
        response::AttemptSummary,
    },
};

#[post("/attempts")]
async fn start_attempt(
    state: web::Data<AppState>,
    request: web::Json<StartAttemptRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let started = state
        .attempt_service
        .start_attempt(&auth.0, &request.enrollment_id, &request.quiz_id)
        .await?;
    let view = state
        .attempt_service
        .attempt_view(&started.attempt, started.resumed)
        .await?;

    if started.resumed {
        Ok(HttpResponse::Ok().json(view))
    } else {
        Ok(HttpResponse::Created().json(view))
    }
}

#[post("/attempts/{id}/submit")]
async fn submit_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAttemptRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state
        .attempt_service
        .submit_attempt(&auth.0, &id, request.into_inner().answers)
        .await?;
    let view = state.attempt_service.attempt_view(&attempt, false).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/attempts/{id}")]
async fn get_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state.attempt_service.get_attempt(&auth.0, &id).await?;
    let view = state.attempt_service.attempt_view(&attempt, false).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/enrollments/{enrollment_id}/quizzes/{quiz_id}/attempts")]
async fn list_attempts(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (enrollment_id, quiz_id) = path.into_inner();
    let attempts = state
        .attempt_service
        .list_attempts(&auth.0, &enrollment_id, &quiz_id)
        .await?;

    let summaries: Vec<AttemptSummary> = attempts.iter().map(AttemptSummary::from).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(start_attempt)
        .service(submit_attempt)
        .service(get_attempt)
        .service(list_attempts);
}
