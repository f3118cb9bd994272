use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{request::EnrollRequest, response::EnrollmentResponse},
};

#[post("/enrollments")]
async fn enroll(
    state: web::Data<AppState>,
    request: web::Json<EnrollRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let enrollment = state
        .enrollment_service
        .enroll(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)))
}

#[get("/enrollments/{id}")]
async fn get_enrollment(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let enrollment = state.enrollment_service.get_enrollment(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(enroll).service(get_enrollment);
}
