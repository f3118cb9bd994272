pub mod enrollment_handler;
pub mod health_handler;
pub mod quiz_attempt_handler;
pub mod quiz_handler;

use actix_web::web;

use crate::errors::AppError;

/// Routes served under `/api`; callers wrap the scope with `AuthMiddleware`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    quiz_attempt_handler::configure(cfg);
    quiz_handler::configure(cfg);
    enrollment_handler::configure(cfg);
}

/// Malformed JSON bodies become `VALIDATION_ERROR` responses.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejected request body: {}", err);
        AppError::ValidationError(err.to_string()).into()
    })
}
