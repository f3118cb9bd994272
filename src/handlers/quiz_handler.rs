use actix_web::{delete, get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_staff, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{AddQuestionRequest, CreateQuizRequest},
        response::{ApiResponse, DeleteQuizResponse, QuestionDto, QuizResponse},
    },
};

#[post("/quizzes")]
async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .create_quiz(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(QuizResponse::new(&quiz, &[], true)))
}

/// Students see published quizzes without the answer key.
#[get("/quizzes/{id}")]
async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(&id).await?;
    let is_staff = auth.0.is_staff();

    if !is_staff && !quiz.is_published {
        return Err(AppError::QuizNotFound(format!(
            "Quiz with id '{}' not found",
            id
        )));
    }

    let questions = state.quiz_service.get_questions(&id).await?;
    Ok(HttpResponse::Ok().json(QuizResponse::new(&quiz, &questions, is_staff)))
}

#[get("/quizzes/{id}/questions")]
async fn list_questions(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let questions = state.quiz_service.get_questions_fresh(&id).await?;
    let body: Vec<QuestionDto> = questions.iter().map(|q| QuestionDto::new(q, true)).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[post("/quizzes/{id}/questions")]
async fn add_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<AddQuestionRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let question = state
        .quiz_service
        .add_question(&auth.0, &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(QuestionDto::new(&question, true)))
}

#[post("/quizzes/{id}/publish")]
async fn publish_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.publish_quiz(&auth.0, &id).await?;
    let questions = state.quiz_service.get_questions(&id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse {
        data: QuizResponse::new(&quiz, &questions, true),
        message: "Quiz published".to_string(),
    }))
}

#[delete("/quizzes/{id}")]
async fn delete_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.quiz_service.delete_quiz(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(DeleteQuizResponse {
        message: format!("Quiz '{}' deleted", id),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_quiz)
        .service(list_questions)
        .service(add_question)
        .service(publish_quiz)
        .service(get_quiz)
        .service(delete_quiz);
}
