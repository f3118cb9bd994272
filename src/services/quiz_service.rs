use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::Utc;
use moka::future::Cache;
use validator::Validate;

use crate::{
    auth::{require_staff, Claims, UserRole},
    errors::{AppError, AppResult},
    models::{
        domain::{QuestionKind, Quiz, QuizQuestion},
        dto::request::{AddQuestionRequest, CreateQuizRequest},
    },
    repositories::QuizRepository,
};

/// Quiz authoring plus cached display reads.
///
/// The cache only serves presentation. Grading goes through the `*_fresh`
/// methods so a changed answer key is never read from a stale entry.
pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
    quizzes: Cache<String, Arc<Quiz>>,
    questions: Cache<String, Arc<Vec<QuizQuestion>>>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>, ttl_seconds: u64, max_capacity: u64) -> Self {
        let ttl = Duration::from_secs(ttl_seconds);

        Self {
            repository,
            quizzes: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            questions: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<Arc<Quiz>> {
        if let Some(quiz) = self.quizzes.get(id).await {
            log::debug!("Quiz cache hit for {}", id);
            return Ok(quiz);
        }

        let quiz = Arc::new(self.get_quiz_fresh(id).await?);
        self.quizzes.insert(id.to_string(), Arc::clone(&quiz)).await;
        Ok(quiz)
    }

    pub async fn get_quiz_fresh(&self, id: &str) -> AppResult<Quiz> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::QuizNotFound(format!("Quiz with id '{}' not found", id)))
    }

    pub async fn get_questions(&self, quiz_id: &str) -> AppResult<Arc<Vec<QuizQuestion>>> {
        if let Some(questions) = self.questions.get(quiz_id).await {
            log::debug!("Question cache hit for quiz {}", quiz_id);
            return Ok(questions);
        }

        let questions = Arc::new(self.get_questions_fresh(quiz_id).await?);
        self.questions
            .insert(quiz_id.to_string(), Arc::clone(&questions))
            .await;
        Ok(questions)
    }

    pub async fn get_questions_fresh(&self, quiz_id: &str) -> AppResult<Vec<QuizQuestion>> {
        self.repository.find_questions(quiz_id).await
    }

    pub async fn create_quiz(&self, claims: &Claims, request: CreateQuizRequest) -> AppResult<Quiz> {
        require_staff(claims)?;
        request.validate()?;

        let mut quiz = Quiz::new_draft(
            &request.course_id,
            &request.lesson_id,
            &claims.sub,
            &request.title,
            request.passing_score,
            request.max_attempts,
        );
        quiz.description = request.description;
        quiz.time_limit_minutes = request.time_limit_minutes;
        quiz.shuffle_questions = request.shuffle_questions;
        quiz.shuffle_options = request.shuffle_options;
        quiz.show_correct_answers = request.show_correct_answers;

        let quiz = self.repository.create(quiz).await?;
        log::info!("Quiz {} created by {}", quiz.id, claims.sub);
        Ok(quiz)
    }

    /// Questions can only be added while the quiz is a draft.
    pub async fn add_question(
        &self,
        claims: &Claims,
        quiz_id: &str,
        request: AddQuestionRequest,
    ) -> AppResult<QuizQuestion> {
        request.validate()?;
        check_answer_key(&request.kind)?;

        let quiz = self.get_quiz_fresh(quiz_id).await?;
        ensure_can_edit(claims, &quiz)?;

        if quiz.is_published {
            return Err(AppError::InvalidStateTransition(format!(
                "quiz '{}' is published; its question set is frozen",
                quiz_id
            )));
        }

        let order = match request.order {
            Some(order) => order,
            None => self.get_questions_fresh(quiz_id).await?.len() as i32 + 1,
        };

        let mut question = QuizQuestion::new(quiz_id, &request.text, request.points, order, request.kind);
        question.explanation = request.explanation;

        let question = self.repository.add_question(question).await?;
        self.questions.invalidate(quiz_id).await;

        log::info!("Question {} added to quiz {}", question.id, quiz_id);
        Ok(question)
    }

    /// Publishing is one-way; publishing twice returns the quiz unchanged.
    pub async fn publish_quiz(&self, claims: &Claims, quiz_id: &str) -> AppResult<Quiz> {
        let mut quiz = self.get_quiz_fresh(quiz_id).await?;
        ensure_can_edit(claims, &quiz)?;

        if quiz.is_published {
            return Ok(quiz);
        }

        quiz.is_published = true;
        quiz.modified_at = Some(Utc::now());
        let quiz = self.repository.update(quiz).await?;
        self.invalidate(quiz_id).await;

        log::info!("Quiz {} published by {}", quiz_id, claims.sub);
        Ok(quiz)
    }

    /// Only drafts can be deleted; published quizzes may carry attempts.
    pub async fn delete_quiz(&self, claims: &Claims, quiz_id: &str) -> AppResult<()> {
        let quiz = self.get_quiz_fresh(quiz_id).await?;
        ensure_can_edit(claims, &quiz)?;

        if quiz.is_published {
            return Err(AppError::InvalidStateTransition(format!(
                "quiz '{}' is published and cannot be deleted",
                quiz_id
            )));
        }

        self.repository.delete(quiz_id).await?;
        self.invalidate(quiz_id).await;

        log::info!("Quiz {} deleted by {}", quiz_id, claims.sub);
        Ok(())
    }

    async fn invalidate(&self, quiz_id: &str) {
        self.quizzes.invalidate(quiz_id).await;
        self.questions.invalidate(quiz_id).await;
    }
}

fn ensure_can_edit(claims: &Claims, quiz: &Quiz) -> AppResult<()> {
    require_staff(claims)?;
    if claims.role != UserRole::Admin && claims.sub != quiz.created_by_user_id {
        return Err(AppError::Forbidden(
            "Only the quiz author or an admin can change this quiz".to_string(),
        ));
    }
    Ok(())
}

fn check_answer_key(kind: &QuestionKind) -> AppResult<()> {
    match kind {
        QuestionKind::MultipleChoice {
            options,
            correct_option_id,
        } => {
            if options.len() < 2 {
                return Err(AppError::ValidationError(
                    "multiple choice questions need at least two options".to_string(),
                ));
            }
            let mut seen = HashSet::new();
            for option in options {
                if option.id.trim().is_empty() || !seen.insert(option.id.as_str()) {
                    return Err(AppError::ValidationError(format!(
                        "option id '{}' is empty or repeated",
                        option.id
                    )));
                }
            }
            if !seen.contains(correct_option_id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "correct option '{}' is not one of the options",
                    correct_option_id
                )));
            }
        }
        QuestionKind::TrueFalse { .. } => {}
        QuestionKind::ShortAnswer { canonical_text } => {
            if canonical_text.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "short answer questions need a canonical answer".to_string(),
                ));
            }
        }
    }
    Ok(())
}
