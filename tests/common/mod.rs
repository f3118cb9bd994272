#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use lms_quiz_server::{
    auth::{Claims, UserRole},
    config::AttemptPolicy,
    errors::{AppError, AppResult},
    models::domain::{
        AttemptStatus, Enrollment, QuestionKind, QuestionOption, Quiz, QuizAttempt, QuizQuestion,
    },
    repositories::{EnrollmentRepository, QuizAttemptRepository, QuizRepository},
    services::{EventPublisher, QuizAttemptService, QuizPassedEvent, QuizService},
};

pub const COURSE_ID: &str = "course-rust-101";
pub const LESSON_ID: &str = "lesson-ownership";
pub const STUDENT_ID: &str = "student-ada";
pub const INSTRUCTOR_ID: &str = "teacher-grace";

// ---------------------------------------------------------------------------
// In-memory stores. Each enforces the same uniqueness rules as its Mongo index.
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: RwLock<HashMap<String, Quiz>>,
    questions: RwLock<HashMap<String, QuizQuestion>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites a stored question in place, bypassing any service cache.
    pub async fn edit_question(&self, question_id: &str, edit: impl FnOnce(&mut QuizQuestion)) {
        let mut questions = self.questions.write().await;
        if let Some(question) = questions.get_mut(question_id) {
            edit(question);
        }
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.contains_key(&quiz.id) {
            return Err(AppError::AlreadyExists(format!(
                "Quiz with id '{}' already exists",
                quiz.id
            )));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if !quizzes.contains_key(&quiz.id) {
            return Err(AppError::QuizNotFound(format!(
                "Quiz with id '{}' not found",
                quiz.id
            )));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        if self.quizzes.write().await.remove(id).is_none() {
            return Err(AppError::QuizNotFound(format!(
                "Quiz with id '{}' not found",
                id
            )));
        }
        self.questions.write().await.retain(|_, q| q.quiz_id != id);
        Ok(())
    }

    async fn find_questions(&self, quiz_id: &str) -> AppResult<Vec<QuizQuestion>> {
        let mut questions: Vec<QuizQuestion> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    async fn add_question(&self, question: QuizQuestion) -> AppResult<QuizQuestion> {
        let mut questions = self.questions.write().await;
        if questions.contains_key(&question.id) {
            return Err(AppError::AlreadyExists(format!(
                "Question with id '{}' already exists",
                question.id
            )));
        }
        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }
}

#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: RwLock<HashMap<String, Enrollment>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Enrollment>> {
        Ok(self.enrollments.read().await.get(id).cloned())
    }

    async fn find_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Enrollment>> {
        Ok(self
            .enrollments
            .read()
            .await
            .values()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        let mut enrollments = self.enrollments.write().await;
        let taken = enrollments.values().any(|e| {
            e.id == enrollment.id
                || (e.student_id == enrollment.student_id && e.course_id == enrollment.course_id)
        });
        if taken {
            return Err(AppError::AlreadyExists(format!(
                "Student '{}' is already enrolled in '{}'",
                enrollment.student_id, enrollment.course_id
            )));
        }
        enrollments.insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn record_quiz_passed(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        quiz_id: &str,
    ) -> AppResult<()> {
        let mut enrollments = self.enrollments.write().await;
        let enrollment = enrollments.get_mut(enrollment_id).ok_or_else(|| {
            AppError::EnrollmentNotFound(format!(
                "Enrollment with id '{}' not found",
                enrollment_id
            ))
        })?;

        if !enrollment.completed_lesson_ids.iter().any(|id| id == lesson_id) {
            enrollment.completed_lesson_ids.push(lesson_id.to_string());
        }
        if !enrollment.passed_quiz_ids.iter().any(|id| id == quiz_id) {
            enrollment.passed_quiz_ids.push(quiz_id.to_string());
        }
        enrollment.modified_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: RwLock<HashMap<String, QuizAttempt>>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }

    /// Moves an attempt's clock back so it looks `by` older.
    pub async fn backdate(&self, attempt_id: &str, by: Duration) {
        let mut attempts = self.attempts.write().await;
        if let Some(attempt) = attempts.get_mut(attempt_id) {
            attempt.started_at -= by;
            attempt.expires_at = attempt.expires_at.map(|deadline| deadline - by);
        }
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        tokio::task::yield_now().await;

        let mut attempts = self.attempts.write().await;
        let conflict = attempts.values().any(|existing| {
            existing.id == attempt.id
                || (existing.enrollment_id == attempt.enrollment_id
                    && existing.quiz_id == attempt.quiz_id
                    && (existing.attempt_number == attempt.attempt_number
                        || (existing.status == AttemptStatus::InProgress
                            && attempt.status == AttemptStatus::InProgress)))
        });
        if conflict {
            return Err(AppError::AlreadyExists(format!(
                "attempt #{} for enrollment '{}' conflicts with a stored attempt",
                attempt.attempt_number, attempt.enrollment_id
            )));
        }
        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        Ok(self.attempts.read().await.get(id).cloned())
    }

    async fn find_in_progress(
        &self,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        tokio::task::yield_now().await;

        Ok(self
            .attempts
            .read()
            .await
            .values()
            .find(|a| {
                a.enrollment_id == enrollment_id
                    && a.quiz_id == quiz_id
                    && a.status == AttemptStatus::InProgress
            })
            .cloned())
    }

    async fn find_by_enrollment_and_quiz(
        &self,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.enrollment_id == enrollment_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(attempts)
    }

    async fn count_attempts(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<usize> {
        Ok(self
            .find_by_enrollment_and_quiz(enrollment_id, quiz_id)
            .await?
            .len())
    }

    async fn latest_attempt_number(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<i32> {
        Ok(self
            .find_by_enrollment_and_quiz(enrollment_id, quiz_id)
            .await?
            .last()
            .map(|a| a.attempt_number)
            .unwrap_or(0))
    }

    async fn has_passed(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_enrollment_and_quiz(enrollment_id, quiz_id)
            .await?
            .iter()
            .any(|a| a.passed()))
    }

    async fn close_in_progress(&self, attempt: &QuizAttempt) -> AppResult<bool> {
        let mut attempts = self.attempts.write().await;
        match attempts.get(&attempt.id) {
            Some(stored) if stored.status == AttemptStatus::InProgress => {
                attempts.insert(attempt.id.clone(), attempt.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_expiring_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<QuizAttempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| {
                a.status == AttemptStatus::InProgress
                    && a.expires_at.map(|deadline| deadline < cutoff).unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

/// Captures published events instead of queueing them.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<QuizPassedEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<QuizPassedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: QuizPassedEvent) -> AppResult<()> {
        self.events
            .lock()
            .map_err(|_| AppError::InternalError("publisher lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn student() -> Claims {
    Claims::student(STUDENT_ID)
}

pub fn instructor() -> Claims {
    Claims::new(INSTRUCTOR_ID, "grace", UserRole::Instructor, 1)
}

pub fn option(id: &str, text: &str) -> QuestionOption {
    QuestionOption {
        id: id.to_string(),
        text: text.to_string(),
    }
}

/// Options `a`..`d`; `correct` names the right one.
pub fn multiple_choice(quiz_id: &str, order: i32, points: i32, correct: &str) -> QuizQuestion {
    QuizQuestion::new(
        quiz_id,
        &format!("Multiple choice question {}", order),
        points,
        order,
        QuestionKind::MultipleChoice {
            options: vec![
                option("a", "Move"),
                option("b", "Copy"),
                option("c", "Clone"),
                option("d", "Drop"),
            ],
            correct_option_id: correct.to_string(),
        },
    )
}

pub fn true_false(quiz_id: &str, order: i32, correct_value: bool) -> QuizQuestion {
    QuizQuestion::new(
        quiz_id,
        &format!("True or false {}", order),
        1,
        order,
        QuestionKind::TrueFalse { correct_value },
    )
}

pub fn short_answer(quiz_id: &str, order: i32, canonical_text: &str) -> QuizQuestion {
    QuizQuestion::new(
        quiz_id,
        &format!("Short answer {}", order),
        1,
        order,
        QuestionKind::ShortAnswer {
            canonical_text: canonical_text.to_string(),
        },
    )
}

pub struct TestContext {
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub enrollments: Arc<InMemoryEnrollmentRepository>,
    pub attempts: Arc<InMemoryQuizAttemptRepository>,
    pub publisher: Arc<RecordingPublisher>,
    pub service: Arc<QuizAttemptService>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(AttemptPolicy::default())
    }

    pub fn with_policy(policy: AttemptPolicy) -> Self {
        let quizzes = Arc::new(InMemoryQuizRepository::new());
        let enrollments = Arc::new(InMemoryEnrollmentRepository::new());
        let attempts = Arc::new(InMemoryQuizAttemptRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());

        let quiz_service = Arc::new(QuizService::new(quizzes.clone(), 300, 100));
        let service = Arc::new(QuizAttemptService::new(
            quiz_service,
            enrollments.clone(),
            attempts.clone(),
            publisher.clone(),
            policy,
        ));

        Self {
            quizzes,
            enrollments,
            attempts,
            publisher,
            service,
        }
    }

    pub async fn enroll(&self, student_id: &str) -> Enrollment {
        self.enrollments
            .create(Enrollment::new(student_id, COURSE_ID))
            .await
            .expect("enrollment should be stored")
    }

    /// Stores a published quiz; `build_questions` receives the new quiz id.
    pub async fn published_quiz(
        &self,
        passing_score: f64,
        max_attempts: i32,
        configure: impl FnOnce(&mut Quiz),
        build_questions: impl FnOnce(&str) -> Vec<QuizQuestion>,
    ) -> (Quiz, Vec<QuizQuestion>) {
        let mut quiz = Quiz::new_draft(
            COURSE_ID,
            LESSON_ID,
            INSTRUCTOR_ID,
            "Ownership basics",
            passing_score,
            max_attempts,
        );
        quiz.is_published = true;
        configure(&mut quiz);

        let quiz = self.quizzes.create(quiz).await.expect("quiz should be stored");
        let mut questions = Vec::new();
        for question in build_questions(quiz.id.as_str()) {
            questions.push(
                self.quizzes
                    .add_question(question)
                    .await
                    .expect("question should be stored"),
            );
        }
        (quiz, questions)
    }
}
