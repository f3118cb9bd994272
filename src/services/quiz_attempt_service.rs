use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};

use crate::{
    auth::{require_owner, require_owner_or_staff, Claims},
    config::{AttemptPolicy, LateSubmissionPolicy},
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptStatus, QuizAttempt, SubmittedAnswer},
        dto::response::AttemptView,
    },
    repositories::{EnrollmentRepository, QuizAttemptRepository},
    services::{
        events::{EventPublisher, QuizPassedEvent},
        grading::grade_answers,
        ordering::{build_ordering, new_seed},
        quiz_service::QuizService,
    },
};

/// Rounds of "insert lost the race, but the winner is already closed".
const START_RETRIES: usize = 3;

#[derive(Debug, Clone)]
pub struct StartedAttempt {
    pub attempt: QuizAttempt,
    /// True when an existing in-progress attempt was returned.
    pub resumed: bool,
}

/// Drives an attempt through start, submit/grade and expiry.
///
/// Concurrency safety comes from the attempt store: a unique in-progress
/// constraint on start and a status-conditioned write on submit.
pub struct QuizAttemptService {
    quiz_service: Arc<QuizService>,
    enrollments: Arc<dyn EnrollmentRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    publisher: Arc<dyn EventPublisher>,
    policy: AttemptPolicy,
}

impl QuizAttemptService {
    pub fn new(
        quiz_service: Arc<QuizService>,
        enrollments: Arc<dyn EnrollmentRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        publisher: Arc<dyn EventPublisher>,
        policy: AttemptPolicy,
    ) -> Self {
        Self {
            quiz_service,
            enrollments,
            attempts,
            publisher,
            policy,
        }
    }

    pub fn policy(&self) -> &AttemptPolicy {
        &self.policy
    }

    pub async fn start_attempt(
        &self,
        claims: &Claims,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<StartedAttempt> {
        let enrollment = self
            .enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| {
                AppError::EnrollmentNotFound(format!(
                    "Enrollment with id '{}' not found",
                    enrollment_id
                ))
            })?;

        require_owner(claims, &enrollment.student_id)?;

        if !enrollment.is_active() {
            return Err(AppError::EnrollmentNotActive(format!(
                "enrollment '{}' is {:?}",
                enrollment_id, enrollment.status
            )));
        }

        let quiz = self.quiz_service.get_quiz(quiz_id).await?;

        if !quiz.is_published {
            return Err(AppError::QuizNotPublished(format!(
                "quiz '{}' is not open for attempts",
                quiz_id
            )));
        }

        if quiz.course_id != enrollment.course_id {
            return Err(AppError::ValidationError(format!(
                "quiz '{}' does not belong to course '{}'",
                quiz_id, enrollment.course_id
            )));
        }

        let mut last_conflict = None;

        for _ in 0..START_RETRIES {
            let now = Utc::now();

            if let Some(existing) = self.attempts.find_in_progress(enrollment_id, quiz_id).await? {
                let existing = self.settle_overdue(existing, now).await?;
                if existing.status == AttemptStatus::InProgress {
                    log::info!(
                        "Resuming attempt {} (#{}) for enrollment {} on quiz {}",
                        existing.id,
                        existing.attempt_number,
                        enrollment_id,
                        quiz_id
                    );
                    return Ok(StartedAttempt {
                        attempt: existing,
                        resumed: true,
                    });
                }
            }

            let used = self.attempts.count_attempts(enrollment_id, quiz_id).await?;
            if used >= quiz.max_attempts.max(0) as usize {
                log::warn!(
                    "Enrollment {} has used {} of {} attempts on quiz {}",
                    enrollment_id,
                    used,
                    quiz.max_attempts,
                    quiz_id
                );
                return Err(AppError::AttemptLimitExceeded(format!(
                    "all {} attempts on quiz '{}' have been used",
                    quiz.max_attempts, quiz_id
                )));
            }

            let attempt_number = self
                .attempts
                .latest_attempt_number(enrollment_id, quiz_id)
                .await?
                + 1;

            let questions = self.quiz_service.get_questions(quiz_id).await?;
            let mut attempt = QuizAttempt::start(&enrollment, &quiz, attempt_number, now);
            build_ordering(&quiz, &questions, new_seed()).apply_to(&mut attempt);

            match self.attempts.create(attempt).await {
                Ok(attempt) => {
                    log::info!(
                        "Started attempt {} (#{}) for enrollment {} on quiz {}",
                        attempt.id,
                        attempt.attempt_number,
                        enrollment_id,
                        quiz_id
                    );
                    return Ok(StartedAttempt {
                        attempt,
                        resumed: false,
                    });
                }
                Err(AppError::AlreadyExists(msg)) => {
                    log::debug!(
                        "Concurrent start for enrollment {} on quiz {}: {}",
                        enrollment_id,
                        quiz_id,
                        msg
                    );
                    last_conflict = Some(msg);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::AlreadyExists(last_conflict.unwrap_or_else(|| {
            format!("could not start an attempt on quiz '{}'", quiz_id)
        })))
    }

    /// Records the answers and grades them in one step.
    ///
    /// Grading reads the quiz and its questions from the store, never the cache.
    pub async fn submit_attempt(
        &self,
        claims: &Claims,
        attempt_id: &str,
        answers: HashMap<String, SubmittedAnswer>,
    ) -> AppResult<QuizAttempt> {
        let mut attempt = self.find_attempt(attempt_id).await?;
        require_owner(claims, &attempt.student_id)?;

        if attempt.status != AttemptStatus::InProgress {
            log::warn!(
                "Rejected submit for attempt {} in status {}",
                attempt_id,
                attempt.status
            );
            return Err(AppError::InvalidStateTransition(format!(
                "attempt '{}' is already {}",
                attempt_id, attempt.status
            )));
        }

        let quiz = self.quiz_service.get_quiz_fresh(&attempt.quiz_id).await?;
        let questions = self.quiz_service.get_questions_fresh(&attempt.quiz_id).await?;

        let mut unknown: Vec<&str> = answers
            .keys()
            .filter(|id| !questions.iter().any(|q| &q.id == *id))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(AppError::ValidationError(format!(
                "answers reference unknown questions: {}",
                unknown.join(", ")
            )));
        }

        let now = Utc::now();
        let is_late = attempt.is_past_deadline(now);

        if is_late && self.policy.late_submission == LateSubmissionPolicy::Reject {
            if attempt.is_overdue(now, self.policy.grace_period_seconds) {
                log::warn!(
                    "Submission for attempt {} arrived after the deadline {:?}",
                    attempt_id,
                    attempt.expires_at
                );
                self.settle_overdue(attempt, now).await?;
                return Err(AppError::TimeLimitExceeded(format!(
                    "attempt '{}' ran past its time limit",
                    attempt_id
                )));
            }
        } else if is_late {
            log::warn!("Accepting late submission for attempt {}", attempt_id);
        }

        attempt.submit(answers, now, is_late)?;
        let outcome = grade_answers(&questions, &attempt.answers, quiz.passing_score);
        attempt.record_grade(outcome, now)?;

        let first_pass = attempt.passed()
            && !self
                .attempts
                .has_passed(&attempt.enrollment_id, &attempt.quiz_id)
                .await?;

        if !self.attempts.close_in_progress(&attempt).await? {
            return Err(AppError::InvalidStateTransition(format!(
                "attempt '{}' was closed by another request",
                attempt_id
            )));
        }

        log::info!(
            "Graded attempt {}: {}/{} ({:.1}%), passed={}",
            attempt.id,
            attempt.score.unwrap_or(0),
            attempt.max_score.unwrap_or(0),
            attempt.percentage.unwrap_or(0.0),
            attempt.passed()
        );

        if first_pass {
            if let Err(e) = self.publisher.publish(QuizPassedEvent::from_attempt(&attempt)) {
                log::warn!("Could not publish quiz pass for attempt {}: {}", attempt.id, e);
            }
        }

        Ok(attempt)
    }

    pub async fn get_attempt(&self, claims: &Claims, attempt_id: &str) -> AppResult<QuizAttempt> {
        let attempt = self.find_attempt(attempt_id).await?;
        require_owner_or_staff(claims, &attempt.student_id)?;
        self.settle_overdue(attempt, Utc::now()).await
    }

    pub async fn list_attempts(
        &self,
        claims: &Claims,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let enrollment = self
            .enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| {
                AppError::EnrollmentNotFound(format!(
                    "Enrollment with id '{}' not found",
                    enrollment_id
                ))
            })?;

        require_owner_or_staff(claims, &enrollment.student_id)?;

        self.attempts
            .find_by_enrollment_and_quiz(enrollment_id, quiz_id)
            .await
    }

    /// Expires every timed attempt past deadline plus grace. Returns how many
    /// were closed. Does nothing when late submissions are accepted.
    pub async fn expire_overdue_attempts(&self, now: DateTime<Utc>) -> AppResult<usize> {
        if self.policy.late_submission != LateSubmissionPolicy::Reject {
            return Ok(0);
        }

        let cutoff = now - Duration::seconds(self.policy.grace_period_seconds.max(0));
        let mut expired = 0;
        for attempt in self.attempts.find_expiring_before(cutoff).await? {
            let attempt_id = attempt.id.clone();
            match self.settle_overdue(attempt, now).await {
                Ok(settled) if settled.status == AttemptStatus::Expired => expired += 1,
                Ok(_) => {}
                Err(e) => log::warn!("Could not expire attempt {}: {}", attempt_id, e),
            }
        }
        Ok(expired)
    }

    /// Presentation of an attempt: questions while open, results once closed.
    pub async fn attempt_view(&self, attempt: &QuizAttempt, resumed: bool) -> AppResult<AttemptView> {
        let quiz = self.quiz_service.get_quiz(&attempt.quiz_id).await?;
        let questions = if attempt.status == AttemptStatus::InProgress {
            self.quiz_service.get_questions(&attempt.quiz_id).await?
        } else {
            Arc::new(Vec::new())
        };
        Ok(AttemptView::new(attempt, &quiz, &questions, resumed))
    }

    async fn find_attempt(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.attempts.find_by_id(attempt_id).await?.ok_or_else(|| {
            AppError::AttemptNotFound(format!("Quiz attempt with id '{}' not found", attempt_id))
        })
    }

    /// Under the reject policy an overdue in-progress attempt is closed as
    /// expired with the grade of an empty answer set. Anything else is
    /// returned untouched.
    async fn settle_overdue(&self, mut attempt: QuizAttempt, now: DateTime<Utc>) -> AppResult<QuizAttempt> {
        if attempt.status != AttemptStatus::InProgress
            || self.policy.late_submission != LateSubmissionPolicy::Reject
            || !attempt.is_overdue(now, self.policy.grace_period_seconds)
        {
            return Ok(attempt);
        }

        let quiz = self.quiz_service.get_quiz_fresh(&attempt.quiz_id).await?;
        let questions = self.quiz_service.get_questions_fresh(&attempt.quiz_id).await?;
        let outcome = grade_answers(&questions, &HashMap::new(), quiz.passing_score);
        attempt.expire(outcome, now)?;

        if self.attempts.close_in_progress(&attempt).await? {
            log::info!(
                "Expired attempt {} (#{}) for enrollment {}",
                attempt.id,
                attempt.attempt_number,
                attempt.enrollment_id
            );
            return Ok(attempt);
        }

        // Closed concurrently; the stored version wins.
        self.find_attempt(&attempt.id).await
    }
}
