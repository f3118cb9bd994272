use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    errors::{AppError, AppResult},
    models::domain::QuizAttempt,
    repositories::EnrollmentRepository,
};

/// Emitted once per (enrollment, quiz) on the first passing graded attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizPassedEvent {
    pub enrollment_id: String,
    pub student_id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub quiz_id: String,
    pub attempt_id: String,
    pub percentage: f64,
    pub passed_at: DateTime<Utc>,
}

impl QuizPassedEvent {
    pub fn from_attempt(attempt: &QuizAttempt) -> Self {
        QuizPassedEvent {
            enrollment_id: attempt.enrollment_id.clone(),
            student_id: attempt.student_id.clone(),
            course_id: attempt.course_id.clone(),
            lesson_id: attempt.lesson_id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            attempt_id: attempt.id.clone(),
            percentage: attempt.percentage.unwrap_or(0.0),
            passed_at: attempt.graded_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Hand-off point to progress tracking and certificates. Must not block.
#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: QuizPassedEvent) -> AppResult<()>;
}

pub struct ChannelEventPublisher {
    sender: UnboundedSender<QuizPassedEvent>,
}

impl ChannelEventPublisher {
    pub fn channel() -> (Self, UnboundedReceiver<QuizPassedEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelEventPublisher {
    fn publish(&self, event: QuizPassedEvent) -> AppResult<()> {
        self.sender.send(event).map_err(|e| {
            AppError::InternalError(format!(
                "completion worker stopped, dropped event for attempt {}",
                e.0.attempt_id
            ))
        })
    }
}

/// Background consumer of `QuizPassedEvent`s.
pub struct CompletionWorker;

impl CompletionWorker {
    /// Runs until every publisher is dropped. Must be called inside a tokio runtime.
    pub fn spawn(
        mut receiver: UnboundedReceiver<QuizPassedEvent>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            log::info!("Completion worker started");
            while let Some(event) = receiver.recv().await {
                if let Err(e) = Self::handle(enrollments.as_ref(), &event).await {
                    log::error!(
                        "Failed to record quiz pass for enrollment {} (attempt {}): {}",
                        event.enrollment_id,
                        event.attempt_id,
                        e
                    );
                }
            }
            log::info!("Completion worker stopped");
        })
    }

    pub async fn handle(
        enrollments: &dyn EnrollmentRepository,
        event: &QuizPassedEvent,
    ) -> AppResult<()> {
        enrollments
            .record_quiz_passed(&event.enrollment_id, &event.lesson_id, &event.quiz_id)
            .await?;

        log::info!(
            "Lesson {} completed for enrollment {}; certificate check queued for course {}",
            event.lesson_id,
            event.enrollment_id,
            event.course_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{Enrollment, Quiz},
        repositories::MockEnrollmentRepository,
    };

    fn passed_event() -> QuizPassedEvent {
        let enrollment = Enrollment::new("student-1", "course-1");
        let quiz = Quiz::new_draft("course-1", "lesson-7", "teacher-1", "Final", 60.0, 1);
        let attempt = QuizAttempt::start(&enrollment, &quiz, 1, Utc::now());
        QuizPassedEvent::from_attempt(&attempt)
    }

    #[test]
    fn test_event_copies_attempt_context() {
        let event = passed_event();
        assert_eq!(event.lesson_id, "lesson-7");
        assert_eq!(event.course_id, "course-1");
        assert_eq!(event.student_id, "student-1");
    }

    #[tokio::test]
    async fn test_channel_publisher_delivers_events() {
        let (publisher, mut receiver) = ChannelEventPublisher::channel();
        let event = passed_event();

        publisher.publish(event.clone()).unwrap();

        assert_eq!(receiver.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_publish_fails_once_worker_is_gone() {
        let (publisher, receiver) = ChannelEventPublisher::channel();
        drop(receiver);

        let result = publisher.publish(passed_event());
        assert!(matches!(result, Err(AppError::InternalError(_))));
    }

    #[tokio::test]
    async fn test_worker_records_pass_on_enrollment() {
        let event = passed_event();
        let expected_enrollment = event.enrollment_id.clone();

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments
            .expect_record_quiz_passed()
            .withf(move |enrollment_id, lesson_id, _| {
                enrollment_id == expected_enrollment && lesson_id == "lesson-7"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (publisher, receiver) = ChannelEventPublisher::channel();
        let handle = CompletionWorker::spawn(receiver, Arc::new(enrollments));

        publisher.publish(event).unwrap();
        drop(publisher);

        handle.await.unwrap();
    }
}
