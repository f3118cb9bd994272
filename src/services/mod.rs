pub mod attempt_sweeper;
pub mod enrollment_service;
pub mod events;
pub mod grading;
pub mod ordering;
pub mod quiz_attempt_service;
pub mod quiz_service;

pub use enrollment_service::EnrollmentService;
pub use events::{ChannelEventPublisher, CompletionWorker, EventPublisher, QuizPassedEvent};
pub use quiz_attempt_service::{QuizAttemptService, StartedAttempt};
pub use quiz_service::QuizService;
