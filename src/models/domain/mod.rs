pub mod enrollment;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use quiz::Quiz;
pub use quiz_attempt::{AttemptStatus, GradeOutcome, QuestionResult, QuizAttempt};
pub use quiz_question::{QuestionKind, QuestionOption, QuestionType, QuizQuestion, SubmittedAnswer};
