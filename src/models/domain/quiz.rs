use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub created_by_user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: f64, // percentage, 0..=100
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_correct_answers: bool,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new_draft(
        course_id: &str,
        lesson_id: &str,
        created_by_user_id: &str,
        title: &str,
        passing_score: f64,
        max_attempts: i32,
    ) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            lesson_id: lesson_id.to_string(),
            created_by_user_id: created_by_user_id.to_string(),
            title: title.to_string(),
            description: None,
            passing_score,
            time_limit_minutes: None,
            max_attempts,
            shuffle_questions: false,
            shuffle_options: false,
            show_correct_answers: true,
            is_published: false,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// Deadline for an attempt started at `started_at`, if the quiz is timed.
    pub fn deadline_from(&self, started_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.time_limit_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| started_at + chrono::Duration::minutes(minutes as i64))
    }
}
