use std::collections::HashMap;

use async_graphql::Enum;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        quiz_question::{QuestionType, SubmittedAnswer},
        Enrollment, Quiz,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Graded,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::Graded => "graded",
            AttemptStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Graded | AttemptStatus::Expired)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-question snapshot taken at grading time.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub points_possible: i32,
    pub points_awarded: i32,
    pub is_correct: bool,
    pub submitted_answer: Option<SubmittedAnswer>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GradeOutcome {
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub is_passed: bool,
    pub question_results: Vec<QuestionResult>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub enrollment_id: String,
    pub quiz_id: String,
    pub student_id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    /// Stored as a BSON date so the sweeper can range-query it.
    #[serde(default, with = "optional_bson_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: HashMap<String, SubmittedAnswer>,
    #[serde(default)]
    pub question_results: Vec<QuestionResult>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub is_passed: Option<bool>,
    #[serde(default)]
    pub is_late: bool,
    pub shuffle_seed: Option<i64>,
    #[serde(default)]
    pub question_order: Vec<String>,
    #[serde(default)]
    pub option_orders: HashMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn start(
        enrollment: &Enrollment,
        quiz: &Quiz,
        attempt_number: i32,
        now: DateTime<Utc>,
    ) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            enrollment_id: enrollment.id.clone(),
            quiz_id: quiz.id.clone(),
            student_id: enrollment.student_id.clone(),
            course_id: quiz.course_id.clone(),
            lesson_id: quiz.lesson_id.clone(),
            attempt_number,
            status: AttemptStatus::InProgress,
            started_at: now,
            expires_at: quiz.deadline_from(now),
            submitted_at: None,
            graded_at: None,
            answers: HashMap::new(),
            question_results: Vec::new(),
            score: None,
            max_score: None,
            percentage: None,
            is_passed: None,
            is_late: false,
            shuffle_seed: None,
            question_order: Vec::new(),
            option_orders: HashMap::new(),
            created_at: Some(now),
            modified_at: Some(now),
        }
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|deadline| now > deadline).unwrap_or(false)
    }

    /// Past the deadline plus the grace period.
    pub fn is_overdue(&self, now: DateTime<Utc>, grace_seconds: i64) -> bool {
        self.expires_at
            .map(|deadline| now > deadline + Duration::seconds(grace_seconds.max(0)))
            .unwrap_or(false)
    }

    fn ensure_status(&self, expected: AttemptStatus, action: &str) -> AppResult<()> {
        if self.status != expected {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot {} attempt '{}' in status {}",
                action, self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn submit(
        &mut self,
        answers: HashMap<String, SubmittedAnswer>,
        now: DateTime<Utc>,
        is_late: bool,
    ) -> AppResult<()> {
        self.ensure_status(AttemptStatus::InProgress, "submit")?;
        self.answers = answers;
        self.submitted_at = Some(now);
        self.is_late = is_late;
        self.status = AttemptStatus::Submitted;
        self.modified_at = Some(now);
        Ok(())
    }

    pub fn record_grade(&mut self, outcome: GradeOutcome, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_status(AttemptStatus::Submitted, "grade")?;
        self.apply_outcome(outcome, now);
        self.status = AttemptStatus::Graded;
        Ok(())
    }

    /// Closes an overdue attempt; `outcome` is the grade of an empty answer set.
    pub fn expire(&mut self, outcome: GradeOutcome, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_status(AttemptStatus::InProgress, "expire")?;
        self.apply_outcome(
            GradeOutcome {
                is_passed: false,
                ..outcome
            },
            now,
        );
        self.status = AttemptStatus::Expired;
        Ok(())
    }

    fn apply_outcome(&mut self, outcome: GradeOutcome, now: DateTime<Utc>) {
        self.score = Some(outcome.score);
        self.max_score = Some(outcome.max_score);
        self.percentage = Some(outcome.percentage);
        self.is_passed = Some(outcome.is_passed);
        self.question_results = outcome.question_results;
        self.graded_at = Some(now);
        self.modified_at = Some(now);
    }

    pub fn passed(&self) -> bool {
        self.status == AttemptStatus::Graded && self.is_passed.unwrap_or(false)
    }
}

mod optional_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(|dt| bson::DateTime::from_millis(dt.timestamp_millis()))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<bson::DateTime>::deserialize(deserializer)?
            .map(|dt| {
                DateTime::from_timestamp_millis(dt.timestamp_millis())
                    .ok_or_else(|| D::Error::custom(format!("date out of range: {:?}", dt)))
            })
            .transpose()
    }
}
