use std::collections::HashMap;

use async_graphql::{InputObject, ID};
use serde::Deserialize;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{QuestionKind, SubmittedAnswer},
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 100))]
    pub enrollment_id: String,

    #[validate(length(min = 1, max = 100))]
    pub quiz_id: String,
}

/// REST submission body: question id mapped to a bare JSON bool or string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    pub answers: HashMap<String, SubmittedAnswer>,
}

/// GraphQL form of one answer. Exactly one of the value fields must be set.
#[derive(Debug, Clone, InputObject)]
pub struct AnswerInput {
    pub question_id: ID,
    pub selected_option_id: Option<String>,
    pub boolean_value: Option<bool>,
    pub text_value: Option<String>,
}

impl AnswerInput {
    pub fn into_answer(self) -> AppResult<(String, SubmittedAnswer)> {
        let question_id = self.question_id.to_string();
        let answer = match (self.selected_option_id, self.boolean_value, self.text_value) {
            (Some(option_id), None, None) => SubmittedAnswer::Text(option_id),
            (None, Some(value), None) => SubmittedAnswer::Flag(value),
            (None, None, Some(text)) => SubmittedAnswer::Text(text),
            _ => {
                return Err(AppError::ValidationError(format!(
                    "answer for question '{}' must set exactly one value",
                    question_id
                )))
            }
        };
        Ok((question_id, answer))
    }
}

#[derive(Debug, Clone, InputObject)]
pub struct SubmitQuizAttemptInput {
    pub attempt_id: ID,
    #[graphql(default)]
    pub answers: Vec<AnswerInput>,
}

impl SubmitQuizAttemptInput {
    pub fn answer_map(self) -> AppResult<HashMap<String, SubmittedAnswer>> {
        let mut answers = HashMap::with_capacity(self.answers.len());
        for input in self.answers {
            let (question_id, answer) = input.into_answer()?;
            if answers.insert(question_id.clone(), answer).is_some() {
                return Err(AppError::ValidationError(format!(
                    "question '{}' answered more than once",
                    question_id
                )));
            }
        }
        Ok(answers)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 100))]
    pub course_id: String,

    #[validate(length(min = 1, max = 100))]
    pub lesson_id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: f64,

    #[validate(range(min = 1, max = 1440))]
    pub time_limit_minutes: Option<i32>,

    #[validate(range(min = 1, max = 100))]
    pub max_attempts: i32,

    #[serde(default)]
    pub shuffle_questions: bool,

    #[serde(default)]
    pub shuffle_options: bool,

    #[serde(default = "default_true")]
    pub show_correct_answers: bool,
}

/// New question; the answer key arrives flattened next to the common fields,
/// e.g. `{"text": .., "points": 1, "type": "true_false", "correct_value": true}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    #[validate(range(min = 0, max = 1000))]
    pub points: i32,

    pub order: Option<i32>,

    #[validate(length(max = 2000))]
    pub explanation: Option<String>,

    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnrollRequest {
    #[validate(length(min = 1, max = 100))]
    pub course_id: String,
}
