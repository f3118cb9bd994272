use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub quiz_id: String,
    pub text: String,
    pub points: i32,
    pub order: i32,
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>, // shown with the correct answer in results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// Answer key and presentation data, one variant per objective question type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<QuestionOption>,
        correct_option_id: String,
    },
    TrueFalse {
        correct_value: bool,
    },
    ShortAnswer {
        canonical_text: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

/// A student's raw answer to one question.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Flag(bool),
    Text(String),
}

impl SubmittedAnswer {
    pub fn display(&self) -> String {
        match self {
            SubmittedAnswer::Flag(value) => value.to_string(),
            SubmittedAnswer::Text(text) => text.clone(),
        }
    }
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
        }
    }

    pub fn correct_answer_display(&self) -> String {
        match self {
            QuestionKind::MultipleChoice {
                correct_option_id, ..
            } => correct_option_id.clone(),
            QuestionKind::TrueFalse { correct_value } => correct_value.to_string(),
            QuestionKind::ShortAnswer { canonical_text } => canonical_text.clone(),
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match self {
            QuestionKind::MultipleChoice { options, .. } => options,
            _ => &[],
        }
    }
}

impl QuizQuestion {
    pub fn new(quiz_id: &str, text: &str, points: i32, order: i32, kind: QuestionKind) -> Self {
        QuizQuestion {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            text: text.to_string(),
            points,
            order,
            kind,
            explanation: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// Negative point values never reach the score.
    pub fn points_possible(&self) -> i32 {
        self.points.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_kind_serializes_with_type_tag() {
        let kind = QuestionKind::TrueFalse {
            correct_value: true,
        };

        let json = serde_json::to_value(&kind).expect("kind should serialize");
        assert_eq!(json["type"], "true_false");
        assert_eq!(json["correct_value"], true);
    }

    #[test]
    fn question_kind_rejects_unknown_type() {
        let invalid = r#"{"type":"essay","prompt":"Discuss"}"#;
        let parsed = serde_json::from_str::<QuestionKind>(invalid);

        assert!(parsed.is_err());
    }

    #[test]
    fn submitted_answer_accepts_bool_and_text_only() {
        let flag: SubmittedAnswer = serde_json::from_str("false").expect("bool answer");
        assert_eq!(flag, SubmittedAnswer::Flag(false));

        let text: SubmittedAnswer = serde_json::from_str("\"opt-2\"").expect("text answer");
        assert_eq!(text, SubmittedAnswer::Text("opt-2".to_string()));

        assert!(serde_json::from_str::<SubmittedAnswer>("42").is_err());
        assert!(serde_json::from_str::<SubmittedAnswer>("{\"a\":1}").is_err());
    }

    #[test]
    fn multiple_choice_exposes_options_and_key() {
        let kind = QuestionKind::MultipleChoice {
            options: vec![
                QuestionOption {
                    id: "a".to_string(),
                    text: "Ownership".to_string(),
                },
                QuestionOption {
                    id: "b".to_string(),
                    text: "Garbage collection".to_string(),
                },
            ],
            correct_option_id: "a".to_string(),
        };

        assert_eq!(kind.question_type(), QuestionType::MultipleChoice);
        assert_eq!(kind.options().len(), 2);
        assert_eq!(kind.correct_answer_display(), "a");
    }

    #[test]
    fn negative_points_count_as_zero() {
        let mut question = QuizQuestion::new(
            "quiz-1",
            "Is Rust memory safe?",
            2,
            1,
            QuestionKind::TrueFalse {
                correct_value: true,
            },
        );
        assert_eq!(question.points_possible(), 2);

        question.points = -3;
        assert_eq!(question.points_possible(), 0);
    }
}
