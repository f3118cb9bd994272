use std::collections::HashMap;

use async_graphql::{SimpleObject, Union};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::domain::{
        AttemptStatus, Enrollment, EnrollmentStatus, QuestionOption, QuestionResult,
        QuestionType, Quiz, QuizAttempt, QuizQuestion,
    },
    services::ordering::{ordered_options, ordered_questions},
};

#[derive(Debug, Clone, PartialEq, Serialize, SimpleObject)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

impl From<&QuestionOption> for OptionView {
    fn from(option: &QuestionOption) -> Self {
        OptionView {
            id: option.id.clone(),
            text: option.text.clone(),
        }
    }
}

/// A question as shown while the attempt is open: no answer key.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptQuestionView {
    pub question_id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub points: i32,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptResponse {
    pub id: String,
    pub enrollment_id: String,
    pub quiz_id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub resumed: bool,
    pub questions: Vec<AttemptQuestionView>,
}

impl AttemptResponse {
    pub fn new(attempt: &QuizAttempt, questions: &[QuizQuestion], resumed: bool) -> Self {
        let questions = ordered_questions(attempt, questions)
            .into_iter()
            .map(|question| AttemptQuestionView {
                question_id: question.id.clone(),
                text: question.text.clone(),
                question_type: question.kind.question_type(),
                points: question.points_possible(),
                options: ordered_options(attempt, question)
                    .into_iter()
                    .map(OptionView::from)
                    .collect(),
            })
            .collect();

        AttemptResponse {
            id: attempt.id.clone(),
            enrollment_id: attempt.enrollment_id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            started_at: attempt.started_at,
            expires_at: attempt.expires_at,
            resumed,
            questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionResultView {
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub points_possible: i32,
    pub points_awarded: i32,
    pub is_correct: bool,
    pub submitted_answer: Option<String>,
    /// Suppressed unless the quiz shows correct answers.
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

impl QuestionResultView {
    fn new(result: &QuestionResult, show_correct_answers: bool) -> Self {
        QuestionResultView {
            question_id: result.question_id.clone(),
            question_text: result.question_text.clone(),
            question_type: result.question_type,
            points_possible: result.points_possible,
            points_awarded: result.points_awarded,
            is_correct: result.is_correct,
            submitted_answer: result.submitted_answer.as_ref().map(|a| a.display()),
            correct_answer: show_correct_answers.then(|| result.correct_answer.clone()),
            explanation: if show_correct_answers {
                result.explanation.clone()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptResultResponse {
    pub id: String,
    pub enrollment_id: String,
    pub quiz_id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub is_passed: bool,
    pub is_late: bool,
    pub questions: Vec<QuestionResultView>,
}

impl AttemptResultResponse {
    pub fn new(attempt: &QuizAttempt, show_correct_answers: bool) -> Self {
        let position: HashMap<&str, usize> = attempt
            .question_order
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();

        let mut results: Vec<&QuestionResult> = attempt.question_results.iter().collect();
        results.sort_by_key(|r| {
            position
                .get(r.question_id.as_str())
                .copied()
                .unwrap_or(usize::MAX)
        });

        AttemptResultResponse {
            id: attempt.id.clone(),
            enrollment_id: attempt.enrollment_id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            graded_at: attempt.graded_at,
            score: attempt.score.unwrap_or(0),
            max_score: attempt.max_score.unwrap_or(0),
            percentage: attempt.percentage.unwrap_or(0.0),
            is_passed: attempt.is_passed.unwrap_or(false),
            is_late: attempt.is_late,
            questions: results
                .into_iter()
                .map(|r| QuestionResultView::new(r, show_correct_answers))
                .collect(),
        }
    }
}

/// An open attempt renders its questions; a closed one renders its result.
#[derive(Debug, Clone, Serialize, Union)]
#[serde(untagged)]
pub enum AttemptView {
    InProgress(AttemptResponse),
    Result(AttemptResultResponse),
}

impl AttemptView {
    pub fn new(
        attempt: &QuizAttempt,
        quiz: &Quiz,
        questions: &[QuizQuestion],
        resumed: bool,
    ) -> Self {
        match attempt.status {
            AttemptStatus::InProgress => {
                AttemptView::InProgress(AttemptResponse::new(attempt, questions, resumed))
            }
            _ => AttemptView::Result(AttemptResultResponse::new(
                attempt,
                quiz.show_correct_answers,
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptSummary {
    pub id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub is_passed: Option<bool>,
    pub is_late: bool,
}

impl From<&QuizAttempt> for AttemptSummary {
    fn from(attempt: &QuizAttempt) -> Self {
        AttemptSummary {
            id: attempt.id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            score: attempt.score,
            max_score: attempt.max_score,
            percentage: attempt.percentage,
            is_passed: attempt.is_passed,
            is_late: attempt.is_late,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDto {
    pub id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub points: i32,
    pub order: i32,
    pub options: Vec<OptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionDto {
    pub fn new(question: &QuizQuestion, include_answer_key: bool) -> Self {
        QuestionDto {
            id: question.id.clone(),
            text: question.text.clone(),
            question_type: question.kind.question_type(),
            points: question.points,
            order: question.order,
            options: question.kind.options().iter().map(OptionView::from).collect(),
            correct_answer: include_answer_key.then(|| question.kind.correct_answer_display()),
            explanation: if include_answer_key {
                question.explanation.clone()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: f64,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_correct_answers: bool,
    pub is_published: bool,
    pub questions: Vec<QuestionDto>,
}

impl QuizResponse {
    pub fn new(quiz: &Quiz, questions: &[QuizQuestion], include_answer_key: bool) -> Self {
        let mut ordered: Vec<&QuizQuestion> = questions.iter().collect();
        ordered.sort_by_key(|q| q.order);

        QuizResponse {
            id: quiz.id.clone(),
            course_id: quiz.course_id.clone(),
            lesson_id: quiz.lesson_id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            passing_score: quiz.passing_score,
            time_limit_minutes: quiz.time_limit_minutes,
            max_attempts: quiz.max_attempts,
            shuffle_questions: quiz.shuffle_questions,
            shuffle_options: quiz.shuffle_options,
            show_correct_answers: quiz.show_correct_answers,
            is_published: quiz.is_published,
            questions: ordered
                .into_iter()
                .map(|q| QuestionDto::new(q, include_answer_key))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentResponse {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub completed_lesson_ids: Vec<String>,
    pub passed_quiz_ids: Vec<String>,
    pub enrolled_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        EnrollmentResponse {
            id: enrollment.id,
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            completed_lesson_ids: enrollment.completed_lesson_ids,
            passed_quiz_ids: enrollment.passed_quiz_ids,
            enrolled_at: enrollment.enrolled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteQuizResponse {
    pub message: String,
}
