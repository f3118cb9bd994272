use std::collections::HashMap;

use crate::models::domain::{
    GradeOutcome, QuestionKind, QuestionResult, QuizQuestion, SubmittedAnswer,
};

/// Comparison form for short answers: surrounding whitespace dropped, case folded.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// `score / max_score * 100` rounded half-up to two decimals, 0 for an empty
/// quiz, always within 0..=100.
///
/// Computed in integer hundredths so that 58 of 100 is exactly `58.0`.
pub fn percentage(score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    let max = i64::from(max_score);
    let score = i64::from(score).clamp(0, max);
    let hundredths = (score * 20_000 + max) / (2 * max);
    hundredths as f64 / 100.0
}

/// Pass check against the stored, rounded percentage. A score exactly on the
/// threshold passes.
pub fn is_passing(percentage: f64, max_score: i32, passing_score: f64) -> bool {
    max_score > 0 && percentage >= passing_score
}

fn is_correct(kind: &QuestionKind, answer: &SubmittedAnswer) -> bool {
    match (kind, answer) {
        (
            QuestionKind::MultipleChoice {
                correct_option_id, ..
            },
            SubmittedAnswer::Text(option_id),
        ) => option_id.trim() == correct_option_id,
        (QuestionKind::TrueFalse { correct_value }, SubmittedAnswer::Flag(value)) => {
            value == correct_value
        }
        (QuestionKind::TrueFalse { correct_value }, SubmittedAnswer::Text(text)) => {
            match normalize_text(text).as_str() {
                "true" => *correct_value,
                "false" => !*correct_value,
                _ => false,
            }
        }
        (QuestionKind::ShortAnswer { canonical_text }, SubmittedAnswer::Text(text)) => {
            normalize_text(text) == normalize_text(canonical_text)
        }
        _ => false,
    }
}

/// Grade one question: full points or nothing.
pub fn grade_question(question: &QuizQuestion, answer: Option<&SubmittedAnswer>) -> QuestionResult {
    let correct = answer
        .map(|answer| is_correct(&question.kind, answer))
        .unwrap_or(false);
    let points_possible = question.points_possible();

    QuestionResult {
        question_id: question.id.clone(),
        question_text: question.text.clone(),
        question_type: question.kind.question_type(),
        points_possible,
        points_awarded: if correct { points_possible } else { 0 },
        is_correct: correct,
        submitted_answer: answer.cloned(),
        correct_answer: question.kind.correct_answer_display(),
        explanation: question.explanation.clone(),
    }
}

/// Grade a full answer set against the current question bank.
///
/// Every question contributes to `max_score` whether answered or not; answers
/// are looked up by question id and missing ones score zero.
pub fn grade_answers(
    questions: &[QuizQuestion],
    answers: &HashMap<String, SubmittedAnswer>,
    passing_score: f64,
) -> GradeOutcome {
    let mut ordered: Vec<&QuizQuestion> = questions.iter().collect();
    ordered.sort_by_key(|q| q.order);

    let question_results: Vec<QuestionResult> = ordered
        .into_iter()
        .map(|question| grade_question(question, answers.get(&question.id)))
        .collect();

    let score: i32 = question_results.iter().map(|r| r.points_awarded).sum();
    let max_score: i32 = question_results.iter().map(|r| r.points_possible).sum();
    let percentage = percentage(score, max_score);

    GradeOutcome {
        score,
        max_score,
        percentage,
        is_passed: is_passing(percentage, max_score, passing_score),
        question_results,
    }
}
