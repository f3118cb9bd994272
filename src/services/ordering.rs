use std::collections::HashMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::domain::{QuestionOption, Quiz, QuizAttempt, QuizQuestion};

/// Question and option order fixed for the lifetime of one attempt.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct AttemptOrdering {
    pub seed: Option<i64>,
    pub question_order: Vec<String>,
    pub option_orders: HashMap<String, Vec<String>>,
}

pub fn new_seed() -> i64 {
    rand::random::<i64>()
}

fn authored_order(questions: &[QuizQuestion]) -> Vec<&QuizQuestion> {
    let mut ordered: Vec<&QuizQuestion> = questions.iter().collect();
    ordered.sort_by_key(|q| q.order);
    ordered
}

/// Same quiz, questions and seed always give the same ordering.
pub fn build_ordering(quiz: &Quiz, questions: &[QuizQuestion], seed: i64) -> AttemptOrdering {
    let mut question_order: Vec<String> = authored_order(questions)
        .into_iter()
        .map(|q| q.id.clone())
        .collect();

    if !quiz.shuffle_questions && !quiz.shuffle_options {
        return AttemptOrdering {
            seed: None,
            question_order,
            option_orders: HashMap::new(),
        };
    }

    let mut rng = StdRng::seed_from_u64(seed as u64);

    if quiz.shuffle_questions {
        question_order.shuffle(&mut rng);
    }

    let mut option_orders = HashMap::new();
    if quiz.shuffle_options {
        for question in authored_order(questions) {
            let options = question.kind.options();
            if options.len() < 2 {
                continue;
            }
            let mut ids: Vec<String> = options.iter().map(|o| o.id.clone()).collect();
            ids.shuffle(&mut rng);
            option_orders.insert(question.id.clone(), ids);
        }
    }

    log::debug!(
        "Built ordering for quiz {} (shuffle_questions={}, shuffle_options={})",
        quiz.id,
        quiz.shuffle_questions,
        quiz.shuffle_options
    );

    AttemptOrdering {
        seed: Some(seed),
        question_order,
        option_orders,
    }
}

impl AttemptOrdering {
    pub fn apply_to(self, attempt: &mut QuizAttempt) {
        attempt.shuffle_seed = self.seed;
        attempt.question_order = self.question_order;
        attempt.option_orders = self.option_orders;
    }
}

/// Questions in the order stored on the attempt; anything the stored order
/// does not mention follows in authored order.
pub fn ordered_questions<'a>(
    attempt: &QuizAttempt,
    questions: &'a [QuizQuestion],
) -> Vec<&'a QuizQuestion> {
    let by_id: HashMap<&str, &QuizQuestion> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let mut ordered: Vec<&QuizQuestion> = attempt
        .question_order
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .collect();

    for question in authored_order(questions) {
        if !attempt.question_order.contains(&question.id) {
            ordered.push(question);
        }
    }

    ordered
}

pub fn ordered_options<'a>(
    attempt: &QuizAttempt,
    question: &'a QuizQuestion,
) -> Vec<&'a QuestionOption> {
    let options = question.kind.options();
    let Some(order) = attempt.option_orders.get(&question.id) else {
        return options.iter().collect();
    };

    let mut ordered: Vec<&QuestionOption> = order
        .iter()
        .filter_map(|id| options.iter().find(|o| &o.id == id))
        .collect();
    for option in options {
        if !order.contains(&option.id) {
            ordered.push(option);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{Enrollment, QuestionKind};
    use chrono::Utc;

    fn questions(count: i32) -> Vec<QuizQuestion> {
        (1..=count)
            .map(|n| {
                let mut q = QuizQuestion::new(
                    "quiz-1",
                    &format!("Question {}", n),
                    1,
                    n,
                    QuestionKind::MultipleChoice {
                        options: (1..=4)
                            .map(|o| QuestionOption {
                                id: format!("q{}-o{}", n, o),
                                text: format!("Option {}", o),
                            })
                            .collect(),
                        correct_option_id: format!("q{}-o1", n),
                    },
                );
                q.id = format!("q{}", n);
                q
            })
            .collect()
    }

    fn quiz(shuffle_questions: bool, shuffle_options: bool) -> Quiz {
        let mut quiz = Quiz::new_draft("course-1", "lesson-1", "teacher-1", "Quiz", 70.0, 3);
        quiz.shuffle_questions = shuffle_questions;
        quiz.shuffle_options = shuffle_options;
        quiz
    }

    #[test]
    fn unshuffled_quiz_keeps_authored_order_without_seed() {
        let mut qs = questions(3);
        qs.reverse();

        let ordering = build_ordering(&quiz(false, false), &qs, 42);

        assert_eq!(ordering.seed, None);
        assert_eq!(ordering.question_order, vec!["q1", "q2", "q3"]);
        assert!(ordering.option_orders.is_empty());
    }

    #[test]
    fn same_seed_gives_same_ordering() {
        let qs = questions(8);
        let quiz = quiz(true, true);

        let first = build_ordering(&quiz, &qs, 7);
        let second = build_ordering(&quiz, &qs, 7);

        assert_eq!(first, second);
        assert_eq!(first.seed, Some(7));
        assert_eq!(first.option_orders.len(), 8);
    }

    #[test]
    fn shuffled_order_is_a_permutation() {
        let qs = questions(10);
        let ordering = build_ordering(&quiz(true, false), &qs, new_seed());

        let mut sorted = ordering.question_order.clone();
        sorted.sort();
        let mut expected: Vec<String> = qs.iter().map(|q| q.id.clone()).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn stored_ordering_drives_views() {
        let qs = questions(3);
        let enrollment = Enrollment::new("student-1", "course-1");
        let mut attempt = QuizAttempt::start(&enrollment, &quiz(true, true), 1, Utc::now());

        AttemptOrdering {
            seed: Some(1),
            question_order: vec!["q3".to_string(), "q1".to_string()],
            option_orders: HashMap::from([(
                "q3".to_string(),
                vec!["q3-o4".to_string(), "q3-o2".to_string()],
            )]),
        }
        .apply_to(&mut attempt);

        let ordered: Vec<&str> = ordered_questions(&attempt, &qs)
            .iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(ordered, vec!["q3", "q1", "q2"]);

        let options: Vec<&str> = ordered_options(&attempt, &qs[2])
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(options, vec!["q3-o4", "q3-o2", "q3-o1", "q3-o3"]);
    }
}
