use rand::Rng;

use crate::quiz::{self, distractors::distractors, shuffle::shuffle, Operation};

pub const DEFAULT_TABLE: i64 = 2;

/// Builds a practice set for one table of `operation`.
///
/// Every question has the correct result plus three distractors, answers and
/// questions are both shuffled, and the set is cut down to `max_questions`.
pub fn generate<R: Rng + ?Sized>(
    operation: Operation,
    table: Option<i64>,
    max_questions: usize,
    rng: &mut R,
) -> Vec<quiz::Question> {
    let t = table.unwrap_or(DEFAULT_TABLE);

    let questions: Vec<quiz::Question> = match operation {
        Operation::Addition => (0..=20)
            .map(|n| make_question(format!("{t} + {n} = ?"), t + n, rng))
            .collect(),
        Operation::Subtraction => (0..=20)
            .map(|n| {
                // a - t is never negative
                let a = t + n;
                make_question(format!("{a} − {t} = ?"), n, rng)
            })
            .collect(),
        Operation::Multiplication => (0..=12)
            .map(|n| make_question(format!("{t} × {n} = ?"), t * n, rng))
            .collect(),
    };

    let mut questions = shuffle(&questions, rng);
    questions.truncate(max_questions);
    questions
}

fn make_question<R: Rng + ?Sized>(prompt: String, correct: i64, rng: &mut R) -> quiz::Question {
    let mut answers = vec![quiz::Answer::new(correct.to_string(), true)];
    answers.extend(
        distractors(correct, rng)
            .iter()
            .map(|wrong| quiz::Answer::new(wrong.to_string(), false)),
    );
    // so the correct one isn't always the first one
    quiz::Question::new(prompt, shuffle(&answers, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn find<'a>(questions: &'a [quiz::Question], prompt: &str) -> &'a quiz::Question {
        questions
            .iter()
            .find(|q| q.prompt == prompt)
            .unwrap_or_else(|| panic!("no question {prompt:?}"))
    }

    #[test]
    fn addition_table_three() {
        let questions = generate(Operation::Addition, Some(3), 25, &mut StdRng::seed_from_u64(1));
        assert_eq!(questions.len(), 21);
        let q = find(&questions, "3 + 5 = ?");
        assert_eq!(q.correct_answer().map(|a| a.text.as_str()), Some("8"));
    }

    #[test]
    fn subtraction_table_four() {
        let questions = generate(Operation::Subtraction, Some(4), 25, &mut StdRng::seed_from_u64(2));
        let q = find(&questions, "9 − 4 = ?");
        assert_eq!(q.correct_answer().map(|a| a.text.as_str()), Some("5"));
    }

    #[test]
    fn multiplication_has_thirteen_rows() {
        let questions = generate(
            Operation::Multiplication,
            Some(7),
            20,
            &mut StdRng::seed_from_u64(3),
        );
        assert_eq!(questions.len(), 13);
        let q = find(&questions, "7 × 12 = ?");
        assert_eq!(q.correct_answer().map(|a| a.text.as_str()), Some("84"));
    }

    #[test]
    fn table_defaults_to_two() {
        let questions = generate(Operation::Multiplication, None, 20, &mut StdRng::seed_from_u64(4));
        assert!(questions.iter().all(|q| q.prompt.starts_with("2 × ")));
    }

    #[test]
    fn result_is_capped() {
        let questions = generate(Operation::Addition, Some(5), 20, &mut StdRng::seed_from_u64(5));
        assert_eq!(questions.len(), 20);
    }

    #[test]
    fn every_question_has_four_answers_one_correct() {
        let mut rng = StdRng::seed_from_u64(6);
        for operation in Operation::ALL {
            for table in 0..=12 {
                for q in generate(operation, Some(table), 20, &mut rng) {
                    assert_eq!(q.answers.len(), 4, "{}", q.prompt);
                    assert_eq!(q.answers.iter().filter(|a| a.is_correct).count(), 1);
                    assert!(q.selected.is_none());
                }
            }
        }
    }
}
