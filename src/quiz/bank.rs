use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use rand::Rng;

use crate::error::LoadError;
use crate::quiz::{self, shuffle::shuffle, training, Operation, QuizParams};

/// One entry of a static question collection, as stored in `data/*.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub answers: Vec<AnswerRecord>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub correct: bool,
}

/// A source of static question collections, one per operation.
pub trait QuestionBank: Send + Sync {
    fn fetch(&self, operation: Operation) -> Result<Vec<QuestionRecord>, LoadError>;
}

/// The collections shipped inside the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedBank;

impl QuestionBank for EmbeddedBank {
    fn fetch(&self, operation: Operation) -> Result<Vec<QuestionRecord>, LoadError> {
        let raw = match operation {
            Operation::Addition => include_str!("../../data/addition.json"),
            Operation::Subtraction => include_str!("../../data/subtraction.json"),
            Operation::Multiplication => include_str!("../../data/multiplication.json"),
        };
        serde_json::from_str(raw).map_err(|source| LoadError::Parse { operation, source })
    }
}

/// Reads `<dir>/<operation>.json` on every fetch.
#[derive(Debug, Clone)]
pub struct DirectoryBank {
    dir: PathBuf,
}

impl DirectoryBank {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, operation: Operation) -> PathBuf {
        self.dir.join(format!("{}.json", operation.as_str()))
    }
}

impl QuestionBank for DirectoryBank {
    fn fetch(&self, operation: Operation) -> Result<Vec<QuestionRecord>, LoadError> {
        let path = self.path_for(operation);
        let file = File::open(&path).map_err(|source| LoadError::Io {
            operation,
            path: path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| LoadError::Parse { operation, source })
    }
}

/// Produces the question set for a quiz start.
///
/// Training mode never touches the bank. Otherwise the collection is checked
/// record by record, shuffled (questions and each answer list) and capped.
pub fn load<R: Rng + ?Sized>(
    bank: &dyn QuestionBank,
    params: &QuizParams,
    max_questions: usize,
    rng: &mut R,
) -> Result<Vec<quiz::Question>, LoadError> {
    if params.training {
        return Ok(training::generate(
            params.operation,
            params.table,
            max_questions,
            rng,
        ));
    }

    let operation = params.operation;
    let records = bank.fetch(operation)?;
    if records.is_empty() {
        return Err(LoadError::Empty { operation });
    }

    let questions = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| to_question(operation, index, record))
        .collect::<Result<Vec<_>, _>>()?;

    let mut questions: Vec<quiz::Question> = shuffle(&questions, rng)
        .into_iter()
        .map(|q| quiz::Question::new(q.prompt, shuffle(&q.answers, rng)))
        .collect();
    questions.truncate(max_questions);

    log::debug!("loaded {} {operation} questions", questions.len());
    Ok(questions)
}

fn to_question(
    operation: Operation,
    index: usize,
    record: QuestionRecord,
) -> Result<quiz::Question, LoadError> {
    let malformed = |reason: String| LoadError::Malformed {
        operation,
        index,
        reason,
    };

    if record.question.trim().is_empty() {
        return Err(malformed("empty prompt".to_string()));
    }
    if record.answers.len() < 2 {
        return Err(malformed(format!(
            "needs at least 2 answers, has {}",
            record.answers.len()
        )));
    }
    let correct = record.answers.iter().filter(|a| a.correct).count();
    if correct != 1 {
        return Err(malformed(format!(
            "needs exactly one correct answer, has {correct}"
        )));
    }

    let answers = record
        .answers
        .into_iter()
        .map(|a| quiz::Answer::new(a.answer, a.correct))
        .collect();
    Ok(quiz::Question::new(record.question, answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedBank(String);

    impl QuestionBank for FixedBank {
        fn fetch(&self, operation: Operation) -> Result<Vec<QuestionRecord>, LoadError> {
            serde_json::from_str(&self.0).map_err(|source| LoadError::Parse { operation, source })
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(17)
    }

    #[test]
    fn embedded_banks_are_well_formed_and_capped() {
        for operation in Operation::ALL {
            let questions = load(&EmbeddedBank, &QuizParams::timed(operation), 20, &mut rng())
                .unwrap_or_else(|e| panic!("{operation}: {e}"));
            assert_eq!(questions.len(), 20);
            for q in &questions {
                assert!(q.answers.len() >= 2);
                assert_eq!(q.answers.iter().filter(|a| a.is_correct).count(), 1);
            }
        }
    }

    #[test]
    fn training_bypasses_the_bank() {
        let bank = FixedBank("not json".to_string());
        let params = QuizParams::training(Operation::Addition, Some(3));
        let questions = load(&bank, &params, 20, &mut rng()).expect("training cannot fail");
        assert_eq!(questions.len(), 20);
    }

    #[test]
    fn single_correct_answer_is_enforced() {
        let bank = FixedBank(
            r#"[{"question": "1 + 1 = ?", "answers": [
                {"answer": "2", "correct": true},
                {"answer": "3", "correct": true}
            ]}]"#
                .to_string(),
        );
        let err = load(&bank, &QuizParams::default(), 20, &mut rng()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { index: 0, .. }), "{err}");
    }

    #[test]
    fn one_answer_is_not_enough() {
        let bank = FixedBank(
            r#"[{"question": "1 + 1 = ?", "answers": [{"answer": "2", "correct": true}]}]"#
                .to_string(),
        );
        assert!(matches!(
            load(&bank, &QuizParams::default(), 20, &mut rng()),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn empty_and_unparseable_banks_fail() {
        let empty = FixedBank("[]".to_string());
        assert!(matches!(
            load(&empty, &QuizParams::default(), 20, &mut rng()),
            Err(LoadError::Empty { .. })
        ));
        let broken = FixedBank("{".to_string());
        assert!(matches!(
            load(&broken, &QuizParams::default(), 20, &mut rng()),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn missing_directory_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bank = DirectoryBank::new(dir.path());
        let err = bank.fetch(Operation::Multiplication).unwrap_err();
        match err {
            LoadError::Io { path, .. } => assert!(path.ends_with("multiplication.json")),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn directory_bank_reads_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("subtraction.json"),
            r#"[{"question": "5 − 2 = ?", "answers": [
                {"answer": "3", "correct": true},
                {"answer": "4", "correct": false}
            ]}]"#,
        )
        .expect("write bank");
        let bank = DirectoryBank::new(dir.path());
        let questions = load(
            &bank,
            &QuizParams::timed(Operation::Subtraction),
            20,
            &mut rng(),
        )
        .expect("load");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer().map(|a| a.text.as_str()), Some("3"));
    }
}
