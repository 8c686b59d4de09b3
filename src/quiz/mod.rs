pub mod bank;
pub mod distractors;
pub mod feedback;
pub mod machine;
pub mod session;
pub mod shuffle;
pub mod training;

use std::fmt;

pub use machine::{Phase, QuizMachine, TimerCommand};
pub use session::{QuizSession, QuizView};

/// Largest multiplication/addition table a route may ask for in training mode.
pub const MAX_TABLE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Addition,
    Subtraction,
    Multiplication,
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
    ];

    /// Resolves a route parameter. Leading slashes and case are ignored and
    /// anything unrecognised, absent input included, falls back to addition.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Operation::Addition;
        };
        match raw.trim_start_matches('/').to_lowercase().as_str() {
            "subtraction" | "soustraction" => Operation::Subtraction,
            "multiplication" => Operation::Multiplication,
            _ => Operation::Addition,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operation::Addition => '+',
            Operation::Subtraction => '−',
            Operation::Multiplication => '×',
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the route hands to a quiz page: `/quiz/<operation>?mode=training&table=N`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizParams {
    pub operation: Operation,
    pub training: bool,
    pub table: Option<i64>,
}

impl QuizParams {
    pub fn timed(operation: Operation) -> Self {
        Self {
            operation,
            training: false,
            table: None,
        }
    }

    pub fn training(operation: Operation, table: Option<i64>) -> Self {
        Self {
            operation,
            training: true,
            table,
        }
    }

    pub fn from_route(operation: Option<&str>, querystring: &str) -> Self {
        let mut params = Self::timed(Operation::normalize(operation));
        for pair in querystring.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "mode" => params.training = value == "training",
                "table" => params.table = parse_table(value),
                _ => {}
            }
        }
        params
    }
}

fn parse_table(raw: &str) -> Option<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|table| (0..=MAX_TABLE).contains(table))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub prompt: String,
    pub answers: Vec<Answer>,
    /// Index into `answers` of the answer the player picked.
    pub selected: Option<usize>,
}
impl Question {
    pub fn new(prompt: String, answers: Vec<Answer>) -> Self {
        Self {
            prompt,
            answers,
            selected: None,
        }
    }

    pub fn correct_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.is_correct)
    }

    pub fn selected_answer(&self) -> Option<&Answer> {
        self.selected.and_then(|i| self.answers.get(i))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    pub text: String,
    pub is_correct: bool,
}
impl Answer {
    pub fn new(text: String, is_correct: bool) -> Self {
        Self { text, is_correct }
    }
}
