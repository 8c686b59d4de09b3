//! Field registry with ordered validation rules and optional step gating.
//!
//! Validation never fails with an `Err`: a failing rule leaves its message on
//! the field and the check returns `false`.

pub mod contact;
pub mod simple;

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::FormError;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct ValidationRule {
    predicate: Predicate,
    message: String,
}

impl ValidationRule {
    pub fn new<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }

    /// A string with something other than whitespace in it.
    pub fn required(message: impl Into<String>) -> Self {
        Self::new(message, |v| v.as_str().is_some_and(|s| !s.trim().is_empty()))
    }

    pub fn email(message: impl Into<String>) -> Self {
        Self::new(message, |v| v.as_str().is_some_and(|s| email_regex().is_match(s)))
    }

    pub fn min_length(min: usize, message: impl Into<String>) -> Self {
        Self::new(message, move |v| {
            v.as_str().is_some_and(|s| s.trim().chars().count() >= min)
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

#[derive(Debug, Clone)]
pub struct FieldState {
    pub value: Value,
    pub error: Option<String>,
    rules: Vec<ValidationRule>,
}

/// Handle to a registered field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormSession {
    fields: Vec<(String, FieldState)>,
    steps: Vec<Vec<String>>,
    current_step: usize,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_field(
        &mut self,
        name: &str,
        initial: Value,
        rules: Vec<ValidationRule>,
    ) -> Result<FieldKey, FormError> {
        if self.field(name).is_some() {
            return Err(FormError::DuplicateField(name.to_string()));
        }
        self.fields.push((
            name.to_string(),
            FieldState {
                value: initial,
                error: None,
                rules,
            },
        ));
        Ok(FieldKey(name.to_string()))
    }

    pub fn set_steps(&mut self, steps: Vec<Vec<String>>) {
        self.steps = steps;
        self.current_step = 0;
    }

    pub fn steps(&self) -> &[Vec<String>] {
        &self.steps
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step + 1 >= self.steps.len()
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Returns `false` when no such field is registered.
    pub fn set_value(&mut self, name: impl AsRef<str>, value: Value) -> bool {
        match self.field_mut(name.as_ref()) {
            Some(field) => {
                field.value = value;
                true
            }
            None => false,
        }
    }

    pub fn value(&self, name: impl AsRef<str>) -> Option<&Value> {
        self.field(name.as_ref()).map(|f| &f.value)
    }

    pub fn error(&self, name: impl AsRef<str>) -> Option<&str> {
        self.field(name.as_ref()).and_then(|f| f.error.as_deref())
    }

    /// Runs the field's rules in order; the first failure's message is kept.
    /// Unknown fields are considered valid.
    pub fn validate_field(&mut self, name: impl AsRef<str>) -> bool {
        let Some(field) = self.field_mut(name.as_ref()) else {
            return true;
        };
        let failed = field
            .rules
            .iter()
            .find(|rule| !rule.check(&field.value))
            .map(|rule| rule.message.clone());
        let valid = failed.is_none();
        field.error = failed;
        valid
    }

    /// Validates every field of the step, so each failing field gets its message.
    pub fn validate_step(&mut self, index: usize) -> bool {
        let Some(names) = self.steps.get(index).cloned() else {
            return true;
        };
        names
            .iter()
            .fold(true, |valid, name| self.validate_field(name) && valid)
    }

    pub fn validate(&mut self) -> bool {
        let names: Vec<String> = self.fields.iter().map(|(n, _)| n.clone()).collect();
        names
            .iter()
            .fold(true, |valid, name| self.validate_field(name) && valid)
    }

    pub fn next_step(&mut self) {
        if self.is_last_step() {
            return;
        }
        if self.validate_step(self.current_step) {
            self.current_step += 1;
        }
    }

    pub fn prev_step(&mut self) {
        if self.current_step > 0 {
            self.current_step -= 1;
        }
    }

    /// Calls `on_success` with the form values only if every field validates.
    pub fn submit<F>(&mut self, on_success: F) -> bool
    where
        F: FnOnce(Map<String, Value>),
    {
        if !self.validate() {
            return false;
        }
        on_success(self.values());
        true
    }

    pub fn values(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }
}
