use serde_json::Value;

use crate::error::FormError;
use crate::forms::{FormSession, ValidationRule};

pub const NAME: &str = "name";
pub const EMAIL: &str = "email";
pub const MESSAGE: &str = "message";

const MESSAGE_MIN_CHARS: usize = 5;

pub(crate) fn name_rules() -> Vec<ValidationRule> {
    vec![ValidationRule::required("Name is required")]
}

pub(crate) fn email_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::required("Email is required"),
        ValidationRule::email("Invalid email address"),
    ]
}

/// Registers every field with an empty string, then sets the steps.
pub(crate) fn build(
    fields: Vec<(&str, Vec<ValidationRule>)>,
    steps: &[&[&str]],
) -> Result<FormSession, FormError> {
    let mut form = FormSession::new();
    for (name, rules) in fields {
        form.register_field(name, Value::String(String::new()), rules)?;
    }
    form.set_steps(
        steps
            .iter()
            .map(|step| step.iter().map(|name| name.to_string()).collect())
            .collect(),
    );
    Ok(form)
}

/// Two-step contact form: who you are, then what you have to say.
pub fn contact_form() -> Result<FormSession, FormError> {
    build(
        vec![
            (NAME, name_rules()),
            (EMAIL, email_rules()),
            (
                MESSAGE,
                vec![
                    ValidationRule::required("Message is required"),
                    ValidationRule::min_length(
                        MESSAGE_MIN_CHARS,
                        format!("Message must be at least {MESSAGE_MIN_CHARS} characters"),
                    ),
                ],
            ),
        ],
        &[&[NAME, EMAIL], &[MESSAGE]],
    )
}

/// What to ask the user for each field.
pub fn prompt_for(field: &str) -> &'static str {
    match field {
        NAME => "What's your name?",
        EMAIL => "What's your email address?",
        MESSAGE => "What would you like to tell us?",
        _ => "Please fill in this field",
    }
}
