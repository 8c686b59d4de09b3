use crate::error::FormError;
use crate::forms::contact::{build, email_rules, name_rules, EMAIL, NAME};
use crate::forms::FormSession;

/// Single-step sign-up: name and email, validated together on submit.
pub fn simple_form() -> Result<FormSession, FormError> {
    build(
        vec![(NAME, name_rules()), (EMAIL, email_rules())],
        &[&[NAME, EMAIL]],
    )
}
