use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::answers::{ValidationError, ValidationResult};
use crate::bmi::BMI_ID;
use crate::spec::form::IntakeForm;
use crate::spec::question::{NONE_OPTION, QuestionDefinition, QuestionKind};

/// Answer keys produced by the engine rather than by a question.
pub const DERIVED_KEYS: &[&str] = &[BMI_ID];

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid pattern"));

/// Checks a flat answer object against the form's catalog.
pub fn validate(form: &IntakeForm, answers: &Value) -> ValidationResult {
    let answers_map = answers.as_object().cloned().unwrap_or_default();

    let errors = form
        .questions
        .iter()
        .filter_map(|question| {
            answers_map
                .get(&question.id)
                .and_then(|value| validate_value(question, value))
        })
        .collect::<Vec<_>>();

    let unknown_fields: Vec<String> = answers_map
        .keys()
        .filter(|key| !form.questions.contains(key) && !DERIVED_KEYS.contains(&key.as_str()))
        .cloned()
        .collect();

    ValidationResult {
        valid: errors.is_empty() && unknown_fields.is_empty(),
        errors,
        unknown_fields,
    }
}

fn validate_value(question: &QuestionDefinition, value: &Value) -> Option<ValidationError> {
    match question.kind {
        QuestionKind::MultiCheckbox => {
            let Some(items) = value.as_array() else {
                return Some(base_error(question, "type mismatch", "type_mismatch"));
            };
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(id) if question.has_checkbox(id) => ids.push(id),
                    Some(_) => {
                        return Some(base_error(
                            question,
                            "unknown checkbox option",
                            "option_mismatch",
                        ));
                    }
                    None => return Some(base_error(question, "type mismatch", "type_mismatch")),
                }
            }
            if ids.len() > 1 && ids.contains(&NONE_OPTION) {
                return Some(base_error(
                    question,
                    "'none' cannot be combined with other options",
                    "exclusive_none",
                ));
            }
            None
        }
        kind => {
            let Some(text) = value.as_str() else {
                return Some(base_error(question, "type mismatch", "type_mismatch"));
            };
            match kind {
                QuestionKind::Radio if !text.is_empty() && !question.has_option(text) => Some(
                    base_error(question, "invalid radio option", "option_mismatch"),
                ),
                QuestionKind::Email if !text.is_empty() && !EMAIL.is_match(text) => Some(
                    base_error(question, "value is not an email address", "email_format"),
                ),
                QuestionKind::FileUpload if !text.starts_with("data:") => Some(base_error(
                    question,
                    "upload is not a data URI",
                    "data_uri",
                )),
                _ => None,
            }
        }
    }
}

fn base_error(question: &QuestionDefinition, message: &str, code: &str) -> ValidationError {
    ValidationError {
        question_id: Some(question.id.clone()),
        path: Some(format!("/{}", question.id)),
        message: message.into(),
        code: Some(code.into()),
    }
}
