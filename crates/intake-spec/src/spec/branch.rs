use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerValue;

/// Condition on the answer of the question a branch rule is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AnswerPredicate {
    Always,
    Equals { value: String },
    OneOf { values: Vec<String> },
}

impl AnswerPredicate {
    pub fn matches(&self, answer: Option<&AnswerValue>) -> bool {
        match self {
            AnswerPredicate::Always => true,
            AnswerPredicate::Equals { value } => {
                answer.and_then(AnswerValue::as_scalar) == Some(value.as_str())
            }
            AnswerPredicate::OneOf { values } => answer
                .and_then(AnswerValue::as_scalar)
                .is_some_and(|answer| values.iter().any(|value| value == answer)),
        }
    }
}

/// Where the cursor goes when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BranchAction {
    /// Jump to `target`. A target missing from the catalog is a configuration error.
    GoTo { target: String },
    /// Jump to the question right after `target`, skipping it. A missing target
    /// leaves the default traversal in place.
    SkipPast { target: String },
}

impl BranchAction {
    pub fn target(&self) -> &str {
        match self {
            BranchAction::GoTo { target } | BranchAction::SkipPast { target } => target,
        }
    }
}

/// `(question, predicate) -> action` entry of the navigation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BranchRule {
    pub question_id: String,
    pub when: AnswerPredicate,
    #[serde(flatten)]
    pub action: BranchAction,
}

impl BranchRule {
    pub fn go_to(
        question_id: impl Into<String>,
        when: AnswerPredicate,
        target: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            when,
            action: BranchAction::GoTo {
                target: target.into(),
            },
        }
    }

    pub fn skip_past(
        question_id: impl Into<String>,
        when: AnswerPredicate,
        target: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            when,
            action: BranchAction::SkipPast {
                target: target.into(),
            },
        }
    }
}
