use serde::{Deserialize, Serialize};

use crate::answers::AnswerStore;
use crate::eligibility::Rejection;

/// Mutable state of one questionnaire attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub current_index: usize,
    #[serde(default)]
    pub answers: AnswerStore,
    #[serde(default)]
    pub terminated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    /// Ids of the questions collected so far, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visited: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub confirmed: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_visited(&self, question_id: &str) -> bool {
        self.visited.iter().any(|id| id == question_id)
    }
}
