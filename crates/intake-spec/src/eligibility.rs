use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerStore;
use crate::bmi::{self, BMI_THRESHOLD, HEIGHT_ID};
use crate::spec::question::NONE_OPTION;

pub const MEDICAL_CONDITIONS_ID: &str = "medicalConditions";
pub const MEDICATIONS_ID: &str = "medications";

/// Why a respondent was found ineligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    MedicalHistory,
    Medications,
    /// Checked against the unrounded BMI; the message shows one decimal, so a
    /// value just under 25 reads as "25.0".
    BmiBelowThreshold { bmi: f64 },
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::MedicalHistory => "medical_history",
            RejectionReason::Medications => "medications",
            RejectionReason::BmiBelowThreshold { .. } => "bmi_below_threshold",
        }
    }
}

/// Terminal eligibility outcome, recorded on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rejection {
    pub question_id: String,
    pub reason: RejectionReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectionReason::MedicalHistory => write!(f, "Ineligible due to medical history."),
            RejectionReason::Medications => write!(f, "Ineligible due to medications."),
            RejectionReason::BmiBelowThreshold { bmi: value } => write!(
                f,
                "Your BMI is {}. Ineligible for weight loss treatment.",
                bmi::format(*value)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Continue,
    Reject(Rejection),
}

/// Decides whether the session may continue after `question_id` was collected.
/// Rules are checked in priority order and the first match wins.
pub fn evaluate(question_id: &str, answers: &AnswerStore) -> Decision {
    let reason = if question_id == MEDICAL_CONDITIONS_ID
        && selection_disqualifies(answers, MEDICAL_CONDITIONS_ID)
    {
        Some(RejectionReason::MedicalHistory)
    } else if question_id == MEDICATIONS_ID && selection_disqualifies(answers, MEDICATIONS_ID) {
        Some(RejectionReason::Medications)
    } else if question_id == HEIGHT_ID {
        let value = bmi::from_answers(answers);
        (value < BMI_THRESHOLD).then_some(RejectionReason::BmiBelowThreshold { bmi: value })
    } else {
        None
    };

    match reason {
        Some(reason) => Decision::Reject(Rejection {
            question_id: question_id.to_string(),
            reason,
        }),
        None => Decision::Continue,
    }
}

/// A checkbox selection disqualifies when anything other than `"none"` is checked.
pub fn selection_disqualifies(answers: &AnswerStore, question_id: &str) -> bool {
    let selection = answers.selection(question_id);
    !selection.is_empty() && !selection.iter().any(|id| id == NONE_OPTION)
}
