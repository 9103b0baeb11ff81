use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Checkbox id that excludes every other selection of its question.
pub const NONE_OPTION: &str = "none";

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    Landing,
    Text,
    Email,
    Tel,
    Textarea,
    FileUpload,
    Radio,
    MultiCheckbox,
}

impl QuestionKind {
    /// Label used in serialized forms and render payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Landing => "landing",
            QuestionKind::Text => "text",
            QuestionKind::Email => "email",
            QuestionKind::Tel => "tel",
            QuestionKind::Textarea => "textarea",
            QuestionKind::FileUpload => "fileUpload",
            QuestionKind::Radio => "radio",
            QuestionKind::MultiCheckbox => "multiCheckbox",
        }
    }

    /// Kinds whose raw input is a single free-form string.
    pub fn is_free_text(&self) -> bool {
        matches!(
            self,
            QuestionKind::Text | QuestionKind::Email | QuestionKind::Tel | QuestionKind::Textarea
        )
    }
}

/// Single choice offered by a radio question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RadioOption {
    pub value: String,
    pub label: String,
}

/// Single box offered by a multi-checkbox question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckboxOption {
    pub id: String,
    pub label: String,
}

/// One phase of a titration plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DosePhase {
    pub weeks: String,
    pub dose: String,
    pub frequency: String,
}

/// Dose escalation plan shown on a product's schedule page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TitrationSchedule {
    pub product: String,
    pub label: String,
    pub phases: Vec<DosePhase>,
}

/// Definition of a single question inside the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<RadioOption>,
    #[serde(
        default,
        rename = "checkboxOptions",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub checkbox_options: Vec<CheckboxOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<TitrationSchedule>,
}

impl QuestionDefinition {
    pub fn new(id: impl Into<String>, kind: QuestionKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            description: None,
            options: Vec::new(),
            checkbox_options: Vec::new(),
            schedule: None,
        }
    }

    /// Adds radio options given as `(value, label)` pairs.
    pub fn with_options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = options
            .iter()
            .map(|(value, label)| RadioOption {
                value: (*value).to_string(),
                label: (*label).to_string(),
            })
            .collect();
        self
    }

    /// Adds checkbox options given as `(id, label)` pairs.
    pub fn with_checkboxes(mut self, options: &[(&str, &str)]) -> Self {
        self.checkbox_options = options
            .iter()
            .map(|(id, label)| CheckboxOption {
                id: (*id).to_string(),
                label: (*label).to_string(),
            })
            .collect();
        self
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    pub fn has_checkbox(&self, id: &str) -> bool {
        self.checkbox_options.iter().any(|option| option.id == id)
    }
}
