use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::{Map, Value};

use crate::spec::question::NONE_OPTION;

/// Value collected for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Text, email, tel, textarea and radio answers.
    Scalar(String),
    /// File uploads, encoded as `data:<mime>;base64,<payload>`.
    DataUri(String),
    /// Checked ids of a multi-checkbox question.
    Selection(Vec<String>),
}

impl AnswerValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            AnswerValue::Scalar(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Selection(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Scalar(text) | AnswerValue::DataUri(text) => text.is_empty(),
            AnswerValue::Selection(ids) => ids.is_empty(),
        }
    }

    /// Flat JSON form used for submissions.
    pub fn to_json(&self) -> Value {
        match self {
            AnswerValue::Scalar(text) | AnswerValue::DataUri(text) => Value::String(text.clone()),
            AnswerValue::Selection(ids) => {
                Value::Array(ids.iter().cloned().map(Value::String).collect())
            }
        }
    }

    pub fn display(&self) -> String {
        match self {
            AnswerValue::Scalar(text) | AnswerValue::DataUri(text) => text.clone(),
            AnswerValue::Selection(ids) => ids.join(", "),
        }
    }
}

/// Checked flag for one box of a multi-checkbox question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxState {
    pub id: String,
    pub checked: bool,
}

/// Answers of the current session plus the per-question checkbox state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerStore {
    #[serde(default)]
    values: BTreeMap<String, AnswerValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    checked: BTreeMap<String, Vec<CheckboxState>>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, question_id: impl Into<String>, value: AnswerValue) {
        self.values.insert(question_id.into(), value);
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.values.get(question_id)
    }

    pub fn scalar(&self, question_id: &str) -> Option<&str> {
        self.get(question_id).and_then(AnswerValue::as_scalar)
    }

    /// Selected ids for a multi-checkbox question; empty when nothing was toggled.
    pub fn selection(&self, question_id: &str) -> &[String] {
        self.get(question_id)
            .and_then(AnswerValue::as_selection)
            .unwrap_or_default()
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.values.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.values.iter()
    }

    /// Applies a checkbox change with the `"none"` exclusivity rule and recomputes
    /// the question's selection from the boxes currently checked.
    ///
    /// Checking `"none"` clears every other box; checking any other box clears
    /// `"none"`; unchecking only touches the box itself. The selection keeps the
    /// order in which boxes were first touched.
    pub fn toggle_checkbox(&mut self, question_id: &str, checkbox_id: &str, checked: bool) {
        let states = self.checked.entry(question_id.to_string()).or_default();
        if checkbox_id == NONE_OPTION && checked {
            for state in states.iter_mut() {
                state.checked = false;
            }
            set_checkbox(states, NONE_OPTION, true);
        } else if checked {
            set_checkbox(states, checkbox_id, true);
            set_checkbox(states, NONE_OPTION, false);
        } else {
            set_checkbox(states, checkbox_id, false);
        }

        let selection = states
            .iter()
            .filter(|state| state.checked)
            .map(|state| state.id.clone())
            .collect();
        self.values
            .insert(question_id.to_string(), AnswerValue::Selection(selection));
    }

    pub fn checkbox_states(&self, question_id: &str) -> &[CheckboxState] {
        self.checked
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_checked(&self, question_id: &str, checkbox_id: &str) -> bool {
        self.checkbox_states(question_id)
            .iter()
            .any(|state| state.id == checkbox_id && state.checked)
    }

    /// Flat `{question_id: value}` object.
    pub fn to_json(&self) -> Value {
        let map = self
            .values
            .iter()
            .map(|(id, value)| (id.clone(), value.to_json()))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }
}

fn set_checkbox(states: &mut Vec<CheckboxState>, id: &str, checked: bool) {
    match states.iter_mut().find(|state| state.id == id) {
        Some(state) => state.checked = checked,
        None => states.push(CheckboxState {
            id: id.to_string(),
            checked,
        }),
    }
}

/// Finalized answers handed to the payment and submission services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSet {
    pub form_id: String,
    pub form_version: String,
    pub answers: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl AnswerSet {
    pub fn new(form_id: impl Into<String>, form_version: impl Into<String>, answers: Value) -> Self {
        Self {
            form_id: form_id.into(),
            form_version: form_version.into(),
            answers,
            payment_id: None,
        }
    }

    /// Serializes the answer set as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    /// Serializes the answer set as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Validation error metadata reported for a finalized answer set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result returned from `validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checking_none_leaves_only_none() {
        let mut store = AnswerStore::new();
        store.toggle_checkbox("medicalConditions", "pancreatitis", true);
        store.toggle_checkbox("medicalConditions", "kidneyDisease", true);
        store.toggle_checkbox("medicalConditions", "none", true);
        assert_eq!(store.selection("medicalConditions"), ["none"]);
        assert!(!store.is_checked("medicalConditions", "pancreatitis"));
    }

    #[test]
    fn checking_other_box_clears_none() {
        let mut store = AnswerStore::new();
        store.toggle_checkbox("medications", "none", true);
        store.toggle_checkbox("medications", "insulin", true);
        assert!(!store.is_checked("medications", "none"));
        assert_eq!(store.selection("medications"), ["insulin"]);
    }

    #[test]
    fn unchecking_touches_only_that_box() {
        let mut store = AnswerStore::new();
        store.toggle_checkbox("medications", "insulin", true);
        store.toggle_checkbox("medications", "chloroquine", true);
        store.toggle_checkbox("medications", "insulin", false);
        assert_eq!(store.selection("medications"), ["chloroquine"]);

        store.toggle_checkbox("medications", "chloroquine", false);
        assert!(store.selection("medications").is_empty());
        assert_eq!(
            store.get("medications"),
            Some(&AnswerValue::Selection(vec![]))
        );
    }

    #[test]
    fn selection_keeps_first_touch_order() {
        let mut store = AnswerStore::new();
        store.toggle_checkbox("q", "b", true);
        store.toggle_checkbox("q", "a", true);
        assert_eq!(store.selection("q"), ["b", "a"]);
    }

    #[test]
    fn flat_json_uses_plain_values() {
        let mut store = AnswerStore::new();
        store.set("gender", AnswerValue::Scalar("female".into()));
        store.set("idUpload", AnswerValue::DataUri("data:image/png;base64,AA==".into()));
        store.toggle_checkbox("medications", "none", true);
        assert_eq!(
            store.to_json(),
            json!({
                "gender": "female",
                "idUpload": "data:image/png;base64,AA==",
                "medications": ["none"]
            })
        );
    }

    #[test]
    fn answer_value_keeps_its_tag() {
        let value = AnswerValue::DataUri("data:text/plain;base64,aGk=".into());
        let encoded = serde_json::to_value(&value).expect("encode");
        assert_eq!(encoded["kind"], "data_uri");
        let decoded: AnswerValue = serde_json::from_value(encoded).expect("decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn answer_set_serializes_to_cbor() {
        let set = AnswerSet::new("intake", "1.0.0", json!({ "gender": "female" }));
        let bytes = set.to_cbor().expect("cbor");
        let decoded: AnswerSet = serde_cbor::from_slice(&bytes).expect("decode");
        assert_eq!(decoded, set);
    }
}
