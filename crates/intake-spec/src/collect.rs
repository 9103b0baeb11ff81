use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::answers::{AnswerStore, AnswerValue};
use crate::bmi::{self, BMI_ID, HEIGHT_ID};
use crate::error::FlowError;
use crate::spec::question::{QuestionDefinition, QuestionKind};

const FALLBACK_MIME: &str = "application/octet-stream";

/// File selected by the user, already read into memory by the render sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }

    /// Encodes the file as a `data:` URI. The MIME type comes from the sink when
    /// given, otherwise it is sniffed from the content.
    pub fn to_data_uri(&self) -> String {
        let mime = self
            .mime
            .clone()
            .or_else(|| infer::get(&self.bytes).map(|kind| kind.mime_type().to_string()))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }
}

/// Raw input returned by the render sink for the displayed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawInput {
    /// Nothing was entered or selected.
    Empty,
    Text(String),
    Choice(Option<String>),
    File(Option<UploadedFile>),
}

/// Writes the raw input for `question` into the store and refreshes derived answers.
///
/// Free-text and radio questions always store a value (empty when the input is
/// missing). File uploads store nothing when no file was selected. Landing and
/// multi-checkbox questions collect nothing here.
pub fn collect(
    question: &QuestionDefinition,
    input: RawInput,
    answers: &mut AnswerStore,
) -> Result<(), FlowError> {
    match (question.kind, input) {
        (QuestionKind::Landing, _) => {}
        (kind, RawInput::Text(text)) if kind.is_free_text() => {
            answers.set(question.id.clone(), AnswerValue::Scalar(text));
        }
        (kind, RawInput::Empty) if kind.is_free_text() => {
            debug!(question_id = %question.id, "no text entered, storing empty value");
            answers.set(question.id.clone(), AnswerValue::Scalar(String::new()));
        }
        (QuestionKind::Radio, RawInput::Choice(choice)) => {
            let value = choice.unwrap_or_default();
            if value.is_empty() {
                debug!(question_id = %question.id, "no option selected, storing empty value");
            }
            answers.set(question.id.clone(), AnswerValue::Scalar(value));
        }
        (QuestionKind::Radio, RawInput::Empty) => {
            debug!(question_id = %question.id, "no option selected, storing empty value");
            answers.set(question.id.clone(), AnswerValue::Scalar(String::new()));
        }
        (QuestionKind::FileUpload, RawInput::File(Some(file))) => {
            debug!(question_id = %question.id, file = %file.name, size = file.bytes.len(), "file read");
            answers.set(question.id.clone(), AnswerValue::DataUri(file.to_data_uri()));
        }
        (QuestionKind::FileUpload, RawInput::File(None) | RawInput::Empty) => {
            debug!(question_id = %question.id, "no file selected");
        }
        (QuestionKind::MultiCheckbox, RawInput::Empty) => {}
        (kind, _) => {
            return Err(FlowError::InputMismatch {
                question_id: question.id.clone(),
                kind: kind.as_str(),
            });
        }
    }

    if question.id == HEIGHT_ID {
        let value = bmi::from_answers(answers);
        debug!(bmi = value, "derived bmi");
        answers.set(BMI_ID, AnswerValue::Scalar(bmi::format(value)));
    }

    Ok(())
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}
