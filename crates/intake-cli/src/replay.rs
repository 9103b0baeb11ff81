use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use intake_spec::{QuestionDefinition, RenderSink, SessionState, SinkEvent};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::wizard::parse_input;

/// Answers keyed by question id. Checkbox answers are arrays of ids; uploads are
/// file paths relative to the script.
#[derive(Debug, Default, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub answers: BTreeMap<String, Value>,
}

impl ReplayScript {
    fn raw_answer(&self, question_id: &str) -> String {
        match self.answers.get(question_id) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Some(other) => other.to_string(),
        }
    }
}

/// Render sink fed from a [`ReplayScript`] instead of a terminal.
pub struct ReplaySink {
    script: ReplayScript,
    base_dir: PathBuf,
    pending: VecDeque<SinkEvent>,
    error: Option<String>,
}

impl ReplaySink {
    pub fn new(script: ReplayScript, base_dir: PathBuf) -> Self {
        Self {
            script,
            base_dir,
            pending: VecDeque::new(),
            error: None,
        }
    }

    /// Problem that stopped the replay, if any.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

impl RenderSink for ReplaySink {
    fn render(&mut self, question: &QuestionDefinition, _session: &SessionState) {
        self.pending.clear();
        debug!(question_id = %question.id, "replaying question");
    }

    fn next_event(&mut self, question: &QuestionDefinition, _session: &SessionState) -> SinkEvent {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        let raw = self.script.raw_answer(&question.id);
        match parse_input(question, &raw, Some(self.base_dir.as_path())) {
            Ok(mut events) => {
                let first = events.pop_front().unwrap_or(SinkEvent::Abandon);
                self.pending = events;
                first
            }
            Err(err) => {
                self.error = Some(format!(
                    "scripted answer for '{}' is invalid: {}",
                    question.id, err.user_message
                ));
                SinkEvent::Abandon
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_spec::{FlowController, FlowState, IntakeForm, QuestionKind};
    use serde_json::json;

    fn form() -> IntakeForm {
        IntakeForm::new(
            "replay",
            "Replay",
            vec![
                QuestionDefinition::new("gender", QuestionKind::Radio, "Gender")
                    .with_options(&[("female", "Female"), ("male", "Male")]),
                QuestionDefinition::new("medications", QuestionKind::MultiCheckbox, "Medications")
                    .with_checkboxes(&[("insulin", "Insulin"), ("none", "None")]),
                QuestionDefinition::new("weight", QuestionKind::Text, "Weight"),
            ],
        )
    }

    fn script(answers: Value) -> ReplayScript {
        serde_json::from_value(json!({ "answers": answers })).expect("script")
    }

    #[test]
    fn script_values_flatten_to_raw_answers() {
        let script = script(json!({ "medications": ["insulin", "none"], "weight": 200 }));
        assert_eq!(script.raw_answer("medications"), "insulin,none");
        assert_eq!(script.raw_answer("weight"), "200");
        assert_eq!(script.raw_answer("missing"), "");
    }

    #[test]
    fn replay_completes_the_flow() {
        let form = form();
        let mut controller = FlowController::new(&form);
        let mut sink = ReplaySink::new(
            script(json!({ "gender": "female", "medications": ["none"], "weight": "180" })),
            PathBuf::new(),
        );
        let state = controller.run(&mut sink).expect("run");
        assert_eq!(state, FlowState::Complete);
        assert!(sink.take_error().is_none());
        assert_eq!(controller.session().answers.selection("medications"), ["none"]);
        assert_eq!(controller.session().answers.scalar("weight"), Some("180"));
    }

    #[test]
    fn invalid_script_answer_stops_the_replay() {
        let form = form();
        let mut controller = FlowController::new(&form);
        let mut sink = ReplaySink::new(script(json!({ "gender": "other" })), PathBuf::new());
        let state = controller.run(&mut sink).expect("run");
        assert_eq!(state, FlowState::AwaitingInput { index: 0 });
        let error = sink.take_error().expect("error");
        assert!(error.contains("'gender'"));
    }
}
