use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use intake_spec::{
    AdvanceOutcome, CatalogError, FlowController, FlowError, FlowState, IntakeForm, RawInput,
    SessionState, SummaryError, build_render_payload, form_schema,
    render_json_ui as intake_render_json_ui, render_summary, render_text as intake_render_text,
    validate,
};

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse session: {0}")]
    SessionParse(#[source] serde_json::Error),
    #[error("failed to parse input: {0}")]
    InputParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_json: Option<String>,
}

fn load_form(config_json: &str) -> Result<IntakeForm, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    match config.form_json.as_deref() {
        Some(form_json) => Ok(IntakeForm::from_json(form_json)?),
        None => Ok(IntakeForm::builtin()?),
    }
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<IntakeForm, ComponentError> {
    let form = load_form(config_json)?;
    if form.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(form)
    }
}

fn parse_session(session_json: &str) -> Result<SessionState, ComponentError> {
    if session_json.trim().is_empty() {
        return Ok(SessionState::new());
    }
    serde_json::from_str(session_json).map_err(ComponentError::SessionParse)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Session envelope returned after every state-changing call.
fn step_response(
    controller: &FlowController<'_>,
    outcome: Option<&AdvanceOutcome>,
) -> Result<Value, ComponentError> {
    let session = serde_json::to_value(controller.session()).map_err(ComponentError::JsonEncode)?;
    let payload = build_render_payload(controller.form(), controller.session());
    let outcome = outcome.map(|outcome| match outcome {
        AdvanceOutcome::Next { index } => json!({ "kind": "next", "index": index }),
        AdvanceOutcome::Rejected(rejection) => json!({
            "kind": "rejected",
            "question_id": rejection.question_id,
            "reason": rejection.reason.code(),
        }),
        AdvanceOutcome::Complete => json!({ "kind": "complete" }),
    });

    Ok(json!({
        "status": payload.status.as_str(),
        "outcome": outcome,
        "session": session,
        "ui": intake_render_json_ui(&payload),
    }))
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|form| serde_json::to_value(form).map_err(ComponentError::JsonEncode)),
    )
}

pub fn get_form_schema() -> String {
    respond(Ok(form_schema()))
}

pub fn start(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let controller = FlowController::new(&form);
        step_response(&controller, None)
    }))
}

pub fn advance(form_id: &str, config_json: &str, session_json: &str, input_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        let input: RawInput = if input_json.trim().is_empty() {
            RawInput::Empty
        } else {
            serde_json::from_str(input_json).map_err(ComponentError::InputParse)?
        };
        let mut controller = FlowController::resume(&form, session)?;
        let outcome = controller.advance(input)?;
        step_response(&controller, Some(&outcome))
    }))
}

pub fn toggle(
    form_id: &str,
    config_json: &str,
    session_json: &str,
    checkbox_id: &str,
    checked: bool,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        let mut controller = FlowController::resume(&form, session)?;
        controller.toggle_checkbox(checkbox_id, checked)?;
        step_response(&controller, None)
    }))
}

pub fn render_text(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond_string(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        Ok(intake_render_text(&build_render_payload(&form, &session)))
    }))
}

pub fn render_json_ui(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        Ok(intake_render_json_ui(&build_render_payload(
            &form, &session,
        )))
    }))
}

pub fn quote(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        let controller = FlowController::resume(&form, session)?;
        serde_json::to_value(controller.quote()).map_err(ComponentError::JsonEncode)
    }))
}

/// Finalized answers of a completed session, ready for the payment and submission services.
pub fn finalize(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        let controller = FlowController::resume(&form, session)?;
        if !matches!(
            controller.state(),
            FlowState::Complete | FlowState::Confirmed { .. }
        ) {
            return Err(FlowError::NotComplete.into());
        }
        let answer_set =
            serde_json::to_value(controller.answer_set()).map_err(ComponentError::JsonEncode)?;
        let price = serde_json::to_value(controller.quote()).map_err(ComponentError::JsonEncode)?;
        Ok(json!({ "answer_set": answer_set, "price": price }))
    }))
}

pub fn validate_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    let validation = ensure_form(form_id, config_json).and_then(|form| {
        let answers = serde_json::from_str(answers_json).map_err(ComponentError::InputParse)?;
        serde_json::to_value(validate(&form, &answers)).map_err(ComponentError::JsonEncode)
    });
    respond(validation)
}

pub fn summary(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond_string(ensure_form(form_id, config_json).and_then(|form| {
        let session = parse_session(session_json)?;
        Ok(render_summary(&form, &session.answers)?)
    }))
}
