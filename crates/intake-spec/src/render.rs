use serde_json::{Map, Value, json};

use crate::{
    flow::{FlowState, flow_state},
    pricing::Price,
    session::SessionState,
    spec::{
        form::IntakeForm,
        question::{QuestionKind, RadioOption, TitrationSchedule},
    },
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A question is waiting for input.
    NeedInput,
    /// The respondent was found ineligible.
    Rejected,
    /// All questions are answered; checkout is next.
    Complete,
    /// Checkout succeeded.
    Confirmed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Rejected => "rejected",
            RenderStatus::Complete => "complete",
            RenderStatus::Confirmed => "confirmed",
        }
    }
}

/// Cursor position exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct RenderCheckbox {
    pub id: String,
    pub label: String,
    pub checked: bool,
}

/// The question currently shown, with its collected value.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: QuestionKind,
    pub options: Vec<RadioOption>,
    pub checkboxes: Vec<RenderCheckbox>,
    pub schedule: Option<TitrationSchedule>,
    pub current_value: Option<Value>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub status: RenderStatus,
    pub question: Option<RenderQuestion>,
    pub progress: RenderProgress,
    pub message: Option<String>,
    pub price: Option<Price>,
}

/// Build the renderer payload for the session's current position.
pub fn build_render_payload(form: &IntakeForm, session: &SessionState) -> RenderPayload {
    let state = flow_state(form, session);
    let total = form.completion_index();

    let (status, message) = match &state {
        FlowState::AwaitingInput { .. } => (RenderStatus::NeedInput, None),
        FlowState::Rejected(rejection) => (RenderStatus::Rejected, Some(rejection.to_string())),
        FlowState::Complete => (
            RenderStatus::Complete,
            Some("Almost done! Please complete your payment.".to_string()),
        ),
        FlowState::Confirmed { .. } => (RenderStatus::Confirmed, None),
    };

    let shown_index = match &state {
        FlowState::AwaitingInput { index } => Some(*index),
        FlowState::Confirmed { .. } => Some(session.current_index),
        _ => None,
    };

    let question = shown_index
        .and_then(|index| form.questions.get(index))
        .map(|question| RenderQuestion {
            id: question.id.clone(),
            title: question.title.clone(),
            description: question.description.clone(),
            kind: question.kind,
            options: question.options.clone(),
            checkboxes: question
                .checkbox_options
                .iter()
                .map(|option| RenderCheckbox {
                    id: option.id.clone(),
                    label: option.label.clone(),
                    checked: session.answers.is_checked(&question.id, &option.id),
                })
                .collect(),
            schedule: question.schedule.clone(),
            current_value: session.answers.get(&question.id).map(|value| value.to_json()),
        });

    let price = matches!(state, FlowState::Complete | FlowState::Confirmed { .. })
        .then(|| form.pricing.resolve(&session.answers));

    RenderPayload {
        form_id: form.id.clone(),
        form_title: form.title.clone(),
        form_version: form.version.clone(),
        status,
        question,
        progress: RenderProgress {
            position: (session.current_index + 1).min(total),
            total,
        },
        message,
        price,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let question = payload.question.as_ref().map(|question| {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(question.id.clone()));
        map.insert("title".into(), Value::String(question.title.clone()));
        map.insert(
            "description".into(),
            question
                .description
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        map.insert("type".into(), Value::String(question.kind.as_str().into()));
        if !question.options.is_empty() {
            map.insert(
                "options".into(),
                Value::Array(
                    question
                        .options
                        .iter()
                        .map(|option| json!({ "value": option.value, "label": option.label }))
                        .collect(),
                ),
            );
        }
        if !question.checkboxes.is_empty() {
            map.insert(
                "checkboxOptions".into(),
                Value::Array(
                    question
                        .checkboxes
                        .iter()
                        .map(|option| {
                            json!({
                                "id": option.id,
                                "label": option.label,
                                "checked": option.checked,
                            })
                        })
                        .collect(),
                ),
            );
        }
        if let Some(schedule) = &question.schedule {
            map.insert(
                "schedule".into(),
                serde_json::to_value(schedule).unwrap_or(Value::Null),
            );
        }
        if let Some(current_value) = &question.current_value {
            map.insert("current_value".into(), current_value.clone());
        }
        Value::Object(map)
    });

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_version": payload.form_version,
        "status": payload.status.as_str(),
        "progress": {
            "position": payload.progress.position,
            "total": payload.progress.total,
        },
        "message": payload.message,
        "question": question,
        "price": payload.price.as_ref().map(|price| json!({
            "amount": price.amount_display(),
            "amount_minor": price.amount_minor,
            "currency": price.currency,
        })),
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Form: {} ({})",
        payload.form_title, payload.form_id
    ));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.position,
        payload.progress.total
    ));
    if let Some(message) = &payload.message {
        lines.push(message.clone());
    }

    if let Some(question) = &payload.question {
        lines.push(format!("Question: {}", question.title));
        if let Some(description) = &question.description {
            lines.push(format!("  {}", description));
        }
        for option in &question.options {
            lines.push(format!("  ( ) {} [{}]", option.label, option.value));
        }
        for option in &question.checkboxes {
            let mark = if option.checked { "x" } else { " " };
            lines.push(format!("  [{}] {} [{}]", mark, option.label, option.id));
        }
        if let Some(schedule) = &question.schedule {
            lines.push(format!("  Titration schedule - {}", schedule.label));
            for phase in &schedule.phases {
                lines.push(format!(
                    "    Week {}: {} ({})",
                    phase.weeks, phase.dose, phase.frequency
                ));
            }
        }
        if let Some(value) = &question.current_value {
            lines.push(format!("  Current value: {}", value_to_display(value)));
        }
    }

    if let Some(price) = &payload.price {
        lines.push(format!("Price: {}", price));
    }

    lines.join("\n")
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
