use tracing::{debug, info};

use crate::answers::AnswerSet;
use crate::collect::{self, RawInput};
use crate::eligibility::{self, Decision, Rejection};
use crate::error::FlowError;
use crate::navigate::Navigator;
use crate::pricing::Price;
use crate::session::SessionState;
use crate::spec::form::IntakeForm;
use crate::spec::question::{QuestionDefinition, QuestionKind};

/// Externally visible state of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    AwaitingInput { index: usize },
    Rejected(Rejection),
    /// Traversal finished; control passes to checkout.
    Complete,
    /// Checkout succeeded; the cursor rests on the confirmation question.
    Confirmed { payment_id: String },
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FlowState::AwaitingInput { .. })
    }
}

/// Result of one advance cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Next { index: usize },
    Rejected(Rejection),
    Complete,
}

/// Event produced by a render sink while a question is displayed.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Toggle { checkbox_id: String, checked: bool },
    Advance(RawInput),
    /// The user left; the session is discarded as it stands.
    Abandon,
}

/// UI side of the flow: shows questions and reports what the user did.
pub trait RenderSink {
    fn render(&mut self, question: &QuestionDefinition, session: &SessionState);

    fn next_event(&mut self, question: &QuestionDefinition, session: &SessionState) -> SinkEvent;

    fn finish(&mut self, _state: &FlowState, _session: &SessionState) {}
}

/// Derives the flow state from a session.
pub fn flow_state(form: &IntakeForm, session: &SessionState) -> FlowState {
    if let Some(rejection) = &session.rejection {
        return FlowState::Rejected(rejection.clone());
    }
    if session.confirmed
        && let Some(payment_id) = &session.payment_id
    {
        return FlowState::Confirmed {
            payment_id: payment_id.clone(),
        };
    }
    if session.terminated || session.current_index >= form.completion_index() {
        return FlowState::Complete;
    }
    FlowState::AwaitingInput {
        index: session.current_index,
    }
}

/// Drives a single session through the catalog.
#[derive(Debug, Clone)]
pub struct FlowController<'f> {
    form: &'f IntakeForm,
    session: SessionState,
}

impl<'f> FlowController<'f> {
    pub fn new(form: &'f IntakeForm) -> Self {
        Self {
            form,
            session: SessionState::new(),
        }
    }

    /// Continues a previously serialized session.
    pub fn resume(form: &'f IntakeForm, session: SessionState) -> Result<Self, FlowError> {
        let len = form.questions.len();
        if session.current_index > len {
            return Err(FlowError::IndexOutOfRange {
                index: session.current_index,
                len,
            });
        }
        Ok(Self { form, session })
    }

    pub fn form(&self) -> &'f IntakeForm {
        self.form
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn into_session(self) -> SessionState {
        self.session
    }

    pub fn state(&self) -> FlowState {
        flow_state(self.form, &self.session)
    }

    /// Question awaiting input, if the session is still in progress.
    pub fn current_question(&self) -> Option<&'f QuestionDefinition> {
        match self.state() {
            FlowState::AwaitingInput { index } => self.form.questions.get(index),
            _ => None,
        }
    }

    /// Records a checkbox change on the displayed multi-checkbox question.
    pub fn toggle_checkbox(&mut self, checkbox_id: &str, checked: bool) -> Result<(), FlowError> {
        let question = self.current_question().ok_or(FlowError::Terminated)?;
        if question.kind != QuestionKind::MultiCheckbox {
            return Err(FlowError::InputMismatch {
                question_id: question.id.clone(),
                kind: question.kind.as_str(),
            });
        }
        if !question.has_checkbox(checkbox_id) {
            return Err(FlowError::UnknownCheckbox {
                question_id: question.id.clone(),
                checkbox_id: checkbox_id.to_string(),
            });
        }
        self.session
            .answers
            .toggle_checkbox(&question.id, checkbox_id, checked);
        Ok(())
    }

    /// Runs one advance cycle: collect, gate, navigate.
    ///
    /// A rejection terminates the session. Configuration errors leave the cursor
    /// on the current question and do not count it as visited.
    pub fn advance(&mut self, input: RawInput) -> Result<AdvanceOutcome, FlowError> {
        let question = self.current_question().ok_or(FlowError::Terminated)?;
        let index = self.session.current_index;

        collect::collect(question, input, &mut self.session.answers)?;

        if let Decision::Reject(rejection) = eligibility::evaluate(&question.id, &self.session.answers)
        {
            self.session.visited.push(question.id.clone());
            info!(
                question_id = %question.id,
                reason = rejection.reason.code(),
                "session rejected"
            );
            self.session.terminated = true;
            self.session.rejection = Some(rejection.clone());
            return Ok(AdvanceOutcome::Rejected(rejection));
        }

        let next = Navigator::new(&self.form.questions, &self.form.branches).next_index(
            index,
            &question.id,
            &self.session.answers,
        )?;
        self.session.visited.push(question.id.clone());

        let completion = self.form.completion_index();
        if next >= completion {
            self.session.current_index = completion;
            self.session.terminated = true;
            info!(form_id = %self.form.id, answered = self.session.visited.len(), "intake complete");
            return Ok(AdvanceOutcome::Complete);
        }

        self.session.current_index = next;
        debug!(from = index, to = next, "advanced");
        Ok(AdvanceOutcome::Next { index: next })
    }

    /// Renders questions and applies sink events until the session ends or is abandoned.
    pub fn run<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> Result<FlowState, FlowError> {
        while let Some(question) = self.current_question() {
            sink.render(question, &self.session);
            loop {
                match sink.next_event(question, &self.session) {
                    SinkEvent::Toggle {
                        checkbox_id,
                        checked,
                    } => self.toggle_checkbox(&checkbox_id, checked)?,
                    SinkEvent::Advance(input) => {
                        self.advance(input)?;
                        break;
                    }
                    SinkEvent::Abandon => {
                        debug!(question_id = %question.id, "session abandoned");
                        return Ok(self.state());
                    }
                }
            }
        }

        let state = self.state();
        sink.finish(&state, &self.session);
        Ok(state)
    }

    /// Price of the selected product.
    pub fn quote(&self) -> Price {
        self.form.pricing.resolve(&self.session.answers)
    }

    /// Finalized answers, including the payment id once captured.
    pub fn answer_set(&self) -> AnswerSet {
        let mut set = AnswerSet::new(
            self.form.id.clone(),
            self.form.version.clone(),
            self.session.answers.to_json(),
        );
        set.payment_id = self.session.payment_id.clone();
        set
    }
}
