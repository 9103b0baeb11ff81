use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use intake_spec::{
    AnswerSet, FlowState, IntakeForm, QuestionDefinition, QuestionKind, RawInput, Receipt,
    RenderSink, SessionState, SinkEvent, UploadedFile, build_render_payload, render_json_ui,
};
use tracing::{debug, warn};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: question prompts only.
    Clean,
    /// Verbose output: question ids, answer JSON, error details.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// How the current question is shown.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum RenderMode {
    Text,
    Json,
}

/// Terminal front end: prints prompts and turns typed lines into sink events.
pub struct TerminalSink<'f, R> {
    form: &'f IntakeForm,
    input: R,
    verbosity: Verbosity,
    mode: RenderMode,
    pending: VecDeque<SinkEvent>,
}

impl<'f, R: BufRead> TerminalSink<'f, R> {
    pub fn new(form: &'f IntakeForm, input: R, verbosity: Verbosity, mode: RenderMode) -> Self {
        Self {
            form,
            input,
            verbosity,
            mode,
            pending: VecDeque::new(),
        }
    }

    fn read_line(&mut self) -> Option<String> {
        print!("> ");
        if let Err(err) = io::stdout().flush() {
            warn!(error = %err, "failed to flush prompt");
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(err) => {
                warn!(error = %err, "failed to read answer");
                None
            }
        }
    }
}

impl<R: BufRead> RenderSink for TerminalSink<'_, R> {
    fn render(&mut self, question: &QuestionDefinition, session: &SessionState) {
        self.pending.clear();
        if self.mode == RenderMode::Json {
            let payload = build_render_payload(self.form, session);
            println!("JSON UI:\n{}", render_json_ui(&payload));
        }
        let prompt = PromptContext::new(question, session, self.form.completion_index());
        show_prompt(&prompt, self.verbosity);
    }

    fn next_event(&mut self, question: &QuestionDefinition, _session: &SessionState) -> SinkEvent {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        loop {
            let Some(line) = self.read_line() else {
                debug!(question_id = %question.id, "input closed");
                return SinkEvent::Abandon;
            };
            if line.eq_ignore_ascii_case("exit") {
                return SinkEvent::Abandon;
            }
            match parse_input(question, &line, None) {
                Ok(mut events) => {
                    let Some(first) = events.pop_front() else {
                        continue;
                    };
                    self.pending = events;
                    return first;
                }
                Err(err) => show_parse_error(&err, self.verbosity),
            }
        }
    }

    fn finish(&mut self, state: &FlowState, _session: &SessionState) {
        show_outcome(state);
    }
}

/// Prints the terminal message for a finished or abandoned session.
pub fn show_outcome(state: &FlowState) {
    match state {
        FlowState::AwaitingInput { .. } => println!("Session abandoned."),
        FlowState::Rejected(rejection) => println!("{}", rejection),
        FlowState::Complete => println!("Almost done! Please complete your payment."),
        FlowState::Confirmed { payment_id } => println!("Order confirmed ({}).", payment_id),
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub position: usize,
    pub total: usize,
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub hint: Option<String>,
    pub lines: Vec<String>,
}

impl PromptContext {
    pub fn new(question: &QuestionDefinition, session: &SessionState, total: usize) -> Self {
        let mut lines = Vec::new();
        for (number, option) in question.options.iter().enumerate() {
            lines.push(format!("  {}) {} [{}]", number + 1, option.label, option.value));
        }
        for (number, option) in question.checkbox_options.iter().enumerate() {
            let mark = if session.answers.is_checked(&question.id, &option.id) {
                "x"
            } else {
                " "
            };
            lines.push(format!(
                "  {}) [{}] {} [{}]",
                number + 1,
                mark,
                option.label,
                option.id
            ));
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
        Self {
            position: (session.current_index + 1).min(total.max(1)),
            total,
            id: question.id.clone(),
            title: question.title.clone(),
            description: question.description.clone(),
            hint: hint_for(question.kind),
            lines,
        }
    }
}

fn hint_for(kind: QuestionKind) -> Option<String> {
    let hint = match kind {
        QuestionKind::Landing => "(press Enter to continue)",
        QuestionKind::Radio => "(number or value)",
        QuestionKind::MultiCheckbox => "(comma-separated numbers or ids)",
        QuestionKind::FileUpload => "(path to file, blank to skip)",
        _ => return None,
    };
    Some(hint.to_string())
}

pub fn show_prompt(prompt: &PromptContext, verbosity: Verbosity) {
    let mut line = format!("{}/{} {}", prompt.position, prompt.total, prompt.title);
    if let Some(hint) = &prompt.hint {
        line.push(' ');
        line.push_str(hint);
    }
    if verbosity.is_verbose() {
        line.push_str(&format!(" [{}]", prompt.id));
    }
    println!("{}", line);
    if let Some(description) = &prompt.description {
        println!("{}", description);
    }
    for entry in &prompt.lines {
        println!("{}", entry);
    }
}

pub fn show_parse_error(error: &AnswerParseError, verbosity: Verbosity) {
    eprintln!("Invalid answer: {}", error.user_message);
    if verbosity.is_verbose()
        && let Some(debug) = &error.debug_message
    {
        eprintln!("  Expected: {}", debug);
    }
}

/// Prints the checkout receipt and the encoded answers.
pub fn show_receipt(receipt: &Receipt, show_answers_json: bool) {
    println!("Payment {} captured: {}", receipt.payment_id, receipt.price);
    show_answers(&receipt.answers, show_answers_json);
}

fn show_answers(answer_set: &AnswerSet, show_answers_json: bool) {
    match answer_set.to_cbor() {
        Ok(bytes) => println!("Answers (CBOR hex): {}", encode_hex(&bytes)),
        Err(err) => eprintln!("Failed to serialize answers to CBOR: {}", err),
    }
    if show_answers_json {
        match answer_set.to_json_pretty() {
            Ok(pretty) => println!("{}", pretty),
            Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Turns one line of user input into the events for `question`.
///
/// Multi-checkbox answers become one toggle per listed box followed by an
/// advance. Relative upload paths are resolved against `base_dir` when given.
pub fn parse_input(
    question: &QuestionDefinition,
    raw: &str,
    base_dir: Option<&Path>,
) -> Result<VecDeque<SinkEvent>, AnswerParseError> {
    let raw = raw.trim();
    let input = match question.kind {
        QuestionKind::Landing => RawInput::Empty,
        kind if kind.is_free_text() => {
            if raw.is_empty() {
                RawInput::Empty
            } else {
                RawInput::Text(raw.to_string())
            }
        }
        QuestionKind::Radio => {
            if raw.is_empty() {
                RawInput::Choice(None)
            } else {
                RawInput::Choice(Some(parse_radio(question, raw)?))
            }
        }
        QuestionKind::FileUpload => {
            if raw.is_empty() {
                RawInput::File(None)
            } else {
                RawInput::File(Some(read_upload(raw, base_dir)?))
            }
        }
        QuestionKind::MultiCheckbox => {
            let mut events = raw
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| {
                    parse_checkbox(question, token).map(|checkbox_id| SinkEvent::Toggle {
                        checkbox_id,
                        checked: true,
                    })
                })
                .collect::<Result<VecDeque<_>, _>>()?;
            events.push_back(SinkEvent::Advance(RawInput::Empty));
            return Ok(events);
        }
        _ => RawInput::Empty,
    };
    Ok(VecDeque::from([SinkEvent::Advance(input)]))
}

fn parse_radio(question: &QuestionDefinition, raw: &str) -> Result<String, AnswerParseError> {
    let by_number = raw
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| question.options.get(index));
    let by_name = || {
        question.options.iter().find(|option| {
            option.value.eq_ignore_ascii_case(raw) || option.label.eq_ignore_ascii_case(raw)
        })
    };
    by_number
        .or_else(by_name)
        .map(|option| option.value.clone())
        .ok_or_else(|| {
            let allowed = question
                .options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>();
            AnswerParseError::new(
                format!("Choose one of: {}.", allowed.join(", ")),
                Some(format!("allowed values: {}", allowed.join(", "))),
            )
        })
}

fn parse_checkbox(question: &QuestionDefinition, token: &str) -> Result<String, AnswerParseError> {
    let by_number = token
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| question.checkbox_options.get(index));
    let by_id = || {
        question
            .checkbox_options
            .iter()
            .find(|option| option.id.eq_ignore_ascii_case(token))
    };
    by_number
        .or_else(by_id)
        .map(|option| option.id.clone())
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("Unknown option '{}'.", token),
                Some(format!(
                    "expected one of: {}",
                    question
                        .checkbox_options
                        .iter()
                        .map(|option| option.id.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            )
        })
}

fn read_upload(raw: &str, base_dir: Option<&Path>) -> Result<UploadedFile, AnswerParseError> {
    let path = match base_dir {
        Some(dir) if Path::new(raw).is_relative() => dir.join(raw),
        _ => Path::new(raw).to_path_buf(),
    };
    let bytes = fs::read(&path).map_err(|err| {
        AnswerParseError::new(
            format!("Could not read file '{}'.", path.display()),
            Some(err.to_string()),
        )
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| raw.to_string());
    debug!(file = %name, size = bytes.len(), "upload read");
    Ok(UploadedFile::new(name, bytes))
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
