mod checkout;
mod replay;
mod wizard;

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use checkout::{FileSubmission, OfflinePayment};
use clap::{Parser, Subcommand};
use intake_component::{describe as component_describe, get_form_schema};
use intake_spec::{
    CollaboratorError, FlowController, FlowError, FlowState, IntakeForm, SessionState,
    ValidationResult, build_render_payload, render_json_ui, render_summary, render_text,
    validate,
};
use replay::{ReplayScript, ReplaySink};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wizard::{RenderMode, TerminalSink, Verbosity};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const OUTPUT_DIR_ENV: &str = "INTAKE_OUTPUT_DIR";
const DEFAULT_LOG_FILTER: &str = "intake=info,intake_spec=info";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Guided intake questionnaire CLI",
    long_about = "Runs the intake flow in a terminal, replays scripted answers, and checks answer files against a form"
)]
struct Cli {
    /// Log engine decisions (branching, derived values) to stderr.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the intake flow interactively.
    Wizard {
        /// Path to an intake form JSON document (defaults to the built-in form).
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
        /// Directory for the submitted answers (defaults to INTAKE_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Also emit answer JSON after checkout.
        #[arg(long)]
        answers_json: bool,
        /// Render output mode for the wizard display.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Run the flow with answers taken from a JSON script.
    Replay {
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
        /// JSON file of the form `{"answers": {"<question id>": <value>}}`.
        #[arg(long, value_name = "SCRIPT")]
        script: PathBuf,
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the intake form document.
    Describe {
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
    },
    /// Print the JSON schema of intake form documents.
    Schema,
    /// Validate a flat answers file against the form.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbosity = Verbosity::from_verbose(cli.verbose);
    match cli.command {
        Command::Wizard {
            form,
            out,
            answers_json,
            format,
        } => run_wizard(form, out, answers_json, format, verbosity),
        Command::Replay {
            form,
            script,
            out,
            format,
        } => run_replay(form, script, out, format),
        Command::Describe { form } => run_describe(form),
        Command::Schema => {
            let schema: Value = serde_json::from_str(&get_form_schema())?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Validate { form, answers } => run_validate(form, answers),
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("intake=debug,intake_spec=debug")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_form(path: Option<&Path>) -> CliResult<IntakeForm> {
    let form = match path {
        Some(path) => IntakeForm::from_json(&fs::read_to_string(path)?)?,
        None => IntakeForm::builtin()?,
    };
    debug!(form_id = %form.id, questions = form.questions.len(), "form loaded");
    Ok(form)
}

fn run_wizard(
    form_path: Option<PathBuf>,
    out: Option<PathBuf>,
    answers_json: bool,
    format: RenderMode,
    verbosity: Verbosity,
) -> CliResult<()> {
    let form = load_form(form_path.as_deref())?;
    let out_root = resolve_output_root(out)?;
    println!("Form: {}", form.title);

    let mut controller = FlowController::new(&form);
    let stdin = io::stdin();
    let mut sink = TerminalSink::new(&form, stdin.lock(), verbosity, format);
    let state = controller.run(&mut sink)?;

    match state {
        FlowState::AwaitingInput { .. } => {
            wizard::show_outcome(&state);
            Ok(())
        }
        FlowState::Complete => run_checkout(&mut controller, &out_root, answers_json),
        FlowState::Rejected(_) | FlowState::Confirmed { .. } => Ok(()),
    }
}

fn run_replay(
    form_path: Option<PathBuf>,
    script_path: PathBuf,
    out: Option<PathBuf>,
    format: RenderMode,
) -> CliResult<()> {
    let form = load_form(form_path.as_deref())?;
    let script: ReplayScript = serde_json::from_str(&fs::read_to_string(&script_path)?)?;
    let out_root = resolve_output_root(out)?;
    let base_dir = script_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut controller = FlowController::new(&form);
    let mut sink = ReplaySink::new(script, base_dir);
    let state = controller.run(&mut sink)?;
    if let Some(err) = sink.take_error() {
        return Err(err.into());
    }
    info!(answered = controller.session().visited.len(), "replay finished");

    if state == FlowState::Complete {
        run_checkout(&mut controller, &out_root, false)?;
    }

    let payload = build_render_payload(&form, controller.session());
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!(
            "{}",
            serde_json::to_string_pretty(&render_json_ui(&payload))?
        ),
    }
    Ok(())
}

fn run_checkout(
    controller: &mut FlowController<'_>,
    out_root: &Path,
    answers_json: bool,
) -> CliResult<()> {
    let summary = render_summary(controller.form(), &controller.session().answers)?;
    let mut payment = OfflinePayment::new();
    let mut submission = FileSubmission::new(out_root.join(&controller.form().id), summary);
    let receipt = match controller.checkout(&mut payment, &mut submission) {
        Ok(receipt) => receipt,
        Err(FlowError::Collaborator(err @ CollaboratorError::Submission(_))) => {
            keep_paid_session(controller.session())?;
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    wizard::show_receipt(&receipt, answers_json);
    println!("Answers written to {}", submission.out_dir().display());
    wizard::show_outcome(&controller.state());
    Ok(())
}

/// Prints a session whose payment went through but whose submission did not, so
/// it can be resumed and resubmitted without charging again.
fn keep_paid_session(session: &SessionState) -> CliResult<()> {
    if let Some(payment_id) = &session.payment_id {
        eprintln!(
            "Payment {} was captured but the answers were not submitted. Session:",
            payment_id
        );
    }
    println!("{}", serde_json::to_string_pretty(session)?);
    Ok(())
}

fn run_describe(form_path: Option<PathBuf>) -> CliResult<()> {
    let form = load_form(form_path.as_deref())?;
    let config_json = serde_json::json!({ "form_json": serde_json::to_string(&form)? }).to_string();
    let described = parse_component_result(&component_describe(&form.id, &config_json))?;
    println!("{}", serde_json::to_string_pretty(&described)?);
    Ok(())
}

fn run_validate(form_path: Option<PathBuf>, answers_path: PathBuf) -> CliResult<()> {
    let form = load_form(form_path.as_deref())?;
    let answers_json = fs::read_to_string(answers_path)?;
    let answers: Value = serde_json::from_str(&answers_json)?;

    let result = validate(&form, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}
