#![allow(missing_docs)]

pub mod answers;
pub mod bmi;
pub mod checkout;
pub mod collect;
pub mod eligibility;
pub mod error;
pub mod flow;
pub mod navigate;
pub mod pricing;
pub mod render;
pub mod session;
pub mod spec;
pub mod summary;
pub mod validate;

pub use answers::{
    AnswerSet, AnswerStore, AnswerValue, CheckboxState, ValidationError, ValidationResult,
};
pub use checkout::{PaymentCollaborator, Receipt, SubmissionCollaborator};
pub use collect::{RawInput, UploadedFile, collect};
pub use eligibility::{Decision, Rejection, RejectionReason, evaluate};
pub use error::{CatalogError, CollaboratorError, FlowError, SummaryError};
pub use flow::{AdvanceOutcome, FlowController, FlowState, RenderSink, SinkEvent, flow_state};
pub use navigate::Navigator;
pub use pricing::{Price, PricingTable};
pub use render::{
    RenderPayload, RenderProgress, RenderQuestion, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use session::SessionState;
pub use spec::{
    AnswerPredicate, BranchAction, BranchRule, IntakeForm, QuestionCatalog, QuestionDefinition,
    QuestionKind, form_schema,
};
pub use summary::{SummaryPolicy, render_summary};
pub use validate::validate;
