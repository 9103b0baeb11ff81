pub mod branch;
pub mod form;
pub mod question;

pub use branch::{AnswerPredicate, BranchAction, BranchRule};
pub use form::{IntakeForm, QuestionCatalog, form_schema};
pub use question::{
    CheckboxOption, DosePhase, NONE_OPTION, QuestionDefinition, QuestionKind, RadioOption,
    TitrationSchedule,
};
