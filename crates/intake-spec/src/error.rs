use thiserror::Error;

/// Problems found while loading or checking an intake form.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse intake form: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("question id '{0}' is defined more than once")]
    DuplicateQuestion(String),
    #[error("radio question '{0}' has no options")]
    MissingOptions(String),
    #[error("multi-checkbox question '{0}' must offer a 'none' option")]
    MissingNoneSentinel(String),
    #[error("branch rule refers to unknown question '{0}'")]
    UnknownBranchSource(String),
    #[error("branch rule on '{question_id}' targets unknown question '{target}'")]
    UnknownBranchTarget { question_id: String, target: String },
    #[error("branch rule on '{question_id}' targets '{target}', which does not lie ahead of it")]
    BackwardBranch { question_id: String, target: String },
    #[error("confirmation question '{0}' is not in the catalog")]
    UnknownConfirmation(String),
}

/// Errors raised while advancing a session through the catalog.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("navigation from '{question_id}' targets '{target}', which is not in the catalog")]
    UnknownTarget { question_id: String, target: String },
    #[error("navigation from '{question_id}' targets '{target}', which does not lie ahead of it")]
    BackwardTarget { question_id: String, target: String },
    #[error("session index {index} is outside the catalog (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("session has already terminated")]
    Terminated,
    #[error("session is not ready for checkout")]
    NotComplete,
    #[error("input does not fit question '{question_id}' of type {kind}")]
    InputMismatch {
        question_id: String,
        kind: &'static str,
    },
    #[error("question '{question_id}' has no checkbox '{checkbox_id}'")]
    UnknownCheckbox {
        question_id: String,
        checkbox_id: String,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Failures reported by the payment and submission services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("payment failed: {0}")]
    Payment(String),
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Errors raised while rendering the submission summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("invalid redaction pattern: {0}")]
    Pattern(#[from] globset::Error),
    #[error("summary template failed: {0}")]
    Template(#[from] handlebars::RenderError),
}
