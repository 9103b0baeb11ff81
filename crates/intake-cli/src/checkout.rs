use std::fs;
use std::path::{Path, PathBuf};

use intake_spec::{
    AnswerSet, CollaboratorError, PaymentCollaborator, Price, SubmissionCollaborator,
};
use tracing::info;

/// Records charges locally instead of calling a payment provider.
#[derive(Debug, Default)]
pub struct OfflinePayment {
    charged: Vec<Price>,
}

impl OfflinePayment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentCollaborator for OfflinePayment {
    fn charge(&mut self, price: &Price, answers: &AnswerSet) -> Result<String, CollaboratorError> {
        if price.amount_minor == 0 {
            return Err(CollaboratorError::Payment("nothing to charge".into()));
        }
        self.charged.push(price.clone());
        let payment_id = format!("offline-{:04}", self.charged.len());
        info!(form_id = %answers.form_id, payment_id = %payment_id, "offline charge recorded");
        Ok(payment_id)
    }
}

/// Writes the finalized answers and the plain-text summary into a directory.
#[derive(Debug)]
pub struct FileSubmission {
    out_dir: PathBuf,
    summary: String,
}

impl FileSubmission {
    pub const ANSWERS_JSON: &'static str = "answers.json";
    pub const ANSWERS_CBOR: &'static str = "answers.cbor";
    pub const SUMMARY: &'static str = "summary.txt";

    pub fn new(out_dir: impl Into<PathBuf>, summary: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            summary: summary.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn write(&self, answers: &AnswerSet) -> Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.out_dir)?;
        fs::write(
            self.out_dir.join(Self::ANSWERS_JSON),
            answers.to_json_pretty()?,
        )?;
        fs::write(self.out_dir.join(Self::ANSWERS_CBOR), answers.to_cbor()?)?;
        fs::write(self.out_dir.join(Self::SUMMARY), &self.summary)?;
        Ok(())
    }
}

impl SubmissionCollaborator for FileSubmission {
    fn submit(&mut self, answers: &AnswerSet) -> Result<(), CollaboratorError> {
        self.write(answers)
            .map_err(|err| CollaboratorError::Submission(err.to_string()))?;
        info!(dir = %self.out_dir.display(), "answers written");
        Ok(())
    }
}
