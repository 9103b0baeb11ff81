use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::answers::AnswerSet;
use crate::error::{CollaboratorError, FlowError};
use crate::flow::{FlowController, FlowState};
use crate::pricing::Price;

/// Payment service invoked once traversal is complete.
pub trait PaymentCollaborator {
    /// Charges `price` for `answers` and returns the provider's payment id.
    fn charge(&mut self, price: &Price, answers: &AnswerSet) -> Result<String, CollaboratorError>;
}

/// Service that persists or forwards the finalized answers.
pub trait SubmissionCollaborator {
    fn submit(&mut self, answers: &AnswerSet) -> Result<(), CollaboratorError>;
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub payment_id: String,
    pub price: Price,
    pub answers: AnswerSet,
}

impl FlowController<'_> {
    /// Hands a completed session to the payment and submission services.
    ///
    /// A captured payment is kept on the session, so retrying after a submission
    /// failure does not charge again. On success the cursor moves to the
    /// confirmation question, when the form has one.
    pub fn checkout(
        &mut self,
        payment: &mut dyn PaymentCollaborator,
        submission: &mut dyn SubmissionCollaborator,
    ) -> Result<Receipt, FlowError> {
        if self.state() != FlowState::Complete {
            return Err(FlowError::NotComplete);
        }

        let price = self.quote();
        let payment_id = match self.session().payment_id.clone() {
            Some(existing) => existing,
            None => {
                let answers = self.answer_set();
                let payment_id = payment.charge(&price, &answers).inspect_err(|err| {
                    warn!(error = %err, "payment failed");
                })?;
                info!(payment_id = %payment_id, price = %price, "payment captured");
                self.session_mut().payment_id = Some(payment_id.clone());
                payment_id
            }
        };

        let answers = self.answer_set();
        submission.submit(&answers).inspect_err(|err| {
            warn!(error = %err, payment_id = %payment_id, "submission failed");
        })?;

        let confirmation = self
            .form()
            .confirmation_question
            .as_deref()
            .and_then(|id| self.form().questions.index_of(id));
        let session = self.session_mut();
        session.confirmed = true;
        if let Some(index) = confirmation {
            session.current_index = index;
        }
        info!(payment_id = %payment_id, "submission accepted");

        Ok(Receipt {
            payment_id,
            price,
            answers,
        })
    }
}
