use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogError;
use crate::pricing::PricingTable;
use crate::spec::branch::{BranchAction, BranchRule};
use crate::spec::question::{NONE_OPTION, QuestionDefinition, QuestionKind};
use crate::summary::SummaryPolicy;

const BUILTIN_FORM: &str = include_str!("../../tests/fixtures/weight_loss_intake.json");

/// Ordered question definitions; catalog order is the default traversal order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct QuestionCatalog(Vec<QuestionDefinition>);

impl QuestionCatalog {
    pub fn new(questions: Vec<QuestionDefinition>) -> Self {
        Self(questions)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QuestionDefinition> {
        self.0.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&QuestionDefinition> {
        self.0.iter().find(|question| question.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|question| question.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuestionDefinition> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a QuestionCatalog {
    type Item = &'a QuestionDefinition;
    type IntoIter = std::slice::Iter<'a, QuestionDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Top-level intake definition: catalog, branch table, pricing and hand-off settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeForm {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: QuestionCatalog,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchRule>,
    #[serde(default)]
    pub pricing: PricingTable,
    /// Question shown once checkout succeeds. Traversal completes on reaching it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_question: Option<String>,
    #[serde(default)]
    pub summary: SummaryPolicy,
}

impl IntakeForm {
    /// Builds a form with default pricing and no branches.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<QuestionDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            version: "1.0.0".into(),
            description: None,
            questions: QuestionCatalog::new(questions),
            branches: Vec::new(),
            pricing: PricingTable::default(),
            confirmation_question: None,
            summary: SummaryPolicy::default(),
        }
    }

    /// The weight-loss intake shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_FORM)
    }

    /// Parses and checks a form document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let form: IntakeForm = serde_json::from_str(json).map_err(CatalogError::Parse)?;
        form.validate()?;
        Ok(form)
    }

    /// Checks catalog and branch-table invariants.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(CatalogError::DuplicateQuestion(question.id.clone()));
            }
            match question.kind {
                QuestionKind::Radio if question.options.is_empty() => {
                    return Err(CatalogError::MissingOptions(question.id.clone()));
                }
                QuestionKind::MultiCheckbox if !question.has_checkbox(NONE_OPTION) => {
                    return Err(CatalogError::MissingNoneSentinel(question.id.clone()));
                }
                _ => {}
            }
        }

        for rule in &self.branches {
            let source = self
                .questions
                .index_of(&rule.question_id)
                .ok_or_else(|| CatalogError::UnknownBranchSource(rule.question_id.clone()))?;
            // Resolved next index; an absent skip target falls back to the default.
            let next = match &rule.action {
                BranchAction::GoTo { target } => self.questions.index_of(target).ok_or_else(|| {
                    CatalogError::UnknownBranchTarget {
                        question_id: rule.question_id.clone(),
                        target: target.clone(),
                    }
                })?,
                BranchAction::SkipPast { target } => match self.questions.index_of(target) {
                    Some(index) => index + 1,
                    None => continue,
                },
            };
            if next <= source {
                return Err(CatalogError::BackwardBranch {
                    question_id: rule.question_id.clone(),
                    target: rule.action.target().to_string(),
                });
            }
        }

        if let Some(confirmation) = &self.confirmation_question
            && !self.questions.contains(confirmation)
        {
            return Err(CatalogError::UnknownConfirmation(confirmation.clone()));
        }

        Ok(())
    }

    /// Index at which forward traversal is finished.
    pub fn completion_index(&self) -> usize {
        self.confirmation_question
            .as_deref()
            .and_then(|id| self.questions.index_of(id))
            .unwrap_or(self.questions.len())
    }
}

/// JSON schema of the form document.
pub fn form_schema() -> Value {
    schemars::schema_for!(IntakeForm).to_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::branch::AnswerPredicate;

    fn radio(id: &str) -> QuestionDefinition {
        QuestionDefinition::new(id, QuestionKind::Radio, id).with_options(&[("yes", "Yes")])
    }

    #[test]
    fn builtin_form_loads() {
        let form = IntakeForm::builtin().expect("builtin form");
        assert_eq!(form.questions.index_of("landing"), Some(0));
        assert!(form.questions.contains("pregnancy"));
        assert_eq!(
            form.completion_index(),
            form.questions.index_of("confirmationPage").expect("confirmation")
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let form = IntakeForm::new("f", "F", vec![radio("a"), radio("a")]);
        assert!(matches!(
            form.validate(),
            Err(CatalogError::DuplicateQuestion(id)) if id == "a"
        ));
    }

    #[test]
    fn checkbox_questions_need_none_sentinel() {
        let question = QuestionDefinition::new("meds", QuestionKind::MultiCheckbox, "Meds")
            .with_checkboxes(&[("insulin", "Insulin")]);
        let form = IntakeForm::new("f", "F", vec![question]);
        assert!(matches!(
            form.validate(),
            Err(CatalogError::MissingNoneSentinel(_))
        ));
    }

    #[test]
    fn go_to_targets_must_exist() {
        let mut form = IntakeForm::new("f", "F", vec![radio("a"), radio("b")]);
        form.branches
            .push(BranchRule::go_to("a", AnswerPredicate::Always, "missing"));
        assert!(matches!(
            form.validate(),
            Err(CatalogError::UnknownBranchTarget { .. })
        ));
    }

    #[test]
    fn skip_past_targets_may_be_absent() {
        let mut form = IntakeForm::new("f", "F", vec![radio("a"), radio("b")]);
        form.branches
            .push(BranchRule::skip_past("a", AnswerPredicate::Always, "missing"));
        assert!(form.validate().is_ok());
        assert_eq!(form.completion_index(), 2);
    }

    #[test]
    fn branch_targets_must_lie_ahead() {
        let mut form = IntakeForm::new("f", "F", vec![radio("a"), radio("b"), radio("c")]);
        form.branches
            .push(BranchRule::go_to("b", AnswerPredicate::Always, "a"));
        assert!(matches!(
            form.validate(),
            Err(CatalogError::BackwardBranch { question_id, target }) if question_id == "b" && target == "a"
        ));

        form.branches = vec![BranchRule::go_to("b", AnswerPredicate::Always, "b")];
        assert!(matches!(
            form.validate(),
            Err(CatalogError::BackwardBranch { .. })
        ));

        form.branches = vec![BranchRule::skip_past("c", AnswerPredicate::Always, "a")];
        assert!(matches!(
            form.validate(),
            Err(CatalogError::BackwardBranch { .. })
        ));

        form.branches = vec![BranchRule::skip_past("b", AnswerPredicate::Always, "b")];
        assert!(form.validate().is_ok());
    }

    #[test]
    fn schema_describes_questions() {
        let schema = form_schema();
        let text = schema.to_string();
        assert!(text.contains("questions"));
        assert!(text.contains("multiCheckbox"));
    }
}
