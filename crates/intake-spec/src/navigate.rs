use tracing::debug;

use crate::answers::AnswerStore;
use crate::error::FlowError;
use crate::spec::branch::{BranchAction, BranchRule};
use crate::spec::form::QuestionCatalog;

/// Resolves the branch table against the catalog.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    catalog: &'a QuestionCatalog,
    rules: &'a [BranchRule],
}

impl<'a> Navigator<'a> {
    pub fn new(catalog: &'a QuestionCatalog, rules: &'a [BranchRule]) -> Self {
        Self { catalog, rules }
    }

    /// First rule attached to `question_id` whose predicate holds.
    pub fn matching_rule(&self, question_id: &str, answers: &AnswerStore) -> Option<&'a BranchRule> {
        self.rules.iter().find(|rule| {
            rule.question_id == question_id && rule.when.matches(answers.get(question_id))
        })
    }

    /// Index of the question to show after `question_id` (at `current_index`) was collected.
    ///
    /// Without a matching rule the cursor moves to `current_index + 1`. Targets
    /// must lie ahead of the current question.
    pub fn next_index(
        &self,
        current_index: usize,
        question_id: &str,
        answers: &AnswerStore,
    ) -> Result<usize, FlowError> {
        let default = current_index + 1;
        let Some(rule) = self.matching_rule(question_id, answers) else {
            return Ok(default);
        };

        let next = match &rule.action {
            BranchAction::GoTo { target } => {
                self.catalog
                    .index_of(target)
                    .ok_or_else(|| FlowError::UnknownTarget {
                        question_id: question_id.to_string(),
                        target: target.clone(),
                    })?
            }
            BranchAction::SkipPast { target } => match self.catalog.index_of(target) {
                Some(index) => index + 1,
                None => {
                    debug!(question_id, target = %target, "skip target absent, using default");
                    return Ok(default);
                }
            },
        };

        if next <= current_index {
            return Err(FlowError::BackwardTarget {
                question_id: question_id.to_string(),
                target: rule.action.target().to_string(),
            });
        }

        debug!(question_id, from = current_index, to = next, "branch taken");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerValue;
    use crate::spec::branch::AnswerPredicate;
    use crate::spec::question::{QuestionDefinition, QuestionKind};

    fn catalog(ids: &[&str]) -> QuestionCatalog {
        QuestionCatalog::new(
            ids.iter()
                .map(|id| QuestionDefinition::new(*id, QuestionKind::Text, *id))
                .collect(),
        )
    }

    fn equals(value: &str) -> AnswerPredicate {
        AnswerPredicate::Equals {
            value: value.into(),
        }
    }

    fn answered(id: &str, value: &str) -> AnswerStore {
        let mut answers = AnswerStore::new();
        answers.set(id, AnswerValue::Scalar(value.into()));
        answers
    }

    #[test]
    fn defaults_to_next_index() {
        let catalog = catalog(&["a", "b"]);
        let navigator = Navigator::new(&catalog, &[]);
        assert_eq!(navigator.next_index(0, "a", &AnswerStore::new()).unwrap(), 1);
    }

    #[test]
    fn male_skips_past_pregnancy_wherever_it_is() {
        let catalog = catalog(&["gender", "weight", "pregnancy", "height"]);
        let rules = [BranchRule::skip_past("gender", equals("male"), "pregnancy")];
        let navigator = Navigator::new(&catalog, &rules);
        assert_eq!(
            navigator
                .next_index(0, "gender", &answered("gender", "male"))
                .unwrap(),
            3
        );
        assert_eq!(
            navigator
                .next_index(0, "gender", &answered("gender", "female"))
                .unwrap(),
            1
        );
    }

    #[test]
    fn skip_without_target_falls_through() {
        let catalog = catalog(&["gender", "weight"]);
        let rules = [BranchRule::skip_past("gender", equals("male"), "pregnancy")];
        let navigator = Navigator::new(&catalog, &rules);
        assert_eq!(
            navigator
                .next_index(0, "gender", &answered("gender", "male"))
                .unwrap(),
            1
        );
    }

    #[test]
    fn tirzepatide_jumps_to_mounjaro_schedule() {
        let catalog = catalog(&[
            "activeIngredient",
            "sublingual_form",
            "ozempicSchedule",
            "mounjaroSchedule",
        ]);
        let rules = [
            BranchRule::go_to("activeIngredient", equals("semaglutide"), "ozempicSchedule"),
            BranchRule::go_to("activeIngredient", equals("tirzepatide"), "mounjaroSchedule"),
        ];
        let navigator = Navigator::new(&catalog, &rules);
        let answers = answered("activeIngredient", "tirzepatide");
        assert_eq!(
            navigator.next_index(0, "activeIngredient", &answers).unwrap(),
            3
        );
        let answers = answered("activeIngredient", "other");
        assert_eq!(
            navigator.next_index(0, "activeIngredient", &answers).unwrap(),
            1
        );
    }

    #[test]
    fn missing_go_to_target_is_fatal() {
        let catalog = catalog(&["sublingual_form", "dropsSchedule"]);
        let rules = [BranchRule::go_to(
            "sublingual_form",
            equals("quickstrips"),
            "quickStripsSchedule",
        )];
        let navigator = Navigator::new(&catalog, &rules);
        let err = navigator
            .next_index(0, "sublingual_form", &answered("sublingual_form", "quickstrips"))
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::UnknownTarget { target, .. } if target == "quickStripsSchedule"
        ));
    }

    #[test]
    fn backward_targets_are_rejected() {
        let catalog = catalog(&["consent", "dropsSchedule"]);
        let rules = [BranchRule::go_to(
            "dropsSchedule",
            AnswerPredicate::Always,
            "consent",
        )];
        let navigator = Navigator::new(&catalog, &rules);
        let err = navigator
            .next_index(1, "dropsSchedule", &AnswerStore::new())
            .unwrap_err();
        assert!(matches!(err, FlowError::BackwardTarget { .. }));
    }

    #[test]
    fn first_matching_rule_wins() {
        let catalog = catalog(&["q", "a", "b"]);
        let rules = [
            BranchRule::go_to("q", AnswerPredicate::Always, "b"),
            BranchRule::go_to("q", AnswerPredicate::Always, "a"),
        ];
        let navigator = Navigator::new(&catalog, &rules);
        assert_eq!(navigator.next_index(0, "q", &AnswerStore::new()).unwrap(), 2);
    }
}
