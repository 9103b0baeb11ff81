use globset::{Glob, GlobSet, GlobSetBuilder};
use handlebars::{Handlebars, no_escape};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::answers::AnswerStore;
use crate::bmi::BMI_ID;
use crate::error::SummaryError;
use crate::spec::form::IntakeForm;
use crate::spec::question::QuestionKind;

const SUMMARY_TEMPLATE: &str = "A new patient submitted the form:\n\n{{#each entries}}{{this.title}}: {{this.value}}\n{{/each}}";
const REDACTED: &str = "[redacted]";

/// Controls which answers are masked in the submission summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryPolicy {
    /// Glob patterns matched against answer keys.
    #[serde(default)]
    pub redact: Vec<String>,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            redact: vec!["idUpload".into()],
        }
    }
}

impl SummaryPolicy {
    fn matcher(&self) -> Result<GlobSet, SummaryError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.redact {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }
}

/// Plain-text listing of the answers in catalog order, followed by derived values.
pub fn render_summary(form: &IntakeForm, answers: &AnswerStore) -> Result<String, SummaryError> {
    let redact = form.summary.matcher()?;

    let mut entries = form
        .questions
        .iter()
        .filter(|question| question.kind != QuestionKind::Landing)
        .filter_map(|question| {
            let value = answers.get(&question.id)?;
            let shown = if redact.is_match(&question.id) {
                REDACTED.to_string()
            } else {
                value.display()
            };
            Some(json!({ "title": question.title, "value": shown }))
        })
        .collect::<Vec<_>>();
    if let Some(bmi) = answers.scalar(BMI_ID) {
        entries.push(json!({ "title": "BMI Calculation", "value": bmi }));
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(no_escape);
    Ok(handlebars.render_template(SUMMARY_TEMPLATE, &json!({ "entries": entries }))?)
}
