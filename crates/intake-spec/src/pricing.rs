use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerStore;

/// Amount in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Price {
    pub amount_minor: u64,
    pub currency: String,
}

impl Price {
    /// Amount with two decimals, e.g. `299.00`.
    pub fn amount_display(&self) -> String {
        format!("{}.{:02}", self.amount_minor / 100, self.amount_minor % 100)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_display(), self.currency)
    }
}

/// Product price lookup keyed by the answer of the product-selecting questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PricingTable {
    pub currency: String,
    pub default_price: u64,
    /// Questions whose answer names the product, checked in order.
    pub selectors: Vec<String>,
    pub prices: BTreeMap<String, u64>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            currency: "CAD".into(),
            default_price: 29_900,
            selectors: vec!["activeIngredient".into(), "sublingual_form".into()],
            prices: BTreeMap::from([
                ("semaglutide".into(), 29_900),
                ("tirzepatide".into(), 49_900),
                ("quickstrips".into(), 12_000),
                ("drops".into(), 10_000),
            ]),
        }
    }
}

impl PricingTable {
    /// Product selected by the first selector whose answer has a price.
    pub fn selected_product<'a>(&self, answers: &'a AnswerStore) -> Option<&'a str> {
        self.selectors
            .iter()
            .filter_map(|selector| answers.scalar(selector))
            .find(|product| self.prices.contains_key(*product))
    }

    pub fn resolve(&self, answers: &AnswerStore) -> Price {
        let amount_minor = self
            .selected_product(answers)
            .and_then(|product| self.prices.get(product))
            .copied()
            .unwrap_or(self.default_price);
        Price {
            amount_minor,
            currency: self.currency.clone(),
        }
    }
}
