use std::collections::HashMap;

use serde::Deserialize;

/// What a product classification implies for SIM handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProductRule {
    /// Clients on this product must hold a SIM.
    #[serde(default)]
    pub requires_sim: bool,

    /// Bind cards straight to ACTIVE instead of ASSIGNED.
    #[serde(default)]
    pub activate_on_assign: bool,
}

/// A catalog entry as written in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductEntry {
    pub code: String,
    #[serde(flatten)]
    pub rule: ProductRule,
}

/// Product class code → SIM rule. Unknown codes need no SIM.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    rules: HashMap<String, ProductRule>,
}

impl ProductCatalog {
    pub fn new(entries: impl IntoIterator<Item = ProductEntry>) -> Self {
        Self {
            rules: entries.into_iter().map(|e| (e.code, e.rule)).collect(),
        }
    }

    /// Add or replace one rule.
    pub fn with(mut self, code: &str, rule: ProductRule) -> Self {
        self.rules.insert(code.to_string(), rule);
        self
    }

    pub fn rule(&self, product_class: &str) -> ProductRule {
        self.rules.get(product_class).copied().unwrap_or_default()
    }

    pub fn requires_sim(&self, product_class: &str) -> bool {
        self.rule(product_class).requires_sim
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
