use std::sync::Arc;

use crate::error::StylesheetErrorKind;
use crate::style_block::{DebugMode, StyleBlock};
use css_ext_selector::SelectorList;
use indexmap::IndexMap;

/// One compiled rule: a selector and what to do with the elements it matches.
#[derive(Clone, Debug)]
pub struct ExtCssRuleData {
    /// Selector text as written, trimmed. Rules are merged on this key.
    pub selector_text: String,
    pub ast: Arc<SelectorList>,
    /// Empty when `should_remove` is set.
    pub styles: IndexMap<String, String>,
    pub debug: DebugMode,
    /// Matched elements are detached instead of styled.
    pub should_remove: bool,
}

impl ExtCssRuleData {
    pub(crate) fn new(
        selector_text: &str,
        ast: Arc<SelectorList>,
        block: StyleBlock,
    ) -> Result<Self, StylesheetErrorKind> {
        let should_remove = block.remove || ast.should_remove();
        if should_remove && !block.styles.is_empty() {
            return Err(StylesheetErrorKind::RemoveConflict);
        }
        Ok(Self {
            selector_text: selector_text.trim().to_owned(),
            ast,
            styles: block.styles,
            debug: block.debug,
            should_remove,
        })
    }

    /// Fold a later rule with the same selector into this one. Nothing changes on error.
    pub(crate) fn merge(&mut self, later: Self) -> Result<(), StylesheetErrorKind> {
        let should_remove = self.should_remove || later.should_remove;
        if should_remove && !(self.styles.is_empty() && later.styles.is_empty()) {
            return Err(StylesheetErrorKind::RemoveConflict);
        }
        self.styles.extend(later.styles);
        self.debug = self.debug.max(later.debug);
        self.should_remove = should_remove;
        Ok(())
    }
}

/// Rules keyed by selector text, in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct RuleSet {
    rules: IndexMap<String, ExtCssRuleData>,
}

impl RuleSet {
    pub(crate) fn add(&mut self, rule: ExtCssRuleData) -> Result<(), StylesheetErrorKind> {
        if let Some(existing) = self.rules.get_mut(&rule.selector_text) {
            return existing.merge(rule);
        }
        self.rules.insert(rule.selector_text.clone(), rule);
        Ok(())
    }

    pub(crate) fn into_rules(self) -> Vec<ExtCssRuleData> {
        self.rules.into_values().collect()
    }
}
