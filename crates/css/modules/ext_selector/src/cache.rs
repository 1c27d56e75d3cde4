use std::sync::Arc;

use crate::ast::SelectorList;
use crate::error::SelectorParseError;
use crate::parser::parse_selector_list;
use rustc_hash::FxHashMap;

/// Parsed selectors keyed by their source text. Owned by one engine instance.
#[derive(Debug, Default)]
pub struct SelectorCache {
    entries: FxHashMap<String, Arc<SelectorList>>,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached tree for `text`, parsing and storing it on first use. Failures are not
    /// cached.
    ///
    /// # Errors
    /// Returns the parse error for invalid selectors.
    pub fn get_or_parse(&mut self, text: &str) -> Result<Arc<SelectorList>, SelectorParseError> {
        if let Some(list) = self.entries.get(text) {
            return Ok(Arc::clone(list));
        }
        let list = Arc::new(parse_selector_list(text)?);
        self.entries.insert(text.to_owned(), Arc::clone(&list));
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
