//! The (element, rule) pairs the engine has styled or removed.

use css_style_attr::InlineStyle;
use dom::NodeKey;
use indexmap::IndexMap;

/// What the engine is about to do to one element. Passed to the `before_style_applied`
/// callback, which may edit `styles` or `remove` or veto the change entirely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleApplication {
    element: NodeKey,
    selector_text: String,
    pub styles: IndexMap<String, String>,
    pub remove: bool,
}

impl StyleApplication {
    pub(crate) const fn new(
        element: NodeKey,
        selector_text: String,
        styles: IndexMap<String, String>,
        remove: bool,
    ) -> Self {
        Self {
            element,
            selector_text,
            styles,
            remove,
        }
    }

    pub const fn element(&self) -> NodeKey {
        self.element
    }

    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }
}

/// One (element, rule) pair the engine currently owns.
#[derive(Clone, Debug)]
pub struct AffectedElement {
    element: NodeKey,
    /// Index into the engine's rule list.
    rule: usize,
    selector_text: String,
    applied: IndexMap<String, String>,
    /// The raw `style` attribute right before this pair was applied.
    prior_inline: Option<String>,
    removed: bool,
}

impl AffectedElement {
    /// A pair that was matched but left untouched, e.g. vetoed by the callback.
    pub(crate) fn untouched(element: NodeKey, rule: usize, selector_text: String) -> Self {
        Self {
            element,
            rule,
            selector_text,
            applied: IndexMap::new(),
            prior_inline: None,
            removed: false,
        }
    }

    pub(crate) fn removed(element: NodeKey, rule: usize, selector_text: String) -> Self {
        Self {
            removed: true,
            ..Self::untouched(element, rule, selector_text)
        }
    }

    /// A pair whose declarations were written to the element.
    pub(crate) fn styled(
        rule: usize,
        application: StyleApplication,
        prior_inline: Option<String>,
    ) -> Self {
        Self {
            element: application.element,
            rule,
            selector_text: application.selector_text,
            applied: application.styles,
            prior_inline,
            removed: false,
        }
    }

    pub const fn element(&self) -> NodeKey {
        self.element
    }

    pub(crate) const fn key(&self) -> (NodeKey, usize) {
        (self.element, self.rule)
    }

    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }

    /// Declarations this rule contributes to the element's inline style.
    pub const fn applied_styles(&self) -> &IndexMap<String, String> {
        &self.applied
    }

    pub fn prior_inline_style(&self) -> Option<&str> {
        self.prior_inline.as_deref()
    }

    pub const fn is_removed(&self) -> bool {
        self.removed
    }

    /// Whether the pair holds declarations on the element.
    pub fn is_styling(&self) -> bool {
        !self.removed && !self.applied.is_empty()
    }
}

/// Set every declaration of `styles` with `!important`.
pub(crate) fn write_declarations(style: &mut InlineStyle, styles: &IndexMap<String, String>) {
    for (property, value) in styles {
        style.set(property, value, true);
    }
}
