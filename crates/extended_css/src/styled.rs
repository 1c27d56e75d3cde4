//! Inline-style state the engine owns on each styled element.

use crate::affected::write_declarations;
use crate::protection::StyleProtector;
use css_style_attr::{Declaration, InlineStyle};
use dom::{DomHost, HostError, NodeKey};
use indexmap::IndexMap;
use log::warn;

/// Every rule matching an element contributes to one merged set of declarations, and one
/// protector guards that set.
#[derive(Debug)]
pub(crate) struct StyledElement {
    element: NodeKey,
    /// The raw `style` attribute before the engine first wrote to it.
    prior_inline: Option<String>,
    /// What each written property replaced; `None` where it was unset.
    prior_values: IndexMap<String, Option<Declaration>>,
    expected: IndexMap<String, String>,
    protector: StyleProtector,
}

impl StyledElement {
    pub(crate) fn new(prior_inline: Option<String>, element: NodeKey, cap: usize) -> Self {
        Self {
            element,
            prior_inline,
            prior_values: IndexMap::new(),
            expected: IndexMap::new(),
            protector: StyleProtector::new(element, cap),
        }
    }

    /// The merged declarations currently written to the element.
    pub(crate) const fn expected(&self) -> &IndexMap<String, String> {
        &self.expected
    }

    pub(crate) const fn restorations(&self) -> usize {
        self.protector.restorations()
    }

    pub(crate) const fn is_protected(&self) -> bool {
        self.protector.is_attached()
    }

    /// Put the merged declarations back if a page script dropped them.
    pub(crate) fn protect<H: DomHost + ?Sized>(&mut self, host: &mut H) -> bool {
        self.protector.process(host, &self.expected)
    }

    /// Make `expected` the element's engine-owned declarations. Properties leaving the set
    /// get the value they had before the engine wrote them. With an empty set the element is
    /// left as it was found and stays unwatched.
    ///
    /// # Errors
    /// Returns the host's error when the attribute cannot be written; the previous set is kept.
    pub(crate) fn sync<H: DomHost + ?Sized>(
        &mut self,
        host: &mut H,
        expected: IndexMap<String, String>,
    ) -> Result<(), HostError> {
        let element = self.element;
        self.protector.pause(host);
        let attribute = host.attribute(element, "style");
        let mut style = InlineStyle::from_attribute(attribute.as_deref());
        for property in self.expected.keys() {
            if expected.contains_key(property) {
                continue;
            }
            match self.prior_values.get(property) {
                Some(Some(prior)) => style.set(&prior.property, &prior.value, prior.important),
                Some(None) | None => {
                    style.remove(property);
                }
            }
        }
        for property in expected.keys() {
            if !self.prior_values.contains_key(property) {
                let prior = style.get(property).cloned();
                self.prior_values.insert(property.clone(), prior);
            }
        }
        write_declarations(&mut style, &expected);

        let written = match self.prior_inline.as_deref() {
            None if style.is_empty() => host.remove_attribute(element, "style"),
            Some(prior) if InlineStyle::from_attribute(Some(prior)) == style => {
                host.set_attribute(element, "style", prior)
            }
            Some(_) | None => host.set_attribute(element, "style", &style.to_css_text()),
        };
        if written.is_ok() {
            self.expected = expected;
        }
        if !self.expected.is_empty() {
            self.protector.resume(host);
        }
        written
    }

    /// Give the element its original inline style back and stop watching it.
    pub(crate) fn release<H: DomHost + ?Sized>(mut self, host: &mut H) {
        if let Err(err) = self.sync(host, IndexMap::new()) {
            warn!("could not restore the inline style of {}: {err}", self.element);
        }
        self.protector.pause(host);
    }
}
