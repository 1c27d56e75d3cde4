//! Re-asserting applied inline styles against page scripts.

use crate::affected::write_declarations;
use css_style_attr::InlineStyle;
use dom::{DomHost, MutationSource, NodeKey, ObserveOptions, ObserverId};
use indexmap::IndexMap;
use log::{debug, error, warn};

/// Watches one element's `style` attribute and puts the applied declarations back when
/// something else drops them, at most `cap` times.
#[derive(Debug)]
pub(crate) struct StyleProtector {
    element: NodeKey,
    observer: Option<ObserverId>,
    restorations: usize,
    cap: usize,
}

fn style_options() -> ObserveOptions {
    ObserveOptions {
        attributes: true,
        attribute_filter: Some(vec!["style".to_owned()]),
        ..ObserveOptions::default()
    }
}

impl StyleProtector {
    /// A protector that is not watching yet; see [`StyleProtector::resume`].
    pub(crate) const fn new(element: NodeKey, cap: usize) -> Self {
        Self {
            element,
            observer: None,
            restorations: 0,
            cap,
        }
    }

    pub(crate) const fn restorations(&self) -> usize {
        self.restorations
    }

    pub(crate) const fn is_attached(&self) -> bool {
        self.observer.is_some()
    }

    const fn is_exhausted(&self) -> bool {
        self.restorations >= self.cap
    }

    /// Start watching again. Does nothing once the cap is reached.
    pub(crate) fn resume<H: MutationSource + ?Sized>(&mut self, host: &mut H) {
        if self.observer.is_none() && !self.is_exhausted() {
            self.observer = Some(host.observe(self.element, style_options()));
        }
    }

    /// Stop watching so the engine's own writes are not queued.
    pub(crate) fn pause<H: MutationSource + ?Sized>(&mut self, host: &mut H) {
        if let Some(observer) = self.observer.take() {
            host.disconnect(observer);
        }
    }

    /// Handle queued `style` changes. Returns true when the styles were written back.
    pub(crate) fn process<H: DomHost + ?Sized>(
        &mut self,
        host: &mut H,
        styles: &IndexMap<String, String>,
    ) -> bool {
        let Some(observer) = self.observer else {
            return false;
        };
        if host.take_records(observer).is_empty() {
            return false;
        }
        let attribute = host.attribute(self.element, "style");
        let mut current = InlineStyle::from_attribute(attribute.as_deref());
        if declarations_hold(&current, styles) {
            return false;
        }

        self.pause(host);
        write_declarations(&mut current, styles);
        if let Err(err) = host.set_attribute(self.element, "style", &current.to_css_text()) {
            warn!("could not restore styles on {}: {err}", self.element);
            self.resume(host);
            return false;
        }
        self.restorations = self.restorations.saturating_add(1);
        if self.is_exhausted() {
            error!(
                "style protection for {} stopped after {} restorations",
                self.element, self.restorations
            );
            return true;
        }
        debug!(
            "restored styles on {} ({}/{})",
            self.element, self.restorations, self.cap
        );
        self.resume(host);
        true
    }
}

/// Every applied declaration is still present with its value and priority.
fn declarations_hold(current: &InlineStyle, styles: &IndexMap<String, String>) -> bool {
    styles.iter().all(|(property, value)| {
        current
            .get(property)
            .is_some_and(|declaration| declaration.important && declaration.value == value.trim())
    })
}
