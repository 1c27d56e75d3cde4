//! The rule-application state machine.
//!
//! An engine owns compiled rules and the set of elements it has changed. Every pass matches
//! all rules, reverts pairs that no longer match and applies new ones, so running it twice
//! against an unchanged document does nothing the second time. The host drives everything:
//! it calls [`ExtendedCss::process_mutations`] when the document may have changed and
//! [`ExtendedCss::run_scheduled`] once [`ExtendedCss::next_deadline`] has passed.

use core::mem;
use core::time::Duration;
use std::rc::Rc;
use std::time::Instant;

use crate::affected::{AffectedElement, StyleApplication};
use crate::changes::{ChangeNotifier, DocumentChangeNotifier};
use crate::config::{BeforeStyleApplied, EngineSettings, ExtCssConfiguration};
use crate::error::ExtCssError;
use crate::events::{EventTracker, InputEvent};
use crate::schedule::ThrottleWrapper;
use crate::styled::StyledElement;
use crate::time::{Clock, SystemClock};
use crate::timings::{RuleTiming, TimingStats};
use css_ext_matcher::{ExtendedMatcher, select};
use css_ext_selector::{SelectorCache, SelectorParseError, parse_selector_list};
use css_ext_stylesheet::{DebugMode, ExtCssRuleData, parse_rules, parse_stylesheet};
use dom::{DomAccess, DomHost, NodeKey};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::info_span;

/// Lifecycle of an engine. `Disposed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Applied,
    Disposed,
}

/// Outcome of [`ExtendedCss::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub error: Option<String>,
}

/// Per-instance state. Emptied on dispose.
struct Context {
    rules: Vec<ExtCssRuleData>,
    affected: Vec<AffectedElement>,
    /// One entry per element holding engine-written declarations.
    styled: IndexMap<NodeKey, StyledElement>,
    notifier: Box<dyn ChangeNotifier>,
    throttle: ThrottleWrapper,
    clock: Rc<dyn Clock>,
    before_style_applied: Option<BeforeStyleApplied>,
    settings: EngineSettings,
    debug: bool,
    cache: SelectorCache,
    timings: TimingStats,
    events: EventTracker,
    /// Removals per element path, so a re-inserted copy counts against the same budget.
    removals: FxHashMap<String, usize>,
}

/// Applies extended CSS rules to a document and keeps them applied.
pub struct ExtendedCss {
    context: Context,
    state: EngineState,
}

impl ExtendedCss {
    /// Compile the configured rules.
    ///
    /// # Errors
    /// Returns an error when no rule source is configured or the stylesheet is invalid.
    pub fn new(config: ExtCssConfiguration) -> Result<Self, ExtCssError> {
        let ExtCssConfiguration {
            style_sheet,
            css_rules,
            before_style_applied,
            debug,
            settings,
            clock,
            notifier,
        } = config;
        if style_sheet.is_none() && css_rules.is_none() {
            return Err(ExtCssError::NoRuleSource);
        }
        let mut cache = SelectorCache::new();
        let rules = compile_rules(style_sheet.as_deref(), css_rules.as_deref(), &mut cache)?;
        info!("extended css engine created with {} rule(s)", rules.len());
        Ok(Self {
            context: Context {
                rules,
                affected: Vec::new(),
                styled: IndexMap::new(),
                notifier: notifier.unwrap_or_else(|| Box::new(DocumentChangeNotifier::new())),
                throttle: ThrottleWrapper::new(settings.throttle_interval),
                clock: clock.unwrap_or_else(|| Rc::new(SystemClock::new())),
                before_style_applied,
                settings,
                debug: debug || settings.debug,
                cache,
                timings: TimingStats::default(),
                events: EventTracker::default(),
                removals: FxHashMap::default(),
            },
            state: EngineState::Created,
        })
    }

    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Compiled rules in first-seen order. Empty once disposed.
    pub fn rules(&self) -> &[ExtCssRuleData] {
        &self.context.rules
    }

    /// Elements currently styled or removed by this engine.
    pub fn affected_elements(&self) -> &[AffectedElement] {
        &self.context.affected
    }

    /// How many times `element`'s declarations were written back after a page change.
    pub fn restorations(&self, element: NodeKey) -> usize {
        self.context
            .styled
            .get(&element)
            .map_or(0, StyledElement::restorations)
    }

    /// Whether the engine still watches `element`'s inline style.
    pub fn is_protected(&self, element: NodeKey) -> bool {
        self.context
            .styled
            .get(&element)
            .is_some_and(StyledElement::is_protected)
    }

    /// Matching statistics for the rule with this selector text.
    pub fn rule_timing(&self, selector_text: &str) -> Option<&RuleTiming> {
        self.context.timings.get(selector_text)
    }

    /// Run a pass now and start listening for document changes. No-op once disposed.
    pub fn apply<H: DomHost>(&mut self, host: &mut H) {
        if self.state == EngineState::Disposed {
            debug!("apply() ignored: engine is disposed");
            return;
        }
        let now = self.context.clock.now();
        self.context.throttle.run_now(now);
        self.context.run_pass(host);
        if !self.context.notifier.is_connected() {
            let root = host.document();
            self.context.notifier.connect(host, root);
        }
        self.state = EngineState::Applied;
    }

    /// Handle queued changes: let protectors re-assert their styles, then schedule a pass if
    /// the document changed in a way that can affect matching.
    pub fn process_mutations<H: DomHost>(&mut self, host: &mut H) {
        if self.state != EngineState::Applied {
            return;
        }
        let context = &mut self.context;
        for state in context.styled.values_mut() {
            state.protect(host);
        }
        let records = context.notifier.take_changes(host);
        if records.is_empty() {
            return;
        }
        let now = context.clock.now();
        if context.events.should_ignore(&records, now) {
            debug!("ignoring {} attribute change(s) after a hover event", records.len());
            return;
        }
        let deadline = context.throttle.schedule(now);
        debug!(
            "{} change(s) observed, re-apply due in {:?}",
            records.len(),
            deadline.saturating_sub(now)
        );
    }

    /// Run the scheduled pass if it is due. Returns whether a pass ran.
    pub fn run_scheduled<H: DomHost>(&mut self, host: &mut H) -> bool {
        if self.state != EngineState::Applied {
            return false;
        }
        let now = self.context.clock.now();
        if !self.context.throttle.take_due(now) {
            return false;
        }
        self.context.run_pass(host);
        true
    }

    /// When the host should call [`ExtendedCss::run_scheduled`], on the engine clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        if self.state == EngineState::Applied {
            self.context.throttle.deadline()
        } else {
            None
        }
    }

    pub fn record_event(&mut self, event: &InputEvent) {
        let now = self.context.clock.now();
        self.context.events.record(event, now);
    }

    /// Stop listening, undo every change and drop all state. Safe to call repeatedly.
    pub fn dispose<H: DomHost>(&mut self, host: &mut H) {
        if self.state == EngineState::Disposed {
            return;
        }
        let context = &mut self.context;
        context.notifier.disconnect(host);
        for (_, state) in mem::take(&mut context.styled).into_iter().rev() {
            state.release(host);
        }
        context.affected.clear();
        context.throttle.cancel();
        context.rules.clear();
        context.cache.clear();
        context.timings.clear();
        context.events.clear();
        context.removals.clear();
        self.state = EngineState::Disposed;
        info!("extended css engine disposed");
    }

    /// Elements matching an extended selector, in document order.
    ///
    /// # Errors
    /// Returns the parse error for an invalid selector.
    pub fn query<H: DomAccess + ?Sized>(
        host: &H,
        selector: &str,
        suppress_timing: bool,
    ) -> Result<Vec<NodeKey>, SelectorParseError> {
        let _span = info_span!("extended_css.query").entered();
        let started = Instant::now();
        let list = parse_selector_list(selector)?;
        let found = select(host, &list);
        if !suppress_timing {
            info!(
                "query '{selector}' matched {} element(s) in {:?}",
                found.len(),
                started.elapsed()
            );
        }
        Ok(found)
    }

    pub fn validate(selector: &str) -> ValidationResult {
        match parse_selector_list(selector) {
            Ok(_) => ValidationResult {
                ok: true,
                error: None,
            },
            Err(err) => ValidationResult {
                ok: false,
                error: Some(err.to_string()),
            },
        }
    }
}

impl Context {
    fn run_pass<H: DomHost>(&mut self, host: &mut H) {
        let _span = info_span!("extended_css.apply").entered();
        let matches = self.collect_matches(&*host);
        let wanted: FxHashSet<(NodeKey, usize)> = matches.iter().copied().collect();

        let (kept, stale): (Vec<_>, Vec<_>) = mem::take(&mut self.affected)
            .into_iter()
            .partition(|entry| !entry.is_removed() && wanted.contains(&entry.key()));
        self.affected = kept;
        let mut restyle: Vec<NodeKey> = Vec::new();
        for entry in stale.iter().filter(|entry| entry.is_styling()) {
            if !restyle.contains(&entry.element()) {
                restyle.push(entry.element());
            }
        }
        for element in restyle {
            self.restyle(host, element);
        }

        let existing: FxHashSet<(NodeKey, usize)> =
            self.affected.iter().map(AffectedElement::key).collect();
        let mut added = 0usize;
        for (element, rule) in matches {
            if existing.contains(&(element, rule)) {
                continue;
            }
            if let Some(entry) = self.apply_rule(host, element, rule) {
                self.affected.push(entry);
                added = added.saturating_add(1);
            }
        }
        debug!(
            "apply pass: {added} new pair(s), {} affected in total",
            self.affected.len()
        );

        let own = self.notifier.take_changes(host);
        if !own.is_empty() {
            debug!("dropped {} change record(s) made by the pass", own.len());
        }
        self.report_timings();
    }

    /// Every (element, rule index) pair that matches right now, timing each rule.
    fn collect_matches<H: DomAccess + ?Sized>(&mut self, host: &H) -> Vec<(NodeKey, usize)> {
        let mut matcher = ExtendedMatcher::new(host);
        let mut pairs = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let started = Instant::now();
            let elements = matcher.select(&rule.ast);
            self.timings
                .record(&rule.selector_text, started.elapsed(), elements.len());
            pairs.extend(elements.into_iter().map(|element| (element, index)));
        }
        pairs
    }

    fn apply_rule<H: DomHost>(
        &mut self,
        host: &mut H,
        element: NodeKey,
        index: usize,
    ) -> Option<AffectedElement> {
        let rule = self.rules.get(index)?;
        let proposed = StyleApplication::new(
            element,
            rule.selector_text.clone(),
            rule.styles.clone(),
            rule.should_remove,
        );
        let application = match &self.before_style_applied {
            Some(callback) => {
                let Some(application) = callback(proposed) else {
                    debug!("'{}' vetoed on {element}", rule.selector_text);
                    return Some(AffectedElement::untouched(
                        element,
                        index,
                        rule.selector_text.clone(),
                    ));
                };
                application
            }
            None => proposed,
        };

        if application.remove {
            return self.remove_element(host, element, index, application.selector_text());
        }
        if application.styles.is_empty() {
            return Some(AffectedElement::untouched(
                element,
                index,
                application.selector_text().to_owned(),
            ));
        }
        self.style_element(host, index, application)
    }

    /// Overlay the rule's declarations on what other rules already wrote to the element.
    fn style_element<H: DomHost>(
        &mut self,
        host: &mut H,
        index: usize,
        application: StyleApplication,
    ) -> Option<AffectedElement> {
        let element = application.element();
        let prior_inline = host.attribute(element, "style");
        let cap = self.settings.protection_cap;
        let state = self
            .styled
            .entry(element)
            .or_insert_with(|| StyledElement::new(prior_inline.clone(), element, cap));
        let mut expected = state.expected().clone();
        for (property, value) in &application.styles {
            expected.insert(property.clone(), value.clone());
        }
        if let Err(err) = state.sync(host, expected) {
            warn!(
                "could not apply '{}' to {element}: {err}",
                application.selector_text()
            );
            if state.expected().is_empty() {
                self.styled.shift_remove(&element);
            }
            return None;
        }
        Some(AffectedElement::styled(index, application, prior_inline))
    }

    /// Rewrite an element's declarations from the pairs still styling it, in the order
    /// they were applied. Releases the element when none are left.
    fn restyle<H: DomHost>(&mut self, host: &mut H, element: NodeKey) {
        let mut expected: IndexMap<String, String> = IndexMap::new();
        for entry in &self.affected {
            if entry.element() == element && entry.is_styling() {
                for (property, value) in entry.applied_styles() {
                    expected.insert(property.clone(), value.clone());
                }
            }
        }
        if expected.is_empty() {
            if let Some(state) = self.styled.shift_remove(&element) {
                state.release(host);
            }
            return;
        }
        if let Some(state) = self.styled.get_mut(&element)
            && let Err(err) = state.sync(host, expected)
        {
            warn!("could not restyle {element}: {err}");
        }
    }

    fn remove_element<H: DomHost>(
        &mut self,
        host: &mut H,
        element: NodeKey,
        index: usize,
        selector_text: &str,
    ) -> Option<AffectedElement> {
        let cap = self.settings.protection_cap;
        let path = host.element_path(element);
        let count = self.removals.entry(path).or_default();
        if *count >= cap {
            debug!("leaving {element} in place: removal cap reached");
            return Some(AffectedElement::untouched(
                element,
                index,
                selector_text.to_owned(),
            ));
        }
        if let Err(err) = host.remove_node(element) {
            warn!("could not remove {element} for '{selector_text}': {err}");
            return None;
        }
        *count = count.saturating_add(1);
        if *count >= cap {
            error!("{element} was removed {cap} times; further re-insertions are left in place");
        }
        Some(AffectedElement::removed(
            element,
            index,
            selector_text.to_owned(),
        ))
    }

    fn report_timings(&self) {
        let global =
            self.debug || self.rules.iter().any(|rule| rule.debug == DebugMode::Global);
        let selectors: Vec<&str> = self
            .rules
            .iter()
            .filter(|rule| global || rule.debug == DebugMode::On)
            .map(|rule| rule.selector_text.as_str())
            .collect();
        if selectors.is_empty() {
            return;
        }
        match self.timings.report(&selectors) {
            Ok(json) => info!("extended css timings: {json}"),
            Err(err) => warn!("could not serialize timings: {err}"),
        }
    }
}

/// Stylesheet rules come first, then the rule list; entries sharing a selector are merged.
fn compile_rules(
    style_sheet: Option<&str>,
    css_rules: Option<&[String]>,
    cache: &mut SelectorCache,
) -> Result<Vec<ExtCssRuleData>, ExtCssError> {
    let mut entries: Vec<&str> = Vec::new();
    if let Some(text) = style_sheet {
        let rules = parse_stylesheet(text, cache)?;
        if css_rules.is_none() {
            return Ok(rules);
        }
        entries.push(text);
    }
    entries.extend(css_rules.unwrap_or_default().iter().map(String::as_str));
    let parsed = parse_rules(&entries, cache);
    if !parsed.errors.is_empty() {
        warn!("{} css rule(s) skipped", parsed.errors.len());
    }
    Ok(parsed.rules)
}
