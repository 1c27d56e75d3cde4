//! Extended CSS: apply stylesheets whose selectors go beyond standard CSS, and keep the
//! resulting styles applied while the page changes.
//!
//! ```text
//! stylesheet text -> rules -> matcher -> apply/revert diff -> inline styles
//!        ^                                                        |
//!        +------------- throttled re-apply <- mutations <---------+
//! ```
//!
//! Everything runs on the caller's thread. The host owns the event loop: it reports
//! mutations with [`ExtendedCss::process_mutations`] and runs due passes with
//! [`ExtendedCss::run_scheduled`].

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod affected;
mod changes;
mod config;
mod engine;
mod error;
mod events;
mod protection;
mod schedule;
mod styled;
mod time;
mod timings;

pub use affected::{AffectedElement, StyleApplication};
pub use changes::{ChangeNotifier, DocumentChangeNotifier};
pub use config::{
    BeforeStyleApplied, DEFAULT_PROTECTION_CAP, DEFAULT_THROTTLE_INTERVAL, EngineSettings,
    ExtCssConfiguration,
};
pub use engine::{EngineState, ExtendedCss, ValidationResult};
pub use error::ExtCssError;
pub use events::{HOVER_EVENTS, InputEvent};
pub use time::{Clock, ManualClock, SystemClock};
pub use timings::RuleTiming;

pub use css_ext_selector::{SelectorParseError, parse_selector_list};
pub use css_ext_stylesheet::{DebugMode, ExtCssRuleData};
