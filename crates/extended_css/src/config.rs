//! Engine configuration.
//!
//! [`EngineSettings`] holds the tunables and can be read from the environment;
//! [`ExtCssConfiguration`] bundles them with the rule sources and host hooks.

use core::time::Duration;
use std::env;
use std::rc::Rc;

use crate::affected::StyleApplication;
use crate::changes::ChangeNotifier;
use crate::time::Clock;

/// Default minimum spacing between two re-apply passes.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(150);

/// Default number of times a style is re-asserted, or an element re-removed, before the
/// engine gives up on it.
pub const DEFAULT_PROTECTION_CAP: usize = 50;

/// Tunables of one engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub throttle_interval: Duration,
    /// At least 1.
    pub protection_cap: usize,
    /// Emit timing reports for every rule.
    pub debug: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL, DEFAULT_PROTECTION_CAP)
    }
}

impl EngineSettings {
    #[must_use]
    pub const fn new(throttle_interval: Duration, protection_cap: usize) -> Self {
        let cap = if protection_cap < 1 { 1 } else { protection_cap };
        Self {
            throttle_interval,
            protection_cap: cap,
            debug: false,
        }
    }

    /// Load settings from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `EXTCSS_THROTTLE_MS`: Minimum re-apply interval in milliseconds (default: 150)
    /// - `EXTCSS_PROTECTION_CAP`: Restorations per element before giving up (default: 50)
    /// - `EXTCSS_DEBUG`: Set to "1" to log timing reports for all rules (default: disabled)
    #[must_use]
    pub fn from_env() -> Self {
        let throttle_interval = env::var("EXTCSS_THROTTLE_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map_or(DEFAULT_THROTTLE_INTERVAL, Duration::from_millis);
        let protection_cap = env::var("EXTCSS_PROTECTION_CAP")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PROTECTION_CAP);
        let debug = env::var("EXTCSS_DEBUG").ok().as_deref() == Some("1");
        Self {
            debug,
            ..Self::new(throttle_interval, protection_cap)
        }
    }
}

/// Hook run before a rule touches an element. Return `None` to leave the element alone.
pub type BeforeStyleApplied = Box<dyn Fn(StyleApplication) -> Option<StyleApplication>>;

/// Everything needed to construct an engine. At least one of `style_sheet` and `css_rules`
/// must be set.
#[derive(Default)]
pub struct ExtCssConfiguration {
    /// A whole stylesheet. Any invalid rule fails construction.
    pub style_sheet: Option<String>,
    /// Independent rules. Invalid ones are logged and skipped.
    pub css_rules: Option<Vec<String>>,
    pub before_style_applied: Option<BeforeStyleApplied>,
    /// Log timing reports for every rule.
    pub debug: bool,
    pub settings: EngineSettings,
    /// Defaults to [`SystemClock`](crate::SystemClock).
    pub clock: Option<Rc<dyn Clock>>,
    /// Defaults to [`DocumentChangeNotifier`](crate::DocumentChangeNotifier).
    pub notifier: Option<Box<dyn ChangeNotifier>>,
}

impl ExtCssConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_style_sheet(mut self, style_sheet: &str) -> Self {
        self.style_sheet = Some(style_sheet.to_owned());
        self
    }

    #[must_use]
    pub fn with_css_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.css_rules = Some(rules.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_before_style_applied<F>(mut self, callback: F) -> Self
    where
        F: Fn(StyleApplication) -> Option<StyleApplication> + 'static,
    {
        self.before_style_applied = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}
