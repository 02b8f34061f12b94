//! Global tunables, created once per session and passed by reference.

use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::logging::LogLevel;

pub const DEFAULT_RANDOM_FACTOR: f64 = 0.5;
pub const DEFAULT_HOHMANN_MULTIPLIER: f64 = 1.2;
pub const MAX_EXTRA_GRACE_DAYS: u32 = 500;

/// How rule title patterns are applied to task titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMatch {
    /// Ignore letter case when matching.
    #[serde(default)]
    pub case_insensitive: bool,
    /// Require the pattern to match the whole title instead of any substring.
    #[serde(default)]
    pub anchored: bool,
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// When false the engine never touches a deadline.
    pub mod_enabled: bool,
    /// How much longer than the minimum a grace-style deadline may be
    /// (0.5 = up to 50% longer). Clamped to [0, 1].
    pub random_factor: f64,
    /// Flat number of calendar days added to every minimum deadline.
    pub extra_grace_days: u32,
    /// Inflates the idealized Hohmann transfer time.
    pub hohmann_multiplier: f64,
    /// Probability that an out-of-bounds deadline is actually replaced.
    pub application_chance: f64,
    /// Shorthand for `log_level = debug`.
    pub debug_mode: bool,
    /// Explicit verbosity; wins over `debug_mode` when set.
    pub log_level: Option<LogLevel>,
    pub calendar: Calendar,
    pub title_match: TitleMatch,
    /// Fixed seed for the rule set's generator; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mod_enabled: true,
            random_factor: DEFAULT_RANDOM_FACTOR,
            extra_grace_days: 0,
            hohmann_multiplier: DEFAULT_HOHMANN_MULTIPLIER,
            application_chance: 1.0,
            debug_mode: false,
            log_level: None,
            calendar: Calendar::default(),
            title_match: TitleMatch::default(),
            seed: None,
        }
    }
}

impl Settings {
    /// Clamp every tunable into its documented range, replacing values that
    /// cannot be clamped (NaN, non-positive day length) with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();

        self.random_factor = clamp_unit(self.random_factor, defaults.random_factor);
        self.application_chance = clamp_unit(self.application_chance, defaults.application_chance);
        self.extra_grace_days = self.extra_grace_days.min(MAX_EXTRA_GRACE_DAYS);
        if !(self.hohmann_multiplier >= 0.0 && self.hohmann_multiplier.is_finite()) {
            self.hohmann_multiplier = defaults.hohmann_multiplier;
        }
        if !(self.calendar.day_seconds > 0.0 && self.calendar.day_seconds.is_finite()) {
            self.calendar.day_seconds = defaults.calendar.day_seconds;
        }
        if !(self.calendar.year_days > 0.0 && self.calendar.year_days.is_finite()) {
            self.calendar.year_days = defaults.calendar.year_days;
        }
        self
    }

    pub fn effective_log_level(&self) -> LogLevel {
        match self.log_level {
            Some(level) => level,
            None if self.debug_mode => LogLevel::Debug,
            None => LogLevel::Important,
        }
    }

    pub fn extra_grace_seconds(&self) -> f64 {
        self.calendar.days_to_seconds(self.extra_grace_days as f64)
    }

    pub fn tunables(&self) -> Tunables {
        Tunables {
            random_factor: self.random_factor,
            extra_grace: self.extra_grace_seconds(),
            application_chance: self.application_chance,
            calendar: self.calendar,
        }
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The slice of [`Settings`] that rule bound computation reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tunables {
    pub random_factor: f64,
    /// Extra grace in seconds.
    pub extra_grace: f64,
    pub application_chance: f64,
    pub calendar: Calendar,
}

impl Default for Tunables {
    fn default() -> Self {
        Settings::default().tunables()
    }
}
