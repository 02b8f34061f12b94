//! Configuration records: rules, travel-time overrides, settings.
//!
//! The host hands over a JSON document shaped like:
//!
//! ```json
//! {
//!   "settings": { "random_factor": 0.5, "extra_grace_days": 0 },
//!   "rules": [
//!     { "kinds": "SurveyContract, PartTest", "min_deadline": 21600,
//!       "max_deadline": 21600, "precision": "hours" },
//!     { "kinds": ["ExplorationContract"], "grace_days": 10, "travel_multiplier": 2 }
//!   ],
//!   "travel_times": [ { "name": "Jool", "travel_days": 1200 } ]
//! }
//! ```
//!
//! Numeric fields are lenient: numbers and numeric strings are accepted,
//! anything else falls back to the field's default instead of failing the
//! whole document.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::calendar::Calendar;
use crate::error::Result;
use crate::logging::{LogLevel, Logger};
use crate::rule::{BoundsPolicy, Precision, Rule};
use crate::settings::{Settings, TitleMatch, MAX_EXTRA_GRACE_DAYS};
use crate::travel_time::TravelOverride;

/// Grace period of a rule that names none: one calendar day.
pub const DEFAULT_GRACE_DAYS: f64 = 1.0;

pub const DEFAULT_TRAVEL_MULTIPLIER: f64 = 1.0;

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub settings: SettingsRecord,
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub travel_times: Vec<TravelTimeRecord>,
}

impl ConfigDocument {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Settings with defaults filled in and every tunable clamped.
    pub fn settings(&self) -> Settings {
        self.settings.resolve()
    }

    /// Build every rule in order; rules that fail to build are logged and
    /// left out.
    pub fn build_rules(&self, settings: &Settings, logger: &Logger) -> Vec<Rule> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for (i, record) in self.rules.iter().enumerate() {
            match record.build(&settings.calendar, settings.title_match) {
                Ok(rule) => {
                    logger.important(format_args!(
                        "Added rule #{} from config: {}",
                        rules.len(),
                        rule.describe(&settings.calendar)
                    ));
                    rules.push(rule);
                }
                Err(e) => logger.error(format_args!("Skipping rule record #{}: {}", i, e)),
            }
        }
        rules
    }

    pub fn overrides(&self, calendar: &Calendar) -> Vec<TravelOverride> {
        self.travel_times
            .iter()
            .map(|r| r.to_override(calendar))
            .collect()
    }
}

// ============================================================================
// RULE RECORD
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleRecord {
    /// Task kinds; a single string may list several separated by commas or
    /// spaces.
    #[serde(default, alias = "types", deserialize_with = "string_list")]
    pub kinds: Vec<String>,
    #[serde(default, deserialize_with = "string_list_verbatim")]
    pub titles: Vec<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_deadline: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_deadline: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_days: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_days: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grace_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grace_days: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub travel_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "lenient_precision")]
    pub precision: Option<Precision>,
}

impl RuleRecord {
    /// Explicit window when any min/max field is present, grace otherwise.
    /// A window given only one end is a fixed deadline at that end.
    pub fn bounds_policy(&self, calendar: &Calendar) -> BoundsPolicy {
        let min = self
            .min_deadline
            .or_else(|| self.min_days.map(|d| calendar.days_to_seconds(d)));
        let max = self
            .max_deadline
            .or_else(|| self.max_days.map(|d| calendar.days_to_seconds(d)));
        match (min, max) {
            (Some(min), Some(max)) => BoundsPolicy::Explicit { min, max },
            (Some(v), None) | (None, Some(v)) => BoundsPolicy::Explicit { min: v, max: v },
            (None, None) => {
                let grace = self.grace_time.unwrap_or_else(|| {
                    calendar.days_to_seconds(self.grace_days.unwrap_or(DEFAULT_GRACE_DAYS))
                });
                BoundsPolicy::Grace { grace }
            }
        }
    }

    pub fn build(&self, calendar: &Calendar, title_match: TitleMatch) -> Result<Rule> {
        Rule::new(
            self.kinds.clone(),
            &self.titles,
            title_match,
            self.bounds_policy(calendar),
            self.travel_multiplier
                .filter(|m| *m >= 0.0)
                .unwrap_or(DEFAULT_TRAVEL_MULTIPLIER),
            self.precision.unwrap_or_default(),
        )
    }
}

// ============================================================================
// TRAVEL TIME RECORD
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TravelTimeRecord {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub travel_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub travel_days: Option<f64>,
}

impl TravelTimeRecord {
    /// Seconds win over days; a record with neither overrides to 0.
    pub fn to_override(&self, calendar: &Calendar) -> TravelOverride {
        let seconds = self
            .travel_time
            .or_else(|| self.travel_days.map(|d| calendar.days_to_seconds(d)))
            .unwrap_or(0.0);
        TravelOverride {
            body: self.name.clone(),
            seconds,
        }
    }
}

// ============================================================================
// SETTINGS RECORD
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsRecord {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub mod_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub random_factor: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub extra_grace_days: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hohmann_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub application_chance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub debug_mode: Option<bool>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub log_level: Option<LogLevel>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub day_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub year_days: Option<f64>,
    #[serde(default)]
    pub title_match: Option<TitleMatch>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub seed: Option<u64>,
}

impl SettingsRecord {
    pub fn resolve(&self) -> Settings {
        let d = Settings::default();
        Settings {
            mod_enabled: self.mod_enabled.unwrap_or(d.mod_enabled),
            random_factor: self.random_factor.unwrap_or(d.random_factor),
            extra_grace_days: self
                .extra_grace_days
                .filter(|v| *v >= 0.0)
                .map(|v| v.round().min(MAX_EXTRA_GRACE_DAYS as f64) as u32)
                .unwrap_or(d.extra_grace_days),
            hohmann_multiplier: self.hohmann_multiplier.unwrap_or(d.hohmann_multiplier),
            application_chance: self.application_chance.unwrap_or(d.application_chance),
            debug_mode: self.debug_mode.unwrap_or(d.debug_mode),
            log_level: self.log_level,
            calendar: Calendar {
                day_seconds: self.day_seconds.unwrap_or(d.calendar.day_seconds),
                year_days: self.year_days.unwrap_or(d.calendar.year_days),
            },
            title_match: self.title_match.unwrap_or(d.title_match),
            seed: self.seed,
        }
        .sanitized()
    }
}

// ============================================================================
// LENIENT FIELDS
// ============================================================================

fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<f64>, D::Error> {
    let value = Value::deserialize(de)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn lenient_u64<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<u64>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<bool>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_enum<'de, D, T>(de: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(de)?;
    let value = match value {
        Value::String(s) => Value::String(s.trim().to_ascii_lowercase()),
        other => other,
    };
    Ok(serde_json::from_value(value).ok())
}

fn lenient_precision<'de, D: Deserializer<'de>>(
    de: D,
) -> std::result::Result<Option<Precision>, D::Error> {
    lenient_enum(de)
}

/// Accepts a list of strings or one string, splitting entries on commas and
/// whitespace.
fn string_list<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<String>, D::Error> {
    let raw = string_list_verbatim(de)?;
    Ok(raw
        .iter()
        .flat_map(|s| s.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Accepts a list of strings or one string, kept as-is.
fn string_list_verbatim<'de, D: Deserializer<'de>>(
    de: D,
) -> std::result::Result<Vec<String>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
