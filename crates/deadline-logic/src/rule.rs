//! Deadline rules: which tasks a rule covers and what deadline it allows.
//!
//! A rule's bounds are always relative to the target's travel time:
//!
//! ```text
//! min = base + extra_grace + travel_multiplier · travel_time
//! max = explicit_max + travel_multiplier · travel_time     (explicit rules)
//!     = min · (1 + random_factor)                          (grace rules)
//! ```
//!
//! A replacement deadline is drawn uniformly from `[min, max]` and rounded
//! to the rule's precision.

use rand::Rng;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::calendar::{format_duration, Calendar, HOUR_SECONDS, MINUTE_SECONDS};
use crate::error::{DeadlineError, Result};
use crate::settings::{TitleMatch, Tunables};
use crate::task::Task;

/// Largest window or grace period a rule accepts, in seconds.
pub const MAX_RULE_SECONDS: f64 = 1.0e12;

/// Largest travel multiplier a rule accepts.
pub const MAX_TRAVEL_MULTIPLIER: f64 = 1.0e3;

// ============================================================================
// PRECISION
// ============================================================================

/// Granularity a replacement deadline is rounded to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    None,
    Seconds,
    #[default]
    Minutes,
    Hours,
    /// Calendar days, not 86400 s.
    Days,
}

impl Precision {
    /// Rounding unit in seconds; `None` for no rounding.
    pub fn unit(self, calendar: &Calendar) -> Option<f64> {
        match self {
            Precision::None => None,
            Precision::Seconds => Some(1.0),
            Precision::Minutes => Some(MINUTE_SECONDS),
            Precision::Hours => Some(HOUR_SECONDS),
            Precision::Days => Some(calendar.day_seconds),
        }
    }

    /// Round to the nearest multiple of the unit.
    pub fn round(self, value: f64, calendar: &Calendar) -> f64 {
        match self.unit(calendar) {
            Some(unit) => (value / unit).round() * unit,
            None => value,
        }
    }

    /// Round to the nearest multiple of the unit that lies inside `bounds`.
    /// When no multiple fits, the plain nearest multiple is returned even
    /// though it falls outside `bounds`.
    pub fn round_within(self, value: f64, bounds: &DeadlineBounds, calendar: &Calendar) -> f64 {
        let Some(unit) = self.unit(calendar) else {
            return value;
        };
        let rounded = (value / unit).round() * unit;
        if bounds.contains(rounded) {
            return rounded;
        }
        let candidate = if rounded < bounds.min {
            (bounds.min / unit).ceil() * unit
        } else {
            (bounds.max / unit).floor() * unit
        };
        if bounds.contains(candidate) {
            candidate
        } else {
            rounded
        }
    }
}

// ============================================================================
// BOUNDS
// ============================================================================

/// How a rule derives its minimum and maximum deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Fixed window in seconds, before travel time.
    Explicit { min: f64, max: f64 },
    /// Flat grace period; the maximum follows from the random factor.
    Grace { grace: f64 },
}

/// Acceptable deadline window for one task under one rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadlineBounds {
    pub min: f64,
    pub max: f64,
}

impl DeadlineBounds {
    pub fn contains(&self, deadline: f64) -> bool {
        deadline >= self.min && deadline <= self.max
    }
}

// ============================================================================
// RULE
// ============================================================================

#[derive(Debug, Clone)]
pub struct Rule {
    kinds: Vec<String>,
    titles: Vec<Regex>,
    policy: BoundsPolicy,
    travel_multiplier: f64,
    precision: Precision,
}

impl Rule {
    /// Build a rule, compiling its title patterns.
    ///
    /// Fails on an invalid pattern, a number outside its allowed range, or an
    /// explicit window whose minimum exceeds its maximum.
    pub fn new(
        kinds: Vec<String>,
        titles: &[String],
        title_match: TitleMatch,
        policy: BoundsPolicy,
        travel_multiplier: f64,
        precision: Precision,
    ) -> Result<Self> {
        let in_range = |v: f64| (0.0..=MAX_RULE_SECONDS).contains(&v);
        match policy {
            BoundsPolicy::Explicit { min, max } => {
                if !in_range(min) || !in_range(max) {
                    return Err(DeadlineError::InvalidRule(format!(
                        "deadline window must lie within [0, {}], got [{}, {}]",
                        MAX_RULE_SECONDS, min, max
                    )));
                }
                if min > max {
                    return Err(DeadlineError::InvalidRule(format!(
                        "minimum deadline {} exceeds maximum {}",
                        min, max
                    )));
                }
            }
            BoundsPolicy::Grace { grace } => {
                if !in_range(grace) {
                    return Err(DeadlineError::InvalidRule(format!(
                        "grace period must lie within [0, {}], got {}",
                        MAX_RULE_SECONDS, grace
                    )));
                }
            }
        }
        if !(0.0..=MAX_TRAVEL_MULTIPLIER).contains(&travel_multiplier) {
            return Err(DeadlineError::InvalidRule(format!(
                "travel multiplier must lie within [0, {}], got {}",
                MAX_TRAVEL_MULTIPLIER, travel_multiplier
            )));
        }

        let titles = titles
            .iter()
            .map(|t| compile_title(t, title_match))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kinds,
            titles,
            policy,
            travel_multiplier,
            precision,
        })
    }

    /// Fixed-window rule for a single task kind, no title constraint.
    pub fn explicit(
        kind: &str,
        min: f64,
        max: f64,
        travel_multiplier: f64,
        precision: Precision,
    ) -> Result<Self> {
        Self::new(
            vec![kind.to_string()],
            &[],
            TitleMatch::default(),
            BoundsPolicy::Explicit { min, max },
            travel_multiplier,
            precision,
        )
    }

    /// Grace-period rule for a single task kind, no title constraint.
    pub fn grace(kind: &str, grace: f64, travel_multiplier: f64, precision: Precision) -> Result<Self> {
        Self::new(
            vec![kind.to_string()],
            &[],
            TitleMatch::default(),
            BoundsPolicy::Grace { grace },
            travel_multiplier,
            precision,
        )
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn policy(&self) -> BoundsPolicy {
        self.policy
    }

    pub fn travel_multiplier(&self) -> f64 {
        self.travel_multiplier
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Kind must be listed (when any are listed); title must match one
    /// pattern (when any are given).
    pub fn matches(&self, task: &Task) -> bool {
        let kind_ok = self.kinds.is_empty()
            || self.kinds.iter().any(|k| k.eq_ignore_ascii_case(&task.kind));
        if !kind_ok {
            return false;
        }
        self.titles.is_empty() || self.titles.iter().any(|re| re.is_match(&task.title))
    }

    fn travel_term(&self, travel_time: f64) -> f64 {
        self.travel_multiplier * travel_time.max(0.0)
    }

    pub fn min_deadline(&self, travel_time: f64, tunables: &Tunables) -> f64 {
        let base = match self.policy {
            BoundsPolicy::Explicit { min, .. } => min,
            BoundsPolicy::Grace { grace } => grace,
        };
        base + tunables.extra_grace + self.travel_term(travel_time)
    }

    /// Never below [`Rule::min_deadline`], even when extra grace pushes the
    /// minimum past an explicit maximum.
    pub fn max_deadline(&self, travel_time: f64, tunables: &Tunables) -> f64 {
        let min = self.min_deadline(travel_time, tunables);
        match self.policy {
            BoundsPolicy::Explicit { max, .. } => (max + self.travel_term(travel_time)).max(min),
            BoundsPolicy::Grace { .. } => min * (1.0 + tunables.random_factor),
        }
    }

    pub fn bounds(&self, travel_time: f64, tunables: &Tunables) -> DeadlineBounds {
        DeadlineBounds {
            min: self.min_deadline(travel_time, tunables),
            max: self.max_deadline(travel_time, tunables),
        }
    }

    pub fn needs_adjustment(&self, task: &Task, travel_time: f64, tunables: &Tunables) -> bool {
        !self.bounds(travel_time, tunables).contains(task.deadline)
    }

    /// Draw a deadline from `bounds` and round it to this rule's precision.
    ///
    /// A degenerate window returns its single value without touching `rng`,
    /// as does a window whose maximum is not finite.
    pub fn proposed_deadline<R: Rng>(
        &self,
        bounds: &DeadlineBounds,
        calendar: &Calendar,
        rng: &mut R,
    ) -> f64 {
        if bounds.min >= bounds.max || !bounds.max.is_finite() {
            return bounds.min;
        }
        let drawn = rng.gen_range(bounds.min..=bounds.max);
        self.precision.round_within(drawn, bounds, calendar)
    }

    /// One-line summary for logs.
    pub fn describe(&self, calendar: &Calendar) -> String {
        let kinds = if self.kinds.is_empty() {
            "*".to_string()
        } else {
            self.kinds.join(", ")
        };
        let bounds = match self.policy {
            BoundsPolicy::Explicit { min, max } => format!(
                "Deadline = '{}'..'{}'",
                format_duration(min, calendar),
                format_duration(max, calendar)
            ),
            BoundsPolicy::Grace { grace } => {
                format!("GracePeriod = '{}'", format_duration(grace, calendar))
            }
        };
        let mut out = format!(
            "Kinds = {{ {} }} {} TravelTimeMultiplier = {:.1} Precision = {:?}",
            kinds, bounds, self.travel_multiplier, self.precision
        );
        if !self.titles.is_empty() {
            let titles: Vec<&str> = self.titles.iter().map(|r| r.as_str()).collect();
            out.push_str(&format!(" Titles = {{ {} }}", titles.join(" | ")));
        }
        out
    }
}

fn compile_title(pattern: &str, mode: TitleMatch) -> Result<Regex> {
    let source = if mode.anchored {
        format!("^(?:{})$", pattern)
    } else {
        pattern.to_string()
    };
    RegexBuilder::new(&source)
        .case_insensitive(mode.case_insensitive)
        .build()
        .map_err(|source| DeadlineError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tunables() -> Tunables {
        Tunables {
            random_factor: 0.5,
            extra_grace: 0.0,
            application_chance: 1.0,
            calendar: Calendar::default(),
        }
    }

    fn titled(kinds: &[&str], titles: &[&str], mode: TitleMatch) -> Rule {
        Rule::new(
            kinds.iter().map(|s| s.to_string()).collect(),
            &titles.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            mode,
            BoundsPolicy::Grace { grace: 100.0 },
            1.0,
            Precision::Minutes,
        )
        .unwrap()
    }

    #[test]
    fn test_matches_kind_only() {
        let rule = titled(&["SurveyContract"], &[], TitleMatch::default());
        assert!(rule.matches(&Task::new(1, "SurveyContract", "anything", 0.0)));
        assert!(rule.matches(&Task::new(1, "surveycontract", "anything", 0.0)));
        assert!(!rule.matches(&Task::new(1, "PartTest", "anything", 0.0)));
    }

    #[test]
    fn test_titles_only_restrict_kind_match() {
        let rule = titled(&["PartTest"], &["Mun"], TitleMatch::default());
        assert!(rule.matches(&Task::new(1, "PartTest", "Test on the Mun", 0.0)));
        assert!(!rule.matches(&Task::new(1, "PartTest", "Test at home", 0.0)));
        // Title match never substitutes for a missing kind
        assert!(!rule.matches(&Task::new(1, "Survey", "Test on the Mun", 0.0)));
    }

    #[test]
    fn test_empty_kinds_gated_by_titles() {
        let rule = titled(&[], &["^Rescue", "Recover"], TitleMatch::default());
        assert!(rule.matches(&Task::new(1, "Anything", "Rescue Bob", 0.0)));
        assert!(rule.matches(&Task::new(1, "Other", "Please Recover it", 0.0)));
        assert!(!rule.matches(&Task::new(1, "Other", "Please rescue Bob", 0.0)));
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        let rule = titled(&[], &[], TitleMatch::default());
        assert!(rule.matches(&Task::new(1, "X", "Y", 0.0)));
    }

    #[test]
    fn test_title_match_modes() {
        let insensitive = TitleMatch {
            case_insensitive: true,
            anchored: false,
        };
        let rule = titled(&[], &["rescue"], insensitive);
        assert!(rule.matches(&Task::new(1, "X", "RESCUE Bob", 0.0)));

        let anchored = TitleMatch {
            case_insensitive: false,
            anchored: true,
        };
        let rule = titled(&[], &["Rescue \\w+"], anchored);
        assert!(rule.matches(&Task::new(1, "X", "Rescue Bob", 0.0)));
        assert!(!rule.matches(&Task::new(1, "X", "Rescue Bob now", 0.0)));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Rule::new(
            vec![],
            &["(unclosed".to_string()],
            TitleMatch::default(),
            BoundsPolicy::Grace { grace: 1.0 },
            1.0,
            Precision::None,
        )
        .unwrap_err();
        assert!(matches!(err, DeadlineError::InvalidPattern { .. }));
    }

    #[test]
    fn test_inverted_window_rejected() {
        assert!(Rule::explicit("X", 200.0, 100.0, 1.0, Precision::None).is_err());
        assert!(Rule::explicit("X", -1.0, 100.0, 1.0, Precision::None).is_err());
        assert!(Rule::grace("X", 100.0, -1.0, Precision::None).is_err());
    }

    #[test]
    fn test_explicit_bounds_with_travel() {
        let rule = Rule::explicit("X", 1_000.0, 2_000.0, 2.0, Precision::None).unwrap();
        let b = rule.bounds(500.0, &tunables());
        assert_eq!(b.min, 2_000.0);
        assert_eq!(b.max, 3_000.0);
    }

    #[test]
    fn test_grace_bounds() {
        let rule = Rule::grace("X", 1_000.0, 1.0, Precision::None).unwrap();
        let t = Tunables {
            extra_grace: 500.0,
            ..tunables()
        };
        let b = rule.bounds(1_500.0, &t);
        assert_eq!(b.min, 3_000.0);
        assert_eq!(b.max, 4_500.0);
    }

    #[test]
    fn test_extra_grace_never_inverts_explicit_window() {
        let rule = Rule::explicit("X", 100.0, 200.0, 0.0, Precision::None).unwrap();
        let t = Tunables {
            extra_grace: 1_000.0,
            ..tunables()
        };
        let b = rule.bounds(0.0, &t);
        assert!(b.min <= b.max);
        assert_eq!(b.min, 1_100.0);
    }

    #[test]
    fn test_min_monotonic_in_travel_multiplier() {
        let mut last = f64::NEG_INFINITY;
        for m in [0.0, 0.5, 1.0, 2.0, 3.0] {
            let rule = Rule::grace("X", 100.0, m, Precision::None).unwrap();
            let min = rule.min_deadline(10_000.0, &tunables());
            assert!(min >= last);
            last = min;
        }
    }

    #[test]
    fn test_needs_adjustment() {
        let rule = Rule::explicit("X", 1_000.0, 2_000.0, 0.0, Precision::None).unwrap();
        let t = tunables();
        assert!(rule.needs_adjustment(&Task::new(1, "X", "", 999.0), 0.0, &t));
        assert!(!rule.needs_adjustment(&Task::new(1, "X", "", 1_000.0), 0.0, &t));
        assert!(!rule.needs_adjustment(&Task::new(1, "X", "", 2_000.0), 0.0, &t));
        assert!(rule.needs_adjustment(&Task::new(1, "X", "", 2_001.0), 0.0, &t));
    }

    #[test]
    fn test_degenerate_window_consumes_no_randomness() {
        let rule = Rule::explicit("X", 21_600.0, 21_600.0, 1.0, Precision::Hours).unwrap();
        let bounds = rule.bounds(0.0, &tunables());
        let mut rng = StdRng::seed_from_u64(7);
        let mut untouched = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let d = rule.proposed_deadline(&bounds, &Calendar::default(), &mut rng);
            assert_eq!(d, 21_600.0);
        }
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn test_unbounded_window_returns_min() {
        let bounds = DeadlineBounds {
            min: 1_000.0,
            max: f64::INFINITY,
        };
        let rule = Rule::grace("X", 1_000.0, 0.0, Precision::Minutes).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut untouched = StdRng::seed_from_u64(7);
        assert_eq!(rule.proposed_deadline(&bounds, &Calendar::default(), &mut rng), 1_000.0);
        let nan = DeadlineBounds {
            min: 1_000.0,
            max: f64::NAN,
        };
        assert_eq!(rule.proposed_deadline(&nan, &Calendar::default(), &mut rng), 1_000.0);
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn test_oversized_values_rejected() {
        assert!(Rule::grace("X", 1.5e308, 1.0, Precision::None).is_err());
        assert!(Rule::explicit("X", 0.0, 1.0e300, 1.0, Precision::None).is_err());
        assert!(Rule::grace("X", 100.0, 1.0e300, Precision::None).is_err());
        assert!(Rule::grace("X", MAX_RULE_SECONDS, MAX_TRAVEL_MULTIPLIER, Precision::None).is_ok());
    }

    #[test]
    fn test_proposed_within_bounds_and_rounded() {
        let cal = Calendar::default();
        let mut rng = StdRng::seed_from_u64(42);
        for precision in [
            Precision::Seconds,
            Precision::Minutes,
            Precision::Hours,
            Precision::Days,
        ] {
            let rule = Rule::explicit("X", 50_000.0, 400_000.0, 0.0, precision).unwrap();
            let bounds = rule.bounds(0.0, &tunables());
            let unit = precision.unit(&cal).unwrap();
            for _ in 0..500 {
                let d = rule.proposed_deadline(&bounds, &cal, &mut rng);
                assert!(bounds.contains(d), "{:?}: {} outside bounds", precision, d);
                let ratio = d / unit;
                assert_eq!(ratio, ratio.round(), "{:?}: {} not a multiple", precision, d);
            }
        }
    }

    #[test]
    fn test_no_precision_keeps_draw() {
        let rule = Rule::explicit("X", 0.5, 0.7, 0.0, Precision::None).unwrap();
        let bounds = rule.bounds(0.0, &tunables());
        let mut rng = StdRng::seed_from_u64(1);
        let d = rule.proposed_deadline(&bounds, &Calendar::default(), &mut rng);
        assert!(bounds.contains(d));
    }

    #[test]
    fn test_round_within_pulls_into_bounds() {
        let cal = Calendar::default();
        let bounds = DeadlineBounds {
            min: 3_700.0,
            max: 7_300.0,
        };
        // 3_750 rounds to 3_600 which is below min; nearest in-range hour is 7_200
        assert_eq!(Precision::Hours.round_within(3_750.0, &bounds, &cal), 7_200.0);
        // No whole hour between 3_700 and 3_800: still a whole hour
        let narrow = DeadlineBounds {
            min: 3_700.0,
            max: 3_800.0,
        };
        let rounded = Precision::Hours.round_within(3_750.0, &narrow, &cal);
        assert_eq!(rounded, 3_600.0);
        assert_eq!((rounded / 3_600.0).fract(), 0.0);
    }

    #[test]
    fn test_days_use_calendar_day_length() {
        let cal = Calendar::default();
        assert_eq!(Precision::Days.round(30_000.0, &cal), 21_600.0);
        assert_eq!(Precision::Days.round(30_000.0, &Calendar::earth()), 0.0);
    }

    #[test]
    fn test_describe() {
        let rule = Rule::grace("SurveyContract", 21_600.0, 1.0, Precision::Hours).unwrap();
        let s = rule.describe(&Calendar::default());
        assert!(s.contains("SurveyContract"));
        assert!(s.contains("1 d 0 h 0 m"));
    }
}
