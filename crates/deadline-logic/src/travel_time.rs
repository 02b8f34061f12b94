//! Per-body one-way travel time from the home world.
//!
//! Built once per session from the body catalog plus explicit overrides and
//! read-only afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bodies::{Body, BodyCatalog};
use crate::calendar::format_duration;
use crate::error::{DeadlineError, Result};
use crate::logging::Logger;
use crate::orbit::{hohmann_transfer_time, synodic_period};
use crate::settings::Settings;

/// Divisor applied to a moon's orbital period for a hop from the home planet.
pub const LOCAL_HOP_DIVISOR: f64 = 5.0;

/// How a cache entry got its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelTimeSource {
    /// The home world itself.
    Home,
    /// The star: one home-planet year.
    Star,
    /// Moon of the home planet: a fraction of its own period.
    LocalHop,
    /// Wait for a window, then a Hohmann transfer.
    Transfer,
    /// Explicit value from configuration.
    Override,
    /// The orbit computation failed; treated as no travel.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelTimeEntry {
    pub seconds: f64,
    pub source: TravelTimeSource,
}

/// Explicit travel time for one body, applied after bulk computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelOverride {
    pub body: String,
    pub seconds: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TravelTimeCache {
    entries: HashMap<String, TravelTimeEntry>,
    /// Catalog order, for reporting.
    order: Vec<String>,
}

impl TravelTimeCache {
    /// Compute every body's travel time, then apply `overrides`.
    ///
    /// Overrides naming a body outside the catalog are logged and skipped.
    pub fn build(
        catalog: &BodyCatalog,
        overrides: &[TravelOverride],
        settings: &Settings,
        logger: &Logger,
    ) -> Self {
        let calendar = &settings.calendar;
        let mut cache = Self {
            entries: HashMap::with_capacity(catalog.len()),
            order: Vec::with_capacity(catalog.len()),
        };

        for body in catalog.bodies() {
            let entry = match estimate(catalog, body, settings.hohmann_multiplier) {
                Ok(entry) => entry,
                Err(e) => {
                    logger.error(format_args!(
                        "Could not estimate travel time for {}: {}",
                        body.name, e
                    ));
                    TravelTimeEntry {
                        seconds: 0.0,
                        source: TravelTimeSource::Fallback,
                    }
                }
            };
            logger.important(format_args!(
                "Travel time for {} is {}.",
                body.name,
                format_duration(entry.seconds, calendar)
            ));
            cache.order.push(body.name.clone());
            cache.entries.insert(body.name.clone(), entry);
        }

        for ov in overrides {
            match cache.entries.get_mut(&ov.body) {
                Some(entry) => {
                    *entry = TravelTimeEntry {
                        seconds: ov.seconds.max(0.0),
                        source: TravelTimeSource::Override,
                    };
                    logger.important(format_args!(
                        "Overriding travel time for {} to be {}.",
                        ov.body,
                        format_duration(entry.seconds, calendar)
                    ));
                }
                None => logger.error(format_args!(
                    "Travel time override for unknown body '{}' ignored.",
                    ov.body
                )),
            }
        }

        cache
    }

    /// Travel time to `body`; 0 when no body is given.
    pub fn travel_time(&self, body: Option<&str>) -> Result<f64> {
        match body {
            None => Ok(0.0),
            Some(name) => self
                .entries
                .get(name)
                .map(|e| e.seconds)
                .ok_or_else(|| DeadlineError::UnknownBody(name.to_string())),
        }
    }

    pub fn entry(&self, body: &str) -> Option<&TravelTimeEntry> {
        self.entries.get(body)
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TravelTimeEntry)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|e| (name.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Estimated one-way travel time from home to `body`, before overrides.
pub fn estimate(
    catalog: &BodyCatalog,
    body: &Body,
    hohmann_multiplier: f64,
) -> Result<TravelTimeEntry> {
    let home = catalog.home();
    let home_planet = catalog.home_planet();

    if body.name == home.name {
        return Ok(TravelTimeEntry {
            seconds: 0.0,
            source: TravelTimeSource::Home,
        });
    }
    if catalog.is_star(body) {
        return Ok(TravelTimeEntry {
            seconds: home_planet.period.max(0.0),
            source: TravelTimeSource::Star,
        });
    }

    let planet = catalog
        .planet_of(body)
        .ok_or_else(|| DeadlineError::UnknownBody(body.name.clone()))?;

    if planet.name == home_planet.name {
        // The home planet itself only differs from home when home is a moon.
        let hop_period = if body.name == home_planet.name {
            home.period
        } else {
            body.period
        };
        return Ok(TravelTimeEntry {
            seconds: (hop_period / LOCAL_HOP_DIVISOR).max(0.0),
            source: TravelTimeSource::LocalHop,
        });
    }

    let window = synodic_period(home_planet.period, planet.period)?;
    let transfer =
        hohmann_transfer_time(home_planet.radius, planet.radius, catalog.star().grav_param)?;
    Ok(TravelTimeEntry {
        seconds: window + hohmann_multiplier * transfer,
        source: TravelTimeSource::Transfer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use crate::orbit::DEFAULT_STAR_GRAV_PARAM;
    use crate::rule::{Precision, Rule};
    use crate::settings::Tunables;

    fn catalog() -> BodyCatalog {
        BodyCatalog::new(vec![
            Body::star("Sun"),
            Body::new("Home", Some("Sun"), 9_203_545.0, 13_599_840_256.0).with_home(),
            Body::new("Moon", Some("Home"), 138_984.0, 12_000_000.0),
            Body::new("Red", Some("Sun"), 17_315_400.0, 20_726_155_264.0),
            Body::new("RedMoon", Some("Red"), 65_518.0, 3_200_000.0),
            Body::new("Fast", Some("Sun"), 3_600.0, 1_000_000_000.0),
        ])
        .unwrap()
    }

    fn build(overrides: &[TravelOverride]) -> TravelTimeCache {
        TravelTimeCache::build(
            &catalog(),
            overrides,
            &Settings::default(),
            &Logger::new(LogLevel::Silent),
        )
    }

    #[test]
    fn test_home_is_zero() {
        let cache = build(&[]);
        assert_eq!(cache.travel_time(Some("Home")).unwrap(), 0.0);
        assert_eq!(cache.entry("Home").unwrap().source, TravelTimeSource::Home);
    }

    #[test]
    fn test_every_body_non_negative() {
        let cache = build(&[]);
        assert_eq!(cache.len(), 6);
        for (name, entry) in cache.iter() {
            assert!(entry.seconds >= 0.0, "{} has {}", name, entry.seconds);
        }
    }

    #[test]
    fn test_star_is_home_year() {
        let cache = build(&[]);
        assert_eq!(cache.travel_time(Some("Sun")).unwrap(), 9_203_545.0);
    }

    #[test]
    fn test_home_moon_is_fifth_of_period() {
        let cache = build(&[]);
        let t = cache.travel_time(Some("Moon")).unwrap();
        assert!((t - 138_984.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distant_moon_uses_its_planet() {
        let cache = build(&[]);
        let planet = cache.travel_time(Some("Red")).unwrap();
        let moon = cache.travel_time(Some("RedMoon")).unwrap();
        assert_eq!(planet, moon);
        assert_eq!(cache.entry("RedMoon").unwrap().source, TravelTimeSource::Transfer);
    }

    #[test]
    fn test_transfer_formula_for_planet_of_the_star() {
        let cache = build(&[]);
        let expected = synodic_period(9_203_545.0, 3_600.0).unwrap()
            + 1.2
                * hohmann_transfer_time(13_599_840_256.0, 1_000_000_000.0, DEFAULT_STAR_GRAV_PARAM)
                    .unwrap();
        let t = cache.travel_time(Some("Fast")).unwrap();
        assert!((t - expected).abs() < 1e-6);

        // Grace 0, travel multiplier 1: the minimum deadline is the travel time
        let rule = Rule::grace("X", 0.0, 1.0, Precision::None).unwrap();
        let tunables = Tunables {
            extra_grace: 0.0,
            ..Settings::default().tunables()
        };
        assert!((rule.min_deadline(t, &tunables) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_override_wins() {
        let cache = build(&[
            TravelOverride {
                body: "Red".into(),
                seconds: 1_000.0,
            },
            TravelOverride {
                body: "Home".into(),
                seconds: 50.0,
            },
        ]);
        assert_eq!(cache.travel_time(Some("Red")).unwrap(), 1_000.0);
        assert_eq!(cache.entry("Red").unwrap().source, TravelTimeSource::Override);
        assert_eq!(cache.travel_time(Some("Home")).unwrap(), 50.0);
    }

    #[test]
    fn test_override_unknown_body_ignored() {
        let cache = build(&[TravelOverride {
            body: "Nowhere".into(),
            seconds: 1_000.0,
        }]);
        assert_eq!(cache.len(), 6);
        assert!(cache.entry("Nowhere").is_none());
    }

    #[test]
    fn test_negative_override_clamped() {
        let cache = build(&[TravelOverride {
            body: "Red".into(),
            seconds: -10.0,
        }]);
        assert_eq!(cache.travel_time(Some("Red")).unwrap(), 0.0);
    }

    #[test]
    fn test_lookup_absent_and_unknown() {
        let cache = build(&[]);
        assert_eq!(cache.travel_time(None).unwrap(), 0.0);
        assert!(matches!(
            cache.travel_time(Some("Nowhere")),
            Err(DeadlineError::UnknownBody(_))
        ));
    }

    #[test]
    fn test_bad_orbit_falls_back_to_zero() {
        let cat = BodyCatalog::new(vec![
            Body::star("Sun"),
            Body::new("Home", Some("Sun"), 100.0, 1.0e9).with_home(),
            Body::new("Broken", Some("Sun"), 0.0, 1.0e9),
        ])
        .unwrap();
        let cache = TravelTimeCache::build(
            &cat,
            &[],
            &Settings::default(),
            &Logger::new(LogLevel::Silent),
        );
        let entry = cache.entry("Broken").unwrap();
        assert_eq!(entry.seconds, 0.0);
        assert_eq!(entry.source, TravelTimeSource::Fallback);
    }

    #[test]
    fn test_iter_keeps_catalog_order() {
        let cache = build(&[]);
        let names: Vec<&str> = cache.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Sun", "Home", "Moon", "Red", "RedMoon", "Fast"]);
    }

    #[test]
    fn test_home_as_moon() {
        let cat = BodyCatalog::new(vec![
            Body::star("Sun"),
            Body::new("Planet", Some("Sun"), 9_000_000.0, 1.0e10),
            Body::new("Base", Some("Planet"), 100_000.0, 1.0e7).with_home(),
            Body::new("Sister", Some("Planet"), 200_000.0, 2.0e7),
        ])
        .unwrap();
        let planet = estimate(&cat, cat.get("Planet").unwrap(), 1.2).unwrap();
        assert_eq!(planet.source, TravelTimeSource::LocalHop);
        assert!((planet.seconds - 20_000.0).abs() < 1e-9);
        let sister = estimate(&cat, cat.get("Sister").unwrap(), 1.2).unwrap();
        assert!((sister.seconds - 40_000.0).abs() < 1e-9);
    }
}
