//! Deadline engine: main entry point called from host lifecycle events.
//!
//! Owns everything built once per session (travel-time cache, rule set,
//! target resolver) and turns "a task was offered" into zero or more
//! deadline changes plus decision records. No error escapes into the host:
//! failures are logged and the affected task falls back to zero travel time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::bodies::BodyCatalog;
use crate::calendar::format_duration;
use crate::config::ConfigDocument;
use crate::logging::Logger;
use crate::rule_set::RuleSet;
use crate::settings::Settings;
use crate::task::{TargetResolver, Task};
use crate::travel_time::TravelTimeCache;

/// Outcome of evaluating one task: one record per applied rule, or a single
/// unchanged record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub task_id: u64,
    pub kind: String,
    pub title: String,
    pub old_deadline: f64,
    /// `None` when the deadline was left alone.
    pub new_deadline: Option<f64>,
    /// Index of the rule that made the change.
    pub rule_index: Option<usize>,
}

impl DecisionRecord {
    fn unchanged(task: &Task) -> Self {
        Self {
            task_id: task.id,
            kind: task.kind.clone(),
            title: task.title.clone(),
            old_deadline: task.deadline,
            new_deadline: None,
            rule_index: None,
        }
    }

    pub fn changed(&self) -> bool {
        self.new_deadline.is_some()
    }
}

pub struct DeadlineEngine<R: Rng = StdRng> {
    settings: Settings,
    catalog: BodyCatalog,
    travel_times: TravelTimeCache,
    rule_set: RuleSet<R>,
    resolver: Box<dyn TargetResolver>,
    logger: Logger,
}

impl DeadlineEngine<StdRng> {
    /// Build with a generator seeded from `settings.seed`, or from entropy
    /// when no seed is configured.
    pub fn new(
        settings: Settings,
        catalog: BodyCatalog,
        config: Option<&ConfigDocument>,
        resolver: Box<dyn TargetResolver>,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(settings, catalog, config, rng, resolver)
    }
}

impl<R: Rng> DeadlineEngine<R> {
    /// Build the travel-time cache and rule set for this session.
    ///
    /// Out-of-range settings are clamped first. A missing configuration is
    /// logged as an error; the engine then runs with no rules and no
    /// travel-time overrides.
    pub fn with_rng(
        settings: Settings,
        catalog: BodyCatalog,
        config: Option<&ConfigDocument>,
        rng: R,
        resolver: Box<dyn TargetResolver>,
    ) -> Self {
        let settings = settings.sanitized();
        let logger = Logger::new(settings.effective_log_level());
        logger.important(format_args!("Loading config..."));

        let (rules, overrides) = match config {
            Some(doc) => (
                doc.build_rules(&settings, &logger),
                doc.overrides(&settings.calendar),
            ),
            None => {
                logger.error(format_args!("Config file not found!"));
                (Vec::new(), Vec::new())
            }
        };

        let travel_times = TravelTimeCache::build(&catalog, &overrides, &settings, &logger);
        let rule_set = RuleSet::new(rules, settings.tunables(), rng, logger);

        Self {
            settings,
            catalog,
            travel_times,
            rule_set,
            resolver,
            logger,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &BodyCatalog {
        &self.catalog
    }

    pub fn travel_times(&self) -> &TravelTimeCache {
        &self.travel_times
    }

    pub fn rule_set(&self) -> &RuleSet<R> {
        &self.rule_set
    }

    /// Travel time to the task's target, or 0 when it cannot be determined.
    pub fn travel_time_for(&self, task: &Task) -> f64 {
        let target = match self.resolver.resolve(task, &self.catalog) {
            Ok(target) => target,
            Err(e) => {
                self.logger.error(format_args!(
                    "Could not determine target body of '{}': {}",
                    task.title, e
                ));
                return 0.0;
            }
        };
        self.logger.debug(format_args!(
            "Target body: {}",
            target.as_deref().unwrap_or("N/A")
        ));
        match self.travel_times.travel_time(target.as_deref()) {
            Ok(t) => t,
            Err(e) => {
                self.logger.error(format_args!(
                    "Travel time lookup failed for '{}': {}",
                    task.title, e
                ));
                0.0
            }
        }
    }

    /// Evaluate one freshly offered task.
    pub fn on_task_offered(&mut self, task: &mut Task) -> Vec<DecisionRecord> {
        let calendar = self.settings.calendar;
        if !self.settings.mod_enabled {
            return vec![DecisionRecord::unchanged(task)];
        }

        self.logger.debug(format_args!("Title: {}", task.title));
        self.logger.debug(format_args!("Kind: {}", task.kind));
        self.logger.debug(format_args!(
            "Deadline: {} ({})",
            task.deadline,
            format_duration(task.deadline, &calendar)
        ));

        let travel_time = self.travel_time_for(task);
        let applied = self.rule_set.evaluate(task, travel_time);

        if applied.is_empty() {
            self.logger.debug(format_args!("Deadline is fine."));
            return vec![DecisionRecord::unchanged(task)];
        }

        applied
            .into_iter()
            .map(|a| {
                self.logger.important(format_args!(
                    "Deadline for {} (\"{}\") adjusted from {} to {} by rule #{}.",
                    task.kind,
                    task.title,
                    format_duration(a.old_deadline, &calendar),
                    format_duration(a.new_deadline, &calendar),
                    a.rule_index
                ));
                DecisionRecord {
                    task_id: task.id,
                    kind: task.kind.clone(),
                    title: task.title.clone(),
                    old_deadline: a.old_deadline,
                    new_deadline: Some(a.new_deadline),
                    rule_index: Some(a.rule_index),
                }
            })
            .collect()
    }

    /// One-time sweep over every currently offered task, in order.
    pub fn on_batch_ready(&mut self, tasks: &mut [Task]) -> Vec<DecisionRecord> {
        self.logger.important(format_args!("{} total tasks.", tasks.len()));
        let mut records = Vec::new();
        for task in tasks.iter_mut() {
            records.extend(self.on_task_offered(task));
        }
        records
    }
}
