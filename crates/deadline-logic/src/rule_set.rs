//! Ordered rules evaluated against one task at a time.
//!
//! Rules run in configuration order and compose: a rule that replaces the
//! deadline writes it to the task before the next rule looks at it, so the
//! last matching rule with a violated window has the final say.

use rand::rngs::StdRng;
use rand::Rng;

use crate::calendar::format_duration;
use crate::logging::Logger;
use crate::rule::Rule;
use crate::settings::Tunables;
use crate::task::Task;

/// One deadline replacement made by [`RuleSet::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedAdjustment {
    /// Position of the rule in configuration order.
    pub rule_index: usize,
    pub old_deadline: f64,
    pub new_deadline: f64,
}

pub struct RuleSet<R: Rng = StdRng> {
    rules: Vec<Rule>,
    tunables: Tunables,
    rng: R,
    logger: Logger,
}

impl<R: Rng> RuleSet<R> {
    pub fn new(rules: Vec<Rule>, tunables: Tunables, rng: R, logger: Logger) -> Self {
        Self {
            rules,
            tunables,
            rng,
            logger,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every matching rule whose window `task.deadline` violates.
    ///
    /// Each violation passes an application-chance roll before the deadline
    /// is replaced. Returns the replacements in the order they happened.
    pub fn evaluate(&mut self, task: &mut Task, travel_time: f64) -> Vec<AppliedAdjustment> {
        let calendar = self.tunables.calendar;
        let mut applied = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.matches(task) {
                continue;
            }

            let bounds = rule.bounds(travel_time, &self.tunables);
            if bounds.contains(task.deadline) {
                self.logger.debug(format_args!(
                    "Rule #{}: deadline {} is fine.",
                    index,
                    format_duration(task.deadline, &calendar)
                ));
                continue;
            }

            let roll: f64 = self.rng.gen();
            if roll >= self.tunables.application_chance {
                self.logger.debug(format_args!(
                    "Rule #{}: deadline {} out of bounds, left alone (roll {:.3}).",
                    index,
                    format_duration(task.deadline, &calendar),
                    roll
                ));
                continue;
            }

            let old_deadline = task.deadline;
            let new_deadline = rule.proposed_deadline(&bounds, &calendar, &mut self.rng);
            task.deadline = new_deadline;
            applied.push(AppliedAdjustment {
                rule_index: index,
                old_deadline,
                new_deadline,
            });
        }

        applied
    }
}
