//! Pure deadline adjustment logic.
//!
//! This crate decides whether an offered task's deadline is impossibly short
//! or trivially long for the body it targets, and picks a replacement. It
//! takes plain data (a body catalog, parsed configuration records, tasks)
//! and has no dependency on the host game, so everything here is
//! unit-testable from a native harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bodies`] | Body catalog: star → planets → moons, planet-of lookup |
//! | [`calendar`] | Day/year length and compact duration formatting |
//! | [`config`] | Rule and travel-time override records, lenient loading |
//! | [`engine`] | Entry point: resolve target, evaluate rules, log decisions |
//! | [`error`] | Crate error type |
//! | [`logging`] | Four-level verbosity gate over the `log` facade |
//! | [`orbit`] | Synodic period and Hohmann transfer time |
//! | [`rule`] | Task matcher, deadline bounds, rounding precision |
//! | [`rule_set`] | Ordered rules sharing one random generator |
//! | [`settings`] | Global tunables |
//! | [`task`] | Task model and target-body resolution |
//! | [`travel_time`] | Per-body one-way travel time from home |

pub mod bodies;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod orbit;
pub mod rule;
pub mod rule_set;
pub mod settings;
pub mod task;
pub mod travel_time;

pub use error::{DeadlineError, Result};
