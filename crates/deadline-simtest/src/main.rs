//! Deadline Tuner Headless Harness
//!
//! Loads a body catalog, a rule configuration and a batch of offered tasks,
//! prints the travel-time table, runs the batch sweep, then checks the
//! engine's properties against the loaded data.
//!
//! Usage:
//!   cargo run -p deadline-simtest
//!   cargo run -p deadline-simtest -- --seed 7 --verbose
//!   cargo run -p deadline-simtest -- --catalog my_system.json --config rules.json

use std::path::{Path, PathBuf};

use clap::Parser;
use deadline_logic::bodies::BodyCatalog;
use deadline_logic::calendar::{format_duration, Calendar};
use deadline_logic::config::ConfigDocument;
use deadline_logic::engine::DeadlineEngine;
use deadline_logic::logging::{LogLevel, Logger};
use deadline_logic::rule::{Precision, Rule};
use deadline_logic::rule_set::RuleSet;
use deadline_logic::settings::{Settings, Tunables};
use deadline_logic::task::{Task, TitleSearch};
use deadline_logic::travel_time::TravelTimeSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::filter::LevelFilter;

// ── Bundled data (used when no path is given) ──────────────────────────
const CATALOG_JSON: &str = include_str!("../../../data/stock_system.json");
const CONFIG_JSON: &str = include_str!("../../../data/deadline_config.json");
const TASKS_JSON: &str = include_str!("../../../data/sample_tasks.json");

const DEFAULT_SEED: u64 = 42;

#[derive(Parser)]
#[command(
    name = "deadline-simtest",
    about = "Headless harness for travel times, batch sweep and rule properties",
    version
)]
struct Cli {
    /// Body catalog JSON (default: bundled stock system)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Rule configuration JSON (default: bundled configuration)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offered tasks JSON (default: bundled sample tasks)
    #[arg(long)]
    tasks: Option<PathBuf>,

    /// Seed for the rule set's generator (default: config seed, else 42)
    #[arg(long)]
    seed: Option<u64>,

    /// Print every check and every decision, and log at debug level
    #[arg(long, short = 'v')]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn read_or(path: Option<&Path>, bundled: &str) -> Result<String, String> {
    match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p.display(), e)),
        None => Ok(bundled.to_string()),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    println!("=== Deadline Tuner Harness ===\n");

    let inputs = match load_inputs(&cli) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let mut results = Vec::new();

    // 1. Travel-time table
    results.extend(validate_travel_times(&inputs, cli.verbose));

    // 2. Batch sweep over the offered tasks
    results.extend(validate_batch_sweep(&inputs, cli.verbose));

    // 3. Rule properties on synthetic rules
    results.extend(validate_rule_properties(&inputs.settings));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || cli.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

struct Inputs {
    settings: Settings,
    catalog: BodyCatalog,
    config: ConfigDocument,
    tasks: Vec<Task>,
}

fn load_inputs(cli: &Cli) -> Result<Inputs, String> {
    let catalog_json = read_or(cli.catalog.as_deref(), CATALOG_JSON)?;
    let config_json = read_or(cli.config.as_deref(), CONFIG_JSON)?;
    let tasks_json = read_or(cli.tasks.as_deref(), TASKS_JSON)?;

    let catalog =
        BodyCatalog::from_json_str(&catalog_json).map_err(|e| format!("catalog: {}", e))?;
    let config =
        ConfigDocument::from_json_str(&config_json).map_err(|e| format!("config: {}", e))?;
    let tasks: Vec<Task> =
        serde_json::from_str(&tasks_json).map_err(|e| format!("tasks: {}", e))?;

    let mut settings = config.settings();
    settings.seed = cli.seed.or(settings.seed).or(Some(DEFAULT_SEED));
    if cli.verbose {
        settings.log_level = Some(LogLevel::Debug);
    }

    Ok(Inputs {
        settings,
        catalog,
        config,
        tasks,
    })
}

fn build_engine(inputs: &Inputs) -> Result<DeadlineEngine, String> {
    let resolver = TitleSearch::new(&inputs.catalog).map_err(|e| e.to_string())?;
    Ok(DeadlineEngine::new(
        inputs.settings.clone(),
        inputs.catalog.clone(),
        Some(&inputs.config),
        Box::new(resolver),
    ))
}

// ── 1. Travel Times ─────────────────────────────────────────────────────

fn validate_travel_times(inputs: &Inputs, _verbose: bool) -> Vec<TestResult> {
    println!("--- Travel Times ---");
    let mut results = Vec::new();

    let engine = match build_engine(inputs) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult {
                name: "engine_build".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };
    let calendar = inputs.settings.calendar;
    let cache = engine.travel_times();

    println!("  {:10} {:>10}  {:20}", "Body", "Source", "Travel time");
    for (name, entry) in cache.iter() {
        println!(
            "  {:10} {:>10}  {:20}",
            name,
            format!("{:?}", entry.source),
            format_duration(entry.seconds, &calendar)
        );
    }

    results.push(TestResult {
        name: "travel_covers_catalog".into(),
        passed: cache.len() == inputs.catalog.len(),
        detail: format!("{} entries for {} bodies", cache.len(), inputs.catalog.len()),
    });

    let negative: Vec<_> = cache
        .iter()
        .filter(|(_, e)| e.seconds.is_nan() || e.seconds < 0.0)
        .map(|(n, _)| n.to_string())
        .collect();
    results.push(TestResult {
        name: "travel_non_negative".into(),
        passed: negative.is_empty(),
        detail: if negative.is_empty() {
            "all travel times ≥ 0".into()
        } else {
            format!("negative or NaN: {}", negative.join(", "))
        },
    });

    let home = inputs.catalog.home().name.clone();
    let home_time = cache.travel_time(Some(&home)).unwrap_or(f64::NAN);
    let home_overridden = cache
        .entry(&home)
        .map(|e| e.source == TravelTimeSource::Override)
        .unwrap_or(false);
    results.push(TestResult {
        name: "travel_home_zero".into(),
        passed: home_time == 0.0 || home_overridden,
        detail: format!("{} → {}", home, home_time),
    });

    let star = inputs.catalog.star().name.clone();
    let star_time = cache.travel_time(Some(&star)).unwrap_or(f64::NAN);
    let home_planet_period = inputs.catalog.home_planet().period;
    let star_overridden = cache
        .entry(&star)
        .map(|e| e.source == TravelTimeSource::Override)
        .unwrap_or(false);
    results.push(TestResult {
        name: "travel_star_one_year".into(),
        passed: star_overridden || (star_time - home_planet_period).abs() < 1e-6,
        detail: format!(
            "{} → {} (home planet year {})",
            star,
            format_duration(star_time, &calendar),
            format_duration(home_planet_period, &calendar)
        ),
    });

    let fallbacks: Vec<_> = cache
        .iter()
        .filter(|(_, e)| e.source == TravelTimeSource::Fallback)
        .map(|(n, _)| n.to_string())
        .collect();
    results.push(TestResult {
        name: "travel_no_fallbacks".into(),
        passed: fallbacks.is_empty(),
        detail: if fallbacks.is_empty() {
            "every orbit computed".into()
        } else {
            format!("orbit computation failed for {}", fallbacks.join(", "))
        },
    });

    results.push(TestResult {
        name: "travel_absent_target_zero".into(),
        passed: cache.travel_time(None).ok() == Some(0.0),
        detail: "no target → 0".into(),
    });

    results
}

// ── 2. Batch Sweep ──────────────────────────────────────────────────────

fn validate_batch_sweep(inputs: &Inputs, verbose: bool) -> Vec<TestResult> {
    println!("--- Batch Sweep ---");
    let mut results = Vec::new();
    let calendar = inputs.settings.calendar;

    let mut engine = match build_engine(inputs) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult {
                name: "engine_build".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };

    let mut tasks = inputs.tasks.clone();
    let records = engine.on_batch_ready(&mut tasks);
    let changed = records.iter().filter(|r| r.changed()).count();

    println!(
        "  {} tasks, {} rules, {} deadline changes",
        tasks.len(),
        engine.rule_set().len(),
        changed
    );
    if verbose {
        for r in &records {
            match r.new_deadline {
                Some(new) => println!(
                    "    #{:<3} {:20} {} → {} (rule #{})",
                    r.task_id,
                    r.kind,
                    format_duration(r.old_deadline, &calendar),
                    format_duration(new, &calendar),
                    r.rule_index.map(|i| i.to_string()).unwrap_or_default()
                ),
                None => println!(
                    "    #{:<3} {:20} {} unchanged",
                    r.task_id,
                    r.kind,
                    format_duration(r.old_deadline, &calendar)
                ),
            }
        }
    }

    results.push(TestResult {
        name: "batch_record_per_task".into(),
        passed: tasks
            .iter()
            .all(|t| records.iter().any(|r| r.task_id == t.id)),
        detail: format!("{} records for {} tasks", records.len(), tasks.len()),
    });

    results.push(TestResult {
        name: "batch_deadlines_valid".into(),
        passed: tasks.iter().all(|t| t.deadline.is_finite() && t.deadline >= 0.0),
        detail: "every deadline finite and ≥ 0".into(),
    });

    // Unmatched kinds pass through untouched
    let unmatched: Vec<_> = tasks
        .iter()
        .filter(|t| !engine.rule_set().rules().iter().any(|r| r.matches(t)))
        .collect();
    let untouched = unmatched.iter().all(|t| {
        inputs
            .tasks
            .iter()
            .find(|o| o.id == t.id)
            .map(|o| o.deadline == t.deadline)
            .unwrap_or(false)
    });
    results.push(TestResult {
        name: "batch_unmatched_untouched".into(),
        passed: untouched,
        detail: format!("{} tasks matched no rule", unmatched.len()),
    });

    // A second sweep over settled tasks changes nothing
    let mut again = tasks.clone();
    let second = engine.on_batch_ready(&mut again);
    let second_changes = second.iter().filter(|r| r.changed()).count();
    results.push(TestResult {
        name: "batch_idempotent".into(),
        passed: second_changes == 0 && again == tasks,
        detail: format!("{} changes on the second sweep", second_changes),
    });

    // Same seed, same outcome
    let replay = build_engine(inputs).map(|mut e| {
        let mut replayed = inputs.tasks.clone();
        e.on_batch_ready(&mut replayed);
        replayed
    });
    results.push(TestResult {
        name: "batch_seed_reproducible".into(),
        passed: replay.as_ref().map(|r| *r == tasks).unwrap_or(false),
        detail: format!("seed {}", inputs.settings.seed.unwrap_or(DEFAULT_SEED)),
    });

    results
}

// ── 3. Rule Properties ──────────────────────────────────────────────────

fn quiet_set(rules: Vec<Rule>, tunables: Tunables, seed: u64) -> RuleSet {
    RuleSet::new(
        rules,
        tunables,
        StdRng::seed_from_u64(seed),
        Logger::new(LogLevel::Silent),
    )
}

fn validate_rule_properties(settings: &Settings) -> Vec<TestResult> {
    println!("--- Rule Properties ---");
    let mut results = Vec::new();
    let seed = settings.seed.unwrap_or(DEFAULT_SEED);
    let tunables = Tunables {
        random_factor: settings.random_factor,
        extra_grace: 0.0,
        application_chance: 1.0,
        calendar: settings.calendar,
    };
    let calendar = settings.calendar;

    // Fixed window: every out-of-range survey deadline becomes 21600 s
    match Rule::explicit("SurveyContract", 21_600.0, 21_600.0, 1.0, Precision::Hours) {
        Ok(rule) => {
            let mut set = quiet_set(vec![rule], tunables, seed);
            let all_fixed = [1.0, 10_000.0, 50_000.0, 1.0e9].iter().all(|&d| {
                let mut task = Task::new(1, "SurveyContract", "Survey", d);
                set.evaluate(&mut task, 0.0);
                task.deadline == 21_600.0
            });
            results.push(TestResult {
                name: "rule_fixed_window".into(),
                passed: all_fixed,
                detail: "min == max deadline is deterministic".into(),
            });
        }
        Err(e) => results.push(TestResult {
            name: "rule_fixed_window".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    // Degenerate window consumes no randomness
    if let Ok(rule) = Rule::explicit("X", 5_000.0, 5_000.0, 0.0, Precision::None) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut reference = rng.clone();
        let bounds = rule.bounds(0.0, &tunables);
        let value = rule.proposed_deadline(&bounds, &calendar, &mut rng);
        let untouched = rng.gen::<u64>() == reference.gen::<u64>();
        results.push(TestResult {
            name: "rule_degenerate_no_rng".into(),
            passed: value == 5_000.0 && untouched,
            detail: format!("proposed {} without drawing", value),
        });
    }

    // Application chance 0 never changes a deadline
    if let Ok(rule) = Rule::explicit("X", 1_000.0, 2_000.0, 0.0, Precision::None) {
        let never = Tunables {
            application_chance: 0.0,
            ..tunables
        };
        let mut set = quiet_set(vec![rule], never, seed);
        let mut task = Task::new(1, "X", "", 10.0);
        let trials = 10_000;
        let changes: usize = (0..trials).map(|_| set.evaluate(&mut task, 0.0).len()).sum();
        results.push(TestResult {
            name: "rule_zero_chance".into(),
            passed: changes == 0 && task.deadline == 10.0,
            detail: format!("{} changes in {} trials", changes, trials),
        });
    }

    // Two matching rules compose in order
    if let (Ok(first), Ok(second)) = (
        Rule::explicit("X", 1_000.0, 1_000.0, 0.0, Precision::None),
        Rule::explicit("X", 2_000.0, 3_000.0, 0.0, Precision::None),
    ) {
        let mut set = quiet_set(vec![first, second], tunables, seed);
        let mut task = Task::new(1, "X", "", 50.0);
        let applied = set.evaluate(&mut task, 0.0);
        let composed = applied.len() == 2
            && applied[1].old_deadline == 1_000.0
            && (2_000.0..=3_000.0).contains(&task.deadline);
        results.push(TestResult {
            name: "rule_composition".into(),
            passed: composed,
            detail: format!("final deadline {}", task.deadline),
        });
    }

    // Rounded draws are exact multiples of the unit
    for precision in [Precision::Minutes, Precision::Hours, Precision::Days] {
        let Ok(rule) = Rule::grace("X", calendar.days_to_seconds(3.0), 1.0, precision) else {
            continue;
        };
        let Some(unit) = precision.unit(&calendar) else {
            continue;
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let bounds = rule.bounds(calendar.days_to_seconds(40.0), &tunables);
        let all_multiples = (0..1_000).all(|_| {
            let v = rule.proposed_deadline(&bounds, &calendar, &mut rng);
            (v / unit).fract() == 0.0 && bounds.contains(v)
        });
        results.push(TestResult {
            name: format!("rule_rounding_{:?}", precision).to_lowercase(),
            passed: all_multiples,
            detail: format!("1000 draws are multiples of {} s", unit),
        });
    }

    // min_deadline is monotonic in the travel multiplier
    let travel = Calendar::default().days_to_seconds(30.0);
    let mins: Vec<f64> = [0.0, 0.5, 1.0, 2.0, 4.0]
        .iter()
        .filter_map(|&m| Rule::grace("X", 1_000.0, m, Precision::None).ok())
        .map(|r| r.min_deadline(travel, &tunables))
        .collect();
    results.push(TestResult {
        name: "rule_monotonic_multiplier".into(),
        passed: mins.len() == 5 && mins.windows(2).all(|w| w[0] <= w[1]),
        detail: format!(
            "{}",
            mins.iter()
                .map(|m| format_duration(*m, &calendar))
                .collect::<Vec<_>>()
                .join(" ≤ ")
        ),
    });

    results
}
