//! GameTest runner CLI
//!
//! Usage:
//!   cargo run --bin gametest                          # Run all enabled cases
//!   cargo run --bin gametest -- --filter redstone:    # Run one suite
//!   cargo run --bin gametest -- --list                # List selected cases
//!   cargo run --bin gametest -- --verbose             # Show every attempt

use bevy::log::{Level, tracing_subscriber};
use bevy::prelude::App;
use std::path::Path;

use gametest::demo::{demo_app, register_demo_suites};
use gametest::report::{CaseReport, RunSummary};
use gametest::runner::{HistoryDatabase, RunConfig, plan_run, run_registry};
use gametest::Registry;

fn main() {
    let config = RunConfig::from_args();
    init_logging(&config);

    let mut registry: Registry<App> = Registry::new();
    if let Err(e) = register_demo_suites(&mut registry) {
        eprintln!("Error: invalid suite definition: {}", e);
        std::process::exit(2);
    }

    if config.list {
        list_cases(&registry, &config);
        return;
    }

    println!("GameTest");
    println!("========\n");

    let summary = run_registry(&registry, &demo_app, &config);
    print_summary(&summary, &config);

    if let Some(path) = &config.output_file {
        match summary.write_json(path) {
            Ok(()) => println!("Results written to {}", path),
            Err(e) => eprintln!("Warning: {}", e),
        }
    }

    if let Some(db_path) = &config.db_path {
        record_history(db_path, &summary, &config);
    }

    if !summary.passed() {
        std::process::exit(1);
    }
}

fn init_logging(config: &RunConfig) {
    let level = if config.verbose {
        Level::DEBUG
    } else if config.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn list_cases(registry: &Registry<App>, config: &RunConfig) {
    for (batch, instances) in plan_run(registry, config) {
        println!("{}/", batch);
        for instance in instances {
            let case = instance.case;
            let mut notes = Vec::new();
            if !case.config().required {
                notes.push("optional".to_string());
            }
            if case.config().max_attempts > 1 {
                notes.push(format!("attempts={}", case.config().max_attempts));
            }
            let tags = case.effective_tags().join(",");
            println!(
                "  {} [{}] max_ticks={} {}",
                instance.id(),
                tags,
                case.config().max_ticks,
                notes.join(" ")
            );
        }
    }
}

fn print_summary(summary: &RunSummary, config: &RunConfig) {
    let mut current_batch = "";
    for case in &summary.cases {
        if !config.quiet {
            if case.batch != current_batch {
                if !current_batch.is_empty() {
                    println!();
                }
                println!("{}/", case.batch);
                current_batch = case.batch.as_str();
            }
            print_case(case, config.verbose);
        }
    }

    let counts = summary.counts();
    println!("\n========");
    println!(
        "Results: {} passed, {} failed, {} timed out, {} known failures ({} flaky)",
        counts.passed, counts.failed, counts.timed_out, counts.known_failures, counts.flaky
    );
    println!(
        "Run {}: {}",
        summary.run_id,
        if summary.passed() { "PASSED" } else { "FAILED" }
    );
}

fn print_case(case: &CaseReport, verbose: bool) {
    let dots = ".".repeat(48 - case.id.len().min(47));
    println!("  {} {} {}", case.id, dots, case.status_line());

    if let Some(reason) = case.final_outcome().reason() {
        if verbose {
            println!("    {}", reason.replace('\n', "\n    "));
        } else {
            println!("    {}", reason.lines().next().unwrap_or_default());
        }
    }

    if verbose && case.attempts.len() > 1 {
        for record in &case.attempts {
            println!(
                "    attempt {}: {} after {} ticks",
                record.attempt, record.outcome, record.ticks
            );
        }
    }
}

fn record_history(db_path: &str, summary: &RunSummary, config: &RunConfig) {
    let config_json = serde_json::to_string(config).ok();
    let result = HistoryDatabase::open(Path::new(db_path))
        .and_then(|mut db| db.record_run(summary, config_json.as_deref()));
    match result {
        Ok(()) => println!("Run recorded in {}", db_path),
        Err(e) => eprintln!("Warning: failed to record run in {}: {}", db_path, e),
    }
}
