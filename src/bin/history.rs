//! Run history viewer
//!
//! Usage:
//!   cargo run --bin gametest-history -- --db gametest.db
//!   cargo run --bin gametest-history -- --db gametest.db --limit 20

use std::env;
use std::path::Path;

use gametest::runner::HistoryDatabase;

const DEFAULT_DB: &str = "gametest.db";

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut db_path = DEFAULT_DB.to_string();
    let mut limit = 10u32;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 1;
            }
            "--limit" if i + 1 < args.len() => {
                limit = args[i + 1].parse().unwrap_or(10);
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: gametest-history [--db <FILE>] [--limit <N>]");
                return;
            }
            _ => {}
        }
        i += 1;
    }

    if !Path::new(&db_path).exists() {
        eprintln!("No history database at {}", db_path);
        eprintln!("Record one with: cargo run --bin gametest -- --db {}", db_path);
        std::process::exit(1);
    }

    let db = match HistoryDatabase::open(Path::new(&db_path)) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: failed to open {}: {}", db_path, e);
            std::process::exit(1);
        }
    };

    println!("Recent runs");
    println!("===========\n");
    match db.recent_runs(limit) {
        Ok(runs) if runs.is_empty() => println!("  (none)"),
        Ok(runs) => {
            for run in runs {
                println!(
                    "  {}  {}  {:>3} cases  {}",
                    run.started_at,
                    run.id,
                    run.cases,
                    if run.passed { "PASSED" } else { "FAILED" }
                );
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }

    println!("\nFlaky cases");
    println!("===========\n");
    match db.flaky_cases() {
        Ok(cases) if cases.is_empty() => println!("  (none)"),
        Ok(cases) => {
            for case in cases {
                println!(
                    "  {:<40} {}/{} runs needed retries ({:.0}%)",
                    case.case_id,
                    case.flaky_runs,
                    case.total_runs,
                    case.flake_rate() * 100.0
                );
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
