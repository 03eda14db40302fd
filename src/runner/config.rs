//! Run configuration: settings file plus command line overrides

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FOOTPRINT, DEFAULT_MAX_CONCURRENT, DEFAULT_TESTS_PER_ROW, RUN_SETTINGS_FILE,
};
use crate::registry::CaseFilter;
use crate::scheduler::{LayoutConfig, SchedulerConfig};

/// Configuration for one invocation of the runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Only run cases carrying one of these tags (empty = all enabled)
    pub tags: Vec<String>,
    /// Only run this batch
    pub batch: Option<String>,
    /// Substring of `suite:name`
    pub filter: Option<String>,
    pub include_disabled: bool,
    /// Worker threads for distinct batches (0 = sequential)
    pub parallel: usize,
    /// Attempts ticking at once inside one batch
    pub max_concurrent: usize,
    pub tests_per_row: usize,
    /// Host footprint reserved per structure (x, y, z)
    pub footprint: [u32; 3],
    /// Shuffle instances within each batch with this seed
    pub seed: Option<u64>,
    /// Write the run summary as JSON here
    pub output_file: Option<String>,
    /// Append the run to this SQLite history database
    pub db_path: Option<String>,
    /// Print the selected cases instead of running them
    pub list: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            batch: None,
            filter: None,
            include_disabled: false,
            parallel: 0,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            tests_per_row: DEFAULT_TESTS_PER_ROW,
            footprint: DEFAULT_FOOTPRINT,
            seed: None,
            output_file: None,
            db_path: None,
            list: false,
            verbose: false,
            quiet: false,
        }
    }
}

/// What the command line asked for besides settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgAction {
    Run,
    Help,
}

impl RunConfig {
    /// Load configuration from a TOML settings file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
        Self::from_toml(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Settings file if present, otherwise built-in defaults
    pub fn from_config_files() -> Self {
        Self::from_file(RUN_SETTINGS_FILE).unwrap_or_default()
    }

    /// Parse configuration from command line arguments
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut config = Self::from_config_files();
        if let Some(path) = settings_override(&args) {
            match Self::from_file(path) {
                Ok(loaded) => config = loaded,
                Err(e) => eprintln!("Warning: {}", e),
            }
        }

        if config.apply_args(&args) == ArgAction::Help {
            print_help();
            std::process::exit(0);
        }
        config
    }

    /// Apply flag overrides. `args[0]` is the program name.
    pub fn apply_args(&mut self, args: &[String]) -> ArgAction {
        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            match args[i].as_str() {
                "--settings" => i += 1,
                "--tag" => {
                    if let Some(v) = value {
                        self.tags.extend(
                            v.split(',')
                                .map(|s| s.trim().to_string())
                                .filter(|s| !s.is_empty()),
                        );
                        i += 1;
                    }
                }
                "--batch" => {
                    if let Some(v) = value {
                        self.batch = Some(v.clone());
                        i += 1;
                    }
                }
                "--filter" => {
                    if let Some(v) = value {
                        self.filter = Some(v.clone());
                        i += 1;
                    }
                }
                "--include-disabled" => self.include_disabled = true,
                "--parallel" => {
                    if let Some(v) = value {
                        self.parallel = v.parse().unwrap_or(0);
                        i += 1;
                    }
                }
                "--max-concurrent" => {
                    if let Some(v) = value {
                        self.max_concurrent = v.parse().unwrap_or(DEFAULT_MAX_CONCURRENT);
                        i += 1;
                    }
                }
                "--seed" => {
                    if let Some(v) = value {
                        self.seed = v.parse().ok();
                        i += 1;
                    }
                }
                "--output" => {
                    if let Some(v) = value {
                        self.output_file = Some(v.clone());
                        i += 1;
                    }
                }
                "--db" => {
                    if let Some(v) = value {
                        self.db_path = Some(v.clone());
                        i += 1;
                    }
                }
                "--list" => self.list = true,
                "--verbose" | "-v" => self.verbose = true,
                "--quiet" | "-q" => self.quiet = true,
                "--help" | "-h" => return ArgAction::Help,
                _ => {}
            }
            i += 1;
        }
        ArgAction::Run
    }

    pub fn case_filter(&self) -> CaseFilter {
        CaseFilter {
            tags: self.tags.clone(),
            batch: self.batch.clone(),
            name_contains: self.filter.clone(),
            include_disabled: self.include_disabled,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent: self.max_concurrent,
            layout: LayoutConfig {
                footprint: self.footprint,
                tests_per_row: self.tests_per_row,
                ..Default::default()
            },
        }
    }
}

fn settings_override(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--settings")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn print_help() {
    println!(
        r#"GameTest runner - tick-synchronized scenario tests against a headless world

USAGE:
    cargo run --bin gametest -- [OPTIONS]

OPTIONS:
    --settings <FILE>       Load settings from TOML file (default: {settings})
    --tag <LIST>            Only run cases with one of these tags (comma-separated)
    --batch <NAME>          Only run this batch
    --filter <TEXT>         Only run cases whose suite:name contains TEXT
    --include-disabled      Also run cases tagged suite:disabled
    --parallel <N>          Run distinct batches on N threads (default: sequential)
    --max-concurrent <N>    Attempts ticking at once per batch (default: {max_concurrent})
    --seed <N>              Shuffle cases within each batch using this seed
    --output <FILE>         Write run summary as JSON
    --db <FILE>             Append results to SQLite history database
    --list                  List selected cases and exit
    --verbose, -v           Show every attempt and debug logging
    --quiet, -q             Only print the summary
    --help, -h              Show this help

EXAMPLES:
    # Everything except disabled cases
    cargo run --bin gametest

    # Only the mob suite, shuffled, with history
    cargo run --bin gametest -- --filter mobs: --seed 42 --db gametest.db

SETTINGS FILE FORMAT (TOML):
    tags = ["suite:default"]
    parallel = 4
    max_concurrent = 20
    footprint = [16, 16, 16]
"#,
        settings = RUN_SETTINGS_FILE,
        max_concurrent = DEFAULT_MAX_CONCURRENT,
    );
}
