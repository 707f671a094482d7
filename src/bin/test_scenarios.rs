//! Scenario test runner CLI
//!
//! Usage:
//!   cargo run --bin test-scenarios                  # Run all tests
//!   cargo run --bin test-scenarios -- agent/        # Run category
//!   cargo run --bin test-scenarios -- lobby/host    # Run single test
//!   cargo run --bin test-scenarios -- -v --jobs 4   # Details on failure, 4 threads

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rayon::prelude::*;

use playtest::logging::{self, DebugLogConfig};
use playtest::testing::{SCENARIOS_DIR, TestResult, discover_tests, parse_test_file, run_test};

#[derive(Parser, Debug)]
#[command(name = "test-scenarios", about = "Run TOML scenarios against the instrumented reference client")]
struct Args {
    /// Only run scenarios whose path contains this text
    filter: Option<String>,
    /// Show expected/actual details on failure
    #[arg(short, long)]
    verbose: bool,
    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,
    /// Scenario directory
    #[arg(long, default_value = SCENARIOS_DIR)]
    dir: PathBuf,
    #[arg(long)]
    debug_log: bool,
}

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    // No subscriber unless asked: scenarios log every captured frame error
    if args.debug_log {
        logging::init(&DebugLogConfig {
            enabled: true,
            ..Default::default()
        });
    }

    println!("Scenario Tests");
    println!("==============\n");

    if !args.dir.exists() {
        bail!("No scenarios directory found at {}", args.dir.display());
    }

    let tests = discover_tests(&args.dir, args.filter.as_deref());
    if tests.is_empty() {
        match &args.filter {
            Some(f) => bail!("No test files found (filter: {})", f),
            None => bail!("No test files found in {}", args.dir.display()),
        }
    }

    if args.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.jobs)
            .build_global()
            .context("Failed to initialize Rayon thread pool")?;
    }

    // Results come back in discovery order
    let results: Vec<(String, TestResult)> = tests
        .par_iter()
        .map(|path| {
            let result = match parse_test_file(path) {
                Ok(def) => run_test(&def),
                Err(message) => TestResult::Error { message },
            };
            (relative_name(&args.dir, path), result)
        })
        .collect();

    let mut passed = 0;
    let mut failed = 0;
    let mut errors = 0;
    let mut current_category = String::new();

    for (rel_path, result) in &results {
        let rel = Path::new(rel_path);
        if let Some(parent) = rel.parent() {
            let category = parent.to_string_lossy().to_string();
            if category != current_category && !category.is_empty() {
                if !current_category.is_empty() {
                    println!();
                }
                println!("{}/", category);
                current_category = category;
            }
        }

        let test_name = rel
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        match result {
            TestResult::Pass { .. } => passed += 1,
            TestResult::Fail { .. } => failed += 1,
            TestResult::Error { .. } => errors += 1,
        }
        print_result(&test_name, result, args.verbose);
    }

    println!("\n==============");
    println!("Results: {} passed, {} failed, {} errors", passed, failed, errors);

    Ok(failed == 0 && errors == 0)
}

fn relative_name(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).to_string_lossy().to_string()
}

fn print_result(name: &str, result: &TestResult, verbose: bool) {
    let dots = ".".repeat(40 - name.len().min(39));

    match result {
        TestResult::Pass { frames } => {
            println!("  {} {} PASS ({} frames)", name, dots, frames);
        }
        TestResult::Fail { error } => {
            println!("  {} {} FAIL", name, dots);
            if verbose {
                println!("    {}", error);
            } else {
                println!("    {}", error.message);
            }
        }
        TestResult::Error { message } => {
            println!("  {} {} ERROR", name, dots);
            println!("    {}", message);
        }
    }
}
