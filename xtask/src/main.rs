//! Development automation tasks for the `LessonLink` workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! intentionally used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context};

mod features;

type TaskFn = fn() -> anyhow::Result<()>;

/// Every task `cargo xtask` knows, in the order `ci` runs them
const TASKS: &[(&str, &str, TaskFn)] = &[
    ("fmt", "Check Rust code formatting", run_fmt),
    ("clippy", "Run Clippy lints", run_clippy),
    ("test", "Run all workspace tests", run_test),
    ("test-features", "Check the lessonlink-infra feature matrix", features::test_feature_matrix),
];

fn main() -> ExitCode {
    let result = match env::args().nth(1).as_deref() {
        Some("ci") => run_ci(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(name) => match find_task(name) {
            Some(task) => task(),
            None => {
                eprintln!("Unknown task: {name}\n");
                print_help();
                Err(anyhow::anyhow!("Unknown task"))
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn find_task(name: &str) -> Option<TaskFn> {
    TASKS.iter().find(|(task, _, _)| *task == name).map(|(_, _, run)| *run)
}

fn print_help() {
    let names: Vec<&str> = TASKS.iter().map(|(name, _, _)| *name).collect();

    println!("LessonLink Development Tasks\n");
    println!("USAGE:\n    cargo xtask <TASK>\n");
    println!("TASKS:");
    println!("    {:<15}Run all CI checks ({})", "ci", names.join(", "));
    for (name, about, _) in TASKS {
        println!("    {name:<15}{about}");
    }
    println!("    {:<15}Show this help message", "help");
}

fn run_ci() -> anyhow::Result<()> {
    for (step, (name, about, run)) in TASKS.iter().enumerate() {
        println!("\n==> Step {}/{}: {about}", step + 1, TASKS.len());
        run().with_context(|| format!("ci step '{name}'"))?;
    }

    println!("\n✓ All CI checks passed!");
    Ok(())
}

/// Run `cargo` with `args`, failing with `failure` on a non-zero exit
fn cargo(args: &[&str], failure: &str) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if !status.success() {
        bail!("{failure}");
    }
    Ok(())
}

fn run_fmt() -> anyhow::Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "Format check failed. Run 'cargo fmt --all' to fix.")
}

/// The keychain backend is left out unless `XTASK_CLIPPY_ALL_FEATURES` is
/// set, since it needs the platform secret service headers to build.
fn run_clippy() -> anyhow::Result<()> {
    let mut args = vec!["clippy", "--workspace", "--all-targets"];
    if env::var_os("XTASK_CLIPPY_ALL_FEATURES").is_some() {
        args.push("--all-features");
    }
    args.extend(["--", "-D", "warnings"]);

    cargo(&args, "Clippy run failed. See output above.")
}

fn run_test() -> anyhow::Result<()> {
    cargo(&["test", "--workspace", "--features", "lessonlink-core/test-utils"], "Tests failed")
}
