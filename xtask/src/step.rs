//! One cargo (or tool) invocation with timing and coloured status lines.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// How a failed step affects the task.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Print the tool output and stop.
    Abort,
    /// Print a warning and carry on.
    Warn,
}

/// Run `cmd` under `label`. Returns the output when the step passed.
pub fn run(label: &str, cmd: &mut Command, on_failure: OnFailure) -> Result<Option<Output>> {
    println!("{}", format!("  {label}...").cyan());
    let start = Instant::now();
    let output = cmd
        .output()
        .with_context(|| format!("Failed to start: {label}"))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
        println!();
        return Ok(Some(output));
    }

    match on_failure {
        OnFailure::Abort => {
            eprintln!("{}", format!("  ✗ {label} failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                eprintln!("  {line}");
            }
            anyhow::bail!("{label} failed");
        }
        OnFailure::Warn => {
            eprintln!("{}", format!("  ⚠ {label} reported problems").yellow().bold());
            println!();
            Ok(None)
        }
    }
}

/// `cargo <args>`.
pub fn cargo(args: &[&str]) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    cmd
}

/// Summary from a line like
/// `test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out`,
/// summed over every test binary in `output`.
pub fn test_summary(output: &str) -> String {
    let mut passed = 0u64;
    let mut binaries = 0u64;
    for line in output.lines() {
        let Some(result) = line.split("test result:").nth(1) else {
            continue;
        };
        binaries = binaries.saturating_add(1);
        passed = passed.saturating_add(
            result
                .split(';')
                .find_map(|field| field.trim().strip_suffix(" passed"))
                .and_then(|n| n.rsplit(' ').next())
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(0),
        );
    }
    if binaries == 0 {
        "(summary not available)".to_string()
    } else {
        format!("({passed} passed in {binaries} binaries)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_up_binaries() {
        let out = "test result: ok. 5 passed; 0 failed; 0 ignored\n\
                   noise\n\
                   test result: ok. 12 passed; 0 failed; 1 ignored\n";
        assert_eq!(test_summary(out), "(17 passed in 2 binaries)");
    }

    #[test]
    fn summary_without_results() {
        assert_eq!(test_summary("Compiling"), "(summary not available)");
    }
}
