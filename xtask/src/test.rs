use crate::step::{self, OnFailure};
use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let start = Instant::now();
    let all = !unit_only && !integration_only;

    if unit_only || all {
        let output = step::run(
            "Unit tests",
            &mut step::cargo(&["test", "--workspace", "--lib"]),
            OnFailure::Abort,
        )?;
        print_summary(output.as_ref());
    }

    if integration_only || all {
        // Every tests/*.rs binary, including the card-to-DAC pipeline and proptests.
        let output = step::run(
            "Integration tests",
            &mut step::cargo(&["test", "--workspace", "--tests"]),
            OnFailure::Abort,
        )?;
        print_summary(output.as_ref());
    }

    if all {
        step::run(
            "Doc tests",
            &mut step::cargo(&["test", "--workspace", "--doc"]),
            OnFailure::Warn,
        )?;
    }

    println!(
        "{}",
        format!("✓ All tests passed in {:.2}s", start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}

fn print_summary(output: Option<&std::process::Output>) {
    if let Some(output) = output {
        let stdout = String::from_utf8_lossy(&output.stdout);
        println!("   {}", step::test_summary(&stdout).dimmed());
        println!();
    }
}
