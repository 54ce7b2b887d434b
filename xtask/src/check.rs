use crate::step::{self, OnFailure};
use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

const EMBEDDED_TARGET: &str = "thumbv7em-none-eabihf";

/// Library crates that must build without `std` for the board.
const NO_STD_CRATES: &[&str] = &["platform", "sdcard", "playback"];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Running WaveCard checks...".cyan().bold());
    println!();

    let start = Instant::now();

    step::run(
        "Firmware (hardware)",
        &mut step::cargo(&[
            "check",
            "-p",
            "firmware",
            "--target",
            EMBEDDED_TARGET,
            "--features",
            "hardware",
        ]),
        OnFailure::Abort,
    )?;

    step::run(
        "Card-image emulator",
        &mut step::cargo(&["check", "-p", "firmware", "--examples", "--features", "emulator"]),
        OnFailure::Abort,
    )?;

    for krate in NO_STD_CRATES {
        step::run(
            &format!("{krate} (no_std)"),
            &mut step::cargo(&["check", "-p", krate, "--target", EMBEDDED_TARGET]),
            OnFailure::Abort,
        )?;
    }

    step::run(
        "Clippy",
        &mut step::cargo(&[
            "clippy",
            "--workspace",
            "--exclude",
            "firmware",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ]),
        OnFailure::Warn,
    )?;

    let fmt = step::run(
        "Formatting",
        &mut step::cargo(&["fmt", "--all", "--", "--check"]),
        OnFailure::Warn,
    )?;
    if fmt.is_none() {
        println!("   {}", "Run 'cargo fmt --all' to fix".dimmed());
        println!();
    }

    println!(
        "{}",
        format!("✓ All checks passed in {:.2}s", start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}
