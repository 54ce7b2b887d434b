use crate::step::{self, OnFailure};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Play `wav` through the desktop card-image player and show its log.
pub fn run(wav: &Path, compatible: bool) -> Result<()> {
    println!();
    println!(
        "{}",
        format!("🎵 Playing {} from a simulated card...", wav.display())
            .cyan()
            .bold()
    );
    println!();

    let wav = wav
        .to_str()
        .with_context(|| format!("Path is not UTF-8: {}", wav.display()))?;

    let mut args = vec![
        "run",
        "-p",
        "firmware",
        "--example",
        "card_image_player",
        "--features",
        "emulator",
        "--",
        wav,
    ];
    if compatible {
        args.push("--compatible");
    }

    let mut cmd = step::cargo(&args);
    if std::env::var_os("RUST_LOG").is_none() {
        cmd.env("RUST_LOG", "info");
    }

    let output = step::run("Card-image player", &mut cmd, OnFailure::Abort)?;
    if let Some(output) = output {
        // tracing-subscriber writes to stdout
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            println!("   {}", line.dimmed());
        }
        println!();
    }

    Ok(())
}
