use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// A build configuration that must compile.
struct Target {
    label: &'static str,
    args: &'static [&'static str],
}

const TARGETS: &[Target] = &[
    Target {
        label: "firmware library (no_std)",
        args: &["check", "-p", "firmware", "--lib"],
    },
    Target {
        label: "firmware library (defmt)",
        args: &["check", "-p", "firmware", "--lib", "--features", "defmt"],
    },
    Target {
        label: "platform crate (no_std)",
        args: &["check", "-p", "platform", "--no-default-features"],
    },
    Target {
        label: "simulator (standalone)",
        args: &["check", "-p", "firmware", "--features", "simulator"],
    },
    Target {
        label: "simulator (IIO server)",
        args: &["check", "-p", "firmware", "--features", "simulator,iio"],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for target in TARGETS {
        println!("{}", format!("  Checking {}...", target.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(target.args)
            .output()
            .with_context(|| format!("Failed to check {}", target.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} check failed", target.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", target.label);
        }

        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                target.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
    }

    // Clippy lints
    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args([
            "clippy",
            "--workspace",
            "--all-targets",
            "--features",
            "firmware/simulator",
            "--",
            "-D",
            "warnings",
        ])
        .output()
        .context("Failed to run clippy")?;

    if !clippy_output.status.success() {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
        // Don't fail on clippy warnings, just show them
    } else {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    // Format check
    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if !fmt_output.status.success() {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    } else {
        println!("{}", "  ✓ Formatting check passed".green());
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
