use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Crates whose docs are worth opening, in reading order.
const DOC_ROOTS: &[&str] = &["firmware", "platform"];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    // The simulator feature pulls in the mocks so their docs are included.
    let mut cmd = Command::new("cargo");
    cmd.args([
        "doc",
        "--workspace",
        "--no-deps",
        "--features",
        "firmware/simulator",
    ]);

    if open {
        cmd.arg("--open");
    }

    let output = cmd.output().context("Failed to build documentation")?;

    if !output.status.success() {
        eprintln!("{}", "✗ Documentation build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed");
    }

    println!(
        "{}",
        format!(
            "✓ Documentation built in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );

    if !open {
        println!();
        for name in DOC_ROOTS {
            println!(
                "   {}",
                format!("target/doc/{}/index.html", name).dimmed()
            );
        }
        println!(
            "   {}",
            "Or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
    }

    println!();

    Ok(())
}
