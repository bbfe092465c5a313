//! xtask sim - desktop simulator runner
//!
//! Builds and runs the `ad3552r-sim` binary of the firmware crate. With
//! `--watch`, sources are watched and the simulator is restarted on every
//! change (kill, rebuild, rerun). The standalone example streams for 20 s,
//! so a change usually lands while the previous run is still going.

use anyhow::{Context, Result};
use colored::Colorize;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

const WATCH_PATHS: &[&str] = &[
    "crates/firmware/src",
    "crates/firmware/Cargo.toml",
    "crates/platform/src",
    "crates/platform/Cargo.toml",
];

/// Ignore change bursts closer together than this.
const DEBOUNCE: Duration = Duration::from_millis(500);

pub fn run(iio: bool, watch: bool, log: Option<&str>) -> Result<()> {
    let features = if iio { "simulator,iio" } else { "simulator" };

    if !watch {
        print_banner(features);
        let status = simulator_command(features, log)
            .status()
            .context("Failed to run cargo")?;
        if !status.success() {
            anyhow::bail!("Simulator exited with {:?}", status.code());
        }
        return Ok(());
    }

    clear_screen();
    print_banner(features);

    let mut process = spawn(features, log);

    let (tx, rx) = channel();
    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event.paths.iter().any(|p| {
                        p.extension()
                            .is_some_and(|ext| ext == "rs" || ext == "toml")
                    })
                {
                    let _ = tx.send(());
                }
            }
        },
        notify::Config::default(),
    )?;

    for path in WATCH_PATHS.iter().map(Path::new) {
        if path.exists() {
            watcher
                .watch(path, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch path: {}", path.display()))?;
        }
    }

    println!("{}", "Watching firmware and platform sources".green().bold());
    println!("{}", "Press Ctrl+C to stop".dimmed());
    println!();

    let mut last_restart = Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => {
                if last_restart.elapsed() < DEBOUNCE {
                    continue;
                }
                std::thread::sleep(Duration::from_millis(200));
                while rx.try_recv().is_ok() {}
                last_restart = Instant::now();

                stop(process.take());
                clear_screen();
                print_banner(features);
                println!("{}", "Changes detected - rebuilding...".yellow().bold());
                println!();
                process = spawn(features, log);

                #[cfg(feature = "notifications")]
                {
                    let _ = notify_rust::Notification::new()
                        .summary("AD3552R simulator")
                        .body("Restarted after source change")
                        .timeout(2000)
                        .show();
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(child) = process.as_mut() {
                    if let Ok(Some(status)) = child.try_wait() {
                        println!();
                        match status.code() {
                            Some(0) => println!("{}", "Simulator finished".green()),
                            Some(code) => println!(
                                "{}",
                                format!("Simulator failed with exit status {}", code).yellow()
                            ),
                            None => println!("{}", "Simulator terminated".yellow()),
                        }
                        println!("{}", "Waiting for changes...".dimmed());
                        println!();
                        process = None;
                    }
                }
            }
            Err(e) => {
                eprintln!("Watcher error: {}", e);
                break;
            }
        }
    }

    stop(process);
    Ok(())
}

fn simulator_command(features: &str, log: Option<&str>) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["run", "-p", "firmware", "--bin", "ad3552r-sim", "--features", features])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    // An explicit --log wins; otherwise keep the caller's RUST_LOG or use info.
    match log {
        Some(filter) => {
            cmd.env("RUST_LOG", filter);
        }
        None if std::env::var("RUST_LOG").is_err() => {
            cmd.env("RUST_LOG", "info");
        }
        None => {}
    }
    cmd
}

fn spawn(features: &str, log: Option<&str>) -> Option<Child> {
    match simulator_command(features, log).spawn() {
        Ok(child) => Some(child),
        Err(e) => {
            eprintln!("{}", format!("Failed to start simulator: {}", e).red().bold());
            None
        }
    }
}

fn stop(process: Option<Child>) {
    if let Some(mut child) = process {
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
    io::stdout().flush().ok();
}

fn print_banner(features: &str) {
    println!("{}", "═════════════════════════════════════════════".cyan());
    println!("{}", "     AD3552R FMC demonstrator - simulator     ".cyan().bold());
    println!("{}", format!("     features: {}", features).cyan());
    println!("{}", "═════════════════════════════════════════════".cyan());
    println!();
}
