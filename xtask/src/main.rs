use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for retro-host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format check, clippy and the full test suite
    Ci {
        /// Print how long each step took
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy with warnings denied
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Run tests, optionally only some groups
    Test {
        #[arg(long)]
        doc: bool,
        /// Sample ring and playback adapter
        #[arg(long)]
        audio: bool,
        /// Controller state and key table
        #[arg(long)]
        input: bool,
        /// Driver, scheduler, session and configuration
        #[arg(long)]
        emulator: bool,
        /// Session integration tests
        #[arg(long)]
        session: bool,
    },
    /// Run benchmarks
    Bench {
        /// Only this target (ring_bench, session_bench)
        name: Option<String>,
    },
    /// Run the host, on a ROM or the built-in test pattern
    Run {
        rom_path: Option<String>,
        #[arg(long)]
        no_audio: bool,
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Ci { verbose } => run_ci(verbose),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Test {
            doc,
            audio,
            input,
            emulator,
            session,
        } => {
            let groups: Vec<TestGroup> = [
                (audio, TestGroup::Audio),
                (input, TestGroup::Input),
                (emulator, TestGroup::Emulator),
                (session, TestGroup::Session),
            ]
            .into_iter()
            .filter_map(|(selected, group)| selected.then_some(group))
            .collect();
            run_test(doc, &groups)
        }
        Commands::Bench { name } => run_bench(name.as_deref()),
        Commands::Run {
            rom_path,
            no_audio,
            release,
        } => run_host(rom_path.as_deref(), no_audio, release),
    }
}

/// cpal needs ALSA headers on Linux; CI builds without the `audio` feature
fn cargo(subcommand: &str) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.arg(subcommand);
    if std::env::var("CI").is_ok() {
        cmd.arg("--no-default-features");
    } else {
        cmd.arg("--all-features");
    }
    cmd
}

fn run_ci(verbose: bool) -> Result<()> {
    println!("{}", "=== retro-host CI ===".bold().blue());
    let start = Instant::now();

    run_step("fmt --check", || run_fmt(true), verbose)?;
    run_step("clippy", || run_clippy(false), verbose)?;
    run_step("tests", || run_test(false, &[]), verbose)?;
    run_step("doc tests", || run_test(true, &[]), verbose)?;

    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["fmt", "--all"]);
    if check {
        cmd.args(["--", "--check"]);
    }
    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    let mut cmd = cargo("clippy");
    cmd.arg("--all-targets");
    if fix {
        cmd.arg("--fix");
    } else {
        cmd.args(["--", "-D", "warnings"]);
    }
    execute_command(&mut cmd)
}

#[derive(Clone, Copy)]
enum TestGroup {
    Audio,
    Input,
    Emulator,
    Session,
}

impl TestGroup {
    fn name(self) -> &'static str {
        match self {
            TestGroup::Audio => "audio",
            TestGroup::Input => "input",
            TestGroup::Emulator => "emulator",
            TestGroup::Session => "session",
        }
    }

    /// Library groups filter by module path; the session suite is its own target
    fn args(self) -> &'static [&'static str] {
        match self {
            TestGroup::Audio => &["--lib", "audio::"],
            TestGroup::Input => &["--lib", "input::"],
            TestGroup::Emulator => &["--lib", "emulator::"],
            TestGroup::Session => &["--test", "session_tests"],
        }
    }
}

fn run_test(doc: bool, groups: &[TestGroup]) -> Result<()> {
    if doc {
        let mut cmd = cargo("test");
        cmd.arg("--doc");
        return execute_command(&mut cmd);
    }
    if groups.is_empty() {
        return execute_command(&mut cargo("test"));
    }

    let mut failed = Vec::new();
    for group in groups {
        println!("{} {} tests", "→".blue(), group.name().bold());
        let mut cmd = cargo("test");
        cmd.args(group.args());
        if execute_command(&mut cmd).is_err() {
            failed.push(group.name());
        }
    }

    if failed.is_empty() {
        println!("{} all selected groups passed", "✓".green());
        Ok(())
    } else {
        anyhow::bail!("failing test groups: {}", failed.join(", "))
    }
}

fn run_bench(name: Option<&str>) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("bench");
    if let Some(name) = name {
        cmd.args(["--bench", name]);
    }
    execute_command(&mut cmd)
}

fn run_host(rom_path: Option<&str>, no_audio: bool, release: bool) -> Result<()> {
    if let Some(rom_path) = rom_path {
        if !Path::new(rom_path).exists() {
            anyhow::bail!("ROM file not found: {}", rom_path);
        }
    }

    println!(
        "{} {} ({}, audio {})",
        "→".blue(),
        rom_path.unwrap_or("built-in test pattern").cyan(),
        if release { "release" } else { "debug" },
        if no_audio { "off" } else { "on" }
    );

    let mut cmd = Command::new("cargo");
    cmd.arg("run");
    if release {
        cmd.arg("--release");
    }
    cmd.arg("--");
    cmd.args(rom_path);
    if no_audio {
        cmd.arg("--no-audio");
    }
    execute_command(&mut cmd)
}

fn run_step<F>(name: &str, step: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    println!("{} {}", "→".blue(), name);
    let start = Instant::now();
    match step() {
        Ok(()) => {
            if verbose {
                println!(
                    "{} {} ({:.2}s)",
                    "✓".green().bold(),
                    name,
                    start.elapsed().as_secs_f64()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), name);
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;
    if !status.success() {
        anyhow::bail!("command failed with {}", status);
    }
    Ok(())
}
