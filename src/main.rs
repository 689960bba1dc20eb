use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use issue25965::config::parse_duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Stress test for deleting an executable right after it exits", long_about = None)]
struct Cli {
    /// More output; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the in-process driver and the native program and compare them.
    Compare {
        /// Sleep between exe runs (defaults to no sleep).
        #[arg(long, value_parser = parse_duration, default_value = "0")]
        sleep: Duration,

        /// Path to the native comparison program.
        #[arg(long)]
        native_exe: Option<PathBuf>,

        /// Compiler for the throwaway target executable [default: $RUSTC or rustc].
        #[arg(long)]
        rustc: Option<PathBuf>,

        /// Leave the work directory behind.
        #[arg(long)]
        keep_temp: bool,
    },
    /// Run the in-process driver once against the given paths.
    Cycle {
        destination: PathBuf,
        source: PathBuf,

        /// Sleep between exe runs (defaults to no sleep).
        #[arg(long, value_parser = parse_duration, default_value = "0")]
        sleep: Duration,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(err) = simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("logging disabled: {err}");
    }
}

#[cfg(windows)]
fn run(command: Command) -> anyhow::Result<bool> {
    use issue25965::harness::{Harness, default_native_exe};
    use issue25965::os::Win32;
    use issue25965::{Driver, ITERATIONS, RunConfig};

    match command {
        Command::Compare {
            sleep,
            native_exe,
            rustc,
            keep_temp,
        } => {
            let native_exe = match native_exe {
                Some(path) => path,
                None => default_native_exe()?,
            };
            let mut harness = Harness::new(Win32, RunConfig::with_delay(sleep), native_exe)
                .keep_temp(keep_temp);
            if let Some(rustc) = rustc {
                harness = harness.rustc(rustc);
            }
            let comparison = harness.run()?;

            match &comparison.managed {
                Ok(report) => println!(
                    "managed: {} iterations ok, handle delta {}",
                    report.iterations,
                    report
                        .leaked_handles
                        .map_or_else(|| "unknown".to_string(), |d| d.to_string())
                ),
                Err(err) => println!("managed: {err}"),
            }
            if comparison.native.passed() {
                println!("native: {ITERATIONS} iterations ok");
            } else {
                println!("native: {}", comparison.native.output.trim_end());
            }
            println!("{}", comparison.verdict());
            Ok(comparison.passed())
        }
        Command::Cycle {
            destination,
            source,
            sleep,
        } => {
            let driver = Driver::new(Win32, RunConfig::with_delay(sleep));
            match driver.run_cycle(&destination, &source, ITERATIONS) {
                Ok(report) => {
                    println!("{} iterations ok", report.iterations);
                    Ok(true)
                }
                Err(err) => {
                    println!("{err}");
                    Ok(false)
                }
            }
        }
    }
}

#[cfg(not(windows))]
fn run(command: Command) -> anyhow::Result<bool> {
    anyhow::bail!(
        "{} needs Windows process and file semantics",
        match command {
            Command::Compare { .. } => "compare",
            Command::Cycle { .. } => "cycle",
        }
    )
}
