//! Steprun - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use steprun::routine;
use steprun::util::config::{load_config, RuntimeConfig};
use steprun::util::logger::{self, LogLevel};
use steprun::{OwnerId, Runtime, Step, StateMask, Task, TaskGroup, NAME, VERSION};

/// Cooperative, tick-driven routine runtime
#[derive(Parser, Debug)]
#[command(name = "steprun")]
#[command(author = "Steprun Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (DEBUG logging)
    #[arg(short, long)]
    verbose: bool,

    /// Runtime configuration file (RON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a small set of routines and print their state after every tick
    Demo {
        /// Number of worker routines
        #[arg(short, long, default_value_t = 3)]
        tasks: usize,

        /// Number of ticks to drive
        #[arg(long, default_value_t = 8)]
        ticks: usize,

        /// Deactivate the shared owner after this many ticks
        #[arg(long, value_name = "TICK")]
        deactivate_at: Option<usize>,
    },

    /// Print the effective configuration as RON
    Config,

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    logger::init_with_level(if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    match args.command {
        Commands::Demo {
            tasks,
            ticks,
            deactivate_at,
        } => demo(config, tasks, ticks, deactivate_at)?,
        Commands::Config => {
            println!("{}", config.to_ron_string().context("Failed to render config")?);
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn demo(
    config: RuntimeConfig,
    workers: usize,
    ticks: usize,
    deactivate_at: Option<usize>,
) -> Result<()> {
    let runtime = Runtime::new(config);
    let owner = OwnerId::new(1);

    let group: TaskGroup = (0..workers)
        .map(|i| {
            let steps = i + 2;
            runtime
                .builder()
                .name(format!("worker-{}", i))
                .owner(owner)
                .spawn(move || routine::values(1..=steps))
        })
        .collect();

    let waiter = {
        let group = group.clone();
        runtime
            .builder()
            .name("waiter")
            .spawn(move || {
                routine::from_iter([
                    Step::wait(group.wait_for_completed()),
                    Step::value("all workers done"),
                ])
            })
    };

    let report = group.run();
    if !report.is_ok() {
        for (id, err) in report.errors() {
            tracing::warn!("{} failed to start: {}", id, err);
        }
    }
    waiter.run().context("Failed to start waiter")?;

    print_table(&runtime, 0);
    for _ in 0..ticks {
        let report = runtime.tick();
        for fault in &report.faults {
            tracing::warn!("{}", fault);
        }
        if deactivate_at == Some(report.tick as usize) {
            runtime
                .owner_deactivated(owner)
                .context("Failed to deactivate owner")?;
        }
        print_table(&runtime, report.tick);
    }

    Ok(())
}

fn print_table(
    runtime: &Runtime,
    tick: u64,
) {
    println!("--- tick {} ---", tick);
    println!("{:<6} {:<10} {:<10} Last Result", "Index", "Name", "State");
    for (i, task) in runtime.tasks(StateMask::ALL).iter().enumerate() {
        println!(
            "{:<6} {:<10} {:<10} {}",
            i,
            task.name(),
            task.state(),
            render_last_result(task)
        );
    }
}

fn render_last_result(task: &Task) -> String {
    if let Some(value) = task.last_result_as::<usize>() {
        value.to_string()
    } else if let Some(value) = task.last_result_as::<&'static str>() {
        value.to_string()
    } else if task.last_result().is_some() {
        "<value>".to_string()
    } else {
        "null".to_string()
    }
}
