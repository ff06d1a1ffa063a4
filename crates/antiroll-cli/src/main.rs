//! `antiroll-cli` – anti-rollover controller bootstrap
//!
//! The `antiroll` binary:
//!
//! 1. Initialises tracing (console, optionally JSON and OTLP).
//! 2. Loads `~/.antiroll/config.toml`, writing the defaults on first run,
//!    and applies `ANTIROLL_*` overrides.
//! 3. Runs the [`ControlLoop`] against the simulated bench drive, printing
//!    every control mode change.
//! 4. Stops on **Ctrl-C** and prints the loop statistics.

mod config;
mod scenario;

use antiroll_hal::sim::SimWheelDrive;
use antiroll_runtime::{ControlLoop, DifferentialController, LoopReport, init_tracing};
use antiroll_types::ControlState;
use colored::Colorize;
use tokio::sync::watch;
use tracing::{error, warn};

fn main() {
    let _telemetry = init_tracing("antiroll");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    if let Err(e) = cfg.validate() {
        error!(error = %e, "refusing to start with invalid configuration");
        println!("{}: {}", "Invalid configuration".red().bold(), e);
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start Tokio runtime");
            std::process::exit(1);
        }
    };

    let report = runtime.block_on(run(cfg));
    print_report(&report);
}

async fn run(cfg: config::Config) -> LoopReport {
    let controller = match DifferentialController::new(cfg.controller) {
        Ok(c) => c,
        Err(e) => {
            println!("{}: {}", "Controller error".red(), e);
            return LoopReport::default();
        }
    };
    let control = ControlLoop::new(
        controller,
        Box::new(scenario::bench_drive(cfg.control_loop.sensor_timeout())),
        Box::new(SimWheelDrive::new("bench_wheels")),
        cfg.control_loop,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping control loop …".yellow().bold());
        stop_tx.send_replace(true);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop the process externally");
    }

    tokio::spawn(print_mode_changes(control.subscribe()));

    println!(
        "  Running bench drive every {} ms.  Press {} to stop.\n",
        cfg.control_loop.sample_period_ms,
        "Ctrl-C".bold()
    );
    control.run(stop_rx).await
}

async fn print_mode_changes(mut rx: watch::Receiver<ControlState>) {
    let mut active = rx.borrow_and_update().control_active;
    while rx.changed().await.is_ok() {
        let state = *rx.borrow_and_update();
        if state.control_active == active {
            continue;
        }
        active = state.control_active;
        if active {
            println!(
                "  {} left {:.2}  right {:.2}",
                "ACTIVE  ".red().bold(),
                state.left_speed,
                state.right_speed
            );
        } else {
            println!(
                "  {} left {:.2}  right {:.2}",
                "INACTIVE".green().bold(),
                state.left_speed,
                state.right_speed
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// First run
// ─────────────────────────────────────────────────────────────────────────────

fn first_run() -> config::Config {
    let mut cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "antiroll".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Differential-drive anti-rollover controller");
    println!();
}

fn print_report(report: &LoopReport) {
    println!();
    println!("{}", "  Control loop summary".bold());
    println!("    ticks             {}", report.ticks);
    println!("    commanded         {}", report.commanded);
    println!("    rate limited      {}", report.rate_limited);
    println!("    sensor timeouts   {}", report.sensor_timeouts);
    println!("    sensor faults     {}", report.sensor_faults);
    println!("    rejected samples  {}", report.rejected_samples);
    println!("    actuation faults  {}", report.actuation_faults);
    let (left, right) = report.final_state.speeds();
    println!("    final speeds      left {left:.2}  right {right:.2}");
    println!("{}", "  ✓ Exiting antiroll.".green());
}
