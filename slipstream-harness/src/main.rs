// Slipstream Harness - Reference driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Slipstream Harness
//!
//! Runs the bulk and incremental reference runs and prints their reports.
//! Exits non-zero when either run fails to decode or finds a mismatch.
//!
//! ## Usage
//!
//! ```bash
//! # Reference fixture
//! slipstream-harness
//!
//! # Custom parameters
//! SLIPSTREAM_HARNESS_CONFIG=harness.json RUST_LOG=debug slipstream-harness
//! ```

use std::process::ExitCode;

use slipstream_harness::{run_reference, HarnessConfig, Result};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("Failed to load configuration: {}", e);
            return ExitCode::from(2);
        }
    };
    init_tracing(&config.log_level);

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Harness aborted: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Returns whether every run passed
fn run(config: &HarnessConfig) -> Result<bool> {
    info!("Slipstream Harness v{}", env!("CARGO_PKG_VERSION"));
    println!("using Slipstream {}", slipstream::VERSION);

    let reports = run_reference(config)?;
    for (n, report) in reports.iter().enumerate() {
        println!("\n*** {}. {} ***\n", n + 1, report.mode);
        println!("{}", report);
    }

    Ok(reports.iter().all(|r| r.passed()))
}
