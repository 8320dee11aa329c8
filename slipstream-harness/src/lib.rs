// Slipstream Harness - Round-trip conformance harness
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Slipstream Harness
//!
//! Drives the Slipstream codec through its two reference runs and checks
//! that every decoded sample matches the original.
//!
//! - [`runner`]: bulk and incremental runs
//! - [`validate`]: sample-by-sample comparison
//! - [`timing`]: per-phase wall-clock marks
//! - [`report`]: textual run reports
//! - [`config`]: JSON-loadable harness configuration
//!
//! ## Example
//!
//! ```rust
//! use slipstream::{SessionRegistry, StreamConfig, StreamId};
//! use slipstream_harness::run_bulk;
//! use slipstream_testdata::generate_three_phase;
//!
//! let buffer = generate_three_phase(4000, 400, 0.01, 0).unwrap();
//! let config = StreamConfig::new(8, 4000, 400).unwrap();
//! let mut registry = SessionRegistry::new();
//!
//! let report = run_bulk(&mut registry, config, StreamId::nil(), &buffer).unwrap();
//! assert!(report.passed());
//! println!("{}", report);
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod timing;
pub mod validate;

pub use config::{HarnessConfig, CONFIG_ENV};
pub use error::{HarnessError, Result};
pub use report::{RunMode, RunReport};
pub use runner::{run_bulk, run_bulk_with_options, run_incremental, run_incremental_with_options};
pub use timing::{PhaseTimer, Timings};
pub use validate::{compare, Field, Mismatch};

use slipstream::SessionRegistry;

/// Run both reference runs described by `config`, returning their reports
/// in order (bulk, incremental).
pub fn run_reference(config: &HarnessConfig) -> Result<Vec<RunReport>> {
    config.validate()?;
    let stream = config.stream_config()?;
    let options = config.codec_options();
    let buffer = config.waveform.generate()?;

    let mut registry = SessionRegistry::new();
    let bulk = run_bulk_with_options(
        &mut registry,
        stream,
        options.clone(),
        config.bulk_stream_id()?,
        &buffer,
    )?;
    let incremental = run_incremental_with_options(
        &mut registry,
        stream,
        options,
        config.incremental_stream_id()?,
        &buffer,
    )?;
    Ok(vec![bulk, incremental])
}
