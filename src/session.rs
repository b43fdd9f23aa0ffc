//! One capture session, from port open to port close
//!
//! A session owns the serial connection for the lifetime of one capture.
//! Dropping the session closes the port, so the handle is released exactly
//! once on every exit path, including errors and interruption.

use crate::capture;
use crate::config::CaptureConfig;
use crate::serial::{reset, PortConfig, SerialConnection};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

/// What one capture produced. `bytes_captured` equals the exact length of
/// data written to `output`.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    pub bytes_captured: u64,
    pub output: PathBuf,
    pub interrupted: bool,
}

/// Owns one open serial connection for one capture attempt.
pub struct CaptureSession {
    conn: SerialConnection,
    config: CaptureConfig,
}

impl CaptureSession {
    /// Open the configured port. Stale buffered data is discarded as part of
    /// the open, and nothing is written to the output path yet, so a failed
    /// open leaves no file behind.
    pub fn start(config: &CaptureConfig) -> Result<Self> {
        let port_config = PortConfig::new(&config.port).with_baud_rate(config.baud);
        let conn = SerialConnection::open(port_config)?;
        info!("opened {} at {} baud", config.port, config.baud);
        Ok(Self {
            conn,
            config: config.clone(),
        })
    }

    /// Force a hardware reset by pulsing DTR/RTS.
    pub fn reset(&mut self) -> Result<()> {
        reset::pulse_reset(&mut self.conn)
            .with_context(|| format!("failed to pulse reset on {}", self.config.port))
    }

    /// Record incoming bytes to the output file until the configured duration
    /// elapses or `cancel` is raised. Interruption is a normal early exit;
    /// the partial file is kept and counted.
    pub fn capture(&mut self, cancel: &AtomicBool) -> Result<CaptureResult> {
        let mut sink = File::create(&self.config.output)
            .with_context(|| format!("failed to create {}", self.config.output.display()))?;

        let deadline = Instant::now() + Duration::from_secs_f64(self.config.duration.max(0.0));
        let outcome = capture::run(&mut self.conn, &mut sink, deadline, cancel)
            .with_context(|| format!("capture from {} failed", self.config.port))?;

        debug!(
            "capture finished: {} bytes, interrupted: {}",
            outcome.bytes_captured, outcome.interrupted
        );
        Ok(CaptureResult {
            bytes_captured: outcome.bytes_captured,
            output: self.config.output.clone(),
            interrupted: outcome.interrupted,
        })
    }
}
