//! Capture configuration
//!
//! Fully-resolved settings for one capture attempt, supplied by the CLI and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default serial port path.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// Default baud rate for most dev boards.
pub const DEFAULT_BAUD: u32 = 115_200;
/// Default capture output file.
pub const DEFAULT_OUTPUT: &str = "boot_capture.txt";
/// Default capture window in seconds, long enough to cover a full
/// commissioning boot.
pub const DEFAULT_DURATION_SECS: f64 = 12.0;

/// Settings for one capture attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, /dev/cu.usbmodem101)
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Where the raw capture is written
    pub output: PathBuf,
    /// Capture window in seconds
    pub duration: f64,
    /// Pulse DTR/RTS to reset the device before capturing
    pub reset: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud: DEFAULT_BAUD,
            output: PathBuf::from(DEFAULT_OUTPUT),
            duration: DEFAULT_DURATION_SECS,
            reset: true,
        }
    }
}
