//! Boot Capture
//!
//! Captures the boot-time serial output of an embedded device to verify
//! commissioning behavior: provisioning QR code generation, BLE advertising
//! startup, and crash detection. Opens a serial connection, optionally
//! triggers a hardware reset by pulsing DTR/RTS, records incoming bytes for a
//! fixed duration, then scans the capture for known status markers.
//!
//! # Usage
//!
//! ```bash
//! # Capture with defaults (12 s at 115200 baud, reset first)
//! boot-capture capture -p /dev/ttyUSB0
//!
//! # Longer window, custom output, no reset
//! boot-capture capture -p /dev/cu.usbmodem101 -d 15 -o my_boot.txt --no-reset
//!
//! # Re-scan an existing capture file (requires no serial feature)
//! boot-capture analyze boot_capture.txt
//!
//! # List candidate serial ports (requires serial feature)
//! boot-capture ports
//! ```

mod analyze;
mod capture;
#[cfg(feature = "serial")]
mod config;
#[cfg(feature = "serial")]
mod serial;
#[cfg(feature = "serial")]
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

/// Raised by SIGINT; the capture loop observes it between iterations.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Boot Capture
///
/// Capture and analyze embedded device boot logs over serial
#[derive(Parser)]
#[command(name = "boot-capture")]
#[command(version = "0.1.0")]
#[command(about = "Capture and analyze embedded device boot logs over serial")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture boot output from a serial port
    #[cfg(feature = "serial")]
    Capture {
        /// Serial port path (e.g., /dev/ttyUSB0, /dev/cu.usbmodem101)
        #[arg(short, long, default_value = config::DEFAULT_PORT)]
        port: String,

        /// Baud rate
        #[arg(short, long, default_value_t = config::DEFAULT_BAUD)]
        baud: u32,

        /// Output file path
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Capture duration in seconds
        #[arg(short, long, default_value_t = config::DEFAULT_DURATION_SECS)]
        duration: f64,

        /// Skip the DTR/RTS toggle (no device reset)
        #[arg(long)]
        no_reset: bool,
    },

    /// Capture boot output from a serial port (requires --features serial)
    #[cfg(not(feature = "serial"))]
    Capture,

    /// Scan an existing capture file for boot markers
    Analyze {
        /// Path to a raw capture file
        file: PathBuf,
    },

    /// List available serial ports
    #[cfg(feature = "serial")]
    Ports,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(unix)]
    install_sigint_handler();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "serial")]
        Commands::Capture {
            port,
            baud,
            output,
            duration,
            no_reset,
        } => handle_capture(config::CaptureConfig {
            port,
            baud,
            output,
            duration,
            reset: !no_reset,
        }),

        #[cfg(not(feature = "serial"))]
        Commands::Capture => anyhow::bail!(
            "serial support was not compiled in; rebuild with --features serial"
        ),

        Commands::Analyze { file } => handle_analyze(&file),

        #[cfg(feature = "serial")]
        Commands::Ports => {
            serial::port::print_ports().context("failed to enumerate serial ports")?;
            Ok(())
        }
    }
}

#[cfg(feature = "serial")]
fn handle_capture(config: config::CaptureConfig) -> Result<()> {
    use chrono::Local;
    use log::warn;
    use session::CaptureSession;

    let mut session = CaptureSession::start(&config)?;

    if config.reset {
        println!(
            "{} Resetting device on {}...",
            "[*]".cyan().bold(),
            config.port.white()
        );
        session.reset()?;
    }

    println!(
        "{} {} Capturing for {:.1}s to {}...",
        "[*]".cyan().bold(),
        Local::now()
            .format("%H:%M:%S%.3f")
            .to_string()
            .dimmed(),
        config.duration,
        config.output.display()
    );

    let result = session.capture(&INTERRUPTED)?;
    // close the port before reading the capture back
    drop(session);

    if result.interrupted {
        println!("\n{}", "Capture interrupted by user".yellow());
    }

    println!(
        "{} Captured {} bytes to {}",
        "[OK]".green().bold(),
        result.bytes_captured,
        result.output.display()
    );

    if result.bytes_captured == 0 {
        warn!("no data captured from {}", config.port);
        println!("{}", "WARNING: No data captured. Check that:".yellow().bold());
        println!("  - The device is connected to the correct port");
        println!("  - No other program (e.g., idf.py monitor) is using the port");
        println!("  - The baud rate matches the device configuration");
    }

    let bytes = std::fs::read(&result.output)
        .with_context(|| format!("failed to read back {}", result.output.display()))?;
    analyze::analyze(&bytes).print();

    Ok(())
}

fn handle_analyze(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    println!(
        "{} Scanning {} ({} bytes)",
        "[*]".cyan().bold(),
        path.display().to_string().white(),
        bytes.len()
    );
    analyze::analyze(&bytes).print();

    Ok(())
}

#[cfg(unix)]
extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, std::sync::atomic::Ordering::SeqCst);
}

#[cfg(unix)]
fn install_sigint_handler() {
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }
}
