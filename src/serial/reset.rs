//! DTR/RTS reset sequencing
//!
//! Most dev boards wire DTR and RTS through the USB-to-serial bridge to the
//! reset and boot-strap pins, so pulsing both lines forces a hardware reset
//! out of whatever state the firmware was in.

use super::SerialConnection;
use log::debug;
use std::io;
use std::thread;
use std::time::Duration;

/// Hold time for each edge of the reset pulse.
pub const SETTLE: Duration = Duration::from_millis(50);

/// Pulse DTR and RTS low then high to force a device reboot.
///
/// Signal-level faults are not distinguished from other I/O errors; anything
/// the bridge reports propagates as-is.
pub fn pulse_reset(conn: &mut SerialConnection) -> io::Result<()> {
    debug!("pulsing DTR/RTS on {}", conn.config().port_path);
    conn.set_dtr(false)?;
    conn.set_rts(false)?;
    thread::sleep(SETTLE);
    conn.set_dtr(true)?;
    conn.set_rts(true)?;
    thread::sleep(SETTLE);
    Ok(())
}
