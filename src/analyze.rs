//! Post-capture boot log analysis
//!
//! Scans a captured boot log for a fixed set of commissioning markers:
//! QR code emission, passcode failures, BLE advertising, transport errors,
//! and crash indicators. Matching is plain case-sensitive substring search
//! anywhere in the decoded text; the decode is lossy so garbled bytes from a
//! baud-rate mismatch never make analysis fail.

use colored::Colorize;
use serde::Serialize;

/// Which report flag a marker sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    QrCode,
    PasscodeFailure,
    Advertising,
    TransportError,
    Crash,
}

/// A known boot log marker.
pub struct Marker {
    /// Exact substring to search for.
    pub pattern: &'static str,
    /// Report flag set when the pattern is found.
    pub flag: Flag,
    /// What finding this pattern means for the operator.
    pub meaning: &'static str,
}

/// Markers emitted by the Matter stack during commissioning boot. Adding a
/// marker is a new table row; several rows may feed the same flag.
pub const BOOT_MARKERS: &[Marker] = &[
    Marker {
        pattern: "SetupQRCode",
        flag: Flag::QrCode,
        meaning: "provisioning QR code emitted",
    },
    Marker {
        pattern: "GetSetupPasscode() failed",
        flag: Flag::PasscodeFailure,
        meaning: "setup passcode generation failed",
    },
    Marker {
        pattern: "CHIPoBLE advertising started",
        flag: Flag::Advertising,
        meaning: "BLE commissioning active",
    },
    Marker {
        pattern: "ERROR setting up transport",
        flag: Flag::TransportError,
        meaning: "transport setup error",
    },
    Marker {
        pattern: "CONFLICT",
        flag: Flag::Crash,
        meaning: "device crash during boot",
    },
    Marker {
        pattern: "abort()",
        flag: Flag::Crash,
        meaning: "device crash during boot",
    },
];

/// One boolean per known marker. All-false is a valid outcome for a log
/// that matched nothing (unclassified), not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub qr_code_present: bool,
    pub passcode_failure: bool,
    pub advertising_started: bool,
    pub transport_error: bool,
    pub crash_detected: bool,
}

impl AnalysisReport {
    fn set(&mut self, flag: Flag) {
        match flag {
            Flag::QrCode => self.qr_code_present = true,
            Flag::PasscodeFailure => self.passcode_failure = true,
            Flag::Advertising => self.advertising_started = true,
            Flag::TransportError => self.transport_error = true,
            Flag::Crash => self.crash_detected = true,
        }
    }

    /// True if any marker matched.
    pub fn any(&self) -> bool {
        self.qr_code_present
            || self.passcode_failure
            || self.advertising_started
            || self.transport_error
            || self.crash_detected
    }

    /// Print the operator-facing summary of the matched markers.
    pub fn print(&self) {
        if self.qr_code_present {
            println!("{} Found QR code in output", "[OK]".green().bold());
        }
        if self.passcode_failure {
            println!(
                "{} QR code generation failed (GetSetupPasscode error)",
                "[WARNING]".yellow().bold()
            );
        }
        if self.advertising_started {
            println!("{} BLE commissioning active", "[OK]".green().bold());
        }
        if self.transport_error {
            println!(
                "{} Transport setup error detected",
                "[WARNING]".yellow().bold()
            );
        }
        if self.crash_detected {
            println!(
                "{} Device crash detected in boot log",
                "[WARNING]".yellow().bold()
            );
        }
        if !self.any() {
            println!("{}", "No known boot markers found".dimmed());
        }
    }
}

/// Decode the capture permissively and test every known marker.
///
/// Pure function of the input bytes: same bytes, same report.
pub fn analyze(bytes: &[u8]) -> AnalysisReport {
    let text = String::from_utf8_lossy(bytes);
    let mut report = AnalysisReport::default();
    for marker in BOOT_MARKERS {
        if text.contains(marker.pattern) {
            report.set(marker.flag);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_table_is_well_formed() {
        for marker in BOOT_MARKERS {
            assert!(!marker.pattern.is_empty());
            assert!(!marker.meaning.is_empty());
        }
    }

    #[test]
    fn qr_code_sets_only_its_flag() {
        let report = analyze(b"CHIP:SVR: SetupQRCode: [MT:Y.K9042C00KA0648G00]");
        assert!(report.qr_code_present);
        assert!(!report.passcode_failure);
        assert!(!report.crash_detected);
    }

    #[test]
    fn passcode_failure_detected() {
        let report = analyze(b"E (1043) chip[DL]: GetSetupPasscode() failed: Error 0x03");
        assert!(report.passcode_failure);
        assert!(!report.qr_code_present);
    }

    #[test]
    fn independent_flags_can_be_true_together() {
        let log = b"I (900) chip[DL]: CHIPoBLE advertising started\n\
                    E (910) chip[IN]: ERROR setting up transport\n";
        let report = analyze(log);
        assert!(report.advertising_started);
        assert!(report.transport_error);
        assert!(!report.crash_detected);
    }

    #[test]
    fn crash_matches_either_conflict_or_abort() {
        assert!(analyze(b"rebooted after CONFLICT in nvs").crash_detected);
        assert!(analyze(b"abort() was called at PC 0x40081234").crash_detected);
    }

    #[test]
    fn empty_capture_is_unclassified() {
        let report = analyze(b"");
        assert_eq!(report, AnalysisReport::default());
        assert!(!report.any());
    }

    #[test]
    fn invalid_utf8_noise_does_not_hide_markers() {
        let mut noisy: Vec<u8> = vec![0xff, 0xfe, 0x80, 0xc3];
        noisy.extend_from_slice(b"abort() was called");
        noisy.extend_from_slice(&[0xf0, 0x28, 0x8c, 0x28]);
        let report = analyze(&noisy);
        assert!(report.crash_detected);
    }

    #[test]
    fn analysis_is_idempotent() {
        let log = b"SetupQRCode\nCHIPoBLE advertising started\n\xff\xff";
        assert_eq!(analyze(log), analyze(log));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!analyze(b"setupqrcode").qr_code_present);
        assert!(!analyze(b"conflict").crash_detected);
    }
}
