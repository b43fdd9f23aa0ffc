//! Deadline-bounded capture loop
//!
//! Polls a byte source until a wall-clock deadline passes or the caller
//! cancels, streaming everything received to a sink in arrival order. The
//! source is expected to use a short read timeout (see `serial::port`), so
//! each loop iteration returns promptly and the deadline is revisited at
//! worst once per polling cycle.

use log::trace;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Largest chunk pulled from the source per read attempt.
pub const READ_CHUNK: usize = 4096;

/// Back-off when a read attempt returns nothing, so a silent device does not
/// busy-spin the processor.
pub const EMPTY_READ_SLEEP: Duration = Duration::from_millis(20);

/// Outcome of one capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Exact number of bytes written to the sink.
    pub bytes_captured: u64,
    /// True when the loop exited early on cancellation rather than deadline.
    pub interrupted: bool,
}

/// Record bytes from `source` into `sink` until `deadline` or cancellation.
///
/// Every chunk is written and flushed immediately so partial captures survive
/// unexpected termination. Timed-out and interrupted reads are the expected
/// steady state on a quiet line and are handled by sleeping briefly; any
/// other read or write error aborts the capture.
///
/// Cancellation is observed between iterations at the latest and is a normal
/// early exit: data already written is retained and counted.
pub fn run<R, W>(
    source: &mut R,
    sink: &mut W,
    deadline: Instant,
    cancel: &AtomicBool,
) -> io::Result<CaptureOutcome>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; READ_CHUNK];
    let mut bytes_captured: u64 = 0;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Ok(CaptureOutcome {
                bytes_captured,
                interrupted: true,
            });
        }
        if Instant::now() >= deadline {
            return Ok(CaptureOutcome {
                bytes_captured,
                interrupted: false,
            });
        }

        match source.read(&mut buf) {
            Ok(0) => thread::sleep(EMPTY_READ_SLEEP),
            Ok(n) => {
                sink.write_all(&buf[..n])?;
                sink.flush()?;
                bytes_captured += n as u64;
                trace!("captured {} bytes", n);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut
                        | io::ErrorKind::WouldBlock
                        | io::ErrorKind::Interrupted
                ) =>
            {
                thread::sleep(EMPTY_READ_SLEEP);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte source that replays a script of read results, then times out
    /// forever. Stands in for a serial port with a short read timeout.
    struct ScriptedSource {
        steps: Vec<Step>,
        next: usize,
    }

    enum Step {
        Data(&'static [u8]),
        TimedOut,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self { steps, next: 0 }
        }
    }

    impl Read for ScriptedSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let step = self.steps.get(self.next);
            self.next += 1;
            match step {
                Some(Step::Data(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                }
                Some(Step::TimedOut) | None => {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"))
                }
            }
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_millis(200)
    }

    #[test]
    fn bytes_arrive_in_order_exactly_once() {
        let mut source = ScriptedSource::new(vec![
            Step::Data(b"I (123) boot: "),
            Step::TimedOut,
            Step::Data(b"ESP-IDF v5.1"),
        ]);
        let mut sink = Vec::new();
        let cancel = AtomicBool::new(false);

        let outcome = run(&mut source, &mut sink, far_deadline(), &cancel).unwrap();

        assert_eq!(sink, b"I (123) boot: ESP-IDF v5.1");
        assert_eq!(outcome.bytes_captured, sink.len() as u64);
        assert!(!outcome.interrupted);
    }

    #[test]
    fn silent_source_captures_nothing() {
        let mut source = ScriptedSource::new(vec![]);
        let mut sink = Vec::new();
        let cancel = AtomicBool::new(false);
        let deadline = Instant::now() + Duration::from_millis(60);

        let outcome = run(&mut source, &mut sink, deadline, &cancel).unwrap();

        assert_eq!(outcome.bytes_captured, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn loop_runs_at_least_the_duration_and_overshoots_at_most_one_cycle() {
        let mut source = ScriptedSource::new(vec![]);
        let mut sink = Vec::new();
        let cancel = AtomicBool::new(false);
        let duration = Duration::from_millis(60);

        let start = Instant::now();
        run(&mut source, &mut sink, start + duration, &cancel).unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= duration, "loop returned early: {:?}", elapsed);
        // one sleep interval of slack, padded for scheduler jitter
        assert!(
            elapsed < duration + Duration::from_millis(150),
            "loop overshot: {:?}",
            elapsed
        );
    }

    #[test]
    fn zero_duration_returns_immediately() {
        let mut source = ScriptedSource::new(vec![Step::Data(b"late")]);
        let mut sink = Vec::new();
        let cancel = AtomicBool::new(false);

        let outcome = run(&mut source, &mut sink, Instant::now(), &cancel).unwrap();

        assert_eq!(outcome.bytes_captured, 0);
        assert!(sink.is_empty());
    }

    /// Source that delivers one chunk and then raises the cancel flag, as a
    /// SIGINT arriving mid-capture would.
    struct CancelAfterFirst<'a> {
        sent: bool,
        cancel: &'a AtomicBool,
    }

    impl Read for CancelAfterFirst<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                self.cancel.store(true, Ordering::SeqCst);
                return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"boot");
            Ok(4)
        }
    }

    #[test]
    fn cancellation_keeps_partial_data() {
        let cancel = AtomicBool::new(false);
        let mut source = CancelAfterFirst {
            sent: false,
            cancel: &cancel,
        };
        let mut sink = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);

        let outcome = run(&mut source, &mut sink, deadline, &cancel).unwrap();

        assert!(outcome.interrupted);
        assert_eq!(outcome.bytes_captured, 4);
        assert_eq!(sink, b"boot");
    }

    struct BrokenSource;

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"))
        }
    }

    #[test]
    fn hard_read_error_propagates() {
        let mut sink = Vec::new();
        let cancel = AtomicBool::new(false);

        let err = run(&mut BrokenSource, &mut sink, far_deadline(), &cancel).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
