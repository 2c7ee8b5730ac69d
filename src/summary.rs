//! Tracking and reporting of transfer outcomes.
use pretty_bytes::converter::convert;

use std::time::{Duration, Instant};

use crate::types::UtilResult;

/// Running totals for a single upload or download execution.
pub struct Summary {
    start_time: Instant,
    transferred: u64,
    total_bytes: u64,
    skipped: u64,
    failed: u64,
}

impl Summary {
    /// Constructs a new `Summary`, starting the clock.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            transferred: 0,
            total_bytes: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Records a completed transfer of `bytes` bytes.
    pub fn success(&mut self, bytes: u64) {
        self.transferred += 1;
        self.total_bytes += bytes;
    }

    /// Records an entry which was deliberately not transferred.
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// Records a failed transfer.
    pub fn fail(&mut self) {
        self.failed += 1;
    }

    /// Logs the totals, returning an error if any transfer failed.
    ///
    /// In dry-run mode nothing was transferred, so every "success" is
    /// reported as a planned transfer instead.
    pub fn finish(self, dry: bool) -> UtilResult<()> {
        // only report whole seconds
        let elapsed = Duration::from_secs(self.start_time.elapsed().as_secs());

        if dry {
            info!("Planned {} transfers", self.transferred);
        } else {
            info!(
                "Transferred {} files ({}) in {}",
                self.transferred,
                convert_bytes(self.total_bytes),
                humantime::format_duration(elapsed)
            );
        }

        if self.skipped > 0 {
            info!("Skipped {} entries", self.skipped);
        }

        if self.failed == 0 {
            return Ok(());
        }

        Err(format!(
            "{} of {} transfers failed",
            self.failed,
            self.failed + self.transferred
        )
        .into())
    }
}

/// Converts a byte count to a `String` representation.
pub fn convert_bytes(bytes: u64) -> String {
    convert(bytes as f64).replacen(' ', "", 1)
}
