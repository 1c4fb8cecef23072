/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Fixed cadence sampling of a [`Registry`].

use embedded_hal::delay::DelayNs;

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use crate::registry::{Registry, ScanSummary};

/// Default period between scans, in milliseconds
pub const POLL_INTERVAL_MS: u32 = 20;

/// Drives [`Registry::scan_all`] once per tick.
///
/// Bus transfers are blocking, so a tick that takes longer than the
/// interval simply delays the next one.
pub struct Poller {
    interval_ms: u32,
    ticks: u32,
    failures: u32,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(POLL_INTERVAL_MS)
    }
}

impl Poller {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            ticks: 0,
            failures: 0,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Number of completed ticks
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Failed reads across all ticks
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Scan once. Call this from a timer callback firing every [`interval_ms`](Self::interval_ms).
    pub fn tick<const N: usize>(&mut self, registry: &mut Registry<'_, N>) -> ScanSummary {
        let summary = registry.scan_all();
        self.ticks = self.ticks.wrapping_add(1);
        self.failures = self.failures.saturating_add(summary.failed as u32);

        #[cfg(feature = "rttdebug")]
        if summary.failed > 0 {
            rprintln!("tick {}: {} read failures", self.ticks, summary.failed);
        }

        summary
    }

    /// Scan `count` times, sleeping the interval after each scan
    pub fn run_for<const N: usize>(
        &mut self,
        registry: &mut Registry<'_, N>,
        delay_source: &mut impl DelayNs,
        count: u32,
    ) {
        for _ in 0..count {
            self.tick(registry);
            delay_source.delay_ms(self.interval_ms);
        }
    }

    /// Scan forever
    pub fn run<const N: usize>(
        &mut self,
        registry: &mut Registry<'_, N>,
        delay_source: &mut impl DelayNs,
    ) -> ! {
        loop {
            self.tick(registry);
            delay_source.delay_ms(self.interval_ms);
        }
    }
}
