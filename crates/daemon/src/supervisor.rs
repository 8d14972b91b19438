// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outer process shell: translates termination signals into a
//! cooperative stop and re-enters the engine after abnormal exits.

use relay_engine::{Engine, StopToken};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::time::{Duration, Instant};
use tracing::{error, info};

// Granularity of the re-entry sleep, so a signal during the backoff
// still stops the daemon promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Keeps the engine loop alive until a termination signal arrives.
pub struct Supervisor {
    engine: Engine,
    conn_sleep: Duration,
    stop: StopToken,
}

impl Supervisor {
    pub fn new(engine: Engine, conn_sleep: Duration) -> Self {
        let stop = engine.stop_token();
        Self {
            engine,
            conn_sleep,
            stop,
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Route SIGINT and SIGTERM to the stop token.
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let stop = self.stop.clone();
        std::thread::spawn(move || {
            for signal in signals.forever() {
                info!("Received signal {signal}; stopping.");
                stop.stop();
            }
        });
        Ok(())
    }

    /// Start the engine and keep its loop running. An engine error is
    /// logged critical and the loop re-entered after `conn_sleep`; a
    /// cooperative stop returns cleanly.
    pub fn run(&mut self) {
        while !self.stop.is_stopped() {
            if !self.engine.is_started() {
                if let Err(err) = self.engine.start() {
                    error!("Could not start the engine: {err}");
                    self.sleep_before_reentry();
                    continue;
                }
            }
            match self.engine.run() {
                Ok(()) => {}
                Err(err) => {
                    error!("Unexpected error in the main loop: {err}");
                    self.sleep_before_reentry();
                }
            }
        }
        info!("Daemon stopped cleanly.");
    }

    fn sleep_before_reentry(&self) {
        let deadline = Instant::now() + self.conn_sleep;
        while !self.stop.is_stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
