//! Background loop copying input reports into the shared [`ReportBuffer`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::priority;
use crate::report::ReportBuffer;
use crate::types::PollStats;
use crate::usb::{InputPipe, TransferError};

const THREAD_NAME: &str = "xpad360-poller";
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Polling period for an endpoint interval and a configured floor.
pub(crate) fn effective_interval(endpoint: Duration, floor: Duration) -> Duration {
    endpoint.max(floor).max(MIN_INTERVAL)
}

#[derive(Debug, Default)]
struct Counters {
    reports: AtomicU64,
    failures: AtomicU64,
}

/// Owns the polling thread of one connection. Dropping it stops and joins
/// the thread.
#[derive(Debug)]
pub(crate) struct Poller {
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Starts polling `pipe` every `interval`, publishing into `buffer`.
    pub(crate) fn spawn(
        pipe: Box<dyn InputPipe>,
        buffer: Arc<ReportBuffer>,
        interval: Duration,
        high_priority: bool,
    ) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let interval = interval.max(MIN_INTERVAL);

        let worker = Worker {
            pipe,
            buffer,
            interval,
            shutdown: Arc::clone(&shutdown),
            counters: Arc::clone(&counters),
        };
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                if high_priority {
                    if let Err(e) = priority::raise_current_thread() {
                        log::debug!("poller keeps default priority: {e}");
                    }
                }
                worker.run();
            })
            .map_err(|e| Error::Backend(format!("failed to spawn {THREAD_NAME}: {e}")))?;

        Ok(Self {
            shutdown,
            counters,
            handle: Some(handle),
        })
    }

    pub(crate) fn stats(&self) -> PollStats {
        PollStats {
            reports: self.counters.reports.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Requests shutdown and waits for the thread to exit.
    pub(crate) fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("{THREAD_NAME} thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    pipe: Box<dyn InputPipe>,
    buffer: Arc<ReportBuffer>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl Worker {
    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn run(mut self) {
        log::debug!("polling every {:?}", self.interval);
        let mut scratch = vec![0u8; self.buffer.len()];
        let mut failing = false;

        loop {
            if self.stopping() {
                break;
            }
            thread::sleep(self.interval);
            if self.stopping() {
                break;
            }

            match self.pipe.transfer(&mut scratch) {
                Ok(0) | Err(TransferError::Timeout) => {}
                // Counters move first so a reader seeing the data also sees them.
                Ok(n) => {
                    self.counters.reports.fetch_add(1, Ordering::Relaxed);
                    self.buffer.publish(&scratch[..n]);
                    failing = false;
                }
                Err(e) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    self.buffer.clear();
                    if failing {
                        log::debug!("input transfer failed again: {e}");
                    } else {
                        log::warn!("input transfer failed, report cleared: {e}");
                        failing = true;
                    }
                }
            }
        }
        log::debug!("poller stopped");
    }
}
