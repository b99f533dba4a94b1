use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use super::sim_error::SimError;

/// A named polling loop.
///
/// The `Ticker` runs a callback on its own thread every `interval`, as long as
/// the shared `running` flag is set. Time spent inside the callback is taken
/// off the following sleep, so slow ticks do not drift the schedule.
pub struct Ticker {
    name: String,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl Ticker {
    /// Creates a new ticker bound to the given running flag.
    pub fn new(name: &str, interval: Duration, running: Arc<AtomicBool>) -> Self {
        Ticker {
            name: name.to_string(),
            interval,
            running,
        }
    }

    /// Starts the loop and executes the callback on each tick with the tick's
    /// start instant and the tick count.
    pub fn start(
        self,
        mut tick_callback: impl FnMut(Instant, usize) + Send + 'static,
    ) -> Result<JoinHandle<()>, SimError> {
        let thread_name = format!("{}-ticker", self.name);
        let error = format!("Failed to start the {} thread.", self.name);
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let mut tick_count = 0;
                while self.running.load(Ordering::SeqCst) {
                    let now = Instant::now();

                    tick_count += 1;
                    tick_callback(now, tick_count);

                    let elapsed = now.elapsed();
                    thread::sleep(self.interval.saturating_sub(elapsed));
                }
            })
            .map_err(|_| SimError::ThreadStartError(error))
    }
}
