use std::time::{Duration, Instant};

/// Runs something at most once per period.
pub struct Every {
    every: Duration,
    last: Instant,
}

impl Every {
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            last: Instant::now(),
        }
    }

    pub fn perform(&mut self, f: impl FnOnce()) {
        let now = Instant::now();
        if now - self.last >= self.every {
            self.last = now;
            f()
        }
    }
}

/// Measures the phases of something, each lap is the time since the previous one.
pub struct Stopwatch {
    start: Instant,
    last: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    pub fn lap(&mut self) -> humantime::Duration {
        let now = Instant::now();
        let lap = now - self.last;
        self.last = now;
        truncate_millis(lap).into()
    }

    pub fn total(&self) -> humantime::Duration {
        truncate_millis(self.start.elapsed()).into()
    }
}

// NOTE: humantime prints every digit down to nanoseconds otherwise
fn truncate_millis(dur: Duration) -> Duration {
    Duration::from_millis(dur.as_millis().try_into().unwrap_or(u64::MAX))
}
