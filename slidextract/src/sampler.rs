use std::{num::NonZeroUsize, ops::Range, time::Duration};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("the sampling interval must be longer than zero")]
    ZeroInterval,
}

/// The points in time to take frames from: `0, interval, 2 * interval, ...`, as many as
/// fit entirely within the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    interval: Duration,
    count: usize,
}

pub fn check_interval(interval: Duration) -> Result<(), SampleError> {
    if interval.is_zero() {
        Err(SampleError::ZeroInterval)
    } else {
        Ok(())
    }
}

impl Timestamps {
    pub fn new(total: Duration, interval: Duration) -> Result<Self, SampleError> {
        check_interval(interval)?;
        let count = total.as_nanos() / interval.as_nanos();
        Ok(Self {
            interval,
            count: count.try_into().unwrap_or(usize::MAX),
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn get(&self, index: usize) -> Option<Duration> {
        (index < self.count).then(|| nth(self.interval, index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Duration)> {
        self.range(0..self.count)
    }

    /// The timestamps with indices in `range`, cut off at the end of the video.
    pub fn range(&self, range: Range<usize>) -> impl Iterator<Item = (usize, Duration)> {
        let interval = self.interval;
        (range.start..range.end.min(self.count)).map(move |i| (i, nth(interval, i)))
    }

    /// Consecutive ranges of indices of at most `size` timestamps each. Only the last one
    /// can be shorter.
    pub fn batches(&self, size: NonZeroUsize) -> impl Iterator<Item = Range<usize>> {
        let count = self.count;
        let size = size.get();
        (0..count)
            .step_by(size)
            .map(move |start| start..start.saturating_add(size).min(count))
    }
}

fn nth(interval: Duration, index: usize) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let nanos = interval.as_nanos() * index as u128;
    let secs = (nanos / NANOS_PER_SEC).try_into().unwrap_or(u64::MAX);
    // NOTE: always less than a second, so it fits
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(secs, subsec)
}
