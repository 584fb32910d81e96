//! Frames are decoded straight into a window in memory, `max_frames` at a time. The
//! first frame of every window is kept, and after that every frame that differs from
//! the last kept frame of the same window. Only the kept frames are written, with
//! one-based output indices that keep counting across windows.
//!
//! Windows never look at each other. A run of near-duplicates that spans a window
//! boundary yields one slide per window it touches.

use std::{num::NonZeroUsize, path::PathBuf};

use slidextract_common::{
    bin_common::termination::Cookie,
    utils::time::{Every, Stopwatch},
};

use crate::{
    error::JobError,
    frame::{Distance, DistanceError, Frame, Normalization},
    job::VideoJob,
    media::ExtractToMemory,
    sampler::Timestamps,
};

use super::{Mode, Policy, Summary};

/// A buffer of at most `capacity` frames that is reused for every batch.
pub struct Window {
    frames: Vec<Frame>,
    capacity: NonZeroUsize,
}

impl Window {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity.get()),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Panics if the window is already full.
    pub fn push(&mut self, frame: Frame) {
        assert!(!self.is_full(), "the window holds at most {} frames", self.capacity);
        self.frames.push(frame);
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity.get()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// The positions in `frames` to keep: the first one, then every one at least
/// `threshold` away from the previously kept one.
pub fn keep_first_of_change(
    frames: &[Frame],
    threshold: Distance,
    normalization: Normalization,
) -> Result<Vec<usize>, (usize, usize, DistanceError)> {
    if frames.is_empty() {
        return Ok(Vec::new());
    }

    let mut keep = vec![0];
    let mut cursor = 0;
    for k in 1..frames.len() {
        let dist = frames[cursor]
            .distance_to(&frames[k], normalization)
            .map_err(|e| (frames[cursor].index(), frames[k].index(), e))?;
        log::debug!(
            "Frame {} is {dist} from frame {}",
            frames[k].index(),
            frames[cursor].index()
        );
        if dist >= threshold {
            keep.push(k);
            cursor = k;
        }
    }
    Ok(keep)
}

pub fn run<D>(
    job: &VideoJob,
    timestamps: &Timestamps,
    decoder: &D,
    max_frames: NonZeroUsize,
    cookie: &Cookie,
) -> Result<Summary, JobError>
where
    D: ExtractToMemory + ?Sized,
{
    let mut watch = Stopwatch::start();
    let mut every = Every::new(std::time::Duration::from_secs(5));
    let mut window = Window::with_capacity(max_frames);
    let mut retained: Vec<PathBuf> = Vec::new();

    for batch in timestamps.batches(max_frames) {
        window.clear();

        for (index, at) in timestamps.range(batch.clone()) {
            if cookie.is_terminating() {
                return Err(JobError::Terminated);
            }

            let bytes = decoder
                .extract_to_memory(job.source(), at, job.format())
                .map_err(|source| JobError::Extract {
                    index,
                    at: at.into(),
                    source,
                })?;
            let image = job
                .format()
                .decode(&bytes)
                .map_err(|source| JobError::DecodeFrame { index, source })?;
            window.push(Frame::new(index, image));
        }

        let keep =
            keep_first_of_change(window.frames(), job.threshold(), job.normalization())
                .map_err(|(left, right, source)| JobError::Compare {
                    left,
                    right,
                    source,
                })?;

        for slot in keep {
            let frame = &window.frames()[slot];
            let path = job.slide_path(retained.len() + 1);
            log::debug!("Keeping frame {} as {}", frame.index(), path.display());
            job.format()
                .write(frame.image(), &path)
                .map_err(|source| JobError::WriteSlide {
                    path: path.clone(),
                    source,
                })?;
            retained.push(path);
        }

        every.perform(|| {
            log::info!(
                "Processed {}/{} frames, {} slides so far",
                batch.end,
                timestamps.len(),
                retained.len()
            )
        });
    }

    log::info!("Processed {} frames in {}", timestamps.len(), watch.lap());

    Ok(Summary {
        mode: Mode::Streaming { max_frames },
        policy: Policy::KeepFirstOfChange,
        sampled: timestamps.len(),
        extracted: timestamps.len(),
        failed: 0,
        retained,
    })
}
