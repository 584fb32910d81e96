pub mod disk;
pub mod streaming;

use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use slidextract_common::{args, bin_common::termination::Cookie, utils::time::Stopwatch};

use crate::{
    error::JobError,
    job::VideoJob,
    media::{
        probe::{DurationProbe, PROBE_TIMEOUT},
        ExtractToFile, ExtractToMemory,
    },
    sampler::Timestamps,
};

args! {
    #[derive(Clone, Debug, PartialEq)]
    Disk {
        "Number of ffmpeg processes to run in parallel. Ignored when processing in memory"
        [short = 'w']
        workers: NonZeroUsize = NonZeroUsize::new(8).expect("not zero");
    }
}

args! {
    #[derive(Clone, Debug, PartialEq)]
    InMemory {
        "Keep the frames in memory instead of writing every one of them to disk. This \
         forces processing to be single threaded"
        [short = 'm']
        in_memory: bool = false;

        "[In memory only] Maximum number of frames to hold in memory at a time"
        [short = 'x']
        max_frames: NonZeroUsize = NonZeroUsize::new(25).expect("not zero");
    }
}

impl InMemoryArgs {
    pub fn mode(&self, disk: &DiskArgs) -> Mode {
        if self.in_memory {
            Mode::Streaming {
                max_frames: self.max_frames,
            }
        } else {
            Mode::Disk {
                workers: disk.workers,
            }
        }
    }
}

/// How frames get from the video to the slides.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every sampled frame is written to disk by `workers` parallel extractions, and
    /// duplicates are deleted afterwards.
    Disk { workers: NonZeroUsize },
    /// At most `max_frames` frames are held in memory at a time, only the slides are
    /// written. Single threaded.
    Streaming { max_frames: NonZeroUsize },
}

/// Which frame of a run of near-duplicates survives.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Used by disk mode. A frame is removed if the one after it is a near-duplicate.
    KeepLastOfRun,
    /// Used by streaming mode. A frame is kept if it differs from the last kept frame of
    /// the same window.
    KeepFirstOfChange,
}

impl Mode {
    pub fn policy(&self) -> Policy {
        match self {
            Mode::Disk { .. } => Policy::KeepLastOfRun,
            Mode::Streaming { .. } => Policy::KeepFirstOfChange,
        }
    }
}

/// The outcome of one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub mode: Mode,
    pub policy: Policy,
    /// Number of timestamps sampled from the video.
    pub sampled: usize,
    /// Frames that were successfully extracted.
    pub extracted: usize,
    /// Frames whose extraction failed. Always zero in streaming mode, where that is
    /// fatal.
    pub failed: usize,
    /// The slides left in the output directory, in order.
    pub retained: Vec<PathBuf>,
}

/// Runs videos through the pipeline chosen by the mode.
pub struct SlideExtractor<B> {
    backend: Arc<B>,
    mode: Mode,
    cookie: Cookie,
}

impl<B> SlideExtractor<B>
where
    B: DurationProbe + ExtractToFile + ExtractToMemory + 'static,
{
    pub fn new(backend: B, mode: Mode, cookie: Cookie) -> Self {
        Self {
            backend: Arc::new(backend),
            mode,
            cookie,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Probes the duration of the video and runs the pipeline. The output directory must
    /// exist already.
    pub fn run(&self, job: &VideoJob) -> Result<Summary, JobError> {
        let mut watch = Stopwatch::start();
        log::info!("[Video: {}]", job.stem());

        let duration = self
            .backend
            .duration(job.source(), PROBE_TIMEOUT)
            .map_err(|source| JobError::Probe {
                path: job.source().to_path_buf(),
                source,
            })?;
        let timestamps = Timestamps::new(duration, job.interval())?;
        log::info!(
            "The video is {} long, sampling {} frames every {}",
            humantime::Duration::from(duration),
            timestamps.len(),
            humantime::Duration::from(job.interval()),
        );
        log::debug!("Probing took {}", watch.lap());

        let summary = match self.mode {
            Mode::Disk { workers } => disk::run(
                job,
                &timestamps,
                Arc::clone(&self.backend),
                workers,
                &self.cookie,
            ),
            Mode::Streaming { max_frames } => streaming::run(
                job,
                &timestamps,
                self.backend.as_ref(),
                max_frames,
                &self.cookie,
            ),
        }?;

        log::info!(
            "Kept {} of {} frames from {}, total: {}",
            summary.retained.len(),
            summary.sampled,
            job.stem(),
            watch.total()
        );
        Ok(summary)
    }
}
