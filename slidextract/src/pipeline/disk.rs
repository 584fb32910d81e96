//! Every sampled frame is extracted to its own file by a pool of workers. When all of
//! them are done, the files are walked in order and every frame that is a near-duplicate
//! of the frame after it is deleted, leaving the last frame of every run of similar
//! frames. Output indices are zero-based and equal to the timestamp index.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use slidextract_common::{
    bin_common::termination::Cookie,
    utils::{
        fsutils,
        time::{Every, Stopwatch},
        workers::{FinishedWorker, Tally, WorkerPool},
    },
};

use crate::{
    error::{JobError, TaskError},
    frame::Frame,
    job::VideoJob,
    media::{ExtractToFile, ImageFormat},
    sampler::Timestamps,
};

use super::{Mode, Policy, Summary};

const PROGRESS_EVERY: Duration = Duration::from_secs(5);

struct Task {
    index: usize,
    at: Duration,
    dest: PathBuf,
}

pub fn run<D>(
    job: &VideoJob,
    timestamps: &Timestamps,
    decoder: Arc<D>,
    workers: NonZeroUsize,
    cookie: &Cookie,
) -> Result<Summary, JobError>
where
    D: ExtractToFile + 'static,
{
    let mut watch = Stopwatch::start();

    let tally = extract_all(job, timestamps, decoder, workers, cookie)?;
    log::info!(
        "Extracted {} frames in {}, {} failed",
        tally.completed,
        watch.lap(),
        tally.failed
    );
    if cookie.is_terminating() {
        return Err(JobError::Terminated);
    }

    let retained = suppress_duplicates(job, timestamps.len())?;
    log::info!("Deleted similar frames in {}", watch.lap());

    Ok(Summary {
        mode: Mode::Disk { workers },
        policy: Policy::KeepLastOfRun,
        sampled: timestamps.len(),
        extracted: tally.completed,
        failed: tally.failed,
        retained,
    })
}

/// Extracts every timestamp to [`VideoJob::slide_path`] on `workers` threads and waits
/// for all of them. A failed extraction is only logged, and whatever it wrote is
/// removed, so its file will be missing.
pub fn extract_all<D>(
    job: &VideoJob,
    timestamps: &Timestamps,
    decoder: Arc<D>,
    workers: NonZeroUsize,
    cookie: &Cookie,
) -> Result<Tally, JobError>
where
    D: ExtractToFile + 'static,
{
    let video: Arc<Path> = Arc::from(job.source());
    let format = job.format();

    let pool = WorkerPool::spawn("extract", workers, cookie.clone(), move |task: Task| {
        log::debug!("Extracting frame {} to {}", task.index, task.dest.display());
        decoder
            .extract_to_file(&video, task.at, format, &task.dest)
            .map_err(|source| {
                // a killed or failed ffmpeg may have left half a file behind
                if let Err(e) = fsutils::remove_if_exists(&task.dest) {
                    log::warn!("Failed to remove {}: {e}", task.dest.display());
                }
                TaskError {
                    index: task.index,
                    at: task.at.into(),
                    source,
                }
            })
    })?;

    let mut every = Every::new(PROGRESS_EVERY);
    for (index, at) in timestamps.iter() {
        if cookie.is_terminating() {
            log::warn!("Termination requested, not dispatching any more frames");
            break;
        }

        pool.submit(Task {
            index,
            at,
            dest: job.slide_path(index),
        })?;
        every.perform(|| {
            log::info!("Dispatched {}/{} frames", index + 1, timestamps.len())
        });
    }

    let mut tally = Tally::default();
    let mut panicked = None;
    for FinishedWorker { name, result } in pool.join() {
        match result {
            Ok(worker_tally) => tally = tally + worker_tally,
            Err(panic) => {
                log::error!("Worker '{name}' panicked with: {panic}");
                panicked.get_or_insert(JobError::WorkerPanicked {
                    name,
                    message: panic.to_string(),
                });
            }
        }
    }

    match panicked {
        Some(e) => Err(e),
        None => Ok(tally),
    }
}

/// Walks the `count` frames of `job` in order, comparing every frame with the one before
/// it, and deletes the earlier one if they are closer than the threshold. The comparison
/// is always with the immediate predecessor on disk, never with the last survivor, so a
/// run of any length collapses into its last frame. Comparisons involving a missing
/// frame are skipped.
///
/// Returns the frames left on disk.
pub fn suppress_duplicates(
    job: &VideoJob,
    count: usize,
) -> Result<Vec<PathBuf>, JobError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let format = job.format();
    let mut previous = read_frame(format, &job.slide_path(0), 0)?;

    for index in 1..count {
        let current = read_frame(format, &job.slide_path(index), index)?;

        if let (Some(prev), Some(cur)) = (&previous, &current) {
            let dist = prev.distance_to(cur, job.normalization()).map_err(|source| {
                JobError::Compare {
                    left: prev.index(),
                    right: cur.index(),
                    source,
                }
            })?;

            if dist < job.threshold() {
                let path = job.slide_path(prev.index());
                log::debug!(
                    "Frame {} is {dist} from frame {}, removing it",
                    prev.index(),
                    cur.index()
                );
                fsutils::remove_if_exists(&path)
                    .map_err(|source| JobError::Remove { path, source })?;
            }
        } else {
            log::debug!(
                "Frame {} or {} is missing, not comparing them",
                index - 1,
                index
            );
        }

        previous = current;
    }

    Ok((0..count)
        .map(|index| job.slide_path(index))
        .filter(|path| path.is_file())
        .collect())
}

fn read_frame(
    format: ImageFormat,
    path: &Path,
    index: usize,
) -> Result<Option<Frame>, JobError> {
    if !path.is_file() {
        return Ok(None);
    }
    format
        .read(path)
        .map(|image| Some(Frame::new(index, image)))
        .map_err(|source| JobError::ReadFrame {
            path: path.to_path_buf(),
            source,
        })
}
