//! Turning one video or a directory of videos into jobs. Every video gets its own fresh
//! output directory, named after its file stem, inside a shared output root.

use std::{fs, path::Path};

use slidextract_common::utils::fsutils;

use crate::{
    error::JobError,
    job::{SamplingArgs, VideoJob},
    pipeline::Summary,
};

/// Creates the output root and all of its parents. It is fine if it exists already.
pub fn ensure_out_root(out_root: &Path) -> Result<(), JobError> {
    fs::create_dir_all(out_root).map_err(|source| JobError::CreateDir {
        path: out_root.to_path_buf(),
        source,
    })
}

/// Creates the job and its output directory. The directory must not exist, slides from
/// an earlier run would otherwise be mixed with the new ones.
pub fn prepare_job(
    video: &Path,
    out_root: &Path,
    sampling: &SamplingArgs,
) -> Result<VideoJob, JobError> {
    let job = VideoJob::new(video, out_root, sampling)?;
    fs::create_dir(job.output_dir()).map_err(|source| JobError::CreateDir {
        path: job.output_dir().to_path_buf(),
        source,
    })?;
    Ok(job)
}

pub fn run_single<F>(
    video: &Path,
    out_root: &Path,
    sampling: &SamplingArgs,
    mut run: F,
) -> Result<Summary, JobError>
where
    F: FnMut(&VideoJob) -> Result<Summary, JobError>,
{
    let job = prepare_job(video, out_root, sampling)?;
    run(&job)
}

/// Runs every regular file directly inside `videos_dir`, in file name order, one after
/// the other. The first failure stops the batch, the videos before it keep their
/// slides.
pub fn run_batch<F>(
    videos_dir: &Path,
    out_root: &Path,
    sampling: &SamplingArgs,
    mut run: F,
) -> Result<Vec<Summary>, JobError>
where
    F: FnMut(&VideoJob) -> Result<Summary, JobError>,
{
    let videos = fsutils::sorted_files(videos_dir).map_err(|source| JobError::ListDir {
        path: videos_dir.to_path_buf(),
        source,
    })?;
    log::info!(
        "Found {} videos in {}",
        videos.len(),
        videos_dir.display()
    );

    let mut summaries = Vec::with_capacity(videos.len());
    for (i, video) in videos.iter().enumerate() {
        log::info!("Video {}/{}: {}", i + 1, videos.len(), video.display());
        summaries.push(run_single(video, out_root, sampling, &mut run)?);
    }
    Ok(summaries)
}
