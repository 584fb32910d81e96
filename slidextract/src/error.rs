use std::{io, path::PathBuf};

use slidextract_common::utils::workers::PoolError;

use crate::frame::DistanceError;
use crate::media::codec::CodecError;
use crate::sampler::SampleError;

/// A failure of ffmpeg, ffprobe or whatever else is doing the decoding.
#[derive(thiserror::Error, Debug)]
pub enum ExternalError {
    #[error(
        "'{program}' was not found, make sure ffmpeg is installed and visible on PATH"
    )]
    NotFound { program: String },

    #[error("failed to run '{program}'")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },

    // NOTE: ffmpeg can be very chatty on stderr, only the start of it is kept
    #[error("'{program}' failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' did not finish within {timeout}")]
    TimedOut {
        program: String,
        timeout: humantime::Duration,
    },

    #[error("unexpected output from '{program}': {reason}")]
    Output { program: String, reason: String },
}

/// Failure of a single extraction task in disk mode. These are logged and counted, the
/// frame is just missing afterwards.
#[derive(thiserror::Error, Debug)]
#[error("failed to extract frame {index} at {at}: {source}")]
pub struct TaskError {
    pub index: usize,
    pub at: humantime::Duration,
    #[source]
    pub source: ExternalError,
}

/// Anything that stops the processing of a video. In batch mode this stops the whole
/// batch as well.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("the video has no usable file name: {}", .0.display())]
    NoStem(PathBuf),

    #[error("failed to get the duration of {}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: ExternalError,
    },

    #[error("failed to extract frame {index} at {at}")]
    Extract {
        index: usize,
        at: humantime::Duration,
        #[source]
        source: ExternalError,
    },

    #[error("failed to decode frame {index}")]
    DecodeFrame {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error("failed to read the frame at {}", .path.display())]
    ReadFrame {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to write the slide to {}", .path.display())]
    WriteSlide {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to compare frame {left} with frame {right}")]
    Compare {
        left: usize,
        right: usize,
        #[source]
        source: DistanceError,
    },

    #[error("failed to remove the duplicate {}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create the output directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list the videos in {}", .path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run the extraction workers")]
    Pool(#[from] PoolError),

    #[error("extraction worker '{name}' panicked: {message}")]
    WorkerPanicked { name: String, message: String },

    #[error("failed to serialize the report for {}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: ron::Error,
    },

    #[error("failed to write the report to {}", .path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("termination was requested")]
    Terminated,
}
