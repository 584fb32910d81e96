use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use slidextract_common::{args, utils::fsutils::file_stem_lossy};

use crate::{
    error::JobError,
    frame::{Distance, Normalization},
    media::ImageFormat,
    sampler,
};

args! {
    #[derive(Clone, Debug, PartialEq)]
    Sampling {
        "Time between frames"
        [short = 't']
        interval: humantime::Duration = Duration::from_millis(500).into();

        "Threshold distance to recognize as a different frame"
        [short = 'd']
        threshold: Distance = 1000;

        "How the distance between two frames is scaled. Thresholds for `raw` have to be \
         tuned for every resolution"
        normalization: Normalization = Normalization::Pixel;

        "File format of the slides"
        [short = 'f']
        format: ImageFormat = ImageFormat::Bmp;
    }
}

/// Everything needed to turn one video into slides. Nothing in it changes once a
/// pipeline has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    source: PathBuf,
    stem: String,
    interval: Duration,
    threshold: Distance,
    normalization: Normalization,
    format: ImageFormat,
    output_dir: PathBuf,
}

impl VideoJob {
    /// A job for `source` that places its slides in `<out_root>/<stem of source>`.
    /// Fails on a zero interval.
    pub fn new(
        source: impl Into<PathBuf>,
        out_root: impl AsRef<Path>,
        sampling: &SamplingArgs,
    ) -> Result<Self, JobError> {
        let source = source.into();
        let interval: Duration = (*sampling.interval()).into();
        sampler::check_interval(interval)?;

        let stem = match file_stem_lossy(&source) {
            Some(stem) if !stem.is_empty() => stem,
            _ => return Err(JobError::NoStem(source)),
        };
        let output_dir = out_root.as_ref().join(&stem);

        Ok(Self {
            source,
            stem,
            interval,
            threshold: *sampling.threshold(),
            normalization: *sampling.normalization(),
            format: *sampling.format(),
            output_dir,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn threshold(&self) -> Distance {
        self.threshold
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `frame_<stem>_<index>.<ext>` inside the output directory.
    pub fn slide_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!(
            "frame_{}_{}.{}",
            self.stem,
            index,
            self.format.extension()
        ))
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use crate::sampler::SampleError;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        sampling: SamplingCli,
    }

    #[test]
    fn names_from_stem() {
        let sampling = SamplingArgs::default().with_format(ImageFormat::Png);
        let job = VideoJob::new("videos/lecture 3.mp4", "out", &sampling).unwrap();
        assert_eq!("lecture 3", job.stem());
        assert_eq!(Path::new("out/lecture 3"), job.output_dir());
        assert_eq!(
            Path::new("out/lecture 3/frame_lecture 3_12.png"),
            job.slide_path(12)
        );
    }

    #[test]
    fn defaults() {
        let job = VideoJob::new("a.mkv", "out", &SamplingArgs::default()).unwrap();
        assert_eq!(Duration::from_millis(500), job.interval());
        assert_eq!(1000, job.threshold());
        assert_eq!(Normalization::Pixel, job.normalization());
        assert_eq!(ImageFormat::Bmp, job.format());
    }

    #[test]
    fn zero_interval_rejected() {
        let sampling = SamplingArgs::default().with_interval(Duration::ZERO.into());
        assert!(matches!(
            VideoJob::new("a.mkv", "out", &sampling),
            Err(JobError::Sample(SampleError::ZeroInterval))
        ));
    }

    #[test]
    fn no_stem() {
        assert!(matches!(
            VideoJob::new("/", "out", &SamplingArgs::default()),
            Err(JobError::NoStem(_))
        ));
    }

    #[test]
    fn format_names_on_the_command_line() {
        for (name, format) in [
            ("bmp", ImageFormat::Bmp),
            ("png", ImageFormat::Png),
            ("jpg", ImageFormat::Jpg),
            ("jpeg", ImageFormat::Jpeg),
        ] {
            let cli = Cli::try_parse_from(["prog", "--format", name]).unwrap();
            assert_eq!(format, *cli.sampling.to_args().format(), "{name}");
        }
        assert!(Cli::try_parse_from(["prog", "-f", "gif"]).is_err());
        assert!(Cli::try_parse_from(["prog", "-f", "BMP"]).is_err());

        let cli = Cli::try_parse_from(["prog"]).unwrap();
        assert_eq!(SamplingArgs::default(), cli.sampling.to_args());
    }
}
