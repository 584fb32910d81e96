use std::{fs, path::PathBuf};

use crate::{
    error::JobError,
    frame::{Distance, Normalization},
    job::VideoJob,
    media::ImageFormat,
    pipeline::{Mode, Policy, Summary},
};

pub const REPORT_FILENAME: &str = "slidextract.ron";

/// What was done to one video, written next to its slides when asked for.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub video: PathBuf,
    pub interval: std::time::Duration,
    pub threshold: Distance,
    pub normalization: Normalization,
    pub format: ImageFormat,
    pub mode: Mode,
    pub policy: Policy,
    pub sampled: usize,
    pub extracted: usize,
    pub failed: usize,
    /// File names of the slides, relative to the directory of the report.
    pub slides: Vec<String>,
}

impl Report {
    pub fn new(job: &VideoJob, summary: &Summary) -> Self {
        Self {
            video: job.source().to_path_buf(),
            interval: job.interval(),
            threshold: job.threshold(),
            normalization: job.normalization(),
            format: job.format(),
            mode: summary.mode,
            policy: summary.policy,
            sampled: summary.sampled,
            extracted: summary.extracted,
            failed: summary.failed,
            slides: summary
                .retained
                .iter()
                .filter_map(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

pub fn save_to(writer: impl std::io::Write, report: &Report) -> ron::Result<()> {
    let conf = ron::ser::PrettyConfig::new().struct_names(true);
    ron::ser::to_writer_pretty(writer, report, conf)
}

pub fn read_from(reader: impl std::io::Read) -> ron::error::SpannedResult<Report> {
    ron::de::from_reader(reader)
}

/// Writes the report of `job` into its output directory and returns where.
pub fn write_report(job: &VideoJob, summary: &Summary) -> Result<PathBuf, JobError> {
    let path = job.output_dir().join(REPORT_FILENAME);
    let mut buf = Vec::new();
    save_to(&mut buf, &Report::new(job, summary)).map_err(|source| JobError::Report {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, buf).map_err(|source| JobError::WriteReport {
        path: path.clone(),
        source,
    })?;
    log::debug!("Wrote the report to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod test {
    use std::num::NonZeroUsize;

    use crate::job::SamplingArgs;

    use super::*;

    #[test]
    fn written_report_reads_back() {
        let root = tempfile::tempdir().unwrap();
        let sampling = SamplingArgs::default().with_format(ImageFormat::Png);
        let job = VideoJob::new("talk.mp4", root.path(), &sampling).unwrap();
        fs::create_dir(job.output_dir()).unwrap();

        let mode = Mode::Disk {
            workers: NonZeroUsize::new(3).unwrap(),
        };
        let summary = Summary {
            mode,
            policy: Policy::KeepLastOfRun,
            sampled: 4,
            extracted: 3,
            failed: 1,
            retained: vec![job.slide_path(2), job.slide_path(3)],
        };
        let path = write_report(&job, &summary).unwrap();
        assert_eq!(job.output_dir().join(REPORT_FILENAME), path);

        let report = read_from(fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(Report::new(&job, &summary), report);
        assert_eq!(
            vec!["frame_talk_2.png".to_string(), "frame_talk_3.png".to_string()],
            report.slides
        );
        assert_eq!(Normalization::Pixel, report.normalization);
        assert_eq!(mode, report.mode);
    }
}
