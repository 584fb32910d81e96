use std::{ffi::OsString, path::PathBuf};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use slidextract::{
    batch,
    error::JobError,
    job::{SamplingCli, VideoJob},
    media::Ffmpeg,
    pipeline::{DiskCli, InMemoryCli, SlideExtractor, Summary},
    report,
};
use slidextract_common::{
    bin_common::{
        init::{init_eyre, init_logger},
        termination::Cookie,
    },
    utils::{fsutils::read_optional_file, time::Stopwatch},
};

#[derive(Parser, Debug)]
#[command(version)]
/// Extracts the slides of presentation videos.
///
/// Frames are sampled at a fixed interval and a frame is only kept as a slide if it
/// differs enough from its neighbours. Uses ffmpeg and ffprobe, which must be on PATH
/// unless overridden.
struct Cli {
    /// The video to extract slides from, or a directory of videos with --batch
    #[arg(long, short = 'i')]
    path: PathBuf,

    /// Process every file in the directory given by --path
    #[arg(long, short = 'b')]
    batch: bool,

    /// Where to place the slides, every video gets its own subdirectory
    #[arg(long, short = 'o', default_value = "out")]
    out_dir: PathBuf,

    #[command(flatten)]
    sampling: SamplingCli,

    #[command(flatten)]
    disk: DiskCli,

    #[command(flatten)]
    in_memory: InMemoryCli,

    /// Write a summary of every video next to its slides
    #[arg(long)]
    report: bool,

    /// Kill an ffmpeg extraction that takes longer than this
    #[arg(long)]
    task_timeout: Option<humantime::Duration>,

    /// The ffmpeg binary to use
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// The ffprobe binary to use
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Log every frame decision
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".slidextractrc";
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() == 1 {
        if let Some(flags) = read_optional_file(ARGS_FILE)
            .wrap_err_with(|| format!("Could not read config file at: {ARGS_FILE}"))?
        {
            args.extend(
                flags
                    .split_whitespace()
                    .map(|s| std::ffi::OsStr::new(s).to_owned()),
            );
        }
    }

    Ok(Cli::parse_from(args))
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    init_logger(cli.logfile.as_deref(), level)?;
    log::debug!("CLI arguments: {cli:#?}");

    let cookie = Cookie::new().wrap_err("failed to register the signal handlers")?;
    let sampling = cli.sampling.to_args();
    let mode = cli.in_memory.to_args().mode(&cli.disk.to_args());
    let backend = Ffmpeg::new()
        .with_binaries(&cli.ffmpeg, &cli.ffprobe)
        .with_task_timeout(cli.task_timeout.map(Into::into));
    let extractor = SlideExtractor::new(backend, mode, cookie);
    log::info!("Running with {mode:?}, using {:?}", mode.policy());

    batch::ensure_out_root(&cli.out_dir)?;

    let write_report = cli.report;
    let run = |job: &VideoJob| -> Result<Summary, JobError> {
        let summary = extractor.run(job)?;
        if write_report {
            let path = report::write_report(job, &summary)?;
            log::info!("Wrote the report to {}", path.display());
        }
        Ok(summary)
    };

    let watch = Stopwatch::start();
    let summaries = if cli.batch {
        batch::run_batch(&cli.path, &cli.out_dir, &sampling, run)
            .wrap_err_with(|| format!("batch failed at: {}", cli.path.display()))?
    } else {
        let summary = batch::run_single(&cli.path, &cli.out_dir, &sampling, run)
            .wrap_err_with(|| {
                format!("failed to extract slides from: {}", cli.path.display())
            })?;
        vec![summary]
    };

    let slides: usize = summaries.iter().map(|sum| sum.retained.len()).sum();
    let failed: usize = summaries.iter().map(|sum| sum.failed).sum();
    if failed > 0 {
        log::warn!("{failed} frames could not be extracted");
    }
    log::info!(
        "Done, {slides} slides from {} videos in {}",
        summaries.len(),
        watch.total()
    );

    Ok(())
}
