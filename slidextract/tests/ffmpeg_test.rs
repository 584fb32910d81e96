use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};

use slidextract::{
    batch,
    job::SamplingArgs,
    media::{DurationProbe, ExtractToFile, ExtractToMemory, Ffmpeg, ImageFormat},
    pipeline::{Mode, SlideExtractor},
};
use slidextract_common::bin_common::termination::Cookie;

const TEST_VIDEO_LENGTH_SEC: u64 = 3;
const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

/// None if ffmpeg isn't installed
fn create_test_video(dir: &Path) -> Option<PathBuf> {
    if !Ffmpeg::new().is_callable() {
        eprintln!("ffmpeg or ffprobe is not installed, skipping");
        return None;
    }

    let video = dir.join("testvideo.mkv");
    let status = Command::new("ffmpeg")
        .args(["-f", "lavfi", "-i"])
        .arg(format!(
            "testsrc=duration={TEST_VIDEO_LENGTH_SEC}:rate=25:size={WIDTH}x{HEIGHT}"
        ))
        .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
        .arg(&video)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .status()
        .expect("failed to execute ffmpeg");
    assert!(status.success(), "ffmpeg could not create the test video");
    Some(video)
}

#[test]
fn probes_duration() {
    let dir = tempfile::tempdir().unwrap();
    let Some(video) = create_test_video(dir.path()) else {
        return;
    };

    let duration = Ffmpeg::new()
        .duration(&video, Duration::from_secs(5))
        .unwrap();
    let expected = Duration::from_secs(TEST_VIDEO_LENGTH_SEC);
    let slack = Duration::from_millis(200);
    assert!(
        duration > expected - slack && duration < expected + slack,
        "{duration:?}"
    );
}

#[test]
fn extracts_frames() {
    let dir = tempfile::tempdir().unwrap();
    let Some(video) = create_test_video(dir.path()) else {
        return;
    };
    let ffmpeg = Ffmpeg::new().with_task_timeout(Some(Duration::from_secs(30)));

    let dest = dir.path().join("frame.png");
    ffmpeg
        .extract_to_file(&video, Duration::from_secs(1), ImageFormat::Png, &dest)
        .unwrap();
    let image = ImageFormat::Png.read(&dest).unwrap();
    assert_eq!((WIDTH, HEIGHT), image.dimensions());

    for format in [ImageFormat::Bmp, ImageFormat::Png] {
        let bytes = ffmpeg
            .extract_to_memory(&video, Duration::from_millis(1500), format)
            .unwrap();
        let image = format.decode(&bytes).unwrap();
        assert_eq!((WIDTH, HEIGHT), image.dimensions(), "{format}");
    }
}

#[test]
fn whole_video_both_modes() {
    let dir = tempfile::tempdir().unwrap();
    let Some(video) = create_test_video(dir.path()) else {
        return;
    };
    let sampling = SamplingArgs::default().with_interval(Duration::from_secs(1).into());

    let modes = [
        Mode::Disk {
            workers: NonZeroUsize::new(2).unwrap(),
        },
        Mode::Streaming {
            max_frames: NonZeroUsize::new(2).unwrap(),
        },
    ];
    for (i, mode) in modes.into_iter().enumerate() {
        let out = dir.path().join(format!("out{i}"));
        batch::ensure_out_root(&out).unwrap();
        let extractor = SlideExtractor::new(Ffmpeg::new(), mode, Cookie::detached());
        let summary = batch::run_single(&video, &out, &sampling, |job| extractor.run(job))
            .unwrap();

        // the container might round the duration down a bit
        let length = TEST_VIDEO_LENGTH_SEC as usize;
        assert!((length - 1..=length).contains(&summary.sampled));
        assert_eq!(0, summary.failed);
        assert!(!summary.retained.is_empty());
        assert!(summary.retained.iter().all(|path| path.is_file()));
    }
}
