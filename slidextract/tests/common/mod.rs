// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use image::{Rgba, RgbaImage};
use slidextract::{
    error::ExternalError,
    job::SamplingArgs,
    media::{DurationProbe, ExtractToFile, ExtractToMemory, ImageFormat},
};
use slidextract_common::utils::fsutils;

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// The start of a png and then nothing.
pub const GARBAGE: &[u8] = b"\x89PNG trunc";

pub const A: u8 = 0;
pub const B: u8 = 255;

/// Pretends to be ffmpeg for a video whose frame `i` is a solid gray image of
/// `colors[i]`. The video is exactly as long as the frames sampled at `interval`.
pub struct FakeMedia {
    interval: Duration,
    colors: Vec<u8>,
    fail_at: HashSet<usize>,
    partial_at: HashSet<usize>,
    garbage_at: HashSet<usize>,
    sizes: HashMap<usize, (u32, u32)>,
    probe_fails: bool,
    extractions: AtomicUsize,
    videos: Mutex<Vec<PathBuf>>,
}

impl FakeMedia {
    pub fn new(interval: Duration, colors: &[u8]) -> Self {
        Self {
            interval,
            colors: colors.to_vec(),
            fail_at: HashSet::new(),
            partial_at: HashSet::new(),
            garbage_at: HashSet::new(),
            sizes: HashMap::new(),
            probe_fails: false,
            extractions: AtomicUsize::new(0),
            videos: Mutex::new(Vec::new()),
        }
    }

    /// Extracting frame `index` fails.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at.insert(index);
        self
    }

    /// Extracting frame `index` to a file writes half an image and then fails, like a
    /// killed ffmpeg.
    pub fn partial_at(mut self, index: usize) -> Self {
        self.partial_at.insert(index);
        self
    }

    /// Extracting frame `index` succeeds but produces bytes no codec understands.
    pub fn garbage_at(mut self, index: usize) -> Self {
        self.garbage_at.insert(index);
        self
    }

    /// Frame `index` has other dimensions than the rest.
    pub fn sized_at(mut self, index: usize, width: u32, height: u32) -> Self {
        self.sizes.insert(index, (width, height));
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    /// Every video that was probed, in order.
    pub fn probed(&self) -> Vec<PathBuf> {
        self.videos.lock().unwrap().clone()
    }

    fn index_of(&self, at: Duration) -> usize {
        (at.as_nanos() / self.interval.as_nanos()) as usize
    }

    fn frame(&self, at: Duration) -> Result<RgbaImage, ExternalError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        let index = self.index_of(at);
        if self.fail_at.contains(&index) {
            return Err(ExternalError::Failed {
                program: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("no frame {index}"),
            });
        }
        let value = self.colors[index];
        let (width, height) = self.sizes.get(&index).copied().unwrap_or((WIDTH, HEIGHT));
        Ok(solid(width, height, value))
    }
}

impl DurationProbe for FakeMedia {
    fn duration(
        &self,
        video: &Path,
        _timeout: Duration,
    ) -> Result<Duration, ExternalError> {
        self.videos.lock().unwrap().push(video.to_path_buf());
        if self.probe_fails {
            return Err(ExternalError::TimedOut {
                program: "fake".to_string(),
                timeout: Duration::from_secs(5).into(),
            });
        }
        Ok(self.interval * self.colors.len() as u32)
    }
}

impl ExtractToFile for FakeMedia {
    fn extract_to_file(
        &self,
        _video: &Path,
        at: Duration,
        format: ImageFormat,
        dest: &Path,
    ) -> Result<(), ExternalError> {
        let index = self.index_of(at);
        if self.partial_at.contains(&index) {
            std::fs::write(dest, GARBAGE).unwrap();
            return Err(ExternalError::TimedOut {
                program: "fake".to_string(),
                timeout: Duration::from_secs(1).into(),
            });
        }
        if self.garbage_at.contains(&index) {
            std::fs::write(dest, GARBAGE).unwrap();
            return Ok(());
        }
        let image = self.frame(at)?;
        format.write(&image, dest).map_err(|e| ExternalError::Output {
            program: "fake".to_string(),
            reason: e.to_string(),
        })
    }
}

impl ExtractToMemory for FakeMedia {
    fn extract_to_memory(
        &self,
        _video: &Path,
        at: Duration,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ExternalError> {
        if self.garbage_at.contains(&self.index_of(at)) {
            return Ok(GARBAGE.to_vec());
        }
        let image = self.frame(at)?;
        format.encode(&image).map_err(|e| ExternalError::Output {
            program: "fake".to_string(),
            reason: e.to_string(),
        })
    }
}

pub fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
}

/// One second between frames, lossless slides.
pub fn sampling() -> SamplingArgs {
    SamplingArgs::default()
        .with_interval(Duration::from_secs(1).into())
        .with_format(ImageFormat::Png)
}

pub fn fake(colors: &[u8]) -> FakeMedia {
    FakeMedia::new(Duration::from_secs(1), colors)
}

/// The file names inside `dir`, sorted.
pub fn names_in(dir: impl AsRef<Path>) -> Vec<String> {
    fsutils::file_names(dir)
        .expect("could not list the directory")
        .into_iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// The gray value of a slide written by [`FakeMedia`].
pub fn gray_of(path: impl AsRef<Path>) -> u8 {
    let image = ImageFormat::Png.read(path).expect("could not read the slide");
    image.get_pixel(0, 0).0[0]
}
