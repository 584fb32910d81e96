use std::{
    ffi::{OsStr, OsString},
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use wait_timeout::ChildExt;

use crate::error::ExternalError;

use super::{
    codec::ImageFormat,
    decoder::{ExtractToFile, ExtractToMemory},
    probe::{self, DurationProbe},
};

const STDERR_KEEP_CHARS: usize = 500;

/// Decodes frames by running one `ffmpeg` process per frame and probes durations with
/// `ffprobe`.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    task_timeout: Option<Duration>,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            task_timeout: None,
        }
    }
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binaries(
        mut self,
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
    ) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// Kill a frame extraction that runs for longer than this. Without it a hung ffmpeg
    /// hangs whoever is waiting for it.
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Whether both binaries can be executed at all.
    pub fn is_callable(&self) -> bool {
        let version = [OsString::from("-version")];
        [&self.ffmpeg, &self.ffprobe]
            .into_iter()
            .all(|program| run(program, &version, Some(Duration::from_secs(10))).is_ok())
    }
}

/// Flags common to both extraction modes. `-accurate_seek` before `-i` does a fast seek
/// to the nearest keyframe and then decodes up to the exact timestamp.
fn seek_args(video: &Path, at: Duration) -> Vec<OsString> {
    let seek_to = format!("{}us", at.as_micros());
    #[rustfmt::skip]
    let args = [
        OsStr::new("-hide_banner"),
        OsStr::new("-loglevel"),      OsStr::new("error"),
        OsStr::new("-nostdin"),
        OsStr::new("-accurate_seek"),
        OsStr::new("-ss"),            OsStr::new(&seek_to),
        OsStr::new("-i"),             video.as_os_str(),
        OsStr::new("-frames:v"),      OsStr::new("1"),
    ];
    args.into_iter().map(|arg| arg.to_owned()).collect()
}

impl DurationProbe for Ffmpeg {
    fn duration(
        &self,
        video: &Path,
        timeout: Duration,
    ) -> Result<Duration, ExternalError> {
        #[rustfmt::skip]
        let args = [
            OsStr::new("-v"),            OsStr::new("error"),
            OsStr::new("-show_entries"), OsStr::new("format=duration"),
            OsStr::new("-of"),           OsStr::new("default=noprint_wrappers=1:nokey=1"),
            video.as_os_str(),
        ];
        let args: Vec<OsString> = args.into_iter().map(|arg| arg.to_owned()).collect();

        let stdout = run(&self.ffprobe, &args, Some(timeout))?;
        probe::parse_seconds(&program_name(&self.ffprobe), &stdout)
    }
}

impl ExtractToFile for Ffmpeg {
    fn extract_to_file(
        &self,
        video: &Path,
        at: Duration,
        format: ImageFormat,
        dest: &Path,
    ) -> Result<(), ExternalError> {
        let mut args = seek_args(video, at);
        args.extend([
            OsString::from("-c:v"),
            OsString::from(format.ffmpeg_codec()),
            OsString::from("-y"),
            dest.as_os_str().to_owned(),
        ]);
        run(&self.ffmpeg, &args, self.task_timeout)?;
        Ok(())
    }
}

impl ExtractToMemory for Ffmpeg {
    fn extract_to_memory(
        &self,
        video: &Path,
        at: Duration,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ExternalError> {
        let mut args = seek_args(video, at);
        args.extend([
            OsString::from("-c:v"),
            OsString::from(format.ffmpeg_codec()),
            OsString::from("-f"),
            OsString::from("image2pipe"),
            OsString::from("pipe:1"),
        ]);
        let stdout = run(&self.ffmpeg, &args, self.task_timeout)?;
        if stdout.is_empty() {
            return Err(ExternalError::Output {
                program: program_name(&self.ffmpeg),
                reason: format!("no frame at {}", humantime::Duration::from(at)),
            });
        }
        Ok(stdout)
    }
}

fn program_name(program: &Path) -> String {
    program.to_string_lossy().into_owned()
}

/// Runs the program to completion and returns its stdout. Both stdout and stderr are
/// drained on their own threads so that a chatty child never blocks on a full pipe.
fn run(
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ExternalError> {
    let name = program_name(program);
    log::trace!("Running {name} {args:?}");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExternalError::NotFound {
                program: name.clone(),
            },
            _ => ExternalError::Io {
                program: name.clone(),
                source: e,
            },
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match timeout {
        None => child.wait(),
        Some(timeout) => match child.wait_timeout(timeout) {
            Ok(Some(status)) => Ok(status),
            Ok(None) => {
                kill(&mut child, &name);
                return Err(ExternalError::TimedOut {
                    program: name,
                    timeout: timeout.into(),
                });
            }
            Err(e) => Err(e),
        },
    }
    .map_err(|source| ExternalError::Io {
        program: name.clone(),
        source,
    })?;

    let joined = |handle: thread::JoinHandle<io::Result<Vec<u8>>>| match handle.join() {
        Ok(res) => res.map_err(|source| ExternalError::Io {
            program: name.clone(),
            source,
        }),
        Err(_) => Err(ExternalError::Output {
            program: name.clone(),
            reason: "the thread reading the output panicked".to_string(),
        }),
    };
    let stdout = joined(stdout)?;
    let stderr = joined(stderr)?;

    if !status.success() {
        let stderr: String = String::from_utf8_lossy(&stderr)
            .trim()
            .chars()
            .take(STDERR_KEEP_CHARS)
            .collect();
        return Err(ExternalError::Failed {
            program: name,
            status: status.to_string(),
            stderr,
        });
    }

    Ok(stdout)
}

fn drain(
    pipe: Option<impl Read + Send + 'static>,
) -> thread::JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

// to not leave zombies around
fn kill(child: &mut Child, name: &str) {
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill {name}: {e}");
    }
    if let Err(e) = child.wait() {
        log::warn!("Failed to reap {name}: {e}");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seek_is_in_micros() {
        let args = seek_args(Path::new("talk.mp4"), Duration::from_millis(1500));
        let pos = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!("1500000us", args[pos + 1]);
        assert_eq!("talk.mp4", args[pos + 3]);
        // the seek must come before the input to be a fast one
        assert!(pos < args.iter().position(|a| a == "-i").unwrap());
    }

    #[test]
    fn missing_binary() {
        let ffmpeg = Ffmpeg::new().with_binaries(
            "/definitely/not/here/ffmpeg",
            "/definitely/not/here/ffprobe",
        );
        assert!(matches!(
            ffmpeg.duration(Path::new("x.mp4"), Duration::from_secs(1)),
            Err(ExternalError::NotFound { .. })
        ));
        assert!(!ffmpeg.is_callable());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_keeps_stderr() {
        let res = run(
            Path::new("sh"),
            &["-c".into(), "echo broken >&2; exit 3".into()],
            None,
        );
        match res {
            Err(ExternalError::Failed { stderr, .. }) => assert_eq!("broken", stderr),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn times_out() {
        let res = run(
            Path::new("sh"),
            &["-c".into(), "sleep 5".into()],
            Some(Duration::from_millis(100)),
        );
        assert!(matches!(res, Err(ExternalError::TimedOut { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn collects_stdout() {
        let res = run(Path::new("sh"), &["-c".into(), "printf hello".into()], None);
        assert_eq!(b"hello".to_vec(), res.unwrap());
    }
}
