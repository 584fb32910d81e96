use std::{path::Path, sync::Arc, time::Duration};

use crate::error::ExternalError;

/// How long to wait for the duration of a video before giving up on it.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub trait DurationProbe {
    /// The total playable duration of `video`. Must fail with
    /// [`ExternalError::TimedOut`] rather than block for longer than `timeout`.
    fn duration(&self, video: &Path, timeout: Duration)
        -> Result<Duration, ExternalError>;
}

impl<T: DurationProbe + ?Sized> DurationProbe for Arc<T> {
    fn duration(
        &self,
        video: &Path,
        timeout: Duration,
    ) -> Result<Duration, ExternalError> {
        self.as_ref().duration(video, timeout)
    }
}

/// Parses the seconds ffprobe prints, like `12.250000`.
pub(crate) fn parse_seconds(
    program: &str,
    stdout: &[u8],
) -> Result<Duration, ExternalError> {
    let output = |reason: String| ExternalError::Output {
        program: program.to_string(),
        reason,
    };

    let text = std::str::from_utf8(stdout)
        .map_err(|_| output("the duration is not valid utf8".to_string()))?
        .trim();
    let secs: f64 = text
        .parse()
        .map_err(|_| output(format!("could not parse {text:?} as a duration")))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| output(format!("{secs} is not a valid duration: {e}")))
}
