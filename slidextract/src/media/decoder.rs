use std::{path::Path, sync::Arc, time::Duration};

use crate::error::ExternalError;

use super::codec::ImageFormat;

/// Produces a single still image of `video` at `at` and saves it at `dest`. Called from
/// several threads at the same time in disk mode.
pub trait ExtractToFile: Send + Sync {
    fn extract_to_file(
        &self,
        video: &Path,
        at: Duration,
        format: ImageFormat,
        dest: &Path,
    ) -> Result<(), ExternalError>;
}

/// Produces the encoded bytes of a single still image of `video` at `at`, without
/// touching the disk.
pub trait ExtractToMemory {
    fn extract_to_memory(
        &self,
        video: &Path,
        at: Duration,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ExternalError>;
}

impl<T: ExtractToFile + ?Sized> ExtractToFile for Arc<T> {
    fn extract_to_file(
        &self,
        video: &Path,
        at: Duration,
        format: ImageFormat,
        dest: &Path,
    ) -> Result<(), ExternalError> {
        self.as_ref().extract_to_file(video, at, format, dest)
    }
}

impl<T: ExtractToMemory + ?Sized> ExtractToMemory for Arc<T> {
    fn extract_to_memory(
        &self,
        video: &Path,
        at: Duration,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ExternalError> {
        self.as_ref().extract_to_memory(video, at, format)
    }
}
