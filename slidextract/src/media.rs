pub mod codec;
pub mod decoder;
pub mod ffmpeg;
pub mod probe;

pub use codec::ImageFormat;
pub use decoder::{ExtractToFile, ExtractToMemory};
pub use ffmpeg::Ffmpeg;
pub use probe::DurationProbe;
