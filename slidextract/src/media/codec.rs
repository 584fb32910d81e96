use std::{fmt, fs, io, path::Path};

use image::{DynamicImage, ImageOutputFormat, RgbaImage};

const JPEG_QUALITY: u8 = 90;

/// The still image formats slides can be saved as. `Jpg` and `Jpeg` only differ in the
/// file extension.
#[derive(clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Fastest, but big files
    Bmp,
    /// Slowest
    Png,
    Jpg,
    Jpeg,
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("failed to decode the {format} image")]
    Decode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode the {format} image")]
    Encode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("file IO failed")]
    Io(#[from] io::Error),
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// The name of the ffmpeg encoder producing this format.
    pub fn ffmpeg_codec(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png => "png",
            ImageFormat::Jpg | ImageFormat::Jpeg => "mjpeg",
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpg | ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }

    fn output_format(self) -> ImageOutputFormat {
        match self {
            ImageFormat::Bmp => ImageOutputFormat::Bmp,
            ImageFormat::Png => ImageOutputFormat::Png,
            ImageFormat::Jpg | ImageFormat::Jpeg => ImageOutputFormat::Jpeg(JPEG_QUALITY),
        }
    }

    /// Decodes the bytes as this format, whatever the content looks like.
    pub fn decode(self, bytes: &[u8]) -> Result<RgbaImage, CodecError> {
        image::load_from_memory_with_format(bytes, self.image_format())
            .map(DynamicImage::into_rgba8)
            .map_err(|source| CodecError::Decode {
                format: self,
                source,
            })
    }

    pub fn encode(self, image: &RgbaImage) -> Result<Vec<u8>, CodecError> {
        // NOTE: video frames are opaque and not every encoder takes an alpha channel
        let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
        let mut bytes = io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut bytes, self.output_format())
            .map_err(|source| CodecError::Encode {
                format: self,
                source,
            })?;
        Ok(bytes.into_inner())
    }

    pub fn read(self, path: impl AsRef<Path>) -> Result<RgbaImage, CodecError> {
        self.decode(&fs::read(path)?)
    }

    pub fn write(
        self,
        image: &RgbaImage,
        path: impl AsRef<Path>,
    ) -> Result<(), CodecError> {
        fs::write(path, self.encode(image)?)?;
        Ok(())
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod test {
    use image::Rgba;

    use super::*;

    #[test]
    fn lossless_formats_keep_pixels() {
        let img =
            RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 80, 7, 255]));
        for format in [ImageFormat::Bmp, ImageFormat::Png] {
            let decoded = format.decode(&format.encode(&img).unwrap()).unwrap();
            assert_eq!(img, decoded, "{format}");
        }
    }

    #[test]
    fn jpeg_keeps_dimensions() {
        let img = RgbaImage::from_pixel(16, 8, Rgba([200, 30, 30, 255]));
        let bytes = ImageFormat::Jpg.encode(&img).unwrap();
        assert_eq!((16, 8), ImageFormat::Jpeg.decode(&bytes).unwrap().dimensions());
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(matches!(
            ImageFormat::Png.decode(b"definitely not a png"),
            Err(CodecError::Decode { .. })
        ));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        ImageFormat::Png.write(&img, &path).unwrap();
        assert_eq!(img, ImageFormat::Png.read(&path).unwrap());
        assert!(matches!(
            ImageFormat::Png.read(dir.path().join("missing.png")),
            Err(CodecError::Io(_))
        ));
    }
}
