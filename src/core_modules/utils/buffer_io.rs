// PNG round-trip helpers for getting `PixelBuffer`s into and out of files.
// Strictly a convenience for demos and tests: the engine core never touches
// the filesystem or an encoder.
pub mod buffer_io {
    use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
    use anyhow::{ensure, Context, Result};
    use image::ImageEncoder;
    use std::path::Path;

    /// Encodes an RGBA `PixelBuffer` of the given geometry to a PNG file.
    pub fn save(path: impl AsRef<Path>, width: u32, height: u32, buffer: &PixelBuffer) -> Result<()> {
        let path = path.as_ref();
        ensure!(
            buffer.bytes.len() == (width * height * 4) as usize,
            "buffer is {} bytes, expected {}x{}x4",
            buffer.bytes.len(),
            width,
            height
        );

        let output = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder
            .write_image(&buffer.bytes, width, height, image::ExtendedColorType::Rgba8)
            .with_context(|| format!("encoding {}", path.display()))?;

        Ok(())
    }

    /// Decodes a PNG file into an RGBA `PixelBuffer` plus its geometry.
    pub fn load(path: impl AsRef<Path>) -> Result<(PixelBuffer, u32, u32)> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        load_from_memory(&bytes).with_context(|| format!("decoding {}", path.display()))
    }

    /// Decodes encoded image bytes into an RGBA `PixelBuffer` plus geometry.
    pub fn load_from_memory(bytes: &[u8]) -> Result<(PixelBuffer, u32, u32)> {
        let decoded = image::load_from_memory(bytes).context("unsupported image data")?;
        let rgba = decoded.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        Ok((PixelBuffer::new(rgba.into_raw()), width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::buffer_io::*;
    use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;

    #[test]
    fn png_round_trip_preserves_bytes() {
        let width = 4u32;
        let height = 2u32;
        let bytes: Vec<u8> = (0..(width * height * 4) as usize)
            .map(|i| (i * 7 % 256) as u8)
            .collect();
        let buffer = PixelBuffer::new(bytes.clone());

        let path = std::env::temp_dir().join("drift_vision_round_trip.png");
        save(&path, width, height, &buffer).expect("encode");
        let (loaded, w, h) = load(&path).expect("decode");
        let _ = std::fs::remove_file(&path);

        assert_eq!((w, h), (width, height));
        assert_eq!(loaded.bytes, bytes);
    }

    #[test]
    fn geometry_mismatch_is_rejected() {
        let buffer = PixelBuffer::new(vec![0u8; 8]);
        let path = std::env::temp_dir().join("drift_vision_bad_geometry.png");
        assert!(save(&path, 3, 3, &buffer).is_err());
    }
}
