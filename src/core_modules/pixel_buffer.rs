// THEORY:
// The `PixelBuffer` module is the most fundamental unit of the drift engine. It is
// a "dumb" data container for one rendered frame: a flat byte sequence in RGBA
// order, four bytes per pixel, with no notion of width or height. Geometry is the
// caller's concern; the engine only ever reasons about pixel *indices*.
//
// Key architectural principles:
// 1.  **Flat and opinion-free**: The buffer stores exactly what the renderer
//     produced. No color-space transforms, no premultiplication, no validation.
//     A buffer whose length is not divisible by 4 is tolerated; the trailing
//     partial group is simply never visited.
// 2.  **Index arithmetic lives here**: Anything that needs to turn a pixel index
//     into channel bytes (or compute per-channel deltas between two buffers)
//     goes through this module, so the 4-byte stride is written down exactly once.
// 3.  **Comparisons live elsewhere**: A `PixelBuffer` is meaningless on its own;
//     pairwise analysis belongs to the `differ` module.

pub mod pixel_buffer {
    pub type Byte = u8;
    pub type Bytes = Vec<Byte>;
    pub type Channel = Byte;
    pub type PixelIndex = u32;
    /// One per-channel signed delta, `current - previous`, range [-255, 255].
    pub type ChannelDelta = i16;
    /// The four signed channel deltas of one pixel, in (r, g, b, a) order.
    pub type SignedDelta = [ChannelDelta; 4];
    /// The four raw channel values of one pixel, in (r, g, b, a) order.
    pub type Rgba = [Channel; 4];

    pub const CHANNELS: usize = 4;

    /// A "dumb" data container representing one frame's raw RGBA bytes.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PixelBuffer {
        /// The flat byte sequence, pixel `i` occupying bytes `[4i, 4i + 4)`.
        pub bytes: Bytes,
    }

    impl PixelBuffer {
        pub fn new(bytes: Bytes) -> Self {
            Self { bytes }
        }

        /// The number of complete pixels in this buffer (trailing bytes ignored).
        pub fn pixel_count(&self) -> usize {
            self.bytes.len() / CHANNELS
        }

        /// The raw RGBA channel values of pixel `index`.
        /// Caller must ensure `index < pixel_count()`.
        pub fn rgba(&self, index: PixelIndex) -> Rgba {
            let base = index as usize * CHANNELS;
            [
                self.bytes[base],
                self.bytes[base + 1],
                self.bytes[base + 2],
                self.bytes[base + 3],
            ]
        }
    }

    impl From<&[Byte]> for PixelBuffer {
        fn from(bytes: &[Byte]) -> Self {
            Self::new(bytes.to_vec())
        }
    }

    /// The number of pixels two buffers can be compared over: the shorter common
    /// length, in complete 4-byte groups. Trailing bytes in the longer buffer
    /// (or a trailing partial group in either) are silently ignored.
    pub fn comparable_pixels(prev: &PixelBuffer, curr: &PixelBuffer) -> usize {
        prev.bytes.len().min(curr.bytes.len()) / CHANNELS
    }

    /// The signed per-channel delta of pixel `index` between two buffers.
    /// Caller must ensure `index < comparable_pixels(prev, curr)`.
    pub fn signed_delta(prev: &PixelBuffer, curr: &PixelBuffer, index: PixelIndex) -> SignedDelta {
        let p = prev.rgba(index);
        let c = curr.rgba(index);
        [
            c[0] as ChannelDelta - p[0] as ChannelDelta,
            c[1] as ChannelDelta - p[1] as ChannelDelta,
            c[2] as ChannelDelta - p[2] as ChannelDelta,
            c[3] as ChannelDelta - p[3] as ChannelDelta,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::pixel_buffer::*;

    #[test]
    fn pixel_count_ignores_trailing_bytes() {
        let buffer = PixelBuffer::new(vec![0u8; 9]);
        assert_eq!(buffer.pixel_count(), 2);
    }

    #[test]
    fn comparable_pixels_uses_shorter_buffer() {
        let short = PixelBuffer::new(vec![0u8; 8]);
        let long = PixelBuffer::new(vec![0u8; 16]);
        assert_eq!(comparable_pixels(&short, &long), 2);
        assert_eq!(comparable_pixels(&long, &short), 2);
    }

    #[test]
    fn signed_delta_is_current_minus_previous() {
        let prev = PixelBuffer::new(vec![10, 20, 30, 255]);
        let curr = PixelBuffer::new(vec![5, 20, 40, 0]);
        assert_eq!(signed_delta(&prev, &curr, 0), [-5, 0, 10, -255]);
    }
}
