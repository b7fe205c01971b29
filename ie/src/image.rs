//! Frame primitives and raw pixel utilities.
//!
//! Captured frames are stored as a lightweight owned RGB image (`OwnedImage`).
//! The chat reader never needs alpha, so it is dropped on construction.
//!
//! For scanning we borrow a view (`Image<'a>`) instead of copying pixels. Views
//! are `Copy` and can be handed to any number of OCR calls at once, as long as
//! the backing frame is not replaced underneath them.

use anyhow::{Context, Result, ensure};

/// Byte order of a tightly packed 4-byte-per-pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgba,
    /// Native order of most desktop capture APIs.
    Bgra,
}

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from 4-byte pixels in the given channel order (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_raw(width: usize, bytes: &[u8], order: ChannelOrder) -> Result<Self> {
        ensure!(width > 0, "frame width must be non-zero");
        ensure!(
            bytes.len() % (width * 4) == 0,
            "frame buffer of {} bytes is not a whole number of {width}px rows",
            bytes.len()
        );

        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| match order {
                ChannelOrder::Rgba => Color::new(v[0], v[1], v[2]),
                ChannelOrder::Bgra => Color::new(v[2], v[1], v[0]),
            })
            .collect::<Vec<_>>();

        Ok(Self {
            width: width as u32,
            height: height as u32,
            data,
        })
    }

    #[inline]
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Result<Self> {
        Self::from_raw(width, bytes, ChannelOrder::Rgba)
    }

    #[inline]
    pub fn from_bgra(width: usize, bytes: &[u8]) -> Result<Self> {
        Self::from_raw(width, bytes, ChannelOrder::Bgra)
    }

    /// A solid frame, mostly useful as a canvas for synthetic captures.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            data: vec![color; (width * height) as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Overwrite a single pixel. Out of bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.data[(x + y * self.width) as usize] = color;
        }
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image<'a>(&'a self) -> Image<'a> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> &Color {
        &self.data[(x + y * self.true_width) as usize]
    }

    /// Pixel at view-relative coordinates. Callers bounds-check first.
    #[inline(always)]
    pub fn get_pixel(&self, x: u32, y: u32) -> Color {
        *self.pixel(self.x1 + x, self.y1 + y)
    }

    /// Pixel at signed view-relative coordinates, `None` outside the view.
    #[inline]
    pub fn checked_pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return None;
        }
        Some(self.get_pixel(x as u32, y as u32))
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
        let mut i = 0;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                bytes[i] = clr.r;
                bytes[i + 1] = clr.g;
                bytes[i + 2] = clr.b;
                i += 3;
            }
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let bytes = self.get_bytes();
        let img = image::RgbImage::from_raw(self.width(), self.height(), bytes)
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }

    /// Copy out a region of exactly `width` x `height` pixels.
    ///
    /// The region may start at negative coordinates or extend past the view;
    /// missing pixels are filled with black.
    pub fn crop_padded(&self, x: i32, y: i32, width: u32, height: u32) -> OwnedImage {
        let mut data = Vec::with_capacity((width * height) as usize);
        for dy in 0..height as i32 {
            for dx in 0..width as i32 {
                data.push(self.checked_pixel(x + dx, y + dy).unwrap_or(Color::BLACK));
            }
        }

        OwnedImage {
            width,
            height,
            data,
        }
    }
}

// ----------

/// Swap the first and third byte of every 4-byte pixel (BGRA <-> RGBA).
pub fn swap_red_blue(bytes: &mut [u8]) {
    for px in bytes.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// Crop a region out of a tightly packed 4-byte-per-pixel buffer.
///
/// The result is always `w * h * 4` bytes. Parts of the region that fall outside
/// the source (negative origin, past the right/bottom edge, or entirely outside)
/// are zero, i.e. transparent black.
pub fn crop_pixels(buffer: &[u8], width: usize, x: i32, y: i32, w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; w * h * 4];
    if width == 0 {
        return out;
    }
    let height = buffer.len() / 4 / width;

    for row in 0..h {
        let sy = y + row as i32;
        if sy < 0 || sy as usize >= height {
            continue;
        }

        // Horizontal overlap of [x, x + w) with [0, width).
        let sx1 = x.max(0) as usize;
        let sx2 = (x + w as i32).clamp(0, width as i32) as usize;
        if sx1 >= sx2 {
            continue;
        }

        let dst_x = (sx1 as i32 - x) as usize;
        let src = (sy as usize * width + sx1) * 4;
        let dst = (row * w + dst_x) * 4;
        let len = (sx2 - sx1) * 4;
        out[dst..dst + len].copy_from_slice(&buffer[src..src + len]);
    }

    out
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn channels(&self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_buffer(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| [i as u8, 10, 20, 255])
            .collect()
    }

    #[test]
    fn test_from_bgra_reorders_channels() {
        let img = OwnedImage::from_bgra(1, &[1, 2, 3, 255]).unwrap();
        assert_eq!(img.as_image().get_pixel(0, 0), Color::new(3, 2, 1));

        let img = OwnedImage::from_rgba(1, &[1, 2, 3, 255]).unwrap();
        assert_eq!(img.as_image().get_pixel(0, 0), Color::new(1, 2, 3));
    }

    #[test]
    fn test_from_raw_rejects_ragged_buffer() {
        assert!(OwnedImage::from_rgba(2, &[0; 12]).is_err());
        assert!(OwnedImage::from_rgba(0, &[]).is_err());
    }

    #[test]
    fn test_swap_red_blue() {
        let mut px = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap_red_blue(&mut px);
        assert_eq!(px, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn test_crop_pixels_inside() {
        let buf = rgba_buffer(4, 4);
        let out = crop_pixels(&buf, 4, 1, 1, 2, 2);
        assert_eq!(out.len(), 16);
        // (1,1) is pixel index 5.
        assert_eq!(&out[0..4], &[5, 10, 20, 255]);
        // (2,2) is pixel index 10.
        assert_eq!(&out[12..16], &[10, 10, 20, 255]);
    }

    #[test]
    fn test_crop_pixels_negative_origin_pads() {
        let buf = rgba_buffer(3, 3);
        let out = crop_pixels(&buf, 3, -1, -1, 2, 2);
        assert_eq!(&out[0..12], &[0; 12]);
        assert_eq!(&out[12..16], &[0, 10, 20, 255]);
    }

    #[test]
    fn test_crop_pixels_past_edge_pads() {
        let buf = rgba_buffer(3, 3);
        let out = crop_pixels(&buf, 3, 2, 2, 3, 1);
        assert_eq!(&out[0..4], &[8, 10, 20, 255]);
        assert_eq!(&out[4..12], &[0; 8]);
    }

    #[test]
    fn test_crop_pixels_fully_outside_is_transparent() {
        let buf = rgba_buffer(3, 3);
        let out = crop_pixels(&buf, 3, 10, -10, 2, 2);
        assert_eq!(out, vec![0; 16]);
    }

    #[test]
    fn test_crop_padded_view() {
        let mut img = OwnedImage::filled(2, 2, Color::WHITE);
        img.put_pixel(0, 0, Color::new(9, 9, 9));
        let crop = img.as_image().crop_padded(-1, 0, 3, 1);
        let view = crop.as_image();
        assert_eq!(view.width(), 3);
        assert_eq!(view.get_pixel(0, 0), Color::BLACK);
        assert_eq!(view.get_pixel(1, 0), Color::new(9, 9, 9));
        assert_eq!(view.get_pixel(2, 0), Color::WHITE);
    }
}
