//! CIM atlas containers
//!
//! A CIM file is one zlib stream. Its payload starts with three big-endian
//! `i32`s (width, height, pixel format) followed by the pixel rows, top to
//! bottom. Space Haven ships RGBA8888 pages; RGB888 pages are read too.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use image::{ImageBuffer, RgbaImage};

use crate::error::{Error, Result};

/// Pixel formats understood by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CimFormat {
    /// 3 bytes per pixel
    Rgb888,
    /// 4 bytes per pixel
    Rgba8888,
}

impl CimFormat {
    /// Maps a header format code.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedCimFormat`] for alpha, luminance-alpha,
    /// RGB565, RGBA4444 and unknown codes.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            3 => Ok(Self::Rgb888),
            4 => Ok(Self::Rgba8888),
            format => Err(Error::UnsupportedCimFormat { format }),
        }
    }

    /// Header format code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Rgb888 => 3,
            Self::Rgba8888 => 4,
        }
    }

    /// Bytes per pixel.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb888 => 3,
            Self::Rgba8888 => 4,
        }
    }

    /// Display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgb888 => "RGB888",
            Self::Rgba8888 => "RGBA8888",
        }
    }
}

/// An atlas page held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CimImage {
    width: u32,
    height: u32,
    format: CimFormat,
    pixels: Vec<u8>,
}

impl CimImage {
    /// A fully transparent RGBA8888 page.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: CimFormat::Rgba8888,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Reads a container from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, inflated or decoded.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut payload = Vec::new();
        ZlibDecoder::new(BufReader::new(file)).read_to_end(&mut payload)?;
        Self::from_payload(&payload)
    }

    /// Decodes an inflated payload (header + pixels).
    ///
    /// # Errors
    /// Returns [`Error::InvalidCim`] on a short or inconsistent payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);
        let header = |e: std::io::Error| Error::InvalidCim {
            message: format!("truncated header: {e}"),
        };
        let width = cursor.read_i32::<BigEndian>().map_err(header)?;
        let height = cursor.read_i32::<BigEndian>().map_err(header)?;
        let format = CimFormat::from_code(cursor.read_i32::<BigEndian>().map_err(header)?)?;

        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(Error::InvalidCim {
                message: format!("negative dimensions {width}x{height}"),
            });
        };
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        let pixels = &payload[12..];
        if pixels.len() < expected {
            return Err(Error::InvalidCim {
                message: format!("expected {expected} pixel bytes, found {}", pixels.len()),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            pixels: pixels[..expected].to_vec(),
        })
    }

    /// Writes the container to disk.
    ///
    /// # Errors
    /// Returns an error if compression or writing fails.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut encoder = ZlibEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_i32::<BigEndian>(self.width as i32)?;
        encoder.write_i32::<BigEndian>(self.height as i32)?;
        encoder.write_i32::<BigEndian>(self.format.code())?;
        encoder.write_all(&self.pixels)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Page width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Page height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format.
    #[must_use]
    pub fn format(&self) -> CimFormat {
        self.format
    }

    /// RGBA value at (x, y); RGB pages report full alpha.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let at = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.pixels[at..at + bpp];
        Some(match self.format {
            CimFormat::Rgba8888 => [px[0], px[1], px[2], px[3]],
            CimFormat::Rgb888 => [px[0], px[1], px[2], 255],
        })
    }

    /// Copies `source` into the rectangle at (x, y), `w` x `h`.
    ///
    /// The copy is clipped to the rectangle, the source and the page. Returns
    /// false if the source size differs from the rectangle.
    pub fn blit_rgba(&mut self, source: &RgbaImage, x: u32, y: u32, w: u32, h: u32) -> bool {
        let exact = source.width() == w && source.height() == h;
        let bpp = self.format.bytes_per_pixel();
        let cols = w.min(source.width()).min(self.width.saturating_sub(x));
        let rows = h.min(source.height()).min(self.height.saturating_sub(y));
        for row in 0..rows {
            for col in 0..cols {
                let rgba = source.get_pixel(col, row).0;
                let at = ((y + row) as usize * self.width as usize + (x + col) as usize) * bpp;
                self.pixels[at..at + bpp].copy_from_slice(&rgba[..bpp]);
            }
        }
        exact
    }

    /// The page as an RGBA image.
    #[must_use]
    pub fn to_rgba_image(&self) -> RgbaImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            image::Rgba(self.pixel(x, y).unwrap_or_default())
        })
    }

    /// Saves the page as a PNG.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn export_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_rgba_image()
            .save_with_format(path.as_ref(), image::ImageFormat::Png)?;
        Ok(())
    }
}
