//! Capture module
//! Produces the JPEG that gets annotated and uploaded, either from an image file
//! on disk or from a screenshot of the primary display (via `xcap`).
//! Every capture is written to the capture directory as `chessboard_<millis>.jpg`.
//! Debug: set `FENSNAP_DEBUG_CAPTURE=1` to also save a lossless PNG alongside.

use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader, ImageResult};
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use xcap::Monitor;

use crate::corners::Size;

const DEBUG_ENV: &str = "FENSNAP_DEBUG_CAPTURE";

/// A stored capture: the JPEG on disk, its bytes, and its pixel size.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub path: PathBuf,
    pub jpeg: Vec<u8>,
    pub size: Size,
}

impl CapturedImage {
    pub fn decode(&self) -> Result<DynamicImage> {
        decode_oriented(&self.jpeg, ImageFormat::Jpeg)
            .with_context(|| format!("Failed to decode capture: {}", self.path.display()))
    }
}

/// Captures the full primary monitor.
/// Permissions note: on macOS, grant "Screen & System Audio Recording" to the terminal.
pub fn capture_screen(dir: &Path, quality: u8) -> Result<CapturedImage> {
    let start = Instant::now();

    let monitors = Monitor::all().context("Failed to enumerate monitors")?;
    let primary_monitor = monitors.first().cloned().context("No monitors found")?;

    let screenshot_raw = primary_monitor
        .capture_image()
        .context("Failed to capture image. On macOS, ensure the terminal has Screen Recording permission in System Settings > Privacy & Security > Screen & System Audio Recording")?;

    let screenshot = DynamicImage::ImageRgba8(screenshot_raw);
    if screenshot.dimensions() == (0, 0) {
        bail!("Captured empty screenshot - possible permission issue or no display");
    }

    let jpeg = encode_jpeg(&screenshot, quality)?;
    let captured = store(dir, jpeg, &screenshot)?;
    tracing::debug!(latency = ?start.elapsed(), size = %captured.size, "screen captured");
    Ok(captured)
}

/// Loads an existing photo. JPEG input is stored unchanged; other formats are re-encoded.
pub fn capture_from_file(source: &Path, dir: &Path, quality: u8) -> Result<CapturedImage> {
    let bytes =
        fs::read(source).with_context(|| format!("Failed to read image: {}", source.display()))?;
    let format = image::guess_format(&bytes)
        .with_context(|| format!("Unrecognized image format: {}", source.display()))?;
    let decoded = decode_oriented(&bytes, format)
        .with_context(|| format!("Failed to decode image: {}", source.display()))?;
    if decoded.dimensions() == (0, 0) {
        bail!("Image has no pixels: {}", source.display());
    }

    let jpeg = if format == ImageFormat::Jpeg {
        bytes
    } else {
        tracing::debug!(?format, "re-encoding capture as JPEG");
        encode_jpeg(&decoded, quality)?
    };
    store(dir, jpeg, &decoded)
}

/// Decodes with the EXIF orientation applied, so the size matches what viewers show.
fn decode_oriented(bytes: &[u8], format: ImageFormat) -> ImageResult<DynamicImage> {
    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format).into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut decoded = DynamicImage::from_decoder(decoder)?;
    decoded.apply_orientation(orientation);
    Ok(decoded)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut out), quality)
        .encode_image(&rgb)
        .context("Failed to encode JPEG")?;
    Ok(out)
}

fn store(dir: &Path, jpeg: Vec<u8>, decoded: &DynamicImage) -> Result<CapturedImage> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create capture directory: {}", dir.display()))?;

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let (path, mut file) = create_capture_file(dir, millis)
        .with_context(|| format!("Failed to create capture in {}", dir.display()))?;
    file.write_all(&jpeg)
        .with_context(|| format!("Failed to write capture: {}", path.display()))?;

    if env::var_os(DEBUG_ENV).is_some() {
        let debug_path = path.with_extension("png");
        decoded
            .save(&debug_path)
            .with_context(|| format!("Failed to save debug capture: {}", debug_path.display()))?;
        tracing::debug!(path = %debug_path.display(), "saved debug capture");
    }

    let (width, height) = decoded.dimensions();
    tracing::info!(path = %path.display(), width, height, "capture stored");
    Ok(CapturedImage {
        path,
        jpeg,
        size: Size::new(width, height),
    })
}

/// `chessboard_<millis>.jpg`, or `chessboard_<millis>_<n>.jpg` if that name is taken.
fn create_capture_file(dir: &Path, millis: u128) -> io::Result<(PathBuf, File)> {
    for n in 0u32.. {
        let name = match n {
            0 => format!("chessboard_{}.jpg", millis),
            n => format!("chessboard_{}_{}.jpg", millis, n),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::other("no free capture file name"))
}
