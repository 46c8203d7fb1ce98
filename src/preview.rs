//! Annotated preview of a submission: the capture letterboxed into a square canvas
//! with the four tagged corners and the board outline drawn on top.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::{Path, PathBuf};

use crate::corners::{ChessboardCorners, Point, Size, Viewport};

const MARKER_OUTER: i32 = 20;
const MARKER_INNER: i32 = 15;
const OUTLINE_WIDTH: i32 = 3;
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

pub fn render_preview(image: &DynamicImage, corners: &ChessboardCorners, canvas: Size) -> Result<RgbImage> {
    let original = Size::new(image.width(), image.height());
    let viewport = Viewport::fit(original, canvas).context("Cannot fit capture into preview")?;
    let shown = viewport.displayed_size(original);

    let mut out = RgbImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    let scaled = imageops::resize(&image.to_rgb8(), shown.width, shown.height, FilterType::Triangle);
    imageops::overlay(
        &mut out,
        &scaled,
        viewport.offset.x.round() as i64,
        viewport.offset.y.round() as i64,
    );

    let points: Vec<Point> = corners
        .to_image_space()
        .context("Cannot map corners into image space")?
        .iter()
        .map(|p| viewport.to_display(*p))
        .collect();

    for i in 0..points.len() {
        draw_thick_line(&mut out, points[i], points[(i + 1) % points.len()]);
    }
    for p in &points {
        let center = (p.x.round() as i32, p.y.round() as i32);
        draw_filled_circle_mut(&mut out, center, MARKER_OUTER, RED);
        draw_filled_circle_mut(&mut out, center, MARKER_INNER, WHITE);
    }
    Ok(out)
}

fn draw_thick_line(img: &mut RgbImage, start: Point, end: Point) {
    let half = OUTLINE_WIDTH / 2;
    for d in -half..=half {
        let d = d as f32;
        // Offsetting along both axes keeps diagonal edges as thick as straight ones.
        draw_line_segment_mut(img, (start.x + d, start.y), (end.x + d, end.y), GREEN);
        draw_line_segment_mut(img, (start.x, start.y + d), (end.x, end.y + d), GREEN);
    }
}

/// `captures/chessboard_1.jpg` → `captures/chessboard_1_annotated.png`.
pub fn preview_path(capture: &Path) -> PathBuf {
    let stem = capture
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string());
    capture.with_file_name(format!("{}_annotated.png", stem))
}

pub fn save_preview(
    image: &DynamicImage,
    corners: &ChessboardCorners,
    canvas: Size,
) -> Result<PathBuf> {
    let rendered = render_preview(image, corners, canvas)?;
    let path = preview_path(&corners.image_path);
    rendered
        .save(&path)
        .with_context(|| format!("Failed to save preview: {}", path.display()))?;
    tracing::info!(path = %path.display(), "preview saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([128, 128, 128])))
    }

    fn corners_for(size: Size, display: Size, pts: [Point; 4]) -> ChessboardCorners {
        ChessboardCorners {
            top_left: pts[0],
            top_right: pts[1],
            bottom_right: pts[2],
            bottom_left: pts[3],
            image_path: PathBuf::from("captures/chessboard_1.jpg"),
            original_width: size.width,
            original_height: size.height,
            display_size: display,
        }
    }

    #[test]
    fn test_preview_letterboxes_and_marks_corners() {
        let size = Size::new(400, 200);
        let corners = corners_for(
            size,
            size,
            [
                Point::new(100.0, 50.0),
                Point::new(300.0, 50.0),
                Point::new(300.0, 150.0),
                Point::new(100.0, 150.0),
            ],
        );
        let out = render_preview(&grey_image(400, 200), &corners, Size::new(200, 200)).unwrap();
        assert_eq!(out.dimensions(), (200, 200));

        // scale 0.5, offset (0, 50): letterbox stays black, image area is grey
        assert_eq!(*out.get_pixel(5, 5), BACKGROUND);
        assert_eq!(*out.get_pixel(100, 100), Rgb([128, 128, 128]));

        // corner (100,50) lands at (50,75): white centre, red ring
        assert_eq!(*out.get_pixel(50, 75), WHITE);
        assert_eq!(*out.get_pixel(50 + 18, 75), RED);

        // outline between top corners at y = 75, away from the markers
        assert_eq!(*out.get_pixel(100, 75), GREEN);
    }

    #[test]
    fn test_preview_maps_display_space_corners() {
        let size = Size::new(400, 400);
        // tagged on a 200x200 display of the same image
        let corners = corners_for(
            size,
            Size::new(200, 200),
            [
                Point::new(50.0, 50.0),
                Point::new(150.0, 50.0),
                Point::new(150.0, 150.0),
                Point::new(50.0, 150.0),
            ],
        );
        let out = render_preview(&grey_image(400, 400), &corners, Size::new(400, 400)).unwrap();
        assert_eq!(*out.get_pixel(100, 100), WHITE);
        assert_eq!(*out.get_pixel(300, 300), WHITE);
    }

    #[test]
    fn test_preview_path() {
        assert_eq!(
            preview_path(Path::new("captures/chessboard_1.jpg")),
            PathBuf::from("captures/chessboard_1_annotated.png")
        );
    }

    #[test]
    fn test_save_preview_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let size = Size::new(64, 64);
        let mut corners = corners_for(size, size, [Point::new(8.0, 8.0); 4]);
        corners.image_path = dir.path().join("chessboard_7.jpg");

        let path = save_preview(&grey_image(64, 64), &corners, Size::new(128, 128)).unwrap();
        assert_eq!(path, dir.path().join("chessboard_7_annotated.png"));
        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (128, 128));
    }
}
