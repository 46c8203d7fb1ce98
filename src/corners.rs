//! Corner annotation model.
//! The four board corners are tagged in display space (TL → TR → BR → BL) and
//! travel with the source image path and its pixel dimensions.
//! `Viewport` holds the fit ("contain") scaling used to move points between a
//! display area, the original image, and the preview canvas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while collecting or converting corner taps.
#[derive(Debug, Error, PartialEq)]
pub enum CornerError {
    #[error("expected `x,y`, got '{0}'")]
    Malformed(String),
    #[error("coordinates must be finite numbers, got '{0}'")]
    NotFinite(String),
    #[error("point ({x:.1}, {y:.1}) lies outside the {width}x{height} display area")]
    OutOfBounds { x: f32, y: f32, width: u32, height: u32 },
    #[error("expected 4 corners, got {0}")]
    WrongCount(usize),
    #[error("sizes must be non-zero")]
    EmptySize,
    #[error("expected size as `WIDTHxHEIGHT`, got '{0}'")]
    MalformedSize(String),
    #[error("cannot confirm: {0}/4 corners selected")]
    Incomplete(usize),
    #[error("cannot confirm: image size unknown")]
    UnknownImageSize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Inclusive bounds check; a tap on the far edge still counts.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width as f32 && p.y <= self.height as f32
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = CornerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CornerError::MalformedSize(s.to_string());
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(malformed)?;
        let width = w.trim().parse::<u32>().map_err(|_| malformed())?;
        let height = h.trim().parse::<u32>().map_err(|_| malformed())?;
        let size = Size::new(width, height);
        if size.is_empty() {
            return Err(CornerError::EmptySize);
        }
        Ok(size)
    }
}

/// Corner positions in the order they must be tagged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CornerLabel {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl CornerLabel {
    pub const ORDER: [CornerLabel; 4] = [
        CornerLabel::TopLeft,
        CornerLabel::TopRight,
        CornerLabel::BottomRight,
        CornerLabel::BottomLeft,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            CornerLabel::TopLeft => "Top Left",
            CornerLabel::TopRight => "Top Right",
            CornerLabel::BottomRight => "Bottom Right",
            CornerLabel::BottomLeft => "Bottom Left",
        }
    }
}

impl fmt::Display for CornerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Fit scaling of an image into an area, centred with letterbox offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Point,
}

impl Viewport {
    pub fn fit(image: Size, area: Size) -> Result<Self, CornerError> {
        if image.is_empty() || area.is_empty() {
            return Err(CornerError::EmptySize);
        }
        let scale_x = area.width as f32 / image.width as f32;
        let scale_y = area.height as f32 / image.height as f32;
        let scale = scale_x.min(scale_y);

        let displayed_w = image.width as f32 * scale;
        let displayed_h = image.height as f32 * scale;

        Ok(Self {
            scale,
            offset: Point::new(
                (area.width as f32 - displayed_w) / 2.0,
                (area.height as f32 - displayed_h) / 2.0,
            ),
        })
    }

    /// Image pixel → display coordinates.
    pub fn to_display(self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.offset.x, p.y * self.scale + self.offset.y)
    }

    /// Display coordinates → image pixel. Letterbox taps map outside the image.
    pub fn to_image(self, p: Point) -> Point {
        Point::new((p.x - self.offset.x) / self.scale, (p.y - self.offset.y) / self.scale)
    }

    /// Rendered size of `image` inside the area, rounded to whole pixels.
    pub fn displayed_size(self, image: Size) -> Size {
        Size::new(
            ((image.width as f32 * self.scale).round() as u32).max(1),
            ((image.height as f32 * self.scale).round() as u32).max(1),
        )
    }
}

/// A confirmed corner set, ready for submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChessboardCorners {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
    pub image_path: PathBuf,
    pub original_width: u32,
    pub original_height: u32,
    pub display_size: Size,
}

impl ChessboardCorners {
    pub fn points(&self) -> [Point; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    pub fn labelled(&self) -> [(CornerLabel, Point); 4] {
        let p = self.points();
        [
            (CornerLabel::TopLeft, p[0]),
            (CornerLabel::TopRight, p[1]),
            (CornerLabel::BottomRight, p[2]),
            (CornerLabel::BottomLeft, p[3]),
        ]
    }

    pub fn original_size(&self) -> Size {
        Size::new(self.original_width, self.original_height)
    }

    /// Corners in original image pixels. Identity unless tagged through a viewport.
    pub fn to_image_space(&self) -> Result<[Point; 4], CornerError> {
        if self.display_size == self.original_size() {
            return Ok(self.points());
        }
        let viewport = Viewport::fit(self.original_size(), self.display_size)?;
        Ok(self.points().map(|p| viewport.to_image(p)))
    }
}

/// Wire shape of the `corners` form part.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CornersPayload {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl From<&ChessboardCorners> for CornersPayload {
    fn from(c: &ChessboardCorners) -> Self {
        Self {
            top_left: c.top_left,
            top_right: c.top_right,
            bottom_right: c.bottom_right,
            bottom_left: c.bottom_left,
        }
    }
}

/// In-progress corner taps for one image.
#[derive(Debug, Clone)]
pub struct CornerSelection {
    taps: Vec<Point>,
    display: Size,
    image: Option<(PathBuf, Size)>,
}

impl CornerSelection {
    pub fn new(display: Size) -> Self {
        Self {
            taps: Vec::with_capacity(4),
            display,
            image: None,
        }
    }

    /// Records the source image once its dimensions are known.
    pub fn with_image(mut self, path: impl Into<PathBuf>, size: Size) -> Self {
        self.image = Some((path.into(), size));
        self
    }

    pub fn display(&self) -> Size {
        self.display
    }

    pub fn count(&self) -> usize {
        self.taps.len()
    }

    /// Label for the next tap, or `None` once all four are in.
    pub fn next_label(&self) -> Option<CornerLabel> {
        CornerLabel::ORDER.get(self.taps.len()).copied()
    }

    /// Adds a tap. Returns `Ok(false)` when four corners are already set.
    pub fn tap(&mut self, p: Point) -> Result<bool, CornerError> {
        if self.taps.len() >= 4 {
            return Ok(false);
        }
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(CornerError::NotFinite(format!("{},{}", p.x, p.y)));
        }
        if !self.display.contains(p) {
            return Err(CornerError::OutOfBounds {
                x: p.x,
                y: p.y,
                width: self.display.width,
                height: self.display.height,
            });
        }
        self.taps.push(p);
        Ok(true)
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }

    pub fn can_confirm(&self) -> bool {
        self.taps.len() == 4 && self.image.is_some()
    }

    pub fn confirm(&self) -> Result<ChessboardCorners, CornerError> {
        if self.taps.len() != 4 {
            return Err(CornerError::Incomplete(self.taps.len()));
        }
        let (path, size) = self.image.as_ref().ok_or(CornerError::UnknownImageSize)?;
        Ok(ChessboardCorners {
            top_left: self.taps[0],
            top_right: self.taps[1],
            bottom_right: self.taps[2],
            bottom_left: self.taps[3],
            image_path: path.clone(),
            original_width: size.width,
            original_height: size.height,
            display_size: self.display,
        })
    }
}

/// Parses a single `x,y` tap.
pub fn parse_point(input: &str) -> Result<Point, CornerError> {
    let malformed = || CornerError::Malformed(input.trim().to_string());
    let (x, y) = input.trim().split_once(',').ok_or_else(malformed)?;
    let x = x.trim().parse::<f32>().map_err(|_| malformed())?;
    let y = y.trim().parse::<f32>().map_err(|_| malformed())?;
    if !x.is_finite() || !y.is_finite() {
        return Err(CornerError::NotFinite(input.trim().to_string()));
    }
    Ok(Point::new(x, y))
}

/// Parses four taps separated by whitespace or `;`, e.g. `"10,12 400,8 410,390 6,402"`.
pub fn parse_corner_list(input: &str) -> Result<Vec<Point>, CornerError> {
    let normalized = input.split(',').map(str::trim).collect::<Vec<_>>().join(",");
    let points = normalized
        .split(|c: char| c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()?;
    if points.len() != 4 {
        return Err(CornerError::WrongCount(points.len()));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3,
            "{:?} != {:?}",
            a,
            b
        );
    }

    fn square_selection() -> CornerSelection {
        CornerSelection::new(Size::new(800, 600)).with_image("board.jpg", Size::new(800, 600))
    }

    #[test]
    fn test_confirm_enabled_after_four_taps() {
        let mut sel = square_selection();
        for (i, p) in [(10.0, 10.0), (700.0, 12.0), (690.0, 580.0), (15.0, 590.0)]
            .into_iter()
            .enumerate()
        {
            assert!(!sel.can_confirm(), "confirm enabled after {} taps", i);
            assert!(sel.tap(Point::new(p.0, p.1)).unwrap());
        }
        assert!(sel.can_confirm());
        assert_eq!(sel.next_label(), None);

        let corners = sel.confirm().unwrap();
        assert_eq!(corners.top_left, Point::new(10.0, 10.0));
        assert_eq!(corners.bottom_left, Point::new(15.0, 590.0));
        assert_eq!(corners.original_width, 800);
        assert_eq!(corners.image_path, PathBuf::from("board.jpg"));
    }

    #[test]
    fn test_fifth_tap_ignored() {
        let mut sel = square_selection();
        for _ in 0..4 {
            sel.tap(Point::new(1.0, 1.0)).unwrap();
        }
        assert!(!sel.tap(Point::new(2.0, 2.0)).unwrap());
        assert_eq!(sel.count(), 4);
        assert!(!sel.tap(Point::new(5000.0, 1.0)).unwrap());
        assert!(!sel.tap(Point::new(f32::NAN, 1.0)).unwrap());
        assert_eq!(sel.count(), 4);
    }

    #[test]
    fn test_reset_clears_taps() {
        let mut sel = square_selection();
        sel.tap(Point::new(5.0, 5.0)).unwrap();
        sel.tap(Point::new(6.0, 5.0)).unwrap();
        sel.reset();
        assert_eq!(sel.count(), 0);
        assert_eq!(sel.next_label(), Some(CornerLabel::TopLeft));
        assert_eq!(sel.confirm().unwrap_err(), CornerError::Incomplete(0));
    }

    #[test]
    fn test_confirm_requires_image_size() {
        let mut sel = CornerSelection::new(Size::new(100, 100));
        for _ in 0..4 {
            sel.tap(Point::new(50.0, 50.0)).unwrap();
        }
        assert!(!sel.can_confirm());
        assert_eq!(sel.confirm().unwrap_err(), CornerError::UnknownImageSize);
    }

    #[test]
    fn test_tap_outside_display_rejected() {
        let mut sel = square_selection();
        let err = sel.tap(Point::new(801.0, 10.0)).unwrap_err();
        assert!(matches!(err, CornerError::OutOfBounds { width: 800, .. }));
        assert!(sel.tap(Point::new(f32::NAN, 1.0)).is_err());
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn test_next_label_follows_order() {
        let mut sel = square_selection();
        let mut seen = Vec::new();
        while let Some(label) = sel.next_label() {
            seen.push(label);
            sel.tap(Point::new(0.0, 0.0)).unwrap();
        }
        assert_eq!(seen, CornerLabel::ORDER.to_vec());
    }

    #[test]
    fn test_fit_landscape_into_square() {
        let vp = Viewport::fit(Size::new(4000, 3000), Size::new(800, 800)).unwrap();
        assert!((vp.scale - 0.2).abs() < 1e-6);
        assert_close(vp.offset, Point::new(0.0, 100.0));
        assert_eq!(vp.displayed_size(Size::new(4000, 3000)), Size::new(800, 600));

        assert_close(vp.to_display(Point::new(2000.0, 1500.0)), Point::new(400.0, 400.0));
        assert_close(vp.to_image(Point::new(400.0, 400.0)), Point::new(2000.0, 1500.0));
        assert_close(vp.to_image(Point::new(0.0, 100.0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_fit_round_trip() {
        let vp = Viewport::fit(Size::new(1080, 1920), Size::new(720, 720)).unwrap();
        let p = Point::new(333.0, 1777.0);
        assert_close(vp.to_image(vp.to_display(p)), p);
    }

    #[test]
    fn test_fit_rejects_empty_sizes() {
        assert_eq!(
            Viewport::fit(Size::new(0, 10), Size::new(10, 10)).unwrap_err(),
            CornerError::EmptySize
        );
        assert!(Viewport::fit(Size::new(10, 10), Size::new(10, 0)).is_err());
    }

    #[test]
    fn test_to_image_space_through_viewport() {
        let corners = ChessboardCorners {
            top_left: Point::new(0.0, 100.0),
            top_right: Point::new(800.0, 100.0),
            bottom_right: Point::new(800.0, 700.0),
            bottom_left: Point::new(0.0, 700.0),
            image_path: PathBuf::from("x.jpg"),
            original_width: 4000,
            original_height: 3000,
            display_size: Size::new(800, 800),
        };
        let pts = corners.to_image_space().unwrap();
        assert_close(pts[0], Point::new(0.0, 0.0));
        assert_close(pts[2], Point::new(4000.0, 3000.0));
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point(" 12.5, 40 ").unwrap(), Point::new(12.5, 40.0));
        assert!(matches!(parse_point("12"), Err(CornerError::Malformed(_))));
        assert!(matches!(parse_point("a,b"), Err(CornerError::Malformed(_))));
        assert!(matches!(parse_point("inf,3"), Err(CornerError::NotFinite(_))));
    }

    #[test]
    fn test_parse_corner_list_separators() {
        let pts = parse_corner_list("10,12 400, 8;410,390  6 ,402").unwrap();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[1], Point::new(400.0, 8.0));
        assert_eq!(pts[3], Point::new(6.0, 402.0));
        assert_eq!(
            parse_corner_list("1,1 2,2 3,3").unwrap_err(),
            CornerError::WrongCount(3)
        );
    }

    #[test]
    fn test_size_from_str() {
        assert_eq!("1080x1920".parse::<Size>().unwrap(), Size::new(1080, 1920));
        assert_eq!("0x10".parse::<Size>().unwrap_err(), CornerError::EmptySize);
        assert!("1080".parse::<Size>().is_err());
    }

    #[test]
    fn test_payload_uses_camel_case_keys() {
        let corners = square_selection();
        let mut corners = corners;
        for p in [(1.0, 2.0), (3.0, 4.0), (5.0, 6.0), (7.0, 8.0)] {
            corners.tap(Point::new(p.0, p.1)).unwrap();
        }
        let payload = CornersPayload::from(&corners.confirm().unwrap());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["topLeft"]["x"], 1.0);
        assert_eq!(json["topRight"]["y"], 4.0);
        assert_eq!(json["bottomRight"]["x"], 5.0);
        assert_eq!(json["bottomLeft"]["y"], 8.0);
    }
}
