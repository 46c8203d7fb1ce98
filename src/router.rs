//! Stage routing: Capture → CornerSelection → Result, with Back and Retry both
//! discarding the current capture and returning to Capture.

use crate::capture::CapturedImage;
use crate::corners::ChessboardCorners;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Capture,
    CornerSelection,
    Result,
}

#[derive(Debug)]
pub struct Router {
    screen: Screen,
    captured: Option<CapturedImage>,
    corners: Option<ChessboardCorners>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            screen: Screen::Capture,
            captured: None,
            corners: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn captured(&self) -> Option<&CapturedImage> {
        self.captured.as_ref()
    }

    pub fn corners(&self) -> Option<&ChessboardCorners> {
        self.corners.as_ref()
    }

    pub fn on_image_captured(&mut self, image: CapturedImage) {
        self.captured = Some(image);
        self.screen = Screen::CornerSelection;
    }

    pub fn on_corners_confirmed(&mut self, corners: ChessboardCorners) {
        self.corners = Some(corners);
        self.screen = Screen::Result;
    }

    pub fn on_back(&mut self) {
        self.clear();
    }

    pub fn on_retry(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.captured = None;
        self.corners = None;
        self.screen = Screen::Capture;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::{Point, Size};
    use std::path::PathBuf;

    fn image() -> CapturedImage {
        CapturedImage {
            path: PathBuf::from("captures/chessboard_1.jpg"),
            jpeg: vec![0xFF, 0xD8],
            size: Size::new(10, 10),
        }
    }

    fn corners() -> ChessboardCorners {
        ChessboardCorners {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(10.0, 0.0),
            bottom_right: Point::new(10.0, 10.0),
            bottom_left: Point::new(0.0, 10.0),
            image_path: PathBuf::from("captures/chessboard_1.jpg"),
            original_width: 10,
            original_height: 10,
            display_size: Size::new(10, 10),
        }
    }

    #[test]
    fn test_linear_flow() {
        let mut router = Router::new();
        assert_eq!(router.screen(), Screen::Capture);

        router.on_image_captured(image());
        assert_eq!(router.screen(), Screen::CornerSelection);
        assert!(router.captured().is_some());

        router.on_corners_confirmed(corners());
        assert_eq!(router.screen(), Screen::Result);
        assert_eq!(router.corners().unwrap().original_width, 10);
    }

    #[test]
    fn test_back_discards_capture() {
        let mut router = Router::new();
        router.on_image_captured(image());
        router.on_back();
        assert_eq!(router.screen(), Screen::Capture);
        assert!(router.captured().is_none());
    }

    #[test]
    fn test_retry_discards_everything() {
        let mut router = Router::new();
        router.on_image_captured(image());
        router.on_corners_confirmed(corners());
        router.on_retry();
        assert_eq!(router.screen(), Screen::Capture);
        assert!(router.captured().is_none());
        assert!(router.corners().is_none());
    }
}
