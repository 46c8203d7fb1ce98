//! Result stage output: the detected position (or the error), followed by the
//! submitted corner coordinates. Text for people, JSON for scripts.

use serde::Serialize;

use crate::corners::ChessboardCorners;
use crate::detect::{DetectError, DetectionResult};
use crate::fen::{self, FenCheck};

pub fn render_result(corners: &ChessboardCorners, outcome: &Result<DetectionResult, DetectError>) -> String {
    let mut out = String::from("Chess pieces detection\n\n");

    match outcome {
        Ok(result) => {
            out.push_str("Open in Lichess:\n");
            out.push_str(&format!("  {}\n\n", fen::resolved_lichess_url(result)));
            out.push_str("FEN Notation:\n");
            out.push_str(&format!("  {}\n", result.fen));
            match fen::check_fen(&result.fen) {
                FenCheck::Valid => {}
                FenCheck::Illegal(reason) => {
                    out.push_str(&format!("  (note: not a legal position: {})\n", reason))
                }
                FenCheck::Malformed(reason) => {
                    out.push_str(&format!("  (note: FEN does not parse: {})\n", reason))
                }
            }
            if !result.board_matrix.is_empty() {
                out.push_str("\nBoard:\n");
                out.push_str(&fen::render_matrix(&result.board_matrix));
            }
        }
        Err(e) => {
            out.push_str("Error\n");
            out.push_str(&format!("  {}\n", e.user_message()));
        }
    }

    out.push_str("\nCorner Coordinates:\n");
    out.push_str(&format!(
        "  Original Image Size: {} × {}\n",
        corners.original_width, corners.original_height
    ));
    for (label, p) in corners.labelled() {
        out.push_str(&format!("  {}: X: {}, Y: {}\n", label, p.x as i64, p.y as i64));
    }
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a DetectionResult,
    corners: &'a ChessboardCorners,
}

pub fn render_json(corners: &ChessboardCorners, result: &DetectionResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport { result, corners })
}

#[derive(Serialize)]
struct JsonError<'a> {
    error: String,
    corners: &'a ChessboardCorners,
}

pub fn render_json_error(corners: &ChessboardCorners, error: &DetectError) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonError {
        error: error.user_message(),
        corners,
    })
}
