//! Checks on a detection result.
//! The backend's answer is reported as-is; these helpers only describe it:
//! FEN syntax/legality via `shakmaty`, agreement between the FEN and the per-square
//! matrix, and a text rendering of the matrix.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

use crate::detect::DetectionResult;

const LICHESS_ANALYSIS: &str = "https://lichess.org/analysis/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FenCheck {
    Valid,
    /// Parses, but is not a legal standard-chess position (e.g. missing king).
    Illegal(String),
    Malformed(String),
}

impl FenCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, FenCheck::Valid)
    }
}

pub fn check_fen(fen: &str) -> FenCheck {
    let parsed = match Fen::from_ascii(fen.trim().as_bytes()) {
        Ok(parsed) => parsed,
        Err(e) => return FenCheck::Malformed(e.to_string()),
    };
    match parsed.into_position::<Chess>(CastlingMode::Standard) {
        Ok(_) => FenCheck::Valid,
        Err(e) => FenCheck::Illegal(e.to_string()),
    }
}

/// Maps one matrix label to a FEN piece letter. Accepts `"K"` / `"p"` and
/// colour-prefixed `"wK"` / `"bP"`; everything else is an empty square.
fn piece_letter(label: &str) -> Option<char> {
    let label = label.trim();
    let mut chars = label.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, None) if "KQRBNPkqrbnp".contains(c) => Some(c),
        (Some('w'), Some(c), None) if "KQRBNPkqrbnp".contains(c) => Some(c.to_ascii_uppercase()),
        (Some('b'), Some(c), None) if "KQRBNPkqrbnp".contains(c) => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn is_square_grid(matrix: &[Vec<String>]) -> bool {
    matrix.len() == 8 && matrix.iter().all(|row| row.len() == 8)
}

/// Rebuilds the FEN piece-placement field (rank 8 first) from an 8×8 matrix.
pub fn placement_from_matrix(matrix: &[Vec<String>]) -> Option<String> {
    if !is_square_grid(matrix) {
        return None;
    }
    let ranks: Vec<String> = matrix
        .iter()
        .map(|row| {
            let mut rank = String::new();
            let mut empty = 0;
            for square in row {
                match piece_letter(square) {
                    Some(c) => {
                        if empty > 0 {
                            rank.push_str(&empty.to_string());
                            empty = 0;
                        }
                        rank.push(c);
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                rank.push_str(&empty.to_string());
            }
            rank
        })
        .collect();
    Some(ranks.join("/"))
}

/// `None` when the matrix is not 8×8; otherwise whether it matches the FEN placement.
pub fn matrix_agrees(result: &DetectionResult) -> Option<bool> {
    let placement = placement_from_matrix(&result.board_matrix)?;
    let fen_placement = result.fen.split_whitespace().next().unwrap_or("");
    Some(placement == fen_placement)
}

pub fn lichess_analysis_url(fen: &str) -> String {
    format!("{}{}", LICHESS_ANALYSIS, fen.trim().replace(' ', "_"))
}

/// The backend's link, or one derived from the FEN when the backend left it blank.
pub fn resolved_lichess_url(result: &DetectionResult) -> String {
    if result.lichess_url.trim().is_empty() {
        lichess_analysis_url(&result.fen)
    } else {
        result.lichess_url.clone()
    }
}

/// Text grid with rank/file labels; rows of other shapes are printed raw.
pub fn render_matrix(matrix: &[Vec<String>]) -> String {
    let mut out = String::new();
    if !is_square_grid(matrix) {
        for row in matrix {
            out.push_str(&row.join(" "));
            out.push('\n');
        }
        return out;
    }
    out.push_str("  a b c d e f g h\n");
    for (i, row) in matrix.iter().enumerate() {
        let squares: Vec<String> = row
            .iter()
            .map(|s| piece_letter(s).unwrap_or('.').to_string())
            .collect();
        out.push_str(&format!("{} {}\n", 8 - i, squares.join(" ")));
    }
    out
}
