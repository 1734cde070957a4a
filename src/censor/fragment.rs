//! Fragment: the replacement produced for one text segment
//!
//! A fragment is an ordered list of plain-text and censored pieces. Hosts
//! build DOM nodes from the pieces directly, so page text is never parsed
//! as HTML.

use serde::{Deserialize, Serialize};

/// One run of a rewritten segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Piece {
    /// Original page text, untouched
    Text(String),
    /// Replacement literal for a matched word
    Censored(String),
}

impl Piece {
    pub fn as_str(&self) -> &str {
        match self {
            Piece::Text(s) | Piece::Censored(s) => s,
        }
    }

    pub fn is_censored(&self) -> bool {
        matches!(self, Piece::Censored(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pieces: Vec<Piece>,
}

impl Fragment {
    /// Fragment holding the untouched segment text
    pub fn plain(text: &str) -> Self {
        Self {
            pieces: vec![Piece::Text(text.to_string())],
        }
    }

    pub fn from_pieces(pieces: Vec<Piece>) -> Self {
        Self { pieces }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub(crate) fn pieces_mut(&mut self) -> &mut Vec<Piece> {
        &mut self.pieces
    }

    /// True when no pattern matched
    pub fn is_unchanged(&self) -> bool {
        !self.pieces.iter().any(Piece::is_censored)
    }

    pub fn censored_count(&self) -> usize {
        self.pieces.iter().filter(|p| p.is_censored()).count()
    }

    /// Visible text after rewriting
    pub fn rendered_text(&self) -> String {
        self.pieces.iter().map(Piece::as_str).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
