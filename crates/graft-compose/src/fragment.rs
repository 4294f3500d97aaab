//! Generated source text with diagnostics kept alongside, not inside, it.
//!
//! A [`SourceFragment`] is an ordered list of pieces. Text pieces are raw
//! output; diagnostic pieces point into the fragment's diagnostic list and
//! mark where the diagnostic belongs. Only [`SourceFragment::render`] turns
//! them into directive lines.

use graft_diag::{Diagnostic, has_errors};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Diagnostic(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFragment {
    pieces: Vec<Piece>,
    diagnostics: Vec<Diagnostic>,
}

impl SourceFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fragment holding a single diagnostic and no text.
    pub fn from_diagnostic(diag: Diagnostic) -> Self {
        let mut fragment = Self::new();
        fragment.push_diagnostic(diag);
        fragment
    }

    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.pieces.last_mut() {
            Some(Piece::Text(last)) => last.push_str(text),
            _ => self.pieces.push(Piece::Text(text.to_string())),
        }
    }

    /// Append `line` followed by a newline.
    pub fn push_line(&mut self, line: &str) {
        self.push_str(line);
        self.push_str("\n");
    }

    pub fn blank_line(&mut self) {
        self.push_str("\n");
    }

    pub fn push_diagnostic(&mut self, diag: Diagnostic) {
        self.pieces.push(Piece::Diagnostic(self.diagnostics.len()));
        self.diagnostics.push(diag);
    }

    /// Move every piece of `other` onto the end of this fragment.
    pub fn append(&mut self, other: SourceFragment) {
        let offset = self.diagnostics.len();
        self.diagnostics.extend(other.diagnostics);
        for piece in other.pieces {
            match piece {
                Piece::Text(text) => self.push_str(&text),
                Piece::Diagnostic(idx) => self.pieces.push(Piece::Diagnostic(idx + offset)),
            }
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// Nothing at all was produced: no text and no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Generated text only, diagnostics left out.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            if let Piece::Text(text) = piece {
                out.push_str(text);
            }
        }
        out
    }

    /// Text with every diagnostic rendered as a directive on its own line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Diagnostic(idx) => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&self.diagnostics[*idx].to_directive());
                    out.push('\n');
                }
            }
        }
        out
    }
}
