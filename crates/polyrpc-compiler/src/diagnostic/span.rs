//! Source location tracking.

use std::path::PathBuf;

/// A span in the source code. Lines and columns are 1-based.
#[derive(Debug, Clone)]
pub struct Span {
    pub file: PathBuf,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(file: PathBuf, start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            file,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Builds a span from a tree-sitter node, converting to 1-based positions.
    pub fn from_node(file: &std::path::Path, node: tree_sitter::Node) -> Self {
        Self::new(
            file.to_path_buf(),
            node.start_position().row + 1,
            node.start_position().column + 1,
            node.end_position().row + 1,
            node.end_position().column + 1,
        )
    }
}
