//! Plain-text documents as ordered text blocks
//!
//! Each line is one block and keeps its own line terminator, so joining the
//! blocks reproduces the input byte for byte.

use crate::error::Result;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    blocks: Vec<String>,
}

impl TextDocument {
    pub fn from_blocks(blocks: Vec<String>) -> Self {
        Self { blocks }
    }

    pub fn parse(text: &str) -> Self {
        Self {
            blocks: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [String] {
        &mut self.blocks
    }

    pub fn render(&self) -> String {
        self.blocks.concat()
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let document = Self::parse(&text);
        debug!(
            "Loaded {} blocks from {}",
            document.blocks.len(),
            path.as_ref().display()
        );
        Ok(document)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render_are_lossless() {
        for text in ["", "one line", "a\nb\n", "a\r\nb", "\n\n\n", "trailing\n"] {
            assert_eq!(TextDocument::parse(text).render(), text);
        }
    }

    #[test]
    fn test_blocks_are_lines() {
        let doc = TextDocument::parse("first\nsecond\nthird");
        assert_eq!(doc.blocks(), &["first\n", "second\n", "third"]);
    }
}
