//! The render description returned to the browser. A `Page` is an ordered
//! list of blocks; the front-end script draws them top to bottom.

use crate::images::Thumbnail;
use serde::Serialize;

pub const ANALYZE_TITLE: &str = "Gemini Multi-language Document Extraction";
pub const RELAY_TITLE: &str = "Gemini Pro Relay";
pub const RESULTS_HEADING: &str = "Results";
pub const UPLOAD_HINT: &str = "Please upload image files to proceed.";
pub const NO_INPUT: &str = "Please upload at least one image.";
pub const NO_TEXT: &str = "Please enter some text.";
pub const UNSAFE_CONTENT: &str =
    "The content could not be processed due to safety concerns or inappropriate content.";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Title { text: String },
    Heading { text: String },
    Text { text: String },
    Error { message: String },
    Thumbnails { images: Vec<Thumbnail> },
    Json { value: serde_json::Value },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(title: &str) -> Self {
        Page {
            blocks: vec![Block::Title { text: title.into() }],
        }
    }

    pub fn heading(&mut self, text: &str) {
        self.blocks.push(Block::Heading { text: text.into() });
    }

    pub fn text(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Text { text: text.into() });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.blocks.push(Block::Error {
            message: message.into(),
        });
    }

    pub fn thumbnails(&mut self, images: Vec<Thumbnail>) {
        if !images.is_empty() {
            self.blocks.push(Block::Thumbnails { images });
        }
    }

    pub fn json(&mut self, value: serde_json::Value) {
        self.blocks.push(Block::Json { value });
    }

    /// Blocks following the `Results` heading
    pub fn results(&self) -> Option<&[Block]> {
        self.blocks
            .iter()
            .position(|b| matches!(b, Block::Heading { text } if text == RESULTS_HEADING))
            .map(|i| &self.blocks[i + 1..])
    }

    pub fn errors(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Error { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let mut page = Page::new(ANALYZE_TITLE);
        page.heading(RESULTS_HEADING);
        page.text("X");
        page.error("boom");

        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "blocks": [
                    { "kind": "title", "text": ANALYZE_TITLE },
                    { "kind": "heading", "text": "Results" },
                    { "kind": "text", "text": "X" },
                    { "kind": "error", "message": "boom" }
                ]
            })
        );
    }

    #[test]
    fn test_results_and_errors() {
        let mut page = Page::new(RELAY_TITLE);
        assert_eq!(page.results(), None);
        page.error("first");
        page.heading(RESULTS_HEADING);
        page.json(json!({ "ok": true }));

        assert_eq!(
            page.results(),
            Some(&[Block::Json { value: json!({ "ok": true }) }][..])
        );
        assert_eq!(page.errors(), ["first"]);
    }

    #[test]
    fn test_empty_thumbnails_are_skipped() {
        let mut page = Page::default();
        page.thumbnails(vec![]);
        assert!(page.blocks.is_empty());
    }
}
