//! Deliverable extraction
//!
//! The engineer persona is told to share its page as a fenced ```html block.
//! These helpers pull that block out of the replies and save it.

use crate::chat::ChatMessage;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use std::path::Path;

/// Contents of fenced code blocks tagged with `language`, in document order
pub fn extract_code_blocks(markdown: &str, language: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let tag = info.split_whitespace().next().unwrap_or_default();
                if tag.eq_ignore_ascii_case(language) {
                    current = Some(String::new());
                }
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Last HTML block of the most recent reply that contains one
pub fn latest_html(responses: &[ChatMessage]) -> Option<String> {
    responses
        .iter()
        .rev()
        .find_map(|message| extract_code_blocks(message.content(), "html").pop())
}

/// Write `contents` to `path`, creating parent directories
pub fn write_artifact(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
    Ok(())
}
