//! Extraction of embedded overview blocks.
//!
//! Planning documents carry structured metadata in a fenced block:
//!
//! ````markdown
//! ```yaml overview
//! phase: 2
//! owner: platform
//! ```
//! ````
//!
//! [`extract`] returns the mapping from the first such block. The
//! reconciler never looks at these blocks.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::error::{Error, Result};

/// Info string that marks an overview block.
pub const OVERVIEW_MARKER: &str = "yaml overview";

fn is_marker(info: &str) -> bool {
    let mut words = info.split_whitespace();
    words.next() == Some("yaml") && words.next() == Some("overview") && words.next().is_none()
}

/// Raw YAML text of the first overview block, if any.
pub fn find_block(markdown: &str) -> Option<String> {
    let mut inside = false;
    let mut content = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if is_marker(&info) => {
                inside = true;
            }
            Event::Text(text) if inside => content.push_str(&text),
            Event::End(TagEnd::CodeBlock) if inside => return Some(content),
            _ => {}
        }
    }
    None
}

/// Parse the first overview block into a mapping.
///
/// Returns `Ok(None)` when the document has no overview block or the block
/// is empty. A block that is not a YAML mapping is an error.
pub fn extract(markdown: &str) -> Result<Option<serde_yaml::Mapping>> {
    let Some(block) = find_block(markdown) else {
        return Ok(None);
    };
    if block.trim().is_empty() {
        return Ok(None);
    }

    match serde_yaml::from_str::<serde_yaml::Value>(&block)? {
        serde_yaml::Value::Mapping(mapping) => Ok(Some(mapping)),
        serde_yaml::Value::Null => Ok(None),
        other => Err(Error::Overview(format!(
            "`{}` block must be a mapping, found {}",
            OVERVIEW_MARKER,
            yaml_kind(&other)
        ))),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
