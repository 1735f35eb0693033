//! Rich-text conversion seam.

use serde_json::Value;

/// Converts a rich-text document into markdown.
///
/// The conversion itself lives outside this crate; the pipeline only
/// relies on the contract that one rich-text value becomes one markdown
/// string.
pub trait RichTextConverter: Send + Sync {
    fn to_markdown(&self, rich_text: &Value) -> String;
}

/// Passthrough for exports whose rich-text fields were already converted
/// upstream: strings come back unchanged, nulls become empty, anything
/// else is rendered as its JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownPassthrough;

impl RichTextConverter for MarkdownPassthrough {
    fn to_markdown(&self, rich_text: &Value) -> String {
        match rich_text {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passthrough_keeps_strings() {
        let converter = MarkdownPassthrough;
        assert_eq!(converter.to_markdown(&json!("already markdown")), "already markdown");
        assert_eq!(converter.to_markdown(&Value::Null), "");
    }
}
