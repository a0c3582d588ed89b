//! Toolbar commands.
//!
//! Every command is a pure function of the text and selection. The session
//! applies the resulting [`Edit`], records a history entry and hands the
//! selection back to the host with focus restored.

use crate::document::Selection;
use scribe_evaluator::CapabilitySet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a command: the new buffer and where the selection lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub selection: Selection,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("No widget named '{0}' is registered")]
    UnknownWidget(String),

    #[error("Heading level must be between 1 and 6, got {0}")]
    InvalidHeadingLevel(u8),
}

/// Put `before` and `after` around the selection. The selection stays on the
/// wrapped text, so an empty selection leaves the cursor between the markers.
pub fn wrap_selection(text: &str, selection: Selection, before: &str, after: &str) -> Edit {
    let Selection { start, end } = selection.clamp(text);

    let mut out = String::with_capacity(text.len() + before.len() + after.len());
    out.push_str(&text[..start]);
    out.push_str(before);
    out.push_str(&text[start..end]);
    out.push_str(after);
    out.push_str(&text[end..]);

    Edit {
        text: out,
        selection: Selection::new(start + before.len(), end + before.len()),
    }
}

/// Insert `fragment` at the end of the selection; nothing is replaced. The
/// cursor lands right after the fragment.
pub fn insert_at_cursor(text: &str, selection: Selection, fragment: &str) -> Edit {
    let at = selection.clamp(text).end;

    let mut out = String::with_capacity(text.len() + fragment.len());
    out.push_str(&text[..at]);
    out.push_str(fragment);
    out.push_str(&text[at..]);

    Edit {
        text: out,
        selection: Selection::cursor(at + fragment.len()),
    }
}

/// Insert `prefix` at the start of the line holding the selection start,
/// whatever the cursor column. The selection shifts with the text.
pub fn insert_line_prefix(text: &str, selection: Selection, prefix: &str) -> Edit {
    let selection = selection.clamp(text);
    let line_start = line_start(text, selection.start);

    let mut out = String::with_capacity(text.len() + prefix.len());
    out.push_str(&text[..line_start]);
    out.push_str(prefix);
    out.push_str(&text[line_start..]);

    Edit {
        text: out,
        selection: Selection::new(selection.start + prefix.len(), selection.end + prefix.len()),
    }
}

/// Insert the usage template of a registered widget at the cursor
pub fn insert_widget_template(
    text: &str,
    selection: Selection,
    capabilities: &CapabilitySet,
    name: &str,
) -> Result<Edit, CommandError> {
    let template = capabilities
        .template(name)
        .ok_or_else(|| CommandError::UnknownWidget(name.to_string()))?;
    Ok(insert_at_cursor(text, selection, &block_fragment(text, selection, &template)))
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Block-level snippets need their own line
fn block_fragment(text: &str, selection: Selection, fragment: &str) -> String {
    let at = selection.clamp(text).end;
    if at == 0 || text[..at].ends_with('\n') {
        fragment.to_string()
    } else {
        format!("\n\n{}", fragment)
    }
}

/// Snippet inserted for a freshly uploaded image
pub fn uploaded_image_snippet(url: &str) -> String {
    format!("<Figure src=\"{}\" />\n", url.replace('"', "%22"))
}

/// The toolbar's command set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "arg", rename_all = "camelCase")]
pub enum ToolbarCommand {
    Bold,
    Italic,
    Strikethrough,
    InlineCode,
    Heading(u8),
    Quote,
    BulletList,
    NumberedList,
    Link,
    Image,
    HorizontalRule,
    CodeBlock,
    Widget(String),
}

impl ToolbarCommand {
    /// Compute the edit this command makes on `text`
    pub fn apply(
        &self,
        text: &str,
        selection: Selection,
        capabilities: &CapabilitySet,
    ) -> Result<Edit, CommandError> {
        let edit = match self {
            ToolbarCommand::Bold => wrap_selection(text, selection, "**", "**"),
            ToolbarCommand::Italic => wrap_selection(text, selection, "*", "*"),
            ToolbarCommand::Strikethrough => wrap_selection(text, selection, "~~", "~~"),
            ToolbarCommand::InlineCode => wrap_selection(text, selection, "`", "`"),
            ToolbarCommand::CodeBlock => wrap_selection(text, selection, "```\n", "\n```\n"),

            ToolbarCommand::Heading(level) => {
                if !(1..=6).contains(level) {
                    return Err(CommandError::InvalidHeadingLevel(*level));
                }
                let prefix = format!("{} ", "#".repeat(*level as usize));
                insert_line_prefix(text, selection, &prefix)
            }
            ToolbarCommand::Quote => insert_line_prefix(text, selection, "> "),
            ToolbarCommand::BulletList => insert_line_prefix(text, selection, "- "),
            ToolbarCommand::NumberedList => insert_line_prefix(text, selection, "1. "),

            ToolbarCommand::Link => insert_at_cursor(text, selection, "[link text](https://example.com)"),
            ToolbarCommand::Image => insert_at_cursor(text, selection, "![alt text](/images/example.png)"),
            ToolbarCommand::HorizontalRule => {
                insert_at_cursor(text, selection, &block_fragment(text, selection, "---\n"))
            }
            ToolbarCommand::Widget(name) => insert_widget_template(text, selection, capabilities, name)?,
        };
        Ok(edit)
    }

    pub fn label(&self) -> String {
        match self {
            ToolbarCommand::Bold => "Bold".to_string(),
            ToolbarCommand::Italic => "Italic".to_string(),
            ToolbarCommand::Strikethrough => "Strikethrough".to_string(),
            ToolbarCommand::InlineCode => "Inline code".to_string(),
            ToolbarCommand::Heading(level) => format!("Heading {}", level),
            ToolbarCommand::Quote => "Quote".to_string(),
            ToolbarCommand::BulletList => "Bulleted list".to_string(),
            ToolbarCommand::NumberedList => "Numbered list".to_string(),
            ToolbarCommand::Link => "Link".to_string(),
            ToolbarCommand::Image => "Image".to_string(),
            ToolbarCommand::HorizontalRule => "Horizontal rule".to_string(),
            ToolbarCommand::CodeBlock => "Code block".to_string(),
            ToolbarCommand::Widget(name) => format!("Insert {}", name),
        }
    }

    /// Every command a toolbar for `capabilities` offers, in display order
    pub fn toolbar(capabilities: &CapabilitySet) -> Vec<ToolbarCommand> {
        let mut commands = vec![
            ToolbarCommand::Bold,
            ToolbarCommand::Italic,
            ToolbarCommand::Strikethrough,
            ToolbarCommand::InlineCode,
        ];
        commands.extend((1..=6).map(ToolbarCommand::Heading));
        commands.extend([
            ToolbarCommand::Quote,
            ToolbarCommand::BulletList,
            ToolbarCommand::NumberedList,
            ToolbarCommand::Link,
            ToolbarCommand::Image,
            ToolbarCommand::HorizontalRule,
            ToolbarCommand::CodeBlock,
        ]);
        commands.extend(capabilities.names().map(|name| ToolbarCommand::Widget(name.to_string())));
        commands
    }
}
