//! Normalized rich-document tree.
//!
//! Every converter produces a [`Document`]. The tree serializes to the
//! editor's JSON shape: each node is
//! `{"type": ..., "attrs"?: ..., "content"?: [...], "marks"?: [...], "text"?: ...}`
//! with camelCase type names. The node types encode which children are legal,
//! so a `taskList` can only hold `taskItem`s and every leaf is a text run or a
//! hard break.

use serde::{Deserialize, Serialize};

/// Root node. Always serialized with `"type": "doc"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "doc")]
pub struct Document {
    #[serde(default)]
    pub content: Vec<Block>,
}

/// Block-level node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Heading {
        attrs: HeadingAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    Paragraph {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    BulletList {
        content: Vec<ListItem>,
    },
    OrderedList {
        attrs: OrderedListAttrs,
        content: Vec<ListItem>,
    },
    TaskList {
        content: Vec<TaskItem>,
    },
    Blockquote {
        content: Vec<Block>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    HorizontalRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    pub start: u32,
}

/// Child of `bulletList` and `orderedList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "listItem")]
pub struct ListItem {
    pub content: Vec<Block>,
}

/// Child of `taskList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "taskItem")]
pub struct TaskItem {
    pub attrs: TaskItemAttrs,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItemAttrs {
    pub checked: bool,
}

/// Inline leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
}

/// Formatting applied to a text run. Order is preserved as encountered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Link { attrs: LinkAttrs },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
}

impl Document {
    pub fn new(content: Vec<Block>) -> Self {
        Self { content }
    }

    /// One paragraph per non-empty text block.
    pub fn from_paragraphs<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let content = blocks
            .into_iter()
            .filter_map(|b| {
                let text = b.as_ref().trim();
                (!text.is_empty()).then(|| Block::paragraph(text))
            })
            .collect();
        Self { content }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Concatenated text of the whole tree, one line per block.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.content {
            block.collect_lines(&mut lines);
        }
        lines.join("\n")
    }
}

impl Block {
    /// Paragraph holding a single unmarked text run. Empty text yields an
    /// empty paragraph.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            content: text_content(text.into()),
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            attrs: HeadingAttrs {
                level: level.clamp(1, 6),
            },
            content: text_content(text.into()),
        }
    }

    pub fn bullet_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Block::BulletList {
            content: items
                .into_iter()
                .map(|s| ListItem {
                    content: vec![Block::paragraph(s)],
                })
                .collect(),
        }
    }

    fn collect_lines(&self, out: &mut Vec<String>) {
        match self {
            Block::Heading { content, .. }
            | Block::Paragraph { content }
            | Block::CodeBlock { content } => out.push(inline_text(content)),
            Block::BulletList { content } | Block::OrderedList { content, .. } => {
                for item in content {
                    for b in &item.content {
                        b.collect_lines(out);
                    }
                }
            }
            Block::TaskList { content } => {
                for item in content {
                    for b in &item.content {
                        b.collect_lines(out);
                    }
                }
            }
            Block::Blockquote { content } => {
                for b in content {
                    b.collect_lines(out);
                }
            }
            Block::HorizontalRule => {}
        }
    }
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }
}

fn inline_text(content: &[Inline]) -> String {
    content
        .iter()
        .map(|i| match i {
            Inline::Text { text, .. } => text.as_str(),
            Inline::HardBreak => "\n",
        })
        .collect()
}

/// A single text node, or nothing for empty text.
fn text_content(text: String) -> Vec<Inline> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Inline::text(text)]
    }
}
