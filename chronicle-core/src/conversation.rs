//! Conversation export data model.
//!
//! An export conversation stores its messages as a tree keyed by node id
//! (the `mapping`). Nodes reference their parent and children by id, so the
//! tree is held as an arena: nodes live in a `Vec` in document order and a
//! side index maps ids to slots. Cycles and dangling ids in malformed
//! exports are therefore just ids that lead nowhere new.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title a conversation gets when the export omits one.
pub const DEFAULT_TITLE: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Unknown,
}

impl MessageRole {
    pub fn from_export_value(value: &Value) -> MessageRole {
        value
            .as_str()
            .map(|s| match s {
                "user" => MessageRole::User,
                "assistant" => MessageRole::Assistant,
                "system" => MessageRole::System,
                _ => MessageRole::Unknown,
            })
            .unwrap_or(MessageRole::Unknown)
    }

    /// Transcript label, or `None` for roles that never produce a line.
    pub fn label(self) -> Option<&'static str> {
        match self {
            MessageRole::User => Some("User"),
            MessageRole::Assistant => Some("Assistant"),
            MessageRole::System => Some("System"),
            MessageRole::Unknown => None,
        }
    }
}

/// `content.parts` as found in the export.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentParts {
    /// Ordered fragments: plain strings or structured parts
    Sequence(Vec<Value>),
    /// Older exports carry a single object with a `text` field
    Structured(Map<String, Value>),
    Empty,
}

impl ContentParts {
    fn from_export(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Array(parts)) => ContentParts::Sequence(parts.clone()),
            Some(Value::Object(obj)) => ContentParts::Structured(obj.clone()),
            _ => ContentParts::Empty,
        }
    }

    /// Only the first fragment counts, and only when it is a non-empty string.
    pub fn text(&self) -> &str {
        match self {
            ContentParts::Sequence(parts) => parts
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default(),
            ContentParts::Structured(obj) => {
                obj.get("text").and_then(Value::as_str).unwrap_or_default()
            }
            ContentParts::Empty => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub author_role: MessageRole,
    pub content_parts: ContentParts,
    pub create_time: Option<f64>,
    pub metadata: Map<String, Value>,
}

impl Message {
    /// Build a message from an export payload.
    ///
    /// Returns `None` for `null`, empty objects and non-object payloads: the
    /// export uses those for structural placeholder nodes.
    pub fn from_export(value: &Value) -> Option<Self> {
        let obj = value.as_object().filter(|obj| !obj.is_empty())?;

        let author_role = MessageRole::from_export_value(
            obj.get("author")
                .and_then(|author| author.get("role"))
                .unwrap_or(&Value::Null),
        );
        let content_parts =
            ContentParts::from_export(obj.get("content").and_then(|c| c.get("parts")));

        Some(Self {
            author_role,
            content_parts,
            create_time: obj.get("create_time").and_then(Value::as_f64),
            metadata: obj
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }

    pub fn text_content(&self) -> &str {
        self.content_parts.text()
    }

    /// Title carried by system-initiated conversations under
    /// `metadata.user_context_message_data`.
    ///
    /// The outer `Option` reports whether a hint block exists at all; the
    /// inner one whether it has a `title` key. The value is taken as is.
    pub fn title_hint(&self) -> Option<Option<&Value>> {
        let hint = self
            .metadata
            .get("user_context_message_data")
            .filter(|data| is_truthy(data))?;
        Some(hint.get("title"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub message: Option<Message>,
    pub child_ids: Vec<String>,
}

impl MessageNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            message: None,
            child_ids: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_ids = children.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `None` for falsy node payloads (`null`, `{}`), which the
    /// export treats the same as a missing node.
    fn from_export(id: &str, value: &Value) -> Option<Self> {
        let obj = value.as_object().filter(|obj| !obj.is_empty())?;

        let child_ids = obj
            .get("children")
            .and_then(Value::as_array)
            .map(|children| children.iter().map(id_string).collect())
            .unwrap_or_default();

        Some(Self {
            id: id.to_owned(),
            parent_id: obj.get("parent").filter(|p| !p.is_null()).map(id_string),
            message: obj.get("message").and_then(Message::from_export),
            child_ids,
        })
    }
}

/// Conversation-level `id`, `title` and `create_time` keep their export JSON
/// values so they are written back unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConversationTree {
    pub id: Value,
    pub title: Value,
    pub create_time: Value,
    nodes: Vec<MessageNode>,
    index: HashMap<String, usize>,
}

impl ConversationTree {
    pub fn new(id: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            id: Value::String(id.into()),
            title: title.map_or(Value::Null, |t| Value::String(t.to_owned())),
            ..Self::default()
        }
    }

    /// Add a node, keeping document order. A repeated id replaces the
    /// earlier node in place.
    pub fn insert(&mut self, node: MessageNode) {
        match self.index.get(&node.id) {
            Some(&slot) => self.nodes[slot] = node,
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    pub fn with_node(mut self, node: MessageNode) -> Self {
        self.insert(node);
        self
    }

    pub fn node(&self, id: &str) -> Option<&MessageNode> {
        self.index.get(id).map(|&slot| &self.nodes[slot])
    }

    /// Nodes in mapping (document) order.
    pub fn nodes(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a tree from one entry of the export's top-level array.
    ///
    /// Returns `None` when the entry is not a JSON object.
    pub fn from_export(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let mut tree = Self {
            id: obj.get("id").cloned().unwrap_or_default(),
            title: obj
                .get("title")
                .cloned()
                .unwrap_or_else(|| Value::String(DEFAULT_TITLE.to_owned())),
            create_time: obj.get("create_time").cloned().unwrap_or_default(),
            ..Self::default()
        };

        if let Some(mapping) = obj.get("mapping").and_then(Value::as_object) {
            for (node_id, node_value) in mapping {
                if let Some(node) = MessageNode::from_export(node_id, node_value) {
                    tree.insert(node);
                }
            }
        }

        Some(tree)
    }
}

/// One linearized conversation as written to the output file.
///
/// Field order is the output key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedConversation {
    pub id: Value,
    pub title: Value,
    pub create_time: Value,
    #[serde(rename = "messages")]
    pub transcript: String,
}

/// Titles that carry no information: falsy values or the export default.
pub fn is_default_title(title: &Value) -> bool {
    !is_truthy(title) || title.as_str() == Some(DEFAULT_TITLE)
}

/// Titles a system message hint may replace: `null` or the export default.
pub fn is_replaceable_title(title: &Value) -> bool {
    title.is_null() || title.as_str() == Some(DEFAULT_TITLE)
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
