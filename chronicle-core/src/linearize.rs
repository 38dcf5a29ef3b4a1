//! Conversation tree linearization.
//!
//! A conversation is flattened by picking one start node and following the
//! first child of every node until the path ends. Sibling branches (edited
//! or regenerated turns) are dropped.
//!
//! * root selection is first-found-wins over parentless nodes carrying a
//!   message, in mapping order ([`select_root_by_parent`]);
//! * only when no such node exists, the earliest message by `create_time`
//!   is used ([`select_root_by_time`]);
//! * traversal follows the leftmost path and stops on revisits, so cyclic
//!   exports terminate.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::conversation::{is_replaceable_title, ConversationTree, Message, MessageRole};

/// Result of linearizing one conversation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Linearized {
    /// Conversation title after recovery from system metadata
    pub title: Value,
    pub title_recovered: bool,
    pub start: Option<String>,
    pub lines: Vec<String>,
}

impl Linearized {
    pub fn transcript(&self) -> String {
        self.lines.join("\n")
    }
}

/// Select the start node, then walk it.
pub fn linearize_tree(tree: &ConversationTree) -> Linearized {
    let start = select_root(tree);
    let lines = linearize(tree, start);
    let title = recover_title(tree);
    let title_recovered = title != tree.title;

    Linearized {
        title,
        title_recovered,
        start: start.map(str::to_owned),
        lines,
    }
}

/// Pick exactly one node to start traversal from, or `None` when no node
/// in the mapping carries a message.
///
/// An empty node id counts as no selection, both here and in [`linearize`].
pub fn select_root(tree: &ConversationTree) -> Option<&str> {
    select_root_by_parent(tree).filter(|id| !id.is_empty()).or_else(|| {
        let fallback = select_root_by_time(tree);
        if let Some(id) = fallback {
            debug!(node = id, "no parentless message node; using earliest message");
        }
        fallback
    })
}

/// First parentless node with a message, in mapping order.
pub fn select_root_by_parent(tree: &ConversationTree) -> Option<&str> {
    tree.nodes()
        .find(|node| node.parent_id.is_none() && node.message.is_some())
        .map(|node| node.id.as_str())
}

/// Earliest message node by `(create_time, node_id)`.
///
/// A missing or zero `create_time` ranks after every real timestamp.
pub fn select_root_by_time(tree: &ConversationTree) -> Option<&str> {
    tree.nodes()
        .filter_map(|node| {
            node.message
                .as_ref()
                .map(|message| (rank_time(message), node.id.as_str()))
        })
        .min_by(|a, b| compare_rank(*a, *b))
        .map(|(_, id)| id)
}

fn rank_time(message: &Message) -> f64 {
    match message.create_time {
        Some(t) if t != 0.0 => t,
        _ => f64::INFINITY,
    }
}

fn compare_rank(a: (f64, &str), b: (f64, &str)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

/// Title for the conversation, replacing a missing or `"Untitled"` title with
/// the hint carried by a parentless system message.
///
/// Candidates are visited in mapping order; once a meaningful title is in
/// place later hints are ignored.
pub fn recover_title(tree: &ConversationTree) -> Value {
    let mut title = tree.title.clone();

    let candidates = tree
        .nodes()
        .filter(|node| node.parent_id.is_none())
        .filter_map(|node| node.message.as_ref());

    for message in candidates {
        if message.author_role != MessageRole::System {
            continue;
        }
        let Some(hint) = message.title_hint() else {
            continue;
        };
        if is_replaceable_title(&title) {
            if let Some(hinted) = hint {
                debug!(title = %hinted, "recovered title from system message metadata");
                title = hinted.clone();
            }
        }
    }

    title
}

/// Walk the leftmost path from `start`, formatting every message on it.
///
/// Stops at a missing or empty id, an id absent from the mapping, a node
/// without children, or a node already visited.
pub fn linearize(tree: &ConversationTree, start: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = start;

    while let Some(id) = current {
        if id.is_empty() {
            debug!("empty node id; ending path");
            break;
        }
        let Some(node) = tree.node(id) else {
            debug!(node = id, "child id missing from mapping; ending path");
            break;
        };
        if !visited.insert(node.id.as_str()) {
            debug!(node = id, "cycle detected; ending path");
            break;
        }

        if let Some(line) = node.message.as_ref().and_then(format_message) {
            lines.push(line);
        }

        current = node.child_ids.first().map(String::as_str);
    }

    lines
}

/// Format a message as `"<Role>: <text>"`, or `None` for roles that are
/// not part of the transcript.
pub fn format_message(message: &Message) -> Option<String> {
    let label = message.author_role.label()?;
    Some(format!("{}: {}", label, message.text_content()))
}
