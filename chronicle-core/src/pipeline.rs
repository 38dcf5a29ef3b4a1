use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::conversation::{is_default_title, ConversationTree, FlattenedConversation};
use crate::error::Result;
use crate::export::{load_export, write_flattened};
use crate::linearize::linearize_tree;

/// Counters describing one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Top-level entries seen in the export
    pub entries: usize,
    pub emitted: usize,
    pub skipped_non_object: usize,
    /// Conversations that produced no transcript lines
    pub dropped_empty: usize,
    pub titles_recovered: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub conversations: Vec<FlattenedConversation>,
    pub report: AssemblyReport,
}

/// Flatten every conversation entry of an export.
///
/// Per-entry anomalies never fail the run: non-object entries are skipped
/// with a warning and conversations without transcript lines are dropped.
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn assemble(entries: &[Value]) -> Assembly {
    let mut assembly = Assembly::default();
    let report = &mut assembly.report;

    for (idx, entry) in entries.iter().enumerate() {
        report.entries += 1;

        let Some(tree) = ConversationTree::from_export(entry) else {
            warn!(
                index = idx,
                "skipping non-object item in conversations list: {}",
                preview(entry, 80)
            );
            report.skipped_non_object += 1;
            continue;
        };

        let linear = linearize_tree(&tree);
        if linear.title_recovered {
            report.titles_recovered += 1;
        }

        if !linear.lines.is_empty() {
            let transcript = linear.transcript();
            assembly.conversations.push(FlattenedConversation {
                id: tree.id,
                title: linear.title,
                create_time: tree.create_time,
                transcript,
            });
            report.emitted += 1;
            continue;
        }

        report.dropped_empty += 1;
        let id = display_id(&tree.id);
        if is_default_title(&linear.title) {
            info!(
                "skipping conversation with ID {} as it has no messages and no meaningful title",
                id
            );
        } else {
            debug!(id = %id, title = %linear.title, "conversation has no transcript lines; not emitted");
        }
    }

    assembly
}

/// Load an export, flatten it, and write the result.
///
/// Missing or unparseable input fails before anything is written.
#[instrument(skip_all, fields(input = %input.as_ref().display(), output = %output.as_ref().display()))]
pub fn parse_export_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<AssemblyReport> {
    let entries = load_export(input)?;
    let assembly = assemble(&entries);

    info!(
        entries = assembly.report.entries,
        emitted = assembly.report.emitted,
        skipped = assembly.report.skipped_non_object,
        dropped = assembly.report.dropped_empty,
        titles_recovered = assembly.report.titles_recovered,
        "assembled conversations"
    );

    write_flattened(output, &assembly.conversations)?;
    Ok(assembly.report)
}

/// Conversation id for log lines: strings bare, anything else as JSON.
fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate a JSON rendering for log output on a char boundary.
fn preview(value: &Value, max_chars: usize) -> String {
    let rendered = value.to_string();
    match rendered.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &rendered[..byte_idx]),
        None => rendered,
    }
}
