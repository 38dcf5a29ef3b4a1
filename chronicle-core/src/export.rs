//! Reading conversation exports and writing flattened output.
//!
//! The export is small enough to hold in memory, so it is read in one go.
//! Format is detected from the document itself:
//! - a JSON array is the usual `conversations.json` layout;
//! - a lone JSON object is taken as a single conversation;
//! - anything else starting with `{` is tried as NDJSON (one conversation
//!   per line), which is what `jq -c '.[]'` produces from an export.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::conversation::FlattenedConversation;
use crate::error::{ChronicleError, Result};

/// File name of the conversation list inside an unzipped export folder.
pub const EXPORT_FILE_NAME: &str = "conversations.json";

/// Default file the flattened conversations are written to.
pub const DEFAULT_OUTPUT_FILE: &str = "chatgpt_conversations.json";

/// Accepts either the export folder or the JSON file itself.
pub fn resolve_export_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_dir() {
        path.join(EXPORT_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Load the top-level conversation entries of an export.
///
/// Entries are returned unvalidated; non-object entries are the caller's
/// to skip.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_export(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = resolve_export_path(path);
    if !path.is_file() {
        return Err(ChronicleError::missing_input(path));
    }

    let content = fs::read_to_string(&path)?;
    let entries = parse_export(&path, &content)?;
    debug!(entries = entries.len(), "loaded export");
    Ok(entries)
}

fn parse_export(path: &Path, content: &str) -> Result<Vec<Value>> {
    let Some(first) = content.trim_start().chars().next() else {
        return Err(ChronicleError::invalid_format(path, "empty input file"));
    };

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(entries)) => Ok(entries),
        Ok(object @ Value::Object(_)) => Ok(vec![object]),
        Ok(other) => Err(ChronicleError::invalid_format(
            path,
            format!("expected a JSON array of conversations, found {}", kind_name(&other)),
        )),
        Err(err) if first == '{' => {
            parse_ndjson(content).map_err(|_| ChronicleError::malformed_json(path, err))
        }
        Err(err) => Err(ChronicleError::malformed_json(path, err)),
    }
}

fn parse_ndjson(content: &str) -> serde_json::Result<Vec<Value>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write flattened conversations as an indented JSON array.
#[instrument(skip_all, fields(path = %path.as_ref().display(), count = conversations.len()))]
pub fn write_flattened(
    path: impl AsRef<Path>,
    conversations: &[FlattenedConversation],
) -> Result<()> {
    let path = path.as_ref();
    write_pretty(path, conversations).map_err(|err| ChronicleError::write_failure(path, err))
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_folder_resolves_to_conversations_json() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_export_path(dir.path()), dir.path().join(EXPORT_FILE_NAME));

        let file = dir.path().join("custom.json");
        assert_eq!(resolve_export_path(&file), file);
    }

    #[test]
    fn test_missing_export_in_folder() {
        let dir = tempdir().unwrap();
        let err = load_export(dir.path()).unwrap_err();
        assert!(matches!(err, ChronicleError::MissingInput { .. }));
    }

    #[test]
    fn test_load_json_array() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  [ {{\"id\": \"a\"}}, 3 ]").unwrap();
        file.flush().unwrap();

        let entries = load_export(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["id"], "a");
    }

    #[test]
    fn test_load_ndjson() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"id\": \"a\"}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{\"id\": \"b\"}}").unwrap();
        file.flush().unwrap();

        let entries = load_export(file.path()).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_single_object_is_one_conversation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\n  \"id\": \"solo\",\n  \"mapping\": {{}}\n}}").unwrap();
        file.flush().unwrap();

        let entries = load_export(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[{{\"id\": \"a\"}},").unwrap();
        file.flush().unwrap();

        let err = load_export(file.path()).unwrap_err();
        assert!(matches!(err, ChronicleError::MalformedJson { .. }));
    }

    #[test]
    fn test_scalar_document_is_invalid_format() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"just a string\"").unwrap();
        file.flush().unwrap();

        let err = load_export(file.path()).unwrap_err();
        assert!(matches!(err, ChronicleError::InvalidFormat { .. }));
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = load_export(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty input file"));
    }

    #[test]
    fn test_write_flattened_is_indented() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.json");
        let convs = vec![FlattenedConversation {
            id: json!("c1"),
            title: json!("Hello"),
            create_time: Value::Null,
            transcript: "User: Hi".into(),
        }];

        write_flattened(&out, &convs).unwrap();
        let written = fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("[\n  {\n    \"id\": \"c1\""));
        assert!(written.contains("\"create_time\": null"));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("no-such-dir").join("out.json");

        let err = write_flattened(&out, &[]).unwrap_err();
        assert!(matches!(err, ChronicleError::WriteFailure { .. }));
    }
}
