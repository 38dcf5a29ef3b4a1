use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type of native Google Docs, the only type exported as text.
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

/// File metadata as listed by `files.list` and saved to the activity file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified_time: DateTime<Utc>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl DriveFile {
    pub fn is_google_doc(&self) -> bool {
        self.mime_type == GOOGLE_DOC_MIME
    }
}

/// One page of `files.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Subset of `files.get` used before exporting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_owned(),
    }
}
